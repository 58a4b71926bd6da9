//! Body content type handling.

use crate::error::{Error, Result};

/// MIME type of a draft body, without its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html").
    pub sub_type: String,
}

/// How a stored body must be interpreted by the splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// `text/plain`: no markup, nothing to split.
    PlainText,
    /// Anything else is handled as HTML.
    Html,
}

impl ContentType {
    /// Checks if this is `text/plain`.
    #[must_use]
    pub fn is_plain_text(&self) -> bool {
        self.main_type == "text" && self.sub_type == "plain"
    }

    /// Returns the body format implied by this content type.
    #[must_use]
    pub fn body_format(&self) -> BodyFormat {
        if self.is_plain_text() {
            BodyFormat::PlainText
        } else {
            BodyFormat::Html
        }
    }

    /// Parses a content type string, ignoring its parameters.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let type_str = s
            .split(';')
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidContentType("Empty content type".to_string()))?;

        let (main_type, sub_type) = type_str
            .split_once('/')
            .filter(|(_, sub)| !sub.trim().is_empty())
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype in {type_str}")))?;

        Ok(Self {
            main_type: main_type.trim().to_lowercase(),
            sub_type: sub_type.trim().to_lowercase(),
        })
    }
}

impl BodyFormat {
    /// Detects the format of a stored body from its MIME type string.
    ///
    /// Unparseable or empty MIME types are treated as HTML, which is what
    /// the compose editor produces.
    #[must_use]
    pub fn detect(mime_type: &str) -> Self {
        ContentType::parse(mime_type).map_or(Self::Html, |ct| ct.body_format())
    }
}
