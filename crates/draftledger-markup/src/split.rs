//! Splitting a stored draft body into user content, signature and quote.
//!
//! A draft saved by the compose screen is the concatenation of three parts:
//! the text the user typed, the signature container and the quoted thread.
//! When the draft is reopened the parts are separated again so that only the
//! user text is editable, while signature and quote are re-appended untouched
//! on the next save.

use scraper::{Html, Selector};

use crate::content_type::BodyFormat;

/// CSS class of the signature container.
pub const SIGNATURE_CLASS: &str = "editorUserSignature";

/// CSS class of a reply quote block.
pub const REPLY_QUOTE_CLASS: &str = "ik_mail_quote";

/// CSS class of a forwarded message block.
pub const FORWARD_QUOTE_CLASS: &str = "forwardContentMessage";

/// A stored body split into its editable and non-editable parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitBody {
    /// User-editable content.
    pub body: String,
    /// Outer markup of the signature container, if any.
    pub signature: Option<String>,
    /// Outer markup of the quoted thread, if any.
    pub quote: Option<String>,
}

impl SplitBody {
    /// Creates a split body with no signature and no quote.
    #[must_use]
    pub fn plain(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            signature: None,
            quote: None,
        }
    }

    /// Re-assembles the whole body: content, then signature, then quote.
    #[must_use]
    pub fn join(&self) -> String {
        join_body(
            &self.body,
            self.signature.as_deref(),
            self.quote.as_deref(),
        )
    }
}

/// Concatenates user content, signature and quote in the stored order.
#[must_use]
pub fn join_body(body: &str, signature: Option<&str>, quote: Option<&str>) -> String {
    let mut whole = String::with_capacity(
        body.len() + signature.map_or(0, str::len) + quote.map_or(0, str::len),
    );
    whole.push_str(body);
    whole.push_str(signature.unwrap_or_default());
    whole.push_str(quote.unwrap_or_default());
    whole
}

/// Wraps raw signature HTML in the signature container.
#[must_use]
pub fn wrap_signature(content: &str) -> String {
    format!(r#"<div class="{SIGNATURE_CLASS}">{content}</div>"#)
}

/// Splits a stored body into user content, signature and quote.
///
/// Plain text bodies are returned whole. For HTML, the signature container
/// is removed first; then, of the reply and forward markers, the one whose
/// last occurrence comes first in the raw text is removed as the quote. A
/// marker that does not occur never wins, and when neither occurs the reply
/// marker is tried (which finds nothing).
#[must_use]
pub fn split_body(stored: &str, mime_type: &str) -> SplitBody {
    if BodyFormat::detect(mime_type) == BodyFormat::PlainText {
        return SplitBody::plain(stored);
    }

    let mut document = Html::parse_document(stored);

    let (body_with_quote, signature) = match detach_first_by_class(&mut document, SIGNATURE_CLASS)
    {
        Some(removed) => (body_inner_html(&document), removed.into_markup()),
        None => (stored.to_string(), None),
    };

    let reply_position = last_index_or_max(stored, REPLY_QUOTE_CLASS);
    let forward_position = last_index_or_max(stored, FORWARD_QUOTE_CLASS);
    let quote_class = if reply_position <= forward_position {
        REPLY_QUOTE_CLASS
    } else {
        FORWARD_QUOTE_CLASS
    };

    let (body, quote) = match detach_first_by_class(&mut document, quote_class) {
        Some(removed) => (body_inner_html(&document), removed.into_markup()),
        None => (body_with_quote, None),
    };

    SplitBody {
        body,
        signature,
        quote,
    }
}

/// An element taken out of a parsed document.
struct Detached {
    outer_html: String,
    is_blank: bool,
}

impl Detached {
    fn into_markup(self) -> Option<String> {
        (!self.is_blank).then_some(self.outer_html)
    }
}

fn detach_first_by_class(document: &mut Html, class: &str) -> Option<Detached> {
    let selector = Selector::parse(&format!(".{class}")).ok()?;

    let (id, detached) = {
        let element = document.select(&selector).next()?;
        let detached = Detached {
            outer_html: element.html(),
            is_blank: element.inner_html().trim().is_empty(),
        };
        (element.id(), detached)
    };

    if let Some(mut node) = document.tree.get_mut(id) {
        node.detach();
    }

    Some(detached)
}

fn body_inner_html(document: &Html) -> String {
    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(|body| body.inner_html()))
        .unwrap_or_else(|| document.root_element().inner_html())
}

fn last_index_or_max(haystack: &str, needle: &str) -> usize {
    haystack.rfind(needle).unwrap_or(usize::MAX)
}
