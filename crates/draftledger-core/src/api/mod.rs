//! Remote mail API used to store and send drafts.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::draft::{Attachment, Draft, DraftAction, PreviousMessage, RemoteRef};

pub use http::HttpDraftApi;

/// Errors returned by the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server could not be reached, or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// The server refused the request.
    #[error("Request rejected: {code} - {description}")]
    Rejected {
        /// Error code (e.g., `draft_already_scheduled_or_sent`).
        code: String,
        /// Human-readable description.
        description: String,
    },

    /// The response could not be decoded.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Local I/O error, e.g. reading the file to upload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Creates a rejection from error code and description.
    #[must_use]
    pub fn rejected(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            description: description.into(),
        }
    }

    /// Whether retrying the same request later may succeed.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

/// What the server answers to a save, send or schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    /// Remote UUID of the draft.
    #[serde(rename = "draft_uuid")]
    pub draft_uuid: String,
    /// UID of the message backing the draft.
    #[serde(default, rename = "uid")]
    pub message_uid: Option<String>,
}

/// Remote operations on drafts.
#[async_trait]
pub trait DraftApi: Send + Sync {
    /// Fetch a remote draft by its resource path.
    ///
    /// The returned draft has a fresh local ID.
    async fn fetch_draft(&self, resource: &str) -> Result<Option<Draft>, ApiError>;

    /// Save, send or schedule a draft.
    async fn save_or_send(&self, draft: &Draft, action: DraftAction)
    -> Result<SaveResult, ApiError>;

    /// Upload an attachment's local file.
    async fn upload_attachment(&self, attachment: &Attachment) -> Result<RemoteRef, ApiError>;

    /// Server-side copies of a message's attachments, for a forward.
    async fn attachments_to_forward(
        &self,
        previous: &PreviousMessage,
    ) -> Result<Vec<Attachment>, ApiError>;
}
