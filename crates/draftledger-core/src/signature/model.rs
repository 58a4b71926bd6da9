//! Signature model types.

use serde::{Deserialize, Serialize};

use crate::draft::DraftMode;

/// Identifier of a signature (sender identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureId(pub i64);

impl SignatureId {
    /// Identity of the "no signature" placeholder.
    pub const NONE: Self = Self(-1);
}

impl std::fmt::Display for SignatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sender identity with its HTML signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature ID.
    pub id: SignatureId,
    /// Name shown in the signature picker.
    #[serde(default)]
    pub name: String,
    /// Sender display name.
    #[serde(default)]
    pub sender_name: String,
    /// Sender email address.
    pub sender_email: String,
    /// Raw HTML content.
    #[serde(default)]
    pub content: String,
    /// Default signature for new messages.
    #[serde(default)]
    pub is_default: bool,
    /// Default signature for replies.
    #[serde(default)]
    pub is_default_reply: bool,
    /// Placeholder meaning "no signature".
    #[serde(default)]
    pub is_dummy: bool,
}

impl Signature {
    /// Create a real signature.
    #[must_use]
    pub fn new(
        id: i64,
        sender_name: impl Into<String>,
        sender_email: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let sender_name = sender_name.into();
        Self {
            id: SignatureId(id),
            name: sender_name.clone(),
            sender_name,
            sender_email: sender_email.into(),
            content: content.into(),
            is_default: false,
            is_default_reply: false,
            is_dummy: false,
        }
    }

    /// Mark as the default signature.
    #[must_use]
    pub const fn default_for_new(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Mark as the default signature for replies.
    #[must_use]
    pub const fn default_for_reply(mut self) -> Self {
        self.is_default_reply = true;
        self
    }

    /// The "no signature" placeholder for a mailbox.
    #[must_use]
    pub fn dummy(mailbox_email: impl Into<String>, is_default: bool) -> Self {
        Self {
            id: SignatureId::NONE,
            name: "No signature".to_string(),
            sender_name: String::new(),
            sender_email: mailbox_email.into(),
            content: String::new(),
            is_default,
            is_default_reply: false,
            is_dummy: true,
        }
    }

    /// Whether this signature is the default one for drafts of `mode`.
    #[must_use]
    pub const fn is_default_for(&self, mode: DraftMode) -> bool {
        if mode.is_reply() {
            self.is_default_reply
        } else {
            self.is_default
        }
    }
}
