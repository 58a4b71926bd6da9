//! The message a draft replies to or forwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Attachment, Recipient};

/// A received message used as the base of a reply or forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousMessage {
    /// Remote UID.
    pub uid: String,
    /// `Message-ID` header.
    #[serde(default)]
    pub message_id: Option<String>,
    /// `References` header.
    #[serde(default)]
    pub references: Option<String>,
    /// Subject.
    #[serde(default)]
    pub subject: Option<String>,
    /// Senders.
    #[serde(default)]
    pub from: Vec<Recipient>,
    /// `To` recipients.
    #[serde(default)]
    pub to: Vec<Recipient>,
    /// `Cc` recipients.
    #[serde(default)]
    pub cc: Vec<Recipient>,
    /// `Reply-To` addresses.
    #[serde(default)]
    pub reply_to: Vec<Recipient>,
    /// Body.
    #[serde(default)]
    pub body: String,
    /// MIME type of the body.
    pub mime_type: String,
    /// Date the message was sent.
    pub date: DateTime<Utc>,
    /// Attachments of the message.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl PreviousMessage {
    /// Compute `(to, cc)` for a reply.
    ///
    /// `Reply-To` wins over `From`; the mailbox's own address is removed
    /// everywhere. If nobody else is left, the reply goes back to `From`.
    #[must_use]
    pub fn reply_recipients(
        &self,
        reply_all: bool,
        mailbox_email: &str,
    ) -> (Vec<Recipient>, Vec<Recipient>) {
        let not_me = |list: &[Recipient]| -> Vec<Recipient> {
            list.iter()
                .filter(|r| !r.email.eq_ignore_ascii_case(mailbox_email))
                .cloned()
                .collect()
        };

        let cleaned_to = not_me(&self.to);
        let cleaned_cc = not_me(&self.cc);

        let mut to = not_me(&self.reply_to);
        if to.is_empty() {
            to = not_me(&self.from);
        }
        let mut cc = Vec::new();

        if to.is_empty() {
            to = cleaned_to;
        } else if reply_all {
            cc = cleaned_to;
        }

        if to.is_empty() {
            to = cleaned_cc;
        } else if reply_all {
            cc.extend(cleaned_cc);
        }

        if to.is_empty() {
            to.clone_from(&self.from);
        }

        (to, cc)
    }

    /// `References` header for a reply to this message.
    #[must_use]
    pub fn reply_references(&self) -> Option<String> {
        match (self.references.as_deref(), self.message_id.as_deref()) {
            (Some(refs), Some(id)) if !refs.trim().is_empty() => Some(format!("{} {id}", refs.trim())),
            (_, Some(id)) => Some(id.to_string()),
            (Some(refs), None) => Some(refs.to_string()),
            (None, None) => None,
        }
    }
}
