//! Observable state of a compose session.

use crate::draft::{ATTACHMENTS_MAX_SIZE, Attachment, Draft, Recipient};
use crate::signature::Signature;

/// Lifecycle of a compose session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// The draft is being loaded or created.
    #[default]
    Loading,
    /// The draft is open for editing.
    Ready,
    /// A save is in progress.
    Saving,
    /// A send is in progress.
    Sending,
    /// A scheduled send is in progress.
    Scheduling,
    /// The session ended with the draft stored.
    Persisted,
    /// The session ended with the draft deleted.
    Discarded,
}

impl SessionPhase {
    /// Whether the session has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Persisted | Self::Discarded)
    }
}

/// What the compose screen renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposeState {
    /// Session lifecycle.
    pub phase: SessionPhase,
    /// `To` recipients.
    pub to: Vec<Recipient>,
    /// `Cc` recipients.
    pub cc: Vec<Recipient>,
    /// `Bcc` recipients.
    pub bcc: Vec<Recipient>,
    /// Attachments with their upload status.
    pub attachments: Vec<Attachment>,
    /// Selected signature.
    pub signature: Option<Signature>,
    /// Whether encryption is on.
    pub is_encrypted: bool,
    /// Manually entered recipients outside the mailbox's domains.
    pub external_recipients: Vec<Recipient>,
    /// Whether the send button is enabled.
    pub can_send: bool,
}

impl ComposeState {
    /// Build the state shown for `draft`.
    #[must_use]
    pub fn from_draft(
        phase: SessionPhase,
        draft: &Draft,
        signature: Option<&Signature>,
        internal_domains: &[String],
    ) -> Self {
        Self {
            phase,
            to: draft.to.clone(),
            cc: draft.cc.clone(),
            bcc: draft.bcc.clone(),
            attachments: draft.attachments.clone(),
            signature: signature.cloned(),
            is_encrypted: draft.is_encrypted,
            external_recipients: external_recipients(draft, internal_domains),
            can_send: can_send(draft),
        }
    }
}

/// Whether `draft` may be sent.
///
/// It needs at least one recipient and attachments within
/// [`ATTACHMENTS_MAX_SIZE`]. When encrypted, every recipient must have a key
/// or a password must be set.
#[must_use]
pub fn can_send(draft: &Draft) -> bool {
    let has_recipients = draft.all_recipients().next().is_some();
    let size_ok = draft.attachments_size() <= ATTACHMENTS_MAX_SIZE;
    let encryption_ok = !draft.is_encrypted
        || draft
            .all_recipients()
            .all(|r| r.can_be_encrypted == Some(true))
        || draft
            .encryption_password
            .as_deref()
            .is_some_and(|password| !password.trim().is_empty());

    has_recipients && size_ok && encryption_ok
}

/// Recipients the user typed whose domain is not one of `internal_domains`.
#[must_use]
pub fn external_recipients(draft: &Draft, internal_domains: &[String]) -> Vec<Recipient> {
    draft
        .all_recipients()
        .filter(|r| r.manually_entered)
        .filter(|r| {
            r.domain().is_some_and(|domain| {
                !internal_domains
                    .iter()
                    .any(|internal| internal.eq_ignore_ascii_case(&domain))
            })
        })
        .cloned()
        .collect()
}
