//! Everything a compose session needs from the rest of the application.

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::DraftApi;
use crate::capture::CaptureChannel;
use crate::dispatch::DraftDispatcher;
use crate::draft::{AttachmentImporter, DraftId, DraftMode, DraftStore, PreviousMessage, Recipient};
use crate::signature::Signature;
use crate::upload::UploadCoordinator;

/// Mailbox and collaborators injected into a compose session.
#[derive(Clone)]
pub struct SessionContext {
    /// Address of the mailbox the draft is written from.
    pub mailbox_email: String,
    /// Domains whose addresses are not external.
    pub internal_domains: Vec<String>,
    /// Signatures of the mailbox.
    pub signatures: Vec<Signature>,
    /// Local draft storage.
    pub store: Arc<dyn DraftStore>,
    /// Remote API.
    pub api: Arc<dyn DraftApi>,
    /// Attachment uploads; share one instance per process.
    pub uploads: UploadCoordinator,
    /// Local attachment copies.
    pub importer: AttachmentImporter,
    /// Hand-off of the editor's final text.
    pub capture: Arc<CaptureChannel>,
}

impl SessionContext {
    /// Create a context for `mailbox_email` with no signatures.
    ///
    /// The mailbox's own domain is the only internal domain.
    #[must_use]
    pub fn new(
        mailbox_email: impl Into<String>,
        store: Arc<dyn DraftStore>,
        api: Arc<dyn DraftApi>,
        upload_root: impl Into<PathBuf>,
    ) -> Self {
        let mailbox_email = mailbox_email.into();
        let internal_domains = mailbox_email
            .rsplit_once('@')
            .map(|(_, domain)| vec![domain.to_lowercase()])
            .unwrap_or_default();

        Self {
            mailbox_email,
            internal_domains,
            signatures: Vec::new(),
            uploads: UploadCoordinator::new(Arc::clone(&store), Arc::clone(&api)),
            store,
            api,
            importer: AttachmentImporter::new(upload_root),
            capture: Arc::new(CaptureChannel::new()),
        }
    }

    /// Sets the mailbox's signatures.
    #[must_use]
    pub fn with_signatures(mut self, signatures: Vec<Signature>) -> Self {
        self.signatures = signatures;
        self
    }

    /// Shares an existing upload coordinator.
    #[must_use]
    pub fn with_uploads(mut self, uploads: UploadCoordinator) -> Self {
        self.uploads = uploads;
        self
    }

    /// Dispatcher pushing this mailbox's drafts.
    #[must_use]
    pub fn dispatcher(&self) -> DraftDispatcher {
        DraftDispatcher::new(
            Arc::clone(&self.store),
            Arc::clone(&self.api),
            self.uploads.clone(),
        )
    }
}

/// How a compose session was opened.
#[derive(Debug, Clone, Default)]
pub struct InitContext {
    /// Kind of draft.
    pub mode: DraftMode,
    /// Local draft to reopen.
    pub local_draft_id: Option<DraftId>,
    /// Remote draft resource to fetch when there is no local copy.
    pub remote_resource: Option<String>,
    /// Message replied to or forwarded.
    pub previous_message: Option<PreviousMessage>,
    /// `mailto:` link to prefill from.
    pub mailto: Option<String>,
    /// Recipient to prefill a new message with.
    pub recipient: Option<Recipient>,
}

impl InitContext {
    /// A blank new message.
    #[must_use]
    pub fn new_mail() -> Self {
        Self::default()
    }

    /// A reply, or a reply-all, to `previous`.
    #[must_use]
    pub fn reply(previous: PreviousMessage, reply_all: bool) -> Self {
        Self {
            mode: if reply_all {
                DraftMode::ReplyAll
            } else {
                DraftMode::Reply
            },
            previous_message: Some(previous),
            ..Self::default()
        }
    }

    /// A forward of `previous`.
    #[must_use]
    pub fn forward(previous: PreviousMessage) -> Self {
        Self {
            mode: DraftMode::Forward,
            previous_message: Some(previous),
            ..Self::default()
        }
    }

    /// Reopen an existing draft.
    #[must_use]
    pub fn existing(local_draft_id: Option<DraftId>, remote_resource: Option<String>) -> Self {
        Self {
            local_draft_id,
            remote_resource,
            ..Self::default()
        }
    }

    /// Prefills from a `mailto:` link.
    #[must_use]
    pub fn with_mailto(mut self, uri: impl Into<String>) -> Self {
        self.mailto = Some(uri.into());
        self
    }

    /// Prefills a recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient: Recipient) -> Self {
        self.recipient = Some(recipient);
        self
    }
}
