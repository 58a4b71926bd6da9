//! The compose session: editing one draft and deciding what to do with it.
//!
//! A session loads or creates a draft, lets the user edit it and, when the
//! user leaves or asks to send, turns the editor's final text into the right
//! action: nothing at all for an untouched draft, deleting a new draft that
//! was never edited, or persisting it and handing it to the dispatcher.
//!
//! The editor reports its text through the [`CaptureChannel`](crate::capture::CaptureChannel):
//! call [`ComposeSession::capture_final_text`] before each
//! [`ComposeSession::request_action`].

mod context;
mod init;
mod mailto;
mod state;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use draftledger_markup::{join_body, normalize_subject, wrap_signature};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::ApiError;
use crate::dispatch::{DispatchError, DispatchOutcome, DraftDispatcher};
use crate::draft::{Attachment, AttachmentId, Draft, DraftAction, FieldType, ImportOutcome, Recipient};
use crate::signature::{Signature, SignatureId};
use crate::snapshot::{DraftSnapshot, is_unchanged};

pub use context::{InitContext, SessionContext};
pub use mailto::{MailtoPrefill, parse_mailto};
pub use state::{ComposeState, SessionPhase, can_send, external_recipients};

/// Errors from a compose session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Local storage failed; the in-memory draft is kept.
    #[error("Store error: {0}")]
    Store(#[from] crate::Error),

    /// The remote API failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The session cannot take actions in its current phase.
    #[error("Session is {0:?}")]
    NotReady(SessionPhase),

    /// The draft has no recipient, too many attachments, or unencryptable
    /// recipients.
    #[error("Draft cannot be sent")]
    NotSendable,

    /// A scheduled send needs a date.
    #[error("Scheduled send needs a date")]
    MissingScheduleDate,
}

/// Result of [`ComposeSession::request_action`].
#[derive(Debug)]
pub enum ActionOutcome {
    /// A newer session generation took over; nothing was done.
    Superseded,
    /// Nothing changed since the last save; nothing was done.
    Unchanged,
    /// The draft was new and never edited; it was deleted.
    Discarded,
    /// The draft was stored and handed to the dispatcher.
    Persisted {
        /// Stored action.
        action: DraftAction,
        /// Background upload and push of the draft.
        dispatch: JoinHandle<Result<DispatchOutcome, DispatchError>>,
    },
}

/// One open draft.
pub struct ComposeSession {
    ctx: SessionContext,
    dispatcher: DraftDispatcher,
    draft: Draft,
    signature_markup: Option<String>,
    quote: Option<String>,
    signature: Option<Signature>,
    is_new: bool,
    snapshot: Option<DraftSnapshot>,
    generation: u64,
    phase: SessionPhase,
    state: watch::Sender<ComposeState>,
}

impl ComposeSession {
    /// Create a session in the loading phase.
    #[must_use]
    pub fn new(ctx: SessionContext) -> Self {
        let (state, _) = watch::channel(ComposeState::default());
        Self {
            dispatcher: ctx.dispatcher(),
            ctx,
            draft: Draft::new(),
            signature_markup: None,
            quote: None,
            signature: None,
            is_new: false,
            snapshot: None,
            generation: 0,
            phase: SessionPhase::Loading,
            state,
        }
    }

    /// Load the draft described by `init`, or create it.
    ///
    /// The draft is stored locally and becomes the baseline for change
    /// detection. Returns `None` if a remote draft was requested and no longer
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the remote API fails.
    pub async fn initialize(&mut self, init: InitContext) -> Result<Option<Draft>, SessionError> {
        self.set_phase(SessionPhase::Loading);

        let Some(loaded) = init::load(&self.ctx, &init).await? else {
            return Ok(None);
        };

        self.draft = loaded.draft;
        self.signature_markup = loaded.signature_markup;
        self.quote = loaded.quote;
        self.signature = Some(loaded.signature);
        self.is_new = loaded.is_new;

        {
            let _guard = self.ctx.uploads.lock(self.draft.id).await;
            self.ctx.store.upsert_draft(&self.stored_form()).await?;
        }
        self.snapshot = Some(DraftSnapshot::capture(&self.draft));
        self.generation = self.ctx.capture.start_generation();

        tracing::info!(draft_id = %self.draft.id, is_new = self.is_new, "Compose session ready");
        self.set_phase(SessionPhase::Ready);
        Ok(Some(self.draft.clone()))
    }

    /// Subscribe to the state shown by the compose screen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ComposeState> {
        self.state.subscribe()
    }

    /// The draft being edited, with only the user's content as body.
    #[must_use]
    pub const fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Capture generation this session waits for.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Markup of the signature appended below the user's content.
    #[must_use]
    pub fn signature_markup(&self) -> Option<&str> {
        self.signature_markup.as_deref()
    }

    /// Markup of the quoted thread.
    #[must_use]
    pub fn quote(&self) -> Option<&str> {
        self.quote.as_deref()
    }

    /// The user came back to the compose screen.
    ///
    /// Text captured before this call is ignored from now on.
    pub fn start_observing(&mut self) -> u64 {
        self.generation = self.ctx.capture.start_generation();
        self.generation
    }

    /// Report the editor's final subject and body.
    pub fn capture_final_text(&self, subject: impl Into<String>, body: impl Into<String>) {
        self.ctx.capture.send(subject, body);
    }

    /// Add a recipient to a field.
    ///
    /// Returns `false` if the address is already in that field.
    pub fn add_recipient(&mut self, field: FieldType, recipient: Recipient) -> bool {
        let list = self.draft.field_mut(field);
        if list.iter().any(|r| r.same_email(&recipient)) {
            return false;
        }
        list.push(recipient);
        self.publish();
        true
    }

    /// Remove a recipient from a field.
    pub fn remove_recipient(&mut self, field: FieldType, email: &str) -> bool {
        let list = self.draft.field_mut(field);
        let before = list.len();
        list.retain(|r| !r.email.eq_ignore_ascii_case(email));
        let removed = list.len() != before;
        if removed {
            self.publish();
        }
        removed
    }

    /// Record whether a key is known for a recipient, in every field.
    pub fn set_recipient_encryptability(&mut self, email: &str, can_be_encrypted: bool) {
        for field in [FieldType::To, FieldType::Cc, FieldType::Bcc] {
            for recipient in self.draft.field_mut(field) {
                if recipient.email.eq_ignore_ascii_case(email) {
                    recipient.can_be_encrypted = Some(can_be_encrypted);
                }
            }
        }
        self.publish();
    }

    /// Import local files as attachments.
    pub async fn import_attachments(&mut self, sources: &[PathBuf]) -> ImportOutcome {
        let outcome = self
            .ctx
            .importer
            .import(self.draft.id, self.draft.attachments_size(), sources)
            .await;
        self.draft
            .attachments
            .extend(outcome.attachments.iter().cloned());
        self.publish();
        outcome
    }

    /// Remove an attachment and its local copy.
    pub async fn remove_attachment(&mut self, attachment_id: AttachmentId) -> Option<Attachment> {
        let index = self
            .draft
            .attachments
            .iter()
            .position(|a| a.id == attachment_id)?;
        let removed = self.draft.attachments.remove(index);

        if let Err(e) = self
            .ctx
            .importer
            .remove_attachment_files(self.draft.id, attachment_id)
            .await
        {
            tracing::warn!(%attachment_id, error = %e, "Failed to remove attachment files");
        }
        self.publish();
        Some(removed)
    }

    /// Select the sender signature; [`SignatureId::NONE`] removes it.
    ///
    /// Returns `false` if the signature is unknown.
    pub fn select_signature(&mut self, id: SignatureId) -> bool {
        let signature = if id == SignatureId::NONE {
            Signature::dummy(&self.ctx.mailbox_email, false)
        } else {
            match self.ctx.signatures.iter().find(|s| s.id == id) {
                Some(signature) => signature.clone(),
                None => return false,
            }
        };

        self.signature_markup = (!signature.is_dummy).then(|| wrap_signature(&signature.content));
        self.draft.identity_id = Some(signature.id);
        self.signature = Some(signature);
        self.publish();
        true
    }

    /// Turn encryption on or off.
    pub fn set_encryption(&mut self, enabled: bool) {
        self.draft.is_encrypted = enabled;
        self.publish();
    }

    /// Set the password used for recipients without a key.
    pub fn set_encryption_password(&mut self, password: Option<String>) {
        self.draft.encryption_password = password.filter(|p| !p.is_empty());
        self.publish();
    }

    /// Set or clear the scheduled send date.
    pub fn set_schedule_date(&mut self, date: Option<DateTime<Utc>>) {
        self.draft.schedule_date = date;
    }

    /// Save, send or schedule the draft.
    ///
    /// Waits for the editor's text of this session's generation. A save of
    /// an unchanged draft does nothing, except deleting a new draft when the
    /// user is leaving (`finishing`). Otherwise the draft is stored with the
    /// action and pushed in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not ready, the draft cannot be
    /// sent, or storing it fails. The in-memory draft is kept in every case.
    pub async fn request_action(
        &mut self,
        action: DraftAction,
        finishing: bool,
    ) -> Result<ActionOutcome, SessionError> {
        if self.phase != SessionPhase::Ready {
            return Err(SessionError::NotReady(self.phase));
        }

        self.set_phase(match action {
            DraftAction::Save => SessionPhase::Saving,
            DraftAction::Send | DraftAction::SendReaction => SessionPhase::Sending,
            DraftAction::Schedule => SessionPhase::Scheduling,
        });

        let result = self.run_action(action, finishing).await;
        match &result {
            Ok(ActionOutcome::Discarded) => self.set_phase(SessionPhase::Discarded),
            Ok(ActionOutcome::Superseded) => self.set_phase(SessionPhase::Ready),
            Ok(_) if finishing => self.set_phase(SessionPhase::Persisted),
            Ok(_) => self.set_phase(SessionPhase::Ready),
            Err(e) => {
                tracing::error!(draft_id = %self.draft.id, %action, error = %e, "Draft action failed");
                self.set_phase(SessionPhase::Ready);
            }
        }
        result
    }

    async fn run_action(
        &mut self,
        action: DraftAction,
        finishing: bool,
    ) -> Result<ActionOutcome, SessionError> {
        let Some(text) = self.ctx.capture.receive_for(self.generation).await else {
            tracing::debug!(draft_id = %self.draft.id, "Action superseded by a newer generation");
            return Ok(ActionOutcome::Superseded);
        };
        self.draft.subject = normalize_subject(&text.subject);
        self.draft.body = text.body;

        if action == DraftAction::Save && is_unchanged(self.snapshot.as_ref(), &self.draft) {
            if finishing && self.is_new {
                self.delete_stored().await?;
                tracing::info!(draft_id = %self.draft.id, "Discarded untouched new draft");
                return Ok(ActionOutcome::Discarded);
            }
            tracing::debug!(draft_id = %self.draft.id, "Draft unchanged, nothing to save");
            return Ok(ActionOutcome::Unchanged);
        }

        if action == DraftAction::Schedule && self.draft.schedule_date.is_none() {
            return Err(SessionError::MissingScheduleDate);
        }
        if action.is_dispatch() && !can_send(&self.draft) {
            return Err(SessionError::NotSendable);
        }

        self.persist(action).await?;
        self.is_new = false;
        if !finishing {
            self.snapshot = Some(DraftSnapshot::capture(&self.draft));
        }

        let dispatcher = self.dispatcher.clone();
        let draft_id = self.draft.id;
        let dispatch = tokio::spawn(async move { dispatcher.process_draft(draft_id).await });

        Ok(ActionOutcome::Persisted { action, dispatch })
    }

    /// Store the draft with `action`, keeping what background work already
    /// recorded for it.
    async fn persist(&mut self, action: DraftAction) -> Result<(), SessionError> {
        let _guard = self.ctx.uploads.lock(self.draft.id).await;

        let mut merged = self.stored_form();
        merged.action = Some(action);

        if let Some(stored) = self.ctx.store.get_draft(self.draft.id).await? {
            if stored.remote_uuid.is_some() {
                merged.remote_uuid = stored.remote_uuid;
            }
            if stored.message_uid.is_some() {
                merged.message_uid = stored.message_uid;
            }
            for attachment in &mut merged.attachments {
                if let Some(known) = stored.attachments.iter().find(|a| a.id == attachment.id) {
                    attachment.status = known.status;
                    attachment.remote.clone_from(&known.remote);
                    attachment.local_path.clone_from(&known.local_path);
                }
            }
        }

        self.ctx.store.upsert_draft(&merged).await?;
        tracing::debug!(draft_id = %merged.id, %action, "Draft stored");

        self.draft.remote_uuid = merged.remote_uuid;
        self.draft.message_uid = merged.message_uid;
        self.draft.attachments = merged.attachments;
        self.draft.action = Some(action);
        self.publish();
        Ok(())
    }

    /// Delete the draft on the user's request.
    ///
    /// A push already running for the draft finishes first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn discard(&mut self) -> Result<(), SessionError> {
        self.delete_stored().await?;
        tracing::info!(draft_id = %self.draft.id, "Draft discarded");
        self.set_phase(SessionPhase::Discarded);
        Ok(())
    }

    /// End the session.
    ///
    /// Local attachment copies of a discarded draft are deleted; those of a
    /// stored draft stay until they are uploaded.
    pub async fn close(self) {
        if self.phase != SessionPhase::Discarded {
            return;
        }
        if let Err(e) = self.ctx.importer.remove_draft_dir(self.draft.id).await {
            tracing::warn!(draft_id = %self.draft.id, error = %e, "Failed to remove upload directory");
        }
    }

    /// Delete the stored draft once no upload or push holds it.
    async fn delete_stored(&self) -> Result<(), SessionError> {
        let _guard = self.ctx.uploads.lock(self.draft.id).await;
        self.ctx.store.delete_draft(self.draft.id).await?;
        Ok(())
    }

    /// The draft as stored: the user's content followed by signature and quote.
    fn stored_form(&self) -> Draft {
        let mut stored = self.draft.clone();
        stored.body = join_body(
            &self.draft.body,
            self.signature_markup.as_deref(),
            self.quote.as_deref(),
        );
        stored
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.publish();
    }

    fn publish(&self) {
        self.state.send_replace(ComposeState::from_draft(
            self.phase,
            &self.draft,
            self.signature.as_ref(),
            &self.ctx.internal_domains,
        ));
    }
}
