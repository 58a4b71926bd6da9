//! Uploading draft attachments.
//!
//! The server links attachments to a draft by upload order and does not
//! accept concurrent uploads for the same draft, so each draft's uploads run
//! one at a time under a per-draft lock. Progress is written to the store
//! after every attachment: an interrupted pass resumes where it stopped.

mod locks;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use crate::api::{ApiError, DraftApi};
use crate::draft::{
    Attachment, AttachmentId, Draft, DraftId, DraftStore, RemoteRef, UploadStatus,
    remove_local_copy,
};

pub use locks::DraftLocks;

/// Errors from an upload pass.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A network failure; the attachment is queued again.
    #[error("Upload of attachment {attachment_id} interrupted: {source}")]
    Retryable {
        /// Attachment being uploaded.
        attachment_id: AttachmentId,
        /// Underlying error.
        source: ApiError,
    },

    /// The upload failed for good; the attachment is marked failed.
    #[error("Upload of attachment {attachment_id} failed: {source}")]
    Fatal {
        /// Attachment being uploaded.
        attachment_id: AttachmentId,
        /// Underlying error.
        source: ApiError,
    },

    /// The draft is not in the store.
    #[error("Draft not found: {0}")]
    DraftNotFound(DraftId),

    /// Reading or writing the store failed.
    #[error("Store error: {0}")]
    Store(#[from] crate::Error),
}

impl UploadError {
    /// Whether running the pass again may succeed without user action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

/// Serializes attachment uploads per draft.
///
/// Clones share the same lock registry.
#[derive(Clone)]
pub struct UploadCoordinator {
    store: Arc<dyn DraftStore>,
    api: Arc<dyn DraftApi>,
    locks: Arc<DraftLocks>,
}

impl UploadCoordinator {
    /// Create a coordinator with its own lock registry.
    #[must_use]
    pub fn new(store: Arc<dyn DraftStore>, api: Arc<dyn DraftApi>) -> Self {
        Self {
            store,
            api,
            locks: Arc::new(DraftLocks::new()),
        }
    }

    /// Upload every attachment of the draft that is waiting for it.
    ///
    /// Attachments left in [`UploadStatus::Uploading`] by an interrupted pass
    /// are uploaded again. The pass stops at the first failure; the returned
    /// draft is the one persisted after the pass.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Retryable`] on network failure,
    /// [`UploadError::Fatal`] on any other upload failure, and store errors.
    pub async fn upload_pending(&self, draft_id: DraftId) -> Result<Draft, UploadError> {
        let _guard = self.lock(draft_id).await;
        self.upload_locked(draft_id).await
    }

    /// Wait for exclusive access to the stored draft.
    ///
    /// Every read-modify-write of a stored draft that may have uploads
    /// running must hold this guard.
    pub async fn lock(&self, draft_id: DraftId) -> OwnedMutexGuard<()> {
        self.locks.lock(draft_id).await
    }

    /// Same as [`upload_pending`](Self::upload_pending), for a caller already
    /// holding the draft's [`lock`](Self::lock).
    pub(crate) async fn upload_locked(&self, draft_id: DraftId) -> Result<Draft, UploadError> {
        let draft = self.load(draft_id).await?;
        let pending: Vec<AttachmentId> = draft
            .attachments
            .iter()
            .filter(|a| matches!(a.status, UploadStatus::Awaiting | UploadStatus::Uploading))
            .map(|a| a.id)
            .collect();

        if pending.is_empty() {
            return Ok(draft);
        }

        tracing::debug!(%draft_id, count = pending.len(), "Uploading attachments");
        for attachment_id in pending {
            self.upload_one(draft_id, attachment_id).await?;
        }

        self.load(draft_id).await
    }

    /// Queue failed attachments of the draft again.
    ///
    /// Returns how many attachments were re-queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft cannot be read or written.
    pub async fn requeue_failed(&self, draft_id: DraftId) -> Result<usize, UploadError> {
        let _guard = self.lock(draft_id).await;

        let mut draft = self.load(draft_id).await?;
        let mut count = 0;
        for attachment in &mut draft.attachments {
            if attachment.status == UploadStatus::Failed {
                attachment.requeue();
                count += 1;
            }
        }

        if count > 0 {
            self.store.upsert_draft(&draft).await?;
            tracing::info!(%draft_id, count, "Re-queued failed attachments");
        }
        Ok(count)
    }

    async fn upload_one(
        &self,
        draft_id: DraftId,
        attachment_id: AttachmentId,
    ) -> Result<(), UploadError> {
        let started = self
            .update(draft_id, attachment_id, |attachment| {
                if attachment.status == UploadStatus::Uploading {
                    attachment.requeue();
                }
                attachment.advance(UploadStatus::Uploading);
            })
            .await?;

        let Some(attachment) = started.filter(|a| a.status == UploadStatus::Uploading) else {
            tracing::debug!(%draft_id, %attachment_id, "Attachment no longer pending");
            return Ok(());
        };

        match self.api.upload_attachment(&attachment).await {
            Ok(remote) => {
                self.finish(draft_id, attachment_id, remote).await?;
                if let Some(path) = &attachment.local_path {
                    remove_local_copy(path).await;
                }
                tracing::debug!(%draft_id, %attachment_id, "Attachment uploaded");
                Ok(())
            }
            Err(source) if source.is_network() => {
                self.update(draft_id, attachment_id, Attachment::requeue)
                    .await?;
                tracing::warn!(%draft_id, %attachment_id, error = %source, "Attachment upload interrupted");
                Err(UploadError::Retryable {
                    attachment_id,
                    source,
                })
            }
            Err(source) => {
                self.update(draft_id, attachment_id, |attachment| {
                    attachment.advance(UploadStatus::Failed);
                })
                .await?;
                tracing::error!(%draft_id, %attachment_id, error = %source, "Attachment upload failed");
                Err(UploadError::Fatal {
                    attachment_id,
                    source,
                })
            }
        }
    }

    async fn finish(
        &self,
        draft_id: DraftId,
        attachment_id: AttachmentId,
        remote: RemoteRef,
    ) -> Result<(), UploadError> {
        self.update(draft_id, attachment_id, move |attachment| {
            if attachment.advance(UploadStatus::Uploaded) {
                attachment.remote = Some(remote);
                attachment.local_path = None;
            }
        })
        .await?;
        Ok(())
    }

    /// Reload the draft, change one attachment and persist it.
    ///
    /// Returns the updated attachment, or `None` if it is gone.
    async fn update(
        &self,
        draft_id: DraftId,
        attachment_id: AttachmentId,
        change: impl FnOnce(&mut Attachment),
    ) -> Result<Option<Attachment>, UploadError> {
        let mut draft = self.load(draft_id).await?;
        let Some(attachment) = draft.attachment_mut(attachment_id) else {
            return Ok(None);
        };
        change(attachment);
        let updated = attachment.clone();

        self.store.upsert_draft(&draft).await?;
        Ok(Some(updated))
    }

    async fn load(&self, draft_id: DraftId) -> Result<Draft, UploadError> {
        self.store
            .get_draft(draft_id)
            .await?
            .ok_or(UploadError::DraftNotFound(draft_id))
    }
}
