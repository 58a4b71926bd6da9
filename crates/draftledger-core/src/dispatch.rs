//! Pushing pending draft actions to the server.
//!
//! Every stored draft may carry an action. Dispatching a draft uploads its
//! attachments, then saves, sends or schedules it. Network failures leave
//! the action in place for the next pass; rejections clear it and keep the
//! draft so the user can fix and retry.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;

use crate::api::{ApiError, DraftApi};
use crate::draft::{DraftAction, DraftId, DraftStore};
use crate::upload::{UploadCoordinator, UploadError};

/// Result of dispatching one draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The draft had no pending action.
    NoAction,
    /// The draft was saved remotely under this UUID.
    Saved {
        /// Remote draft UUID.
        remote_uuid: String,
    },
    /// The message was sent, scheduled or reacted with; the local draft is gone.
    Dispatched(DraftAction),
}

/// Errors from dispatching a draft.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Attachment upload failed.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Some attachments failed to upload. The action is kept; it is pushed
    /// once [`UploadCoordinator::requeue_failed`] has queued them again and
    /// they upload, or once the user removes them.
    #[error("Draft {0} has attachments that are not uploaded")]
    AttachmentsNotUploaded(DraftId),

    /// The server could not be reached; the action is kept.
    #[error("Draft {draft_id} not pushed: {source}")]
    Network {
        /// Draft being pushed.
        draft_id: DraftId,
        /// Underlying error.
        source: ApiError,
    },

    /// The server refused the draft; the action is cleared.
    #[error("Draft {draft_id} rejected: {source}")]
    Rejected {
        /// Draft being pushed.
        draft_id: DraftId,
        /// Underlying error.
        source: ApiError,
    },

    /// Reading or writing the store failed.
    #[error("Store error: {0}")]
    Store(#[from] crate::Error),
}

impl DispatchError {
    /// Whether a later pass may succeed without user action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Upload(e) => e.is_retryable(),
            Self::Network { .. } => true,
            Self::AttachmentsNotUploaded(_) | Self::Rejected { .. } | Self::Store(_) => false,
        }
    }
}

/// Pushes drafts with a pending action.
#[derive(Clone)]
pub struct DraftDispatcher {
    store: Arc<dyn DraftStore>,
    api: Arc<dyn DraftApi>,
    uploads: UploadCoordinator,
}

impl DraftDispatcher {
    /// Create a dispatcher sharing `uploads`' lock registry.
    #[must_use]
    pub fn new(
        store: Arc<dyn DraftStore>,
        api: Arc<dyn DraftApi>,
        uploads: UploadCoordinator,
    ) -> Self {
        Self {
            store,
            api,
            uploads,
        }
    }

    /// Upload the draft's attachments, then push its pending action.
    ///
    /// The draft stays locked for the whole run, so a session storing a new
    /// action waits for the push and write-back to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if an upload fails, the server cannot be reached or
    /// refuses the draft, or the store fails.
    pub async fn process_draft(&self, draft_id: DraftId) -> Result<DispatchOutcome, DispatchError> {
        let _guard = self.uploads.lock(draft_id).await;
        let draft = self.uploads.upload_locked(draft_id).await?;

        let Some(action) = draft.action else {
            return Ok(DispatchOutcome::NoAction);
        };

        if draft.attachments.iter().any(|a| !a.is_uploaded()) {
            tracing::warn!(%draft_id, %action, "Draft waits for failed attachments to be re-queued");
            return Err(DispatchError::AttachmentsNotUploaded(draft_id));
        }

        let pushed = self.api.save_or_send(&draft, action).await;
        match pushed {
            Ok(result) if action == DraftAction::Save => {
                let Some(mut latest) = self.store.get_draft(draft_id).await? else {
                    tracing::info!(%draft_id, "Draft deleted while saving, not restoring it");
                    return Ok(DispatchOutcome::Saved {
                        remote_uuid: result.draft_uuid,
                    });
                };
                latest.remote_uuid = Some(result.draft_uuid.clone());
                if result.message_uid.is_some() {
                    latest.message_uid = result.message_uid;
                }
                if latest.action == Some(action) {
                    latest.action = None;
                }
                self.store.upsert_draft(&latest).await?;

                tracing::info!(%draft_id, remote_uuid = %result.draft_uuid, "Draft saved");
                Ok(DispatchOutcome::Saved {
                    remote_uuid: result.draft_uuid,
                })
            }
            Ok(_) => {
                self.store.delete_draft(draft_id).await?;
                tracing::info!(%draft_id, %action, "Draft dispatched");
                Ok(DispatchOutcome::Dispatched(action))
            }
            Err(source) if source.is_network() => {
                tracing::warn!(%draft_id, %action, error = %source, "Draft push interrupted");
                Err(DispatchError::Network { draft_id, source })
            }
            Err(source) => {
                if let Some(mut latest) = self.store.get_draft(draft_id).await?
                    && latest.action == Some(action)
                {
                    latest.action = None;
                    self.store.upsert_draft(&latest).await?;
                }
                tracing::error!(%draft_id, %action, error = %source, "Draft rejected");
                Err(DispatchError::Rejected { draft_id, source })
            }
        }
    }

    /// Dispatch every draft with a pending action.
    ///
    /// Drafts are processed concurrently; each one's uploads stay sequential.
    ///
    /// # Errors
    ///
    /// Returns an error only if the pending drafts cannot be listed. Per-draft
    /// failures are reported in the returned list.
    pub async fn process_all(
        &self,
    ) -> crate::Result<Vec<(DraftId, Result<DispatchOutcome, DispatchError>)>> {
        let drafts = self.store.drafts_with_action().await?;
        tracing::debug!(count = drafts.len(), "Dispatching pending drafts");

        let mut tasks = JoinSet::new();
        for draft in drafts {
            let dispatcher = self.clone();
            tasks.spawn(async move { (draft.id, dispatcher.process_draft(draft.id).await) });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!(error = %e, "Dispatch task failed"),
            }
        }
        Ok(results)
    }
}
