//! Drafts, their attachments and local storage.

mod import;
mod message;
mod model;
mod repository;

pub use import::{ATTACHMENTS_MAX_SIZE, AttachmentImporter, ImportError, ImportOutcome};
pub(crate) use import::remove_local_copy;
pub use message::PreviousMessage;
pub use model::{
    Attachment, AttachmentId, Draft, DraftAction, DraftId, DraftMode, FieldType, Recipient,
    RemoteRef, UploadStatus,
};
pub use repository::{DraftStore, SqliteDraftStore};
