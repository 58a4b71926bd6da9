//! # draftledger-core
//!
//! Draft lifecycle core for the `DraftLedger` email composer.
//!
//! This crate provides:
//! - Draft model and local storage (`SQLite`)
//! - **Change detection** - skip saves of untouched drafts
//! - **Capture channel** - generation-stamped hand-off of the editor's final text
//! - **Upload coordinator** - sequential, resumable attachment uploads per draft
//! - **Signature selection** - pick the sender identity of replies
//! - **Compose session** - load, edit, save, send and schedule a draft
//! - **Dispatcher** - push pending draft actions to the server

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod api;
pub mod capture;
pub mod dispatch;
pub mod draft;
mod error;
pub mod session;
pub mod signature;
pub mod snapshot;
pub mod upload;

pub use api::{ApiError, DraftApi, HttpDraftApi, SaveResult};
pub use capture::{CaptureChannel, CapturedText};
pub use dispatch::{DispatchError, DispatchOutcome, DraftDispatcher};
pub use draft::{
    ATTACHMENTS_MAX_SIZE, Attachment, AttachmentId, AttachmentImporter, Draft, DraftAction,
    DraftId, DraftMode, DraftStore, FieldType, ImportError, ImportOutcome, PreviousMessage,
    Recipient, RemoteRef, SqliteDraftStore, UploadStatus,
};
pub use error::{Error, Result};
pub use session::{
    ActionOutcome, ComposeSession, ComposeState, InitContext, SessionContext, SessionError,
    SessionPhase,
};
pub use signature::{Signature, SignatureId, choose_signature};
pub use snapshot::{DraftSnapshot, is_unchanged};
pub use upload::{DraftLocks, UploadCoordinator, UploadError};
