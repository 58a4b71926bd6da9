//! Draft model types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signature::SignatureId;

/// Local identifier of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(pub Uuid);

impl DraftId {
    /// Generate a fresh random draft ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local identifier of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentId(pub Uuid);

impl AttachmentId {
    /// Generate a fresh random attachment ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttachmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Action waiting to be pushed to the server for a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftAction {
    /// Save the draft remotely.
    Save,
    /// Send the message now.
    Send,
    /// Send the message at its schedule date.
    Schedule,
    /// Send an emoji reaction.
    SendReaction,
}

impl DraftAction {
    /// Get the wire/storage name of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Send => "send",
            Self::Schedule => "schedule",
            Self::SendReaction => "send_reaction",
        }
    }

    /// Whether this action dispatches the message rather than storing it.
    #[must_use]
    pub const fn is_dispatch(&self) -> bool {
        !matches!(self, Self::Save)
    }
}

impl std::fmt::Display for DraftAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a draft came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DraftMode {
    /// A brand new message.
    #[default]
    NewMail,
    /// Reply to the sender.
    Reply,
    /// Reply to everyone.
    ReplyAll,
    /// Forward a message.
    Forward,
}

impl DraftMode {
    /// Whether this is a reply or reply-all.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        matches!(self, Self::Reply | Self::ReplyAll)
    }
}

/// Which recipient field of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `To`.
    To,
    /// `Cc`.
    Cc,
    /// `Bcc`.
    Bcc,
}

fn default_true() -> bool {
    true
}

/// A message recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Email address.
    pub email: String,
    /// Display name (may be empty).
    #[serde(default)]
    pub name: String,
    /// Whether the user typed this recipient, as opposed to it being prefilled.
    #[serde(default = "default_true")]
    pub manually_entered: bool,
    /// Whether a key is known for this recipient. `None` until looked up.
    #[serde(default)]
    pub can_be_encrypted: Option<bool>,
}

impl Recipient {
    /// Create a manually entered recipient.
    #[must_use]
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            manually_entered: true,
            can_be_encrypted: None,
        }
    }

    /// Create a recipient that was filled in automatically.
    #[must_use]
    pub fn prefilled(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            manually_entered: false,
            ..Self::new(email, name)
        }
    }

    /// Check if two recipients have the same address, ignoring case.
    #[must_use]
    pub fn same_email(&self, other: &Self) -> bool {
        self.email.eq_ignore_ascii_case(&other.email)
    }

    /// Display string, e.g. `"Jane Doe" <jane@example.com>`.
    #[must_use]
    pub fn display(&self) -> String {
        if self.name.trim().is_empty() {
            self.email.clone()
        } else {
            format!("\"{}\" <{}>", self.name, self.email)
        }
    }

    /// Domain part of the address, lowercased.
    #[must_use]
    pub fn domain(&self) -> Option<String> {
        self.email
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_lowercase())
            .filter(|domain| !domain.is_empty())
    }
}

/// Upload progress of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Waiting to be uploaded.
    #[default]
    Awaiting,
    /// Upload in progress.
    Uploading,
    /// Stored on the server.
    Uploaded,
    /// Upload was rejected.
    Failed,
}

impl UploadStatus {
    /// Whether moving from `self` to `next` is a forward transition.
    ///
    /// Going back to [`UploadStatus::Awaiting`] is a re-queue and is not
    /// covered here.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Awaiting, Self::Uploading | Self::Failed)
                | (Self::Uploading, Self::Uploaded | Self::Failed)
        )
    }
}

/// Server-side reference of an uploaded attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    /// Remote attachment UUID.
    pub uuid: String,
}

impl RemoteRef {
    /// Create a remote reference.
    #[must_use]
    pub fn new(uuid: impl Into<String>) -> Self {
        Self { uuid: uuid.into() }
    }
}

/// A file attached to a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Local ID.
    pub id: AttachmentId,
    /// File name shown to the user.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
    /// Temporary copy of the file, while it is not uploaded.
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    /// Upload progress.
    #[serde(default)]
    pub status: UploadStatus,
    /// Server reference once uploaded.
    #[serde(default)]
    pub remote: Option<RemoteRef>,
}

impl Attachment {
    /// Create an attachment imported from a local file, awaiting upload.
    #[must_use]
    pub fn local(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        local_path: PathBuf,
    ) -> Self {
        Self {
            id: AttachmentId::new(),
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            local_path: Some(local_path),
            status: UploadStatus::Awaiting,
            remote: None,
        }
    }

    /// Create an attachment that already lives on the server.
    #[must_use]
    pub fn remote(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        remote: RemoteRef,
    ) -> Self {
        Self {
            id: AttachmentId::new(),
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            local_path: None,
            status: UploadStatus::Uploaded,
            remote: Some(remote),
        }
    }

    /// Move the upload status forward.
    ///
    /// Returns `false` and leaves the status untouched if the transition
    /// would go backward.
    pub fn advance(&mut self, next: UploadStatus) -> bool {
        if self.status.can_advance_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Put the attachment back in the upload queue.
    pub fn requeue(&mut self) {
        if self.status != UploadStatus::Uploaded {
            self.status = UploadStatus::Awaiting;
        }
    }

    /// Whether the attachment is on the server.
    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        self.status == UploadStatus::Uploaded && self.remote.is_some()
    }
}

/// An email draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Local ID.
    pub id: DraftId,
    /// Remote draft UUID, once saved on the server.
    #[serde(default)]
    pub remote_uuid: Option<String>,
    /// UID of the remote message backing this draft.
    #[serde(default)]
    pub message_uid: Option<String>,
    /// `To` recipients.
    #[serde(default)]
    pub to: Vec<Recipient>,
    /// `Cc` recipients.
    #[serde(default)]
    pub cc: Vec<Recipient>,
    /// `Bcc` recipients.
    #[serde(default)]
    pub bcc: Vec<Recipient>,
    /// Subject.
    #[serde(default)]
    pub subject: Option<String>,
    /// Whole body: user content, signature and quote.
    #[serde(default)]
    pub body: String,
    /// MIME type of the body.
    pub mime_type: String,
    /// Attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Whether the message must be encrypted.
    #[serde(default)]
    pub is_encrypted: bool,
    /// Password for recipients without a known key.
    #[serde(default)]
    pub encryption_password: Option<String>,
    /// When to send a scheduled message.
    #[serde(default)]
    pub schedule_date: Option<DateTime<Utc>>,
    /// Action waiting to be pushed to the server.
    #[serde(default)]
    pub action: Option<DraftAction>,
    /// Sender identity (signature) ID.
    #[serde(default)]
    pub identity_id: Option<SignatureId>,
    /// `In-Reply-To` header.
    #[serde(default)]
    pub in_reply_to: Option<String>,
    /// `References` header.
    #[serde(default)]
    pub references: Option<String>,
    /// UID of the message this replies to.
    #[serde(default)]
    pub in_reply_to_uid: Option<String>,
    /// UID of the message this forwards.
    #[serde(default)]
    pub forwarded_uid: Option<String>,
}

impl Draft {
    /// Create an empty HTML draft with a fresh local ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: DraftId::new(),
            remote_uuid: None,
            message_uid: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: None,
            body: String::new(),
            mime_type: "text/html".to_string(),
            attachments: Vec::new(),
            is_encrypted: false,
            encryption_password: None,
            schedule_date: None,
            action: None,
            identity_id: None,
            in_reply_to: None,
            references: None,
            in_reply_to_uid: None,
            forwarded_uid: None,
        }
    }

    /// Recipients of one field.
    #[must_use]
    pub fn field(&self, field: FieldType) -> &Vec<Recipient> {
        match field {
            FieldType::To => &self.to,
            FieldType::Cc => &self.cc,
            FieldType::Bcc => &self.bcc,
        }
    }

    /// Mutable recipients of one field.
    pub fn field_mut(&mut self, field: FieldType) -> &mut Vec<Recipient> {
        match field {
            FieldType::To => &mut self.to,
            FieldType::Cc => &mut self.cc,
            FieldType::Bcc => &mut self.bcc,
        }
    }

    /// All recipients, `To` then `Cc` then `Bcc`.
    pub fn all_recipients(&self) -> impl Iterator<Item = &Recipient> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Total size of the attachments in bytes.
    #[must_use]
    pub fn attachments_size(&self) -> u64 {
        self.attachments.iter().map(|a| a.size).sum()
    }

    /// Find an attachment by ID.
    #[must_use]
    pub fn attachment(&self, id: AttachmentId) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.id == id)
    }

    /// Find an attachment by ID, mutably.
    pub fn attachment_mut(&mut self, id: AttachmentId) -> Option<&mut Attachment> {
        self.attachments.iter_mut().find(|a| a.id == id)
    }
}

impl Default for Draft {
    fn default() -> Self {
        Self::new()
    }
}
