//! Change detection for open drafts.
//!
//! A [`DraftSnapshot`] is taken once the draft is loaded. When the user
//! leaves, comparing the draft against it tells whether a save would be a
//! no-op. Recipients and attachments are compared as sets: reordering them
//! is not an edit.

use std::collections::HashSet;

use crate::draft::{AttachmentId, Draft, Recipient};
use crate::signature::SignatureId;

/// Immutable baseline of the user-editable fields of a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSnapshot {
    identity_id: Option<SignatureId>,
    to: HashSet<(String, String)>,
    cc: HashSet<(String, String)>,
    bcc: HashSet<(String, String)>,
    subject: Option<String>,
    body: String,
    is_encrypted: bool,
    encryption_password: Option<String>,
    attachments: HashSet<AttachmentId>,
}

impl DraftSnapshot {
    /// Record the current state of `draft`.
    #[must_use]
    pub fn capture(draft: &Draft) -> Self {
        Self {
            identity_id: draft.identity_id,
            to: recipient_set(&draft.to),
            cc: recipient_set(&draft.cc),
            bcc: recipient_set(&draft.bcc),
            subject: draft.subject.clone(),
            body: draft.body.clone(),
            is_encrypted: draft.is_encrypted,
            encryption_password: draft.encryption_password.clone(),
            attachments: draft.attachments.iter().map(|a| a.id).collect(),
        }
    }

    /// Whether `draft` still matches this baseline.
    #[must_use]
    pub fn matches(&self, draft: &Draft) -> bool {
        *self == Self::capture(draft)
    }
}

/// Whether `draft` is unchanged since `snapshot` was taken.
///
/// A draft that was never captured counts as changed.
#[must_use]
pub fn is_unchanged(snapshot: Option<&DraftSnapshot>, draft: &Draft) -> bool {
    snapshot.is_some_and(|snapshot| snapshot.matches(draft))
}

fn recipient_set(recipients: &[Recipient]) -> HashSet<(String, String)> {
    recipients
        .iter()
        .map(|r| (r.email.clone(), r.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{Attachment, RemoteRef};
    use std::path::PathBuf;

    fn draft() -> Draft {
        let mut draft = Draft::new();
        draft.subject = Some("Subject".into());
        draft.body = "<p>Body</p>".into();
        draft.to = vec![
            Recipient::new("a@example.com", "A"),
            Recipient::new("b@example.com", "B"),
        ];
        draft.identity_id = Some(SignatureId(3));
        draft.attachments = vec![
            Attachment::remote("x.pdf", 1, "application/pdf", RemoteRef::new("r")),
            Attachment::local("y.txt", 2, "text/plain", PathBuf::from("/tmp/y")),
        ];
        draft
    }

    #[test]
    fn test_untouched_draft_is_unchanged() {
        let draft = draft();
        let snapshot = DraftSnapshot::capture(&draft);
        assert!(is_unchanged(Some(&snapshot), &draft));
    }

    #[test]
    fn test_never_captured_is_changed() {
        assert!(!is_unchanged(None, &draft()));
    }

    #[test]
    fn test_reordering_is_not_an_edit() {
        let mut edited = draft();
        let snapshot = DraftSnapshot::capture(&edited);
        edited.to.reverse();
        edited.attachments.reverse();
        assert!(is_unchanged(Some(&snapshot), &edited));
    }

    #[test]
    fn test_upload_progress_is_not_an_edit() {
        let mut edited = draft();
        let snapshot = DraftSnapshot::capture(&edited);
        edited.attachments[1].status = crate::draft::UploadStatus::Uploading;
        assert!(is_unchanged(Some(&snapshot), &edited));
    }

    #[test]
    fn test_every_single_field_edit_is_detected() {
        let edits: Vec<fn(&mut Draft)> = vec![
            |d| d.identity_id = Some(SignatureId(4)),
            |d| d.to.push(Recipient::new("c@example.com", "C")),
            |d| d.to[0].name = "Renamed".into(),
            |d| d.cc.push(Recipient::new("c@example.com", "")),
            |d| d.bcc.push(Recipient::new("c@example.com", "")),
            |d| d.subject = None,
            |d| d.body.push('!'),
            |d| d.is_encrypted = true,
            |d| d.encryption_password = Some("secret".into()),
            |d| {
                d.attachments.pop();
            },
        ];

        for (i, edit) in edits.into_iter().enumerate() {
            let mut edited = draft();
            let snapshot = DraftSnapshot::capture(&edited);
            edit(&mut edited);
            assert!(!is_unchanged(Some(&snapshot), &edited), "edit #{i} went unnoticed");
        }
    }
}
