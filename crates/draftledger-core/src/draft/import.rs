//! Importing local files as draft attachments.
//!
//! Imported files are copied under `<upload_root>/<draft_id>/<attachment_id>/`
//! so that the upload coordinator can read them after the user's original
//! file has moved. The copies are deleted once uploaded or when the draft is
//! closed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::{Attachment, AttachmentId, DraftId};

/// Maximum total size of a draft's attachments (25 MiB).
pub const ATTACHMENTS_MAX_SIZE: u64 = 25 * 1024 * 1024;

/// Errors when importing a local file.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The source file could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        /// Source path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file could not be copied to the upload directory.
    #[error("Cannot copy {} to the upload directory: {source}", path.display())]
    Copy {
        /// Source path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The path is not a regular file.
    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),
}

/// Result of importing a batch of files.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    /// Attachments that were imported.
    pub attachments: Vec<Attachment>,
    /// Whether the batch pushed the draft over [`ATTACHMENTS_MAX_SIZE`].
    pub too_big: bool,
    /// Files that could not be imported.
    pub failures: Vec<ImportError>,
}

/// Copies local files into per-draft upload directories.
#[derive(Debug, Clone)]
pub struct AttachmentImporter {
    upload_root: PathBuf,
}

impl AttachmentImporter {
    /// Create an importer storing copies under `upload_root`.
    #[must_use]
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
        }
    }

    /// Directory holding a draft's local attachment copies.
    #[must_use]
    pub fn draft_dir(&self, draft_id: DraftId) -> PathBuf {
        self.upload_root.join(draft_id.to_string())
    }

    /// Import files into a draft whose attachments already weigh
    /// `current_size` bytes.
    ///
    /// Each file is imported independently: failures are collected and the
    /// rest of the batch continues. Files past the size ceiling are still
    /// imported and flagged with [`ImportOutcome::too_big`], which makes the
    /// draft unsendable until something is removed.
    pub async fn import(
        &self,
        draft_id: DraftId,
        current_size: u64,
        sources: &[PathBuf],
    ) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();
        let mut available = ATTACHMENTS_MAX_SIZE.saturating_sub(current_size);

        for source in sources {
            match self.import_one(draft_id, source).await {
                Ok(attachment) => {
                    if attachment.size > available {
                        outcome.too_big = true;
                    }
                    available = available.saturating_sub(attachment.size);
                    outcome.attachments.push(attachment);
                }
                Err(e) => {
                    tracing::warn!(%draft_id, error = %e, "Attachment import failed");
                    outcome.failures.push(e);
                }
            }
        }

        outcome
    }

    async fn import_one(
        &self,
        draft_id: DraftId,
        source: &Path,
    ) -> Result<Attachment, ImportError> {
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|e| ImportError::Read {
                path: source.to_path_buf(),
                source: e,
            })?;
        if !metadata.is_file() {
            return Err(ImportError::NotAFile(source.to_path_buf()));
        }

        let name = source
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
        let mime_type = mime_guess::from_path(source)
            .first_or_octet_stream()
            .to_string();

        let mut attachment = Attachment::local(&name, metadata.len(), mime_type, PathBuf::new());
        let dir = self.draft_dir(draft_id).join(attachment.id.to_string());
        let destination = dir.join(&name);

        let copied = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::copy(source, &destination).await
        }
        .await;

        match copied {
            Ok(size) => {
                attachment.size = size;
                attachment.local_path = Some(destination);
                tracing::debug!(%draft_id, attachment_id = %attachment.id, name = %name, "Imported attachment");
                Ok(attachment)
            }
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&dir).await;
                Err(ImportError::Copy {
                    path: source.to_path_buf(),
                    source: e,
                })
            }
        }
    }

    /// Delete the local copy of one attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub async fn remove_attachment_files(
        &self,
        draft_id: DraftId,
        attachment_id: AttachmentId,
    ) -> std::io::Result<()> {
        remove_dir_if_present(&self.draft_dir(draft_id).join(attachment_id.to_string())).await
    }

    /// Delete every local copy of a draft.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub async fn remove_draft_dir(&self, draft_id: DraftId) -> std::io::Result<()> {
        remove_dir_if_present(&self.draft_dir(draft_id)).await
    }
}

/// Delete an uploaded attachment's local copy, then its attachment and
/// draft directories once they are empty.
pub(crate) async fn remove_local_copy(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove uploaded file");
        return;
    }

    let attachment_dir = path.parent();
    if let Some(dir) = attachment_dir
        && tokio::fs::remove_dir(dir).await.is_ok()
        && let Some(draft_dir) = dir.parent()
    {
        // Fails while other attachments of the draft are still local.
        let _ = tokio::fs::remove_dir(draft_dir).await;
    }
}

async fn remove_dir_if_present(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::draft::UploadStatus;

    #[tokio::test]
    async fn test_import_copies_file() {
        let source_dir = tempfile::tempdir().unwrap();
        let upload_root = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("notes.txt");
        std::fs::write(&source, b"hello").unwrap();

        let importer = AttachmentImporter::new(upload_root.path());
        let draft_id = DraftId::new();
        let outcome = importer.import(draft_id, 0, &[source]).await;

        assert!(outcome.failures.is_empty());
        assert!(!outcome.too_big);
        let attachment = &outcome.attachments[0];
        assert_eq!(attachment.name, "notes.txt");
        assert_eq!(attachment.size, 5);
        assert_eq!(attachment.mime_type, "text/plain");
        assert_eq!(attachment.status, UploadStatus::Awaiting);

        let copy = attachment.local_path.as_ref().unwrap();
        assert!(copy.starts_with(importer.draft_dir(draft_id)));
        assert_eq!(std::fs::read(copy).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_missing_file_is_reported_not_added() {
        let upload_root = tempfile::tempdir().unwrap();
        let importer = AttachmentImporter::new(upload_root.path());

        let outcome = importer
            .import(DraftId::new(), 0, &[PathBuf::from("/definitely/not/here.pdf")])
            .await;

        assert!(outcome.attachments.is_empty());
        assert!(matches!(outcome.failures[0], ImportError::Read { .. }));
    }

    #[tokio::test]
    async fn test_size_ceiling_flags_batch() {
        let source_dir = tempfile::tempdir().unwrap();
        let upload_root = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("big.bin");
        std::fs::write(&source, vec![0_u8; 16]).unwrap();

        let importer = AttachmentImporter::new(upload_root.path());
        let outcome = importer
            .import(DraftId::new(), ATTACHMENTS_MAX_SIZE - 8, &[source])
            .await;

        assert!(outcome.too_big);
        assert_eq!(outcome.attachments.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_draft_dir() {
        let source_dir = tempfile::tempdir().unwrap();
        let upload_root = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("a.png");
        std::fs::write(&source, b"png").unwrap();

        let importer = AttachmentImporter::new(upload_root.path());
        let draft_id = DraftId::new();
        let outcome = importer.import(draft_id, 0, &[source]).await;
        assert_eq!(outcome.attachments[0].mime_type, "image/png");

        importer.remove_draft_dir(draft_id).await.unwrap();
        assert!(!importer.draft_dir(draft_id).exists());
        importer.remove_draft_dir(draft_id).await.unwrap();
    }
    #[tokio::test]
    async fn test_last_uploaded_copy_removes_draft_dir() {
        let source_dir = tempfile::tempdir().unwrap();
        let upload_root = tempfile::tempdir().unwrap();
        let first = source_dir.path().join("a.txt");
        let second = source_dir.path().join("b.txt");
        std::fs::write(&first, b"a").unwrap();
        std::fs::write(&second, b"b").unwrap();

        let importer = AttachmentImporter::new(upload_root.path());
        let draft_id = DraftId::new();
        let outcome = importer.import(draft_id, 0, &[first, second]).await;
        let copies: Vec<_> = outcome
            .attachments
            .iter()
            .map(|a| a.local_path.clone().unwrap())
            .collect();

        remove_local_copy(&copies[0]).await;
        assert!(!copies[0].parent().unwrap().exists());
        assert!(importer.draft_dir(draft_id).exists());

        remove_local_copy(&copies[1]).await;
        assert!(!importer.draft_dir(draft_id).exists());
        assert!(upload_root.path().exists());
    }
}
