//! Attachment upload coordinator behavior.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::{CountingStore, FakeApi, Failure, pending_attachment};
use draftledger_core::{
    Attachment, Draft, DraftStore, RemoteRef, UploadCoordinator, UploadError, UploadStatus,
};

async fn setup(attachments: Vec<Attachment>) -> (Arc<CountingStore>, Arc<FakeApi>, UploadCoordinator, Draft) {
    let store = CountingStore::new().await;
    let api = FakeApi::new();
    let uploads = UploadCoordinator::new(store.clone(), api.clone());

    let mut draft = Draft::new();
    draft.attachments = attachments;
    store.upsert_draft(&draft).await.unwrap();

    (store, api, uploads, draft)
}

fn statuses(draft: &Draft) -> Vec<UploadStatus> {
    draft.attachments.iter().map(|a| a.status).collect()
}

#[tokio::test]
async fn uploads_awaiting_attachments_in_order() {
    let (_store, api, uploads, draft) =
        setup(vec![pending_attachment("a.txt"), pending_attachment("b.txt")]).await;

    let uploaded = uploads.upload_pending(draft.id).await.unwrap();

    assert_eq!(api.uploads(), ["a.txt", "b.txt"]);
    assert_eq!(statuses(&uploaded), [UploadStatus::Uploaded, UploadStatus::Uploaded]);
    assert_eq!(uploaded.attachments[0].remote, Some(RemoteRef::new("att-a.txt")));
    assert_eq!(uploaded.attachments[0].local_path, None);
}

#[tokio::test]
async fn second_pass_uploads_nothing_again() {
    let (_store, api, uploads, draft) =
        setup(vec![pending_attachment("a.txt"), pending_attachment("b.txt")]).await;

    uploads.upload_pending(draft.id).await.unwrap();
    let again = uploads.upload_pending(draft.id).await.unwrap();

    assert_eq!(api.uploads().len(), 2);
    assert!(again.attachments.iter().all(Attachment::is_uploaded));
}

#[tokio::test]
async fn forwarded_attachments_are_skipped() {
    let forwarded = Attachment::remote("fw.pdf", 5, "application/pdf", RemoteRef::new("r-1"));
    let (_store, api, uploads, draft) = setup(vec![forwarded]).await;

    uploads.upload_pending(draft.id).await.unwrap();
    assert!(api.uploads().is_empty());
}

#[tokio::test]
async fn fatal_failure_stops_the_pass_and_next_pass_resumes() {
    let (store, api, uploads, draft) = setup(vec![
        pending_attachment("one.txt"),
        pending_attachment("two.txt"),
        pending_attachment("three.txt"),
    ])
    .await;
    api.fail_upload_once("two.txt", Failure::Rejected);

    let error = uploads.upload_pending(draft.id).await.unwrap_err();
    assert!(matches!(error, UploadError::Fatal { attachment_id, .. } if attachment_id == draft.attachments[1].id));
    assert!(!error.is_retryable());

    let stored = store.get_draft(draft.id).await.unwrap().unwrap();
    assert_eq!(
        statuses(&stored),
        [UploadStatus::Uploaded, UploadStatus::Failed, UploadStatus::Awaiting]
    );
    assert_eq!(api.uploads(), ["one.txt"]);

    let resumed = uploads.upload_pending(draft.id).await.unwrap();
    assert_eq!(api.uploads(), ["one.txt", "three.txt"]);
    assert_eq!(
        statuses(&resumed),
        [UploadStatus::Uploaded, UploadStatus::Failed, UploadStatus::Uploaded]
    );
}

#[tokio::test]
async fn failed_attachments_can_be_requeued() {
    let (_store, api, uploads, draft) = setup(vec![pending_attachment("x.txt")]).await;
    api.fail_upload_once("x.txt", Failure::Rejected);

    uploads.upload_pending(draft.id).await.unwrap_err();
    assert_eq!(uploads.requeue_failed(draft.id).await.unwrap(), 1);

    let uploaded = uploads.upload_pending(draft.id).await.unwrap();
    assert_eq!(statuses(&uploaded), [UploadStatus::Uploaded]);
    assert_eq!(uploads.requeue_failed(draft.id).await.unwrap(), 0);
}

#[tokio::test]
async fn network_failure_requeues_for_retry() {
    let (store, api, uploads, draft) = setup(vec![pending_attachment("x.txt")]).await;
    api.fail_upload_once("x.txt", Failure::Network);

    let error = uploads.upload_pending(draft.id).await.unwrap_err();
    assert!(error.is_retryable());

    let stored = store.get_draft(draft.id).await.unwrap().unwrap();
    assert_eq!(statuses(&stored), [UploadStatus::Awaiting]);

    let uploaded = uploads.upload_pending(draft.id).await.unwrap();
    assert_eq!(statuses(&uploaded), [UploadStatus::Uploaded]);
}

#[tokio::test]
async fn interrupted_upload_is_resumed() {
    let mut stale = pending_attachment("stale.txt");
    stale.status = UploadStatus::Uploading;
    let (_store, api, uploads, draft) = setup(vec![stale]).await;

    let uploaded = uploads.upload_pending(draft.id).await.unwrap();
    assert_eq!(api.uploads(), ["stale.txt"]);
    assert_eq!(statuses(&uploaded), [UploadStatus::Uploaded]);
}

#[tokio::test]
async fn progress_is_persisted_per_attachment() {
    let (store, _api, uploads, draft) =
        setup(vec![pending_attachment("a.txt"), pending_attachment("b.txt")]).await;
    let before = store.upserts();

    uploads.upload_pending(draft.id).await.unwrap();

    // Uploading then Uploaded, for each attachment.
    assert_eq!(store.upserts() - before, 4);
}

#[tokio::test]
async fn concurrent_passes_on_one_draft_upload_once() {
    let (_store, api, uploads, draft) = setup(vec![
        pending_attachment("a.txt"),
        pending_attachment("b.txt"),
        pending_attachment("c.txt"),
    ])
    .await;

    let first = tokio::spawn({
        let uploads = uploads.clone();
        async move { uploads.upload_pending(draft.id).await }
    });
    let second = tokio::spawn({
        let uploads = uploads.clone();
        async move { uploads.upload_pending(draft.id).await }
    });

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    assert_eq!(api.uploads(), ["a.txt", "b.txt", "c.txt"]);
}

#[tokio::test]
async fn missing_draft_is_reported() {
    let (_store, _api, uploads, _draft) = setup(Vec::new()).await;
    let error = uploads
        .upload_pending(draftledger_core::DraftId::new())
        .await
        .unwrap_err();
    assert!(matches!(error, UploadError::DraftNotFound(_)));
}
