//! Background dispatch of stored draft actions.

#![allow(clippy::unwrap_used)]

mod common;

use common::{CountingStore, FakeApi, Failure, pending_attachment};
use draftledger_core::{
    DispatchError, DispatchOutcome, Draft, DraftAction, DraftDispatcher, DraftStore,
    UploadCoordinator, UploadStatus,
};

async fn stored(store: &CountingStore, action: Option<DraftAction>) -> Draft {
    let mut draft = Draft::new();
    draft.action = action;
    store.upsert_draft(&draft).await.unwrap();
    draft
}

#[tokio::test]
async fn draft_without_action_is_left_alone() {
    let store = CountingStore::new().await;
    let api = FakeApi::new();
    let dispatcher = DraftDispatcher::new(
        store.clone(),
        api.clone(),
        UploadCoordinator::new(store.clone(), api.clone()),
    );
    let draft = stored(&store, None).await;

    let outcome = dispatcher.process_draft(draft.id).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::NoAction);
    assert!(api.pushes().is_empty());
}

#[tokio::test]
async fn process_all_handles_every_pending_draft() {
    let store = CountingStore::new().await;
    let api = FakeApi::new();
    let dispatcher = DraftDispatcher::new(
        store.clone(),
        api.clone(),
        UploadCoordinator::new(store.clone(), api.clone()),
    );

    let save = stored(&store, Some(DraftAction::Save)).await;
    let send = stored(&store, Some(DraftAction::Send)).await;
    let idle = stored(&store, None).await;

    let mut results = dispatcher.process_all().await.unwrap();
    results.sort_by_key(|(id, _)| *id == send.id);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, save.id);
    assert!(matches!(results[0].1, Ok(DispatchOutcome::Saved { .. })));
    assert_eq!(
        results[1].1.as_ref().unwrap(),
        &DispatchOutcome::Dispatched(DraftAction::Send)
    );

    assert!(store.get_draft(send.id).await.unwrap().is_none());
    assert_eq!(store.get_draft(save.id).await.unwrap().unwrap().action, None);
    assert!(store.get_draft(idle.id).await.unwrap().is_some());
    assert!(store.drafts_with_action().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_upload_blocks_the_push() {
    let store = CountingStore::new().await;
    let api = FakeApi::new();
    let uploads = UploadCoordinator::new(store.clone(), api.clone());
    let dispatcher = DraftDispatcher::new(store.clone(), api.clone(), uploads.clone());

    let mut draft = Draft::new();
    draft.action = Some(DraftAction::Save);
    draft.attachments = vec![pending_attachment("big.bin")];
    store.upsert_draft(&draft).await.unwrap();
    api.fail_upload_once("big.bin", Failure::Rejected);

    let error = dispatcher.process_draft(draft.id).await.unwrap_err();
    assert!(matches!(error, DispatchError::Upload(_)));
    assert!(api.pushes().is_empty());

    let error = dispatcher.process_draft(draft.id).await.unwrap_err();
    assert!(matches!(error, DispatchError::AttachmentsNotUploaded(id) if id == draft.id));
    let waiting = store.get_draft(draft.id).await.unwrap().unwrap();
    assert_eq!(waiting.action, Some(DraftAction::Save));
    assert_eq!(waiting.attachments[0].status, UploadStatus::Failed);

    uploads.requeue_failed(draft.id).await.unwrap();
    let outcome = dispatcher.process_draft(draft.id).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Saved { .. }));

    let saved = store.get_draft(draft.id).await.unwrap().unwrap();
    assert_eq!(saved.attachments[0].status, UploadStatus::Uploaded);
}

#[tokio::test]
async fn network_failure_is_retried_on_next_run() {
    let store = CountingStore::new().await;
    let api = FakeApi::new();
    let dispatcher = DraftDispatcher::new(
        store.clone(),
        api.clone(),
        UploadCoordinator::new(store.clone(), api.clone()),
    );
    let draft = stored(&store, Some(DraftAction::Save)).await;
    api.fail_push_once(Failure::Network);

    let results = dispatcher.process_all().await.unwrap();
    assert!(results[0].1.as_ref().unwrap_err().is_retryable());

    let results = dispatcher.process_all().await.unwrap();
    assert_eq!(results[0].0, draft.id);
    assert!(results[0].1.is_ok());
    assert_eq!(api.pushes(), [(draft.id, DraftAction::Save)]);
}

#[tokio::test]
async fn draft_deleted_while_saving_is_not_restored() {
    let store = CountingStore::new().await;
    let api = FakeApi::new();
    let dispatcher = DraftDispatcher::new(
        store.clone(),
        api.clone(),
        UploadCoordinator::new(store.clone(), api.clone()),
    );
    let draft = stored(&store, Some(DraftAction::Save)).await;
    let draft_id = draft.id;

    api.push_gate.close();
    let task = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.process_draft(draft_id).await }
    });
    api.push_gate.held().await;

    store.delete_draft(draft_id).await.unwrap();
    api.push_gate.open();

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, DispatchOutcome::Saved { .. }));
    assert!(store.get_draft(draft_id).await.unwrap().is_none());
    assert!(dispatcher.process_all().await.unwrap().is_empty());
}
