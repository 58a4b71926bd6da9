//! Test doubles shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use chrono::Utc;
use draftledger_core::{
    ApiError, Attachment, Draft, DraftAction, DraftApi, DraftId, DraftStore, PreviousMessage,
    Recipient, RemoteRef, SaveResult, SqliteDraftStore,
};

/// How a fake call fails.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Network,
    Rejected,
}

impl Failure {
    fn error(self) -> ApiError {
        match self {
            Self::Network => ApiError::Network("connection reset".into()),
            Self::Rejected => ApiError::rejected("invalid_attachment", "Rejected by test"),
        }
    }
}

/// Holds calls back while closed.
#[derive(Default)]
pub struct Gate {
    closed: AtomicBool,
    entered: Notify,
    opened: Notify,
}

impl Gate {
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.opened.notify_waiters();
    }

    /// Wait until a call is held at the gate.
    pub async fn held(&self) {
        self.entered.notified().await;
    }

    async fn pass(&self) {
        if !self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.entered.notify_one();
        loop {
            let opened = self.opened.notified();
            tokio::pin!(opened);
            opened.as_mut().enable();
            if !self.closed.load(Ordering::SeqCst) {
                return;
            }
            opened.await;
        }
    }
}

/// In-memory `DraftApi` recording every call.
#[derive(Default)]
pub struct FakeApi {
    /// Holds uploads before they complete.
    pub upload_gate: Gate,
    /// Holds pushes before they reach the server.
    pub push_gate: Gate,
    uploads: Mutex<Vec<String>>,
    pushes: Mutex<Vec<(DraftId, DraftAction)>>,
    pushed_bodies: Mutex<Vec<String>>,
    creates: AtomicUsize,
    upload_failures: Mutex<HashMap<String, Failure>>,
    push_failures: Mutex<VecDeque<Failure>>,
    remote_drafts: Mutex<HashMap<String, Draft>>,
    forward_attachments: Mutex<Vec<Attachment>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next upload of the attachment named `name`.
    pub fn fail_upload_once(&self, name: &str, failure: Failure) {
        self.upload_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), failure);
    }

    /// Fail the next push.
    pub fn fail_push_once(&self, failure: Failure) {
        self.push_failures.lock().unwrap().push_back(failure);
    }

    pub fn add_remote_draft(&self, resource: &str, draft: Draft) {
        self.remote_drafts
            .lock()
            .unwrap()
            .insert(resource.to_string(), draft);
    }

    pub fn set_forward_attachments(&self, attachments: Vec<Attachment>) {
        *self.forward_attachments.lock().unwrap() = attachments;
    }

    /// Names of successfully uploaded attachments, in order.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    /// Successful pushes, in order.
    pub fn pushes(&self) -> Vec<(DraftId, DraftAction)> {
        self.pushes.lock().unwrap().clone()
    }

    /// Bodies of successful pushes, in order.
    pub fn pushed_bodies(&self) -> Vec<String> {
        self.pushed_bodies.lock().unwrap().clone()
    }

    /// Successful pushes of drafts unknown to the server.
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DraftApi for FakeApi {
    async fn fetch_draft(&self, resource: &str) -> Result<Option<Draft>, ApiError> {
        Ok(self.remote_drafts.lock().unwrap().get(resource).cloned())
    }

    async fn save_or_send(
        &self,
        draft: &Draft,
        action: DraftAction,
    ) -> Result<SaveResult, ApiError> {
        self.push_gate.pass().await;
        if let Some(failure) = self.push_failures.lock().unwrap().pop_front() {
            return Err(failure.error());
        }
        if draft.remote_uuid.is_none() {
            self.creates.fetch_add(1, Ordering::SeqCst);
        }
        self.pushes.lock().unwrap().push((draft.id, action));
        self.pushed_bodies.lock().unwrap().push(draft.body.clone());
        Ok(SaveResult {
            draft_uuid: draft
                .remote_uuid
                .clone()
                .unwrap_or_else(|| format!("remote-{}", draft.id)),
            message_uid: Some("1@Drafts".into()),
        })
    }

    async fn upload_attachment(&self, attachment: &Attachment) -> Result<RemoteRef, ApiError> {
        tokio::task::yield_now().await;
        self.upload_gate.pass().await;
        if let Some(failure) = self.upload_failures.lock().unwrap().remove(&attachment.name) {
            return Err(failure.error());
        }
        self.uploads.lock().unwrap().push(attachment.name.clone());
        Ok(RemoteRef::new(format!("att-{}", attachment.name)))
    }

    async fn attachments_to_forward(
        &self,
        _previous: &PreviousMessage,
    ) -> Result<Vec<Attachment>, ApiError> {
        Ok(self.forward_attachments.lock().unwrap().clone())
    }
}

/// `SqliteDraftStore` counting writes, with switchable write failures.
pub struct CountingStore {
    inner: SqliteDraftStore,
    pub upserts: AtomicUsize,
    pub deletes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl CountingStore {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteDraftStore::in_memory().await.unwrap(),
            upserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        })
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check(&self) -> draftledger_core::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("disk full").into());
        }
        Ok(())
    }
}

#[async_trait]
impl DraftStore for CountingStore {
    async fn get_draft(&self, id: DraftId) -> draftledger_core::Result<Option<Draft>> {
        self.inner.get_draft(id).await
    }

    async fn upsert_draft(&self, draft: &Draft) -> draftledger_core::Result<()> {
        self.check()?;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_draft(draft).await
    }

    async fn delete_draft(&self, id: DraftId) -> draftledger_core::Result<()> {
        self.check()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_draft(id).await
    }

    async fn drafts_with_action(&self) -> draftledger_core::Result<Vec<Draft>> {
        self.inner.drafts_with_action().await
    }
}

/// An attachment awaiting upload, backed by no real file.
pub fn pending_attachment(name: &str) -> Attachment {
    Attachment::local(name, 10, "text/plain", PathBuf::from(format!("/nonexistent/{name}")))
}

pub fn previous_message() -> PreviousMessage {
    PreviousMessage {
        uid: "42@INBOX".into(),
        message_id: Some("<m42@example.com>".into()),
        references: None,
        subject: Some("Quarterly numbers".into()),
        from: vec![Recipient::new("boss@example.com", "The Boss")],
        to: vec![Recipient::new("alice@work.example", "Alice")],
        cc: vec![Recipient::new("bob@example.com", "Bob")],
        reply_to: Vec::new(),
        body: "<p>Please review</p>".into(),
        mime_type: "text/html".into(),
        date: Utc::now(),
        attachments: Vec::new(),
    }
}
