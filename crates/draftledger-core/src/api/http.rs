//! HTTP implementation of [`DraftApi`].

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ApiError, DraftApi, SaveResult};
use crate::draft::{Attachment, Draft, DraftAction, PreviousMessage, Recipient, RemoteRef};
use crate::signature::SignatureId;

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_builder() {
            Self::InvalidRequest(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: String,
    data: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireRecipient {
    email: String,
    #[serde(default)]
    name: String,
}

impl From<&Recipient> for WireRecipient {
    fn from(r: &Recipient) -> Self {
        Self {
            email: r.email.clone(),
            name: r.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireAttachment {
    uuid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    mime_type: String,
}

impl WireAttachment {
    fn into_attachment(self) -> Attachment {
        Attachment::remote(self.name, self.size, self.mime_type, RemoteRef::new(self.uuid))
    }
}

/// A draft as returned by the server.
#[derive(Debug, Deserialize)]
struct RemoteDraft {
    uuid: String,
    #[serde(default)]
    to: Vec<WireRecipient>,
    #[serde(default)]
    cc: Vec<WireRecipient>,
    #[serde(default)]
    bcc: Vec<WireRecipient>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    identity_id: Option<String>,
    #[serde(default)]
    in_reply_to: Option<String>,
    #[serde(default)]
    in_reply_to_uid: Option<String>,
    #[serde(default)]
    forwarded_uid: Option<String>,
    #[serde(default)]
    references: Option<String>,
    #[serde(default)]
    attachments: Vec<WireAttachment>,
    #[serde(default)]
    encrypted: bool,
    #[serde(default)]
    encryption_password: Option<String>,
}

impl RemoteDraft {
    fn into_draft(self) -> Draft {
        let recipients = |list: Vec<WireRecipient>| -> Vec<Recipient> {
            list.into_iter()
                .map(|r| Recipient::new(r.email, r.name))
                .collect()
        };

        let mut draft = Draft::new();
        draft.remote_uuid = Some(self.uuid);
        draft.to = recipients(self.to);
        draft.cc = recipients(self.cc);
        draft.bcc = recipients(self.bcc);
        draft.subject = self.subject;
        draft.body = self.body;
        if !self.mime_type.is_empty() {
            draft.mime_type = self.mime_type;
        }
        draft.identity_id = self
            .identity_id
            .and_then(|id| id.parse().ok())
            .map(SignatureId);
        draft.in_reply_to = self.in_reply_to;
        draft.in_reply_to_uid = self.in_reply_to_uid;
        draft.forwarded_uid = self.forwarded_uid;
        draft.references = self.references;
        draft.attachments = self
            .attachments
            .into_iter()
            .map(WireAttachment::into_attachment)
            .collect();
        draft.is_encrypted = self.encrypted;
        draft.encryption_password = self.encryption_password;
        draft
    }
}

fn wire(list: &[Recipient]) -> Vec<WireRecipient> {
    list.iter().map(WireRecipient::from).collect()
}

/// Request body of a save, send or schedule.
#[derive(Debug, Serialize)]
struct DraftPayload<'a> {
    to: Vec<WireRecipient>,
    cc: Vec<WireRecipient>,
    bcc: Vec<WireRecipient>,
    subject: Option<&'a str>,
    body: &'a str,
    mime_type: &'a str,
    identity_id: Option<String>,
    action: &'static str,
    in_reply_to: Option<&'a str>,
    in_reply_to_uid: Option<&'a str>,
    forwarded_uid: Option<&'a str>,
    references: Option<&'a str>,
    attachments: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule_date: Option<String>,
    encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    encryption_password: Option<&'a str>,
    delay: u32,
}

impl<'a> DraftPayload<'a> {
    fn new(draft: &'a Draft, action: DraftAction) -> Self {
        Self {
            to: wire(&draft.to),
            cc: wire(&draft.cc),
            bcc: wire(&draft.bcc),
            subject: draft.subject.as_deref(),
            body: &draft.body,
            mime_type: &draft.mime_type,
            identity_id: draft
                .identity_id
                .filter(|id| *id != SignatureId::NONE)
                .map(|id| id.to_string()),
            action: action.as_str(),
            in_reply_to: draft.in_reply_to.as_deref(),
            in_reply_to_uid: draft.in_reply_to_uid.as_deref(),
            forwarded_uid: draft.forwarded_uid.as_deref(),
            references: draft.references.as_deref(),
            attachments: draft
                .attachments
                .iter()
                .filter_map(|a| a.remote.as_ref().map(|r| r.uuid.as_str()))
                .collect(),
            schedule_date: match action {
                DraftAction::Schedule => draft.schedule_date.map(|d| d.to_rfc3339()),
                _ => None,
            },
            encrypted: draft.is_encrypted,
            encryption_password: draft
                .encryption_password
                .as_deref()
                .filter(|_| draft.is_encrypted),
            delay: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForwardedAttachments {
    #[serde(default)]
    attachments: Vec<WireAttachment>,
}

/// Parse a response body in the shared envelope.
fn parse_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, ApiError> {
    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if status.is_server_error() => {
            return Err(ApiError::Network(format!("Server error {status}")));
        }
        Err(e) => return Err(ApiError::Decode(e.to_string())),
    };

    if envelope.result == "success"
        && let Some(data) = envelope.data
    {
        return Ok(data);
    }

    match envelope.error {
        Some(error) => Err(ApiError::rejected(error.code, error.description)),
        None if status.is_server_error() => Err(ApiError::Network(format!("Server error {status}"))),
        None => Err(ApiError::Decode(format!(
            "Response without data (result: {})",
            envelope.result
        ))),
    }
}

/// [`DraftApi`] over HTTPS with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpDraftApi {
    base_url: Url,
    mailbox_uuid: String,
    token: String,
    http_client: Client,
}

impl HttpDraftApi {
    /// Creates a client for one mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(
        base_url: &str,
        mailbox_uuid: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            mailbox_uuid: mailbox_uuid.into(),
            token: token.into(),
            http_client: Client::new(),
        })
    }

    fn draft_endpoint(&self, suffix: Option<&str>) -> Result<Url, ApiError> {
        let mut path = format!("/api/mail/{}/draft", self.mailbox_uuid);
        if let Some(suffix) = suffix {
            path.push('/');
            path.push_str(suffix);
        }
        Ok(self.base_url.join(&path)?)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_envelope(status, &body)
    }
}

#[async_trait]
impl DraftApi for HttpDraftApi {
    async fn fetch_draft(&self, resource: &str) -> Result<Option<Draft>, ApiError> {
        let url = self.base_url.join(resource)?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await?;
        let remote: RemoteDraft = parse_envelope(status, &body)?;
        Ok(Some(remote.into_draft()))
    }

    async fn save_or_send(
        &self,
        draft: &Draft,
        action: DraftAction,
    ) -> Result<SaveResult, ApiError> {
        let payload = DraftPayload::new(draft, action);
        let request = match &draft.remote_uuid {
            Some(uuid) => self.http_client.put(self.draft_endpoint(Some(uuid))?),
            None => self.http_client.post(self.draft_endpoint(None)?),
        };

        tracing::debug!(draft_id = %draft.id, %action, "Pushing draft");
        self.call(request.json(&payload)).await
    }

    async fn upload_attachment(&self, attachment: &Attachment) -> Result<RemoteRef, ApiError> {
        let path = attachment.local_path.as_ref().ok_or_else(|| {
            ApiError::InvalidRequest(format!("Attachment {} has no local file", attachment.id))
        })?;
        let bytes = tokio::fs::read(path).await?;

        let filename = HeaderValue::from_bytes(attachment.name.as_bytes())
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let mime_type = HeaderValue::from_str(&attachment.mime_type)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let request = self
            .http_client
            .post(self.draft_endpoint(Some("attachment"))?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("x-ws-attachment-filename", filename)
            .header("x-ws-attachment-mime-type", mime_type)
            .header("x-ws-attachment-disposition", "attachment")
            .body(bytes);

        let uploaded: WireAttachment = self.call(request).await?;
        Ok(RemoteRef::new(uploaded.uuid))
    }

    async fn attachments_to_forward(
        &self,
        previous: &PreviousMessage,
    ) -> Result<Vec<Attachment>, ApiError> {
        let body = serde_json::json!({
            "to_forward_uids": [previous.uid],
            "mode": "inline",
        });

        let request = self
            .http_client
            .post(self.draft_endpoint(Some("attachmentsToForward"))?)
            .json(&body);

        let forwarded: ForwardedAttachments = self.call(request).await?;
        Ok(forwarded
            .attachments
            .into_iter()
            .map(WireAttachment::into_attachment)
            .collect())
    }
}
