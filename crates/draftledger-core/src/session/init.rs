//! Loading or creating the draft of a new compose session.

use draftledger_markup::{
    QuotedMessage, forward_quote, forward_subject, plain_text_to_html, reply_quote, reply_subject,
    split_body, wrap_signature,
};

use super::SessionError;
use super::context::{InitContext, SessionContext};
use super::mailto::parse_mailto;
use crate::draft::{Draft, DraftMode, PreviousMessage, Recipient, UploadStatus};
use crate::signature::{Signature, choose_signature};

/// A draft ready to be edited, with its non-editable parts set aside.
pub(super) struct Loaded {
    /// The draft, with only the user's content as body.
    pub draft: Draft,
    pub signature_markup: Option<String>,
    pub quote: Option<String>,
    pub signature: Signature,
    /// Whether the draft was created by this session.
    pub is_new: bool,
}

/// Find the draft to edit: local copy, then remote copy, then a new one.
///
/// Returns `None` when the remote draft no longer exists.
pub(super) async fn load(
    ctx: &SessionContext,
    init: &InitContext,
) -> Result<Option<Loaded>, SessionError> {
    let mut existing = match init.local_draft_id {
        Some(id) => ctx.store.get_draft(id).await?,
        None => None,
    };

    if existing.is_none()
        && let Some(resource) = &init.remote_resource
    {
        existing = ctx.api.fetch_draft(resource).await?;
        if existing.is_none() {
            tracing::warn!(resource = %resource, "Remote draft no longer exists");
            return Ok(None);
        }
    }

    let mut loaded = match existing {
        Some(draft) => open_existing(ctx, draft),
        None => create(ctx, init).await,
    };

    for recipient in loaded
        .draft
        .to
        .iter_mut()
        .chain(&mut loaded.draft.cc)
        .chain(&mut loaded.draft.bcc)
    {
        recipient.manually_entered = false;
    }

    Ok(Some(loaded))
}

fn open_existing(ctx: &SessionContext, mut draft: Draft) -> Loaded {
    let split = split_body(&draft.body, &draft.mime_type);
    draft.body = split.body;

    let signature = match draft.identity_id {
        Some(id) => ctx
            .signatures
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .unwrap_or_else(|| Signature::dummy(&ctx.mailbox_email, false)),
        None => {
            let signature =
                choose_signature(DraftMode::NewMail, None, &ctx.signatures, &ctx.mailbox_email);
            draft.identity_id = Some(signature.id);
            signature
        }
    };

    tracing::debug!(draft_id = %draft.id, "Opened existing draft");
    Loaded {
        draft,
        signature_markup: split.signature,
        quote: split.quote,
        signature,
        is_new: false,
    }
}

async fn create(ctx: &SessionContext, init: &InitContext) -> Loaded {
    let mut draft = Draft::new();
    let mut quote = None;
    let previous = init.previous_message.as_ref();

    match (init.mode, previous) {
        (DraftMode::Reply | DraftMode::ReplyAll, Some(message)) => {
            let (to, cc) =
                message.reply_recipients(init.mode == DraftMode::ReplyAll, &ctx.mailbox_email);
            draft.to = to;
            draft.cc = cc;
            draft.subject = Some(reply_subject(message.subject.as_deref()));
            draft.in_reply_to.clone_from(&message.message_id);
            draft.references = message.reply_references();
            draft.in_reply_to_uid = Some(message.uid.clone());
            quote = Some(quote_markup(init.mode, message));
        }
        (DraftMode::Forward, Some(message)) => {
            draft.subject = Some(forward_subject(message.subject.as_deref()));
            draft.forwarded_uid = Some(message.uid.clone());
            draft.attachments = match ctx.api.attachments_to_forward(message).await {
                Ok(mut attachments) => {
                    for attachment in &mut attachments {
                        attachment.status = UploadStatus::Uploaded;
                    }
                    attachments
                }
                Err(e) => {
                    tracing::warn!(uid = %message.uid, error = %e, "Could not get attachments to forward");
                    Vec::new()
                }
            };
            quote = Some(quote_markup(init.mode, message));
        }
        _ => prefill_new_mail(&mut draft, init),
    }

    let signature = choose_signature(init.mode, previous, &ctx.signatures, &ctx.mailbox_email);
    draft.identity_id = Some(signature.id);
    let signature_markup = (!signature.is_dummy).then(|| wrap_signature(&signature.content));

    tracing::debug!(draft_id = %draft.id, mode = ?init.mode, "Created draft");
    Loaded {
        draft,
        signature_markup,
        quote,
        signature,
        is_new: true,
    }
}

fn prefill_new_mail(draft: &mut Draft, init: &InitContext) {
    if let Some(prefill) = init.mailto.as_deref().and_then(parse_mailto) {
        draft.to = prefill.to;
        draft.cc = prefill.cc;
        draft.bcc = prefill.bcc;
        draft.subject = prefill.subject;
        if let Some(body) = prefill.body {
            draft.body = plain_text_to_html(&body);
        }
    }

    if let Some(recipient) = &init.recipient
        && !draft.to.iter().any(|r| r.same_email(recipient))
    {
        draft.to.push(recipient.clone());
    }
}

fn displays(list: &[Recipient]) -> Vec<String> {
    list.iter().map(Recipient::display).collect()
}

fn quote_markup(mode: DraftMode, message: &PreviousMessage) -> String {
    let from = displays(&message.from).join(", ");
    let date = message.date.format("%a, %-d %b %Y %H:%M").to_string();
    let to = displays(&message.to);
    let cc = displays(&message.cc);

    let quoted = QuotedMessage {
        from: &from,
        date: &date,
        subject: message.subject.as_deref(),
        to: &to,
        cc: &cc,
        body: &message.body,
        mime_type: &message.mime_type,
    };

    match mode {
        DraftMode::Forward => forward_quote(&quoted),
        _ => reply_quote(&quoted),
    }
}
