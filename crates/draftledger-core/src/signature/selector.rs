//! Picking the signature of a new draft.
//!
//! When answering a message, the identity that received it is the natural
//! sender. Its recipients are matched against the signatures' addresses,
//! field by field, and the best-scoring signature wins.

use super::model::Signature;
use crate::draft::{DraftMode, PreviousMessage, Recipient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Score {
    NoMatch,
    EmailMatch,
    EmailMatchAndDefault,
    ExactMatch,
    ExactMatchAndDefault,
}

/// Choose the signature of a new draft.
///
/// New messages and forwards get the default signature. Replies get the
/// default reply signature, or else the signature matching whoever the
/// previous message was addressed to. When nothing applies, the "no
/// signature" placeholder of `mailbox_email` is returned.
#[must_use]
pub fn choose_signature(
    mode: DraftMode,
    previous: Option<&PreviousMessage>,
    signatures: &[Signature],
    mailbox_email: &str,
) -> Signature {
    let default = signatures
        .iter()
        .find(|s| !s.is_dummy && s.is_default_for(mode));

    let chosen = if mode.is_reply() {
        default.or_else(|| previous.and_then(|message| most_fitting(message, signatures)))
    } else {
        default
    };

    chosen
        .cloned()
        .unwrap_or_else(|| Signature::dummy(mailbox_email, true))
}

fn most_fitting<'a>(message: &PreviousMessage, signatures: &'a [Signature]) -> Option<&'a Signature> {
    [&message.to, &message.from, &message.cc]
        .into_iter()
        .find_map(|recipients| find_in_recipients(recipients, signatures))
}

/// Best signature for the first field where any recipient is one of ours.
fn find_in_recipients<'a>(
    recipients: &[Recipient],
    signatures: &'a [Signature],
) -> Option<&'a Signature> {
    let mut best: Option<(Score, &Signature)> = None;

    for recipient in recipients {
        let Some((score, signature)) = best_for_recipient(recipient, signatures) else {
            continue;
        };
        if score == Score::ExactMatchAndDefault {
            return Some(signature);
        }
        if best.is_none_or(|(best_score, _)| score > best_score) {
            best = Some((score, signature));
        }
    }

    best.map(|(_, signature)| signature)
}

fn best_for_recipient<'a>(
    recipient: &Recipient,
    signatures: &'a [Signature],
) -> Option<(Score, &'a Signature)> {
    let mut best: Option<(Score, &Signature)> = None;

    for signature in signatures
        .iter()
        .filter(|s| !s.is_dummy && s.sender_email.eq_ignore_ascii_case(&recipient.email))
    {
        let score = score(recipient, signature);
        if score == Score::ExactMatchAndDefault {
            return Some((score, signature));
        }
        if best.is_none_or(|(best_score, _)| score > best_score) {
            best = Some((score, signature));
        }
    }

    best
}

fn score(recipient: &Recipient, signature: &Signature) -> Score {
    let same_name = recipient.name == signature.sender_name;
    match (same_name, signature.is_default) {
        (true, true) => Score::ExactMatchAndDefault,
        (true, false) => Score::ExactMatch,
        (false, true) => Score::EmailMatchAndDefault,
        (false, false) => Score::EmailMatch,
    }
}
