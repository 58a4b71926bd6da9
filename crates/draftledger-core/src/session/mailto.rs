//! `mailto:` links used to prefill a new message.

use url::Url;
use url::form_urlencoded;

use crate::draft::Recipient;

/// Fields prefilled from a `mailto:` link.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MailtoPrefill {
    /// `To` recipients.
    pub to: Vec<Recipient>,
    /// `Cc` recipients.
    pub cc: Vec<Recipient>,
    /// `Bcc` recipients.
    pub bcc: Vec<Recipient>,
    /// Subject.
    pub subject: Option<String>,
    /// Plain text body.
    pub body: Option<String>,
}

/// Parse a `mailto:` URI.
///
/// Returns `None` if `uri` is not a `mailto:` URI.
#[must_use]
pub fn parse_mailto(uri: &str) -> Option<MailtoPrefill> {
    let url = Url::parse(uri.trim()).ok()?;
    if url.scheme() != "mailto" {
        return None;
    }

    let mut prefill = MailtoPrefill {
        to: addresses(&decode(url.path())),
        ..MailtoPrefill::default()
    };

    for (key, value) in url.query_pairs() {
        match key.to_ascii_lowercase().as_str() {
            "to" => prefill.to.extend(addresses(&value)),
            "cc" => prefill.cc.extend(addresses(&value)),
            "bcc" => prefill.bcc.extend(addresses(&value)),
            "subject" => prefill.subject = Some(value.into_owned()),
            "body" => prefill.body = Some(value.into_owned()),
            _ => {}
        }
    }

    Some(prefill)
}

/// Percent-decode a `mailto:` path, where `+` is a literal plus sign.
fn decode(path: &str) -> String {
    let escaped = format!("v={}", path.replace('+', "%2B"));
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

fn addresses(list: &str) -> Vec<Recipient> {
    list.split(',')
        .map(str::trim)
        .filter(|email| email.contains('@'))
        .map(|email| Recipient::prefilled(email, ""))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn emails(list: &[Recipient]) -> Vec<&str> {
        list.iter().map(|r| r.email.as_str()).collect()
    }

    #[test]
    fn test_parse_full_mailto() {
        let prefill = parse_mailto(
            "mailto:alice@example.com,bob+news@example.com?cc=carol@example.com&subject=Hello%20there&body=Line%201",
        )
        .unwrap();

        assert_eq!(emails(&prefill.to), ["alice@example.com", "bob+news@example.com"]);
        assert_eq!(emails(&prefill.cc), ["carol@example.com"]);
        assert_eq!(prefill.subject.as_deref(), Some("Hello there"));
        assert_eq!(prefill.body.as_deref(), Some("Line 1"));
        assert!(!prefill.to[0].manually_entered);
    }

    #[test]
    fn test_parse_encoded_address() {
        let prefill = parse_mailto("mailto:jane%40example.com").unwrap();
        assert_eq!(emails(&prefill.to), ["jane@example.com"]);
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(parse_mailto("https://example.com").is_none());
        assert!(parse_mailto("not a uri").is_none());
    }
}
