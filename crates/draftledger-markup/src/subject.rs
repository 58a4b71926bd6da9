//! Subject line formatting for replies and forwards.

/// Maximum subject length accepted by the mail server (RFC 5322 line limit).
pub const SUBJECT_MAX_LENGTH: usize = 998;

const PREFIX_REPLY: &str = "Re: ";
const PREFIX_FORWARD: &str = "Fw: ";

// Localized prefixes already meaning "reply" or "forward".
const REPLY_MARKERS: &[&str] = &["re:", "ref:", "aw:", "rif:", "r:"];
const FORWARD_MARKERS: &[&str] = &["fw:", "fwd:", "rv:", "wg:", "tr:", "i:"];

/// Builds the subject of a reply to a message with `previous` subject.
#[must_use]
pub fn reply_subject(previous: Option<&str>) -> String {
    prefixed(previous.unwrap_or_default(), PREFIX_REPLY, REPLY_MARKERS)
}

/// Builds the subject of a forward of a message with `previous` subject.
#[must_use]
pub fn forward_subject(previous: Option<&str>) -> String {
    prefixed(previous.unwrap_or_default(), PREFIX_FORWARD, FORWARD_MARKERS)
}

/// Normalizes a subject captured from the editor.
///
/// Blank subjects become `None`; long ones are truncated to
/// [`SUBJECT_MAX_LENGTH`] characters.
#[must_use]
pub fn normalize_subject(subject: &str) -> Option<String> {
    if subject.trim().is_empty() {
        return None;
    }
    Some(subject.chars().take(SUBJECT_MAX_LENGTH).collect())
}

fn prefixed(subject: &str, prefix: &str, markers: &[&str]) -> String {
    let lower = subject.to_lowercase();
    if markers.iter().any(|marker| lower.contains(marker)) {
        subject.to_string()
    } else {
        format!("{prefix}{subject}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_subject() {
        assert_eq!(reply_subject(Some("Lunch")), "Re: Lunch");
        assert_eq!(reply_subject(Some("RE: Lunch")), "RE: Lunch");
        assert_eq!(reply_subject(Some("AW: Mittag")), "AW: Mittag");
        assert_eq!(reply_subject(None), "Re: ");
    }

    #[test]
    fn test_forward_subject() {
        assert_eq!(forward_subject(Some("Report")), "Fw: Report");
        assert_eq!(forward_subject(Some("Fwd: Report")), "Fwd: Report");
        assert_eq!(forward_subject(Some("TR: Rapport")), "TR: Rapport");
    }

    #[test]
    fn test_normalize_subject() {
        assert_eq!(normalize_subject("   "), None);
        assert_eq!(normalize_subject("Hi").as_deref(), Some("Hi"));

        let long = "x".repeat(SUBJECT_MAX_LENGTH + 10);
        assert_eq!(
            normalize_subject(&long).map(|s| s.chars().count()),
            Some(SUBJECT_MAX_LENGTH)
        );
    }
}
