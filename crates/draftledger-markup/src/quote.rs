//! Quote markup for new replies and forwards.

use std::fmt::Write;

use crate::content_type::BodyFormat;
use crate::split::{FORWARD_QUOTE_CLASS, REPLY_QUOTE_CLASS};

/// The parts of a previous message shown in its quote.
#[derive(Debug, Clone, Copy)]
pub struct QuotedMessage<'a> {
    /// Display of the sender, e.g. `"Jane Doe" <jane@example.com>`.
    pub from: &'a str,
    /// Preformatted date.
    pub date: &'a str,
    /// Subject of the previous message.
    pub subject: Option<&'a str>,
    /// Displays of the `To` recipients.
    pub to: &'a [String],
    /// Displays of the `Cc` recipients.
    pub cc: &'a [String],
    /// Body of the previous message.
    pub body: &'a str,
    /// MIME type of `body`.
    pub mime_type: &'a str,
}

/// Builds the reply quote block appended below a reply.
#[must_use]
pub fn reply_quote(message: &QuotedMessage<'_>) -> String {
    let header = format!("On {}, {} wrote:", message.date, message.from);
    format!(
        r#"<div class="{REPLY_QUOTE_CLASS}"><div>{}</div><blockquote>{}</blockquote></div>"#,
        escape_html(&header),
        previous_body_html(message),
    )
}

/// Builds the forwarded message block appended below a forward.
#[must_use]
pub fn forward_quote(message: &QuotedMessage<'_>) -> String {
    let mut quote = format!(r#"<div class="{FORWARD_QUOTE_CLASS}">"#);

    push_line(&mut quote, "---------- Forwarded message ---------");
    push_line(&mut quote, &format!("From: {}", message.from));
    push_line(&mut quote, &format!("Date: {}", message.date));
    push_line(
        &mut quote,
        &format!("Subject: {}", message.subject.unwrap_or_default()),
    );
    if !message.to.is_empty() {
        push_line(&mut quote, &format!("To: {}", message.to.join(", ")));
    }
    if !message.cc.is_empty() {
        push_line(&mut quote, &format!("Cc: {}", message.cc.join(", ")));
    }
    push_line(&mut quote, "");

    quote.push_str(&previous_body_html(message));
    quote.push_str("</div>");
    quote
}

/// Converts plain text to HTML, keeping line breaks.
#[must_use]
pub fn plain_text_to_html(text: &str) -> String {
    escape_html(text).replace("\r\n", "<br>").replace('\n', "<br>")
}

/// Escapes the characters that are significant in HTML text and attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn previous_body_html(message: &QuotedMessage<'_>) -> String {
    match BodyFormat::detect(message.mime_type) {
        BodyFormat::PlainText => plain_text_to_html(message.body),
        BodyFormat::Html => message.body.to_string(),
    }
}

fn push_line(html: &mut String, line: &str) {
    let _ = write!(html, "<div>{}<br></div>", escape_html(line));
}
