//! # draftledger-markup
//!
//! Text and markup transforms used when composing an email draft.
//!
//! ## Features
//!
//! - **Splitting**: Separate a stored body into user content, signature and quote
//! - **Quotes**: Build reply and forward quote blocks
//! - **Signatures**: Wrap signature HTML in its container
//! - **Subjects**: `Re:`/`Fw:` prefixing and length normalization
//!
//! ## Quick Start
//!
//! ```ignore
//! use draftledger_markup::{split_body, wrap_signature};
//!
//! let stored = format!("<p>Hello</p>{}", wrap_signature("Jane"));
//! let split = split_body(&stored, "text/html");
//!
//! assert_eq!(split.body, "<p>Hello</p>");
//! assert_eq!(split.join(), stored);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod quote;
mod split;
mod subject;

pub use content_type::{BodyFormat, ContentType};
pub use error::{Error, Result};
pub use quote::{QuotedMessage, escape_html, forward_quote, plain_text_to_html, reply_quote};
pub use split::{
    FORWARD_QUOTE_CLASS, REPLY_QUOTE_CLASS, SIGNATURE_CLASS, SplitBody, join_body, split_body,
    wrap_signature,
};
pub use subject::{SUBJECT_MAX_LENGTH, forward_subject, normalize_subject, reply_subject};
