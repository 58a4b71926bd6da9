//! Sender signatures and their automatic selection.

mod model;
mod selector;

pub use model::{Signature, SignatureId};
pub use selector::choose_signature;
