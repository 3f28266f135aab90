//! Identifier extraction from listing pages
//!
//! Extractors are total: a payload that does not look like the expected page simply
//! yields no items. Payload bytes are decoded as UTF-8, replacing invalid sequences.

pub mod diskunion;
pub mod markup;
pub mod yahoo;

pub use markup::Markup;

/// Decodes a response payload for marker scanning
pub fn payload_text(payload: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(payload)
}
