//! Transcript document: data model, timestamp handling, and parsing.

mod timestamp;
mod types;

use serde::Deserialize;
use serde_json::Value;

pub use timestamp::Timestamp;
pub(crate) use types::non_empty;
pub use types::{
    Attachment, AttachmentView, DEFAULT_AVATAR, DEFAULT_TITLE, Embed, EmbedField, EmbedFooter,
    EmbedImage, FooterObject, Message, Transcript, UNKNOWN_CLOSER,
};

/// Body returned by the storage API's read endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct BinEnvelope {
    pub record: Transcript,
}

/// Parse either a storage envelope (`{"record": {...}}`) or a bare transcript.
pub fn parse_document(json: &str) -> serde_json::Result<Transcript> {
    let value: Value = serde_json::from_str(json)?;
    if value.get("record").is_some_and(Value::is_object) {
        let envelope: BinEnvelope = serde_json::from_value(value)?;
        Ok(envelope.record)
    } else {
        serde_json::from_value(value)
    }
}
