//! Timestamps as the bot writes them: ISO strings or epoch milliseconds.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description};

/// Month/day/year with a 12-hour clock, the shape of an en-US locale string.
const DISPLAY_FORMAT: &str =
    "[month padding:none]/[day padding:none]/[year], [hour repr:12 padding:none]:[minute]:[second] [period]";

/// Serialized back in the same form it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    pub fn to_datetime(&self) -> Option<OffsetDateTime> {
        match self {
            Timestamp::Millis(ms) => from_millis(*ms),
            Timestamp::Text(text) => parse_text(text),
        }
    }

    /// Formats in the given offset. Unparseable text is shown as written.
    pub fn display(&self, offset: UtcOffset) -> String {
        match self.to_datetime().and_then(|dt| dt.checked_to_offset(offset)) {
            Some(dt) => format_datetime(dt),
            None => match self {
                Timestamp::Millis(ms) => ms.to_string(),
                Timestamp::Text(text) => text.clone(),
            },
        }
    }
}

fn from_millis(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
}

fn parse_text(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();
    if let Ok(dt) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(dt);
    }
    if let Ok(dt) = OffsetDateTime::parse(text, &Iso8601::DEFAULT) {
        return Some(dt);
    }
    // No offset in the string: read it as UTC
    if let Ok(dt) = PrimitiveDateTime::parse(text, &Iso8601::DEFAULT) {
        return Some(dt.assume_utc());
    }
    text.parse::<i64>().ok().and_then(from_millis)
}

fn format_datetime(dt: OffsetDateTime) -> String {
    format_description::parse(DISPLAY_FORMAT)
        .ok()
        .and_then(|fmt| dt.format(&fmt).ok())
        .or_else(|| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| dt.unix_timestamp().to_string())
}
