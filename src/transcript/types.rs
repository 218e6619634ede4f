//! Types for the persisted transcript document.
//!
//! Field names follow the JSON written by the ticket bot, which mixes
//! camelCase (`channelName`, `contentType`) with snake_case (`avatar_url`).
//! Every object keeps unknown keys in `extra` so a read-modify-write cycle
//! through the inliner never drops producer data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::timestamp::Timestamp;

/// Title shown when the transcript has no channel name
pub const DEFAULT_TITLE: &str = "Ticket Transcript";
/// Shown when nobody is recorded as closing the ticket
pub const UNKNOWN_CLOSER: &str = "Unknown";
/// Discord's stock avatar, used when a message has neither inline data nor a URL
pub const DEFAULT_AVATAR: &str = "https://cdn.discordapp.com/embed/avatars/0.png";

/// Empty strings count as absent, matching how the producer omits fields.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
    /// Chronological; never reordered
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transcript {
    pub fn title(&self) -> &str {
        non_empty(&self.channel_name).unwrap_or(DEFAULT_TITLE)
    }

    pub fn closed_by(&self) -> &str {
        non_empty(&self.closed_by).unwrap_or(UNKNOWN_CLOSER)
    }

    pub fn close_reason(&self) -> Option<&str> {
        non_empty(&self.close_reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// `data:` URL filled in by the inliner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Inline data, then the remote URL, then the stock avatar.
    pub fn avatar_src(&self) -> &str {
        non_empty(&self.avatar_base64)
            .or_else(|| non_empty(&self.avatar_url))
            .unwrap_or(DEFAULT_AVATAR)
    }

    pub fn text(&self) -> Option<&str> {
        non_empty(&self.content)
    }

    pub fn embeds(&self) -> &[Embed] {
        self.embeds.as_deref().unwrap_or_default()
    }

    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<EmbedField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Embed {
    /// CSS color for the left border. Zero is treated like an absent color.
    pub fn border_color(&self) -> Option<String> {
        match self.color {
            Some(0) | None => None,
            Some(color) => Some(format!("#{:06x}", color & 0xff_ffff)),
        }
    }

    pub fn fields(&self) -> &[EmbedField] {
        self.fields.as_deref().unwrap_or_default()
    }

    pub fn image_src(&self) -> Option<&str> {
        self.image.as_ref().and_then(EmbedImage::src)
    }

    pub fn footer_text(&self) -> Option<&str> {
        self.footer.as_ref().and_then(EmbedFooter::text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmbedImage {
    pub fn src(&self) -> Option<&str> {
        non_empty(&self.base64).or_else(|| non_empty(&self.url))
    }
}

/// Older producers wrote the footer as a bare string, newer ones as `{ "text": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbedFooter {
    Text(String),
    Object(FooterObject),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FooterObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmbedFooter {
    pub fn text(&self) -> Option<&str> {
        match self {
            EmbedFooter::Text(text) => Some(text.as_str()).filter(|s| !s.is_empty()),
            EmbedFooter::Object(obj) => non_empty(&obj.text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// How an attachment is shown, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentView<'a> {
    /// Inline data with an `image/*` content type
    InlineImage { src: &'a str },
    /// Inline data of any other type, offered as a download
    InlineFile { href: &'a str },
    /// Only a remote URL survives; it may no longer resolve
    External { href: &'a str },
    Hidden,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        non_empty(&self.content_type).is_some_and(|ct| ct.starts_with("image/"))
    }

    pub fn view(&self) -> AttachmentView<'_> {
        match (non_empty(&self.base64), non_empty(&self.url)) {
            (Some(data), _) if self.is_image() => AttachmentView::InlineImage { src: data },
            (Some(data), _) => AttachmentView::InlineFile { href: data },
            (None, Some(url)) => AttachmentView::External { href: url },
            (None, None) => AttachmentView::Hidden,
        }
    }
}
