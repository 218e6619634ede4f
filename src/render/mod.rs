//! HTML rendering: a transcript in, a standalone page out.
//!
//! Rendering is a pure projection of the transcript. Each call builds a whole
//! new document, so rendering the same transcript twice yields identical
//! output and never duplicates messages. All text is escaped, including the
//! close reason.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use time::UtcOffset;

use crate::transcript::{
    Attachment, AttachmentView, DEFAULT_TITLE, Embed, Message, Transcript, non_empty,
};

const STYLE: &str = include_str!("style.css");
/// Border color of the synthetic "closed" notice
const CLOSED_ACCENT: &str = "#f04747";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Offset timestamps are displayed in
    pub offset: UtcOffset,
}

impl RenderOptions {
    /// Uses the machine's local offset, falling back to UTC when it cannot be determined.
    pub fn local() -> Self {
        Self {
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            offset: UtcOffset::UTC,
        }
    }
}

/// Values for the four fixed header slots
struct HeaderFields<'a> {
    title: &'a str,
    created: String,
    message_count: String,
    closed_by: &'a str,
}

impl HeaderFields<'_> {
    fn blank() -> Self {
        Self {
            title: "",
            created: String::new(),
            message_count: String::new(),
            closed_by: "",
        }
    }
}

/// Render the full transcript page.
pub fn display_transcript(transcript: &Transcript, options: &RenderOptions) -> String {
    let header = HeaderFields {
        title: transcript.title(),
        created: transcript
            .created_at
            .as_ref()
            .map(|ts| ts.display(options.offset))
            .unwrap_or_else(|| "Unknown".to_string()),
        message_count: transcript.messages.len().to_string(),
        closed_by: transcript.closed_by(),
    };
    page(transcript.title(), &header, render_messages(transcript, options)).into_string()
}

/// Page shell with blank header fields and a single notice in place of the messages.
pub fn render_error_page(notice: &str) -> String {
    let body = html! {
        div.error { (notice) }
    };
    page(DEFAULT_TITLE, &HeaderFields::blank(), body).into_string()
}

/// Contents of the `#messages` container.
pub fn render_messages(transcript: &Transcript, options: &RenderOptions) -> Markup {
    html! {
        @for msg in &transcript.messages {
            (message_unit(msg, options))
        }
        @if let Some(reason) = transcript.close_reason() {
            (close_notice(reason))
        }
    }
}

fn page(doc_title: &str, header: &HeaderFields<'_>, messages: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (doc_title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                main.transcript {
                    header.ticket-header {
                        h1 #ticket-name { (header.title) }
                        dl.ticket-meta {
                            div {
                                dt { "Created" }
                                dd #created-date { (header.created) }
                            }
                            div {
                                dt { "Messages" }
                                dd #message-count { (header.message_count) }
                            }
                            div {
                                dt { "Closed by" }
                                dd #closed-by { (header.closed_by) }
                            }
                        }
                    }
                    div #messages { (messages) }
                }
            }
        }
    }
}

fn message_unit(msg: &Message, options: &RenderOptions) -> Markup {
    let timestamp = msg
        .timestamp
        .as_ref()
        .map(|ts| ts.display(options.offset))
        .unwrap_or_default();
    html! {
        div.message {
            img.avatar src=(msg.avatar_src()) alt=(msg.username);
            div.message-content {
                div.message-header {
                    span.username { (msg.username) }
                    span.timestamp { (timestamp) }
                }
                @if let Some(text) = msg.text() {
                    div.message-text { (text) }
                }
                @for embed in msg.embeds() {
                    (embed_block(embed))
                }
                @for attachment in msg.attachments() {
                    (attachment_element(attachment))
                }
            }
        }
    }
}

// Fixed order: color, title, description, fields, image, footer
fn embed_block(embed: &Embed) -> Markup {
    let style = embed
        .border_color()
        .map(|color| format!("border-left-color: {color};"));
    html! {
        div.embed style=[style] {
            @if let Some(title) = non_empty(&embed.title) {
                div.embed-title { (title) }
            }
            @if let Some(description) = non_empty(&embed.description) {
                div.embed-description { (description) }
            }
            @for field in embed.fields() {
                div.embed-field {
                    div.embed-field-name { (field.name) }
                    div.embed-field-value { (field.value) }
                }
            }
            @if let Some(src) = embed.image_src() {
                img.embed-image src=(src);
            }
            @if let Some(footer) = embed.footer_text() {
                div.embed-footer { (footer) }
            }
        }
    }
}

fn attachment_element(attachment: &Attachment) -> Markup {
    match attachment.view() {
        AttachmentView::InlineImage { src } => html! {
            img.attachment-image src=(src) alt=(attachment.name)
                style="max-width: 100%; margin-top: 8px; border-radius: 4px;";
        },
        AttachmentView::InlineFile { href } => html! {
            a.attachment href=(href) download=(attachment.name) {
                "📎 " (attachment.name)
            }
        },
        AttachmentView::External { href } => html! {
            a.attachment href=(href) target="_blank" rel="noopener noreferrer" style="opacity: 0.6;" {
                "📎 " (attachment.name) " (external link)"
            }
        },
        AttachmentView::Hidden => html! {},
    }
}

fn close_notice(reason: &str) -> Markup {
    html! {
        div.message.close-notice {
            div.message-content {
                div.embed style={ "border-left-color: " (CLOSED_ACCENT) ";" } {
                    div.embed-title { "🔒 Ticket Closed" }
                    div.embed-description { "Reason: " (reason) }
                }
            }
        }
    }
}
