//! Asset inlining: swap remote image URLs for `data:` URLs before a
//! transcript is stored, so it still renders after the originals are gone.
//!
//! Assets are fetched one at a time. A failing asset is logged and left as a
//! plain URL; it never aborts the walk.

use std::io::Read;

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::AssetError;
use crate::transcript::{Transcript, non_empty};

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Raw bytes of a remote asset and the type the server reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedAsset {
    pub fn to_data_url(&self) -> String {
        let mime = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(OCTET_STREAM);
        format!("data:{mime};base64,{}", STANDARD.encode(&self.bytes))
    }
}

pub trait AssetFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedAsset, AssetError>;
}

/// Fetches assets over HTTP with a per-asset size cap.
pub struct HttpAssetFetcher {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpAssetFetcher {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            max_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_asset_bytes)
    }
}

impl AssetFetcher for HttpAssetFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedAsset, AssetError> {
        debug!(%url, "fetching asset");
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(AssetError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(AssetError::Transport {
                    url: url.to_string(),
                    reason: transport.to_string(),
                });
            }
        };
        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(AssetError::Status {
                url: url.to_string(),
                status,
            });
        }

        let content_type = response.header("Content-Type").map(str::to_string);
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|source| AssetError::Io {
                url: url.to_string(),
                source,
            })?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(AssetError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }
        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }
}

/// Counts from one inlining pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InlineReport {
    /// Fields that gained inline data
    pub inlined: usize,
    /// Fields left as URLs because the fetch failed
    pub failed: usize,
    /// Fields that already carried inline data
    pub skipped: usize,
}

/// Content type for an attachment, from the extension of its URL path.
pub fn content_type_for_url(url: &str) -> &'static str {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => OCTET_STREAM,
    }
}

/// Fill every absent inline field whose URL can be fetched.
///
/// Per message: avatar, then attachments, then embed images. Existing
/// inline data is never overwritten.
pub fn inline_assets(transcript: &mut Transcript, fetcher: &dyn AssetFetcher) -> InlineReport {
    let mut report = InlineReport::default();

    for msg in &mut transcript.messages {
        if let Some(data) = upgrade(&msg.avatar_url, &msg.avatar_base64, fetcher, &mut report) {
            msg.avatar_base64 = Some(data);
        }

        for att in msg.attachments.iter_mut().flatten() {
            if let Some(data) = upgrade(&att.url, &att.base64, fetcher, &mut report) {
                att.base64 = Some(data);
                if non_empty(&att.content_type).is_none() {
                    let inferred = att.url.as_deref().map_or(OCTET_STREAM, content_type_for_url);
                    att.content_type = Some(inferred.to_string());
                }
            }
        }

        for embed in msg.embeds.iter_mut().flatten() {
            if let Some(image) = embed.image.as_mut() {
                if let Some(data) = upgrade(&image.url, &image.base64, fetcher, &mut report) {
                    image.base64 = Some(data);
                }
            }
        }
    }

    info!(
        inlined = report.inlined,
        failed = report.failed,
        skipped = report.skipped,
        "inlined transcript assets"
    );
    report
}

/// Owned variant for pipelines that hand the transcript straight to storage.
pub fn process_transcript_for_storage(
    mut transcript: Transcript,
    fetcher: &dyn AssetFetcher,
) -> Transcript {
    inline_assets(&mut transcript, fetcher);
    transcript
}

fn upgrade(
    url: &Option<String>,
    inline: &Option<String>,
    fetcher: &dyn AssetFetcher,
    report: &mut InlineReport,
) -> Option<String> {
    let url = non_empty(url)?;
    if non_empty(inline).is_some() {
        report.skipped += 1;
        return None;
    }
    match fetcher.fetch(url) {
        Ok(asset) => {
            report.inlined += 1;
            Some(asset.to_data_url())
        }
        Err(err) => {
            warn!(error = %err, "asset left as remote url");
            report.failed += 1;
            None
        }
    }
}
