//! Viewer link handling and transcript retrieval from the key-value store.

use std::borrow::Cow;

use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;
use crate::error::LoadError;
use crate::render::{self, RenderOptions};
use crate::transcript::{BinEnvelope, Transcript};

/// Request header carrying the access key
pub const MASTER_KEY_HEADER: &str = "X-Master-Key";

/// Parameters read from a viewer link: `?id=<bin>&key=<access key>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRequest {
    pub id: Option<String>,
    pub key: Option<String>,
}

impl ViewRequest {
    /// Accepts a full URL, a relative `page.html?...` link, or a bare query string.
    pub fn from_link(link: &str) -> Self {
        match Url::parse(link) {
            Ok(url) => Self::from_pairs(url.query_pairs()),
            Err(_) => Self::from_query(link),
        }
    }

    pub fn from_query(query: &str) -> Self {
        let query = query.split('#').next().unwrap_or_default();
        let query = query.split_once('?').map_or(query, |(_, q)| q);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    // First occurrence wins; an empty value counts as absent.
    fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
        let mut id = None;
        let mut key = None;
        for (name, value) in pairs {
            let slot = match name.as_ref() {
                "id" => &mut id,
                "key" => &mut key,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        Self {
            id: id.filter(|v: &String| !v.is_empty()),
            key: key.filter(|v: &String| !v.is_empty()),
        }
    }

    /// Explicit values replace whatever the link carried.
    pub fn with_overrides(mut self, id: Option<String>, key: Option<String>) -> Self {
        if let Some(id) = id.filter(|v| !v.is_empty()) {
            self.id = Some(id);
        }
        if let Some(key) = key.filter(|v| !v.is_empty()) {
            self.key = Some(key);
        }
        self
    }
}

/// `{host}/v3/b/{id}/latest`, with the id percent-encoded as a path segment
pub fn latest_endpoint(storage_host: &str, id: &str) -> Result<Url, LoadError> {
    let mut url = Url::parse(storage_host)
        .map_err(|e| LoadError::InvalidHost(format!("{storage_host}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| LoadError::InvalidHost(storage_host.to_string()))?
        .pop_if_empty()
        .extend(["v3", "b", id, "latest"]);
    url.set_query(None);
    Ok(url)
}

/// Fetch the latest version of a bin and unwrap its `record`.
///
/// No request is made without an id. Any non-2xx status, transport error,
/// or malformed body is terminal; nothing is retried.
pub fn load_transcript(request: &ViewRequest, config: &Config) -> Result<Transcript, LoadError> {
    let id = request.id.as_deref().ok_or(LoadError::MissingIdentifier)?;
    let endpoint = latest_endpoint(&config.storage_host, id)?;
    let key = request.key.as_deref().or(config.master_key.as_deref());

    debug!(%endpoint, keyed = key.is_some(), "fetching transcript");
    let mut req = ureq::get(endpoint.as_str());
    if let Some(key) = key {
        req = req.set(MASTER_KEY_HEADER, key);
    }

    let response = match req.call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => return Err(LoadError::Status { status }),
        Err(ureq::Error::Transport(transport)) => {
            return Err(LoadError::Transport(transport.to_string()));
        }
    };
    let status = response.status();
    if !(200..300).contains(&status) {
        return Err(LoadError::Status { status });
    }

    let envelope: BinEnvelope = response
        .into_json()
        .map_err(|e| LoadError::Decode(e.to_string()))?;
    debug!(messages = envelope.record.messages.len(), "transcript loaded");
    Ok(envelope.record)
}

/// A rendered page plus the load error, if the page is an error notice.
#[derive(Debug)]
pub struct ViewOutcome {
    pub html: String,
    pub error: Option<LoadError>,
}

impl ViewOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Load then render. The transcript is rendered exactly once on success;
/// on failure the page carries a single notice and the detail is only logged.
pub fn view(request: &ViewRequest, config: &Config, options: &RenderOptions) -> ViewOutcome {
    match load_transcript(request, config) {
        Ok(transcript) => ViewOutcome {
            html: render::display_transcript(&transcript, options),
            error: None,
        },
        Err(err) => {
            match &err {
                LoadError::MissingIdentifier => warn!("viewer link has no transcript id"),
                other => error!(error = %other, "error loading transcript"),
            }
            ViewOutcome {
                html: render::render_error_page(err.notice()),
                error: Some(err),
            }
        }
    }
}
