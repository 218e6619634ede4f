//! Render stored Discord ticket transcripts to standalone HTML.
//!
//! The view path is [`fetch::view`]: read `id`/`key` from a viewer link, pull
//! the bin from storage, and project it through [`render::display_transcript`].
//! Before a transcript is stored, [`inline::inline_assets`] can replace its
//! remote image URLs with `data:` URLs.

pub mod config;
pub mod error;
pub mod fetch;
pub mod inline;
pub mod render;
pub mod transcript;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use error::{AssetError, LoadError};
pub use fetch::{ViewOutcome, ViewRequest, load_transcript, view};
pub use inline::{
    AssetFetcher, FetchedAsset, HttpAssetFetcher, InlineReport, inline_assets,
    process_transcript_for_storage,
};
pub use render::{RenderOptions, display_transcript, render_error_page};
pub use transcript::{Transcript, parse_document};
