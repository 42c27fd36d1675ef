//! Caller-facing download request.

use super::types::{EpisodeRef, MediaKind, MediaMetadata};

/// Everything a caller supplies to enqueue a download. The transfer URL must
/// already be resolved/authorized.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub media: MediaKind,
    pub url: String,
    pub name: String,
    pub cover: Option<String>,
    pub metadata: MediaMetadata,
}

impl DownloadRequest {
    pub fn movie(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            media: MediaKind::Movie,
            url: url.into(),
            name: name.into(),
            cover: None,
            metadata: MediaMetadata::default(),
        }
    }

    pub fn episode(url: impl Into<String>, name: impl Into<String>, episode: EpisodeRef) -> Self {
        Self {
            media: MediaKind::Episode(episode),
            url: url.into(),
            name: name.into(),
            cover: None,
            metadata: MediaMetadata::default(),
        }
    }

    /// Remote cover URL; empty strings are treated as "no cover".
    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        let cover = cover.into();
        self.cover = (!cover.trim().is_empty()).then_some(cover);
        self
    }

    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Checks required inputs are non-empty. Returns a message naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("download url is empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name is empty".to_string());
        }
        if let MediaKind::Episode(ep) = &self.media {
            if ep.series_name.trim().is_empty() {
                return Err("series name is empty".to_string());
            }
        }
        Ok(())
    }

    pub(crate) fn artwork_key(&self) -> String {
        self.media.artwork_key(&self.name)
    }
}
