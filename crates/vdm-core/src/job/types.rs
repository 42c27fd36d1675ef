//! Core job types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::status::{InvalidTransition, JobStatus};

/// Opaque job identifier (`<kind>_<normalized name>_<created millis>`).
pub type JobId = String;

/// Series linkage carried by every episode job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    /// Grouping key for the aggregation view and artwork cache.
    pub series_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    pub season: u32,
    pub episode: u32,
}

/// What a job downloads. Movies never carry series linkage; episodes always do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Episode(EpisodeRef),
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Episode(_) => "episode",
        }
    }

    pub fn episode(&self) -> Option<&EpisodeRef> {
        match self {
            MediaKind::Movie => None,
            MediaKind::Episode(ep) => Some(ep),
        }
    }

    pub fn is_movie(&self) -> bool {
        matches!(self, MediaKind::Movie)
    }

    pub fn series_name(&self) -> Option<&str> {
        self.episode().map(|ep| ep.series_name.as_str())
    }

    pub fn kind(&self) -> JobKind {
        match self {
            MediaKind::Movie => JobKind::Movie,
            MediaKind::Episode(_) => JobKind::Episode,
        }
    }

    /// Key under which the cover is cached: the series name for episodes (so
    /// every episode converges on one file), the normalized name for movies.
    pub(crate) fn artwork_key(&self, name: &str) -> String {
        match self {
            MediaKind::Episode(ep) => ep.series_name.clone(),
            MediaKind::Movie => format!("movie_{}", super::id::normalize_name(name)),
        }
    }
}

/// Media kind without series linkage, for lookups by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Movie,
    Episode,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Movie => "movie",
            JobKind::Episode => "episode",
        }
    }
}

/// Optional display metadata supplied by the caller (enrichment is external).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    /// Runtime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

/// Byte-level progress reported by the transfer agent for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Agent-side percentage (0-100); used only when the total is unknown.
    pub progress: u8,
    pub downloaded_bytes: u64,
    /// 0 when the agent does not know the total yet.
    pub total_bytes: u64,
}

/// One requested download (a movie or a single episode) and its transfer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub name: String,
    #[serde(flatten)]
    pub media: MediaKind,
    pub url: String,
    /// Remote cover image URL, if the caller provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// Locally cached cover (shared by all episodes of a series).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_cover: Option<PathBuf>,
    #[serde(flatten)]
    pub metadata: MediaMetadata,
    /// Total size in bytes; 0 until the agent reports it.
    pub size: u64,
    pub downloaded_bytes: u64,
    pub progress: u8,
    pub status: JobStatus,
    /// Set only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Set only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix milliseconds.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// `round(downloaded / size * 100)`, clamped to 100.
pub(crate) fn percent_of(downloaded: u64, size: u64) -> u8 {
    if size == 0 {
        return 0;
    }
    let pct = (downloaded as f64 / size as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

impl Job {
    pub fn kind_str(&self) -> &'static str {
        self.media.as_str()
    }

    pub fn episode(&self) -> Option<&EpisodeRef> {
        self.media.episode()
    }

    pub fn series_name(&self) -> Option<&str> {
        self.media.series_name()
    }

    pub(crate) fn artwork_key(&self) -> String {
        self.media.artwork_key(&self.name)
    }

    /// Cover to display: the cached file when present, else the remote URL.
    pub fn display_cover(&self) -> Option<String> {
        self.local_cover
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| self.cover.clone())
    }

    /// Apply a state-machine transition, rejecting anything not enumerated.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Record a progress report. Returns false when the report would move
    /// progress backwards and `allow_regress` is not set.
    pub(crate) fn record_progress(&mut self, update: &ProgressUpdate, allow_regress: bool) -> bool {
        if !allow_regress && update.downloaded_bytes < self.downloaded_bytes {
            return false;
        }
        if update.total_bytes > 0 {
            self.size = update.total_bytes;
        }
        self.downloaded_bytes = update.downloaded_bytes;
        let pct = if self.size > 0 {
            percent_of(self.downloaded_bytes, self.size)
        } else {
            update.progress.min(100)
        };
        self.progress = if allow_regress { pct } else { pct.max(self.progress) };
        true
    }

    /// downloading → completed; sets the file path, size, progress 100 and completion time.
    pub(crate) fn complete(
        &mut self,
        file_path: PathBuf,
        size: u64,
        now: i64,
    ) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Completed)?;
        if size > 0 {
            self.size = size;
        }
        self.downloaded_bytes = self.size;
        self.progress = 100;
        self.file_path = Some(file_path);
        self.error = None;
        self.completed_at = Some(now);
        Ok(())
    }

    /// downloading → failed with a human-readable message.
    pub(crate) fn fail(&mut self, message: String) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(message);
        Ok(())
    }

    /// {paused | failed} → pending; clears the error but keeps `downloaded_bytes`
    /// so the agent can decide whether to continue the partial transfer.
    pub(crate) fn requeue(&mut self) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Pending)?;
        self.error = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job {
            id: "movie_x_1".into(),
            name: "X".into(),
            media: MediaKind::Movie,
            url: "https://cdn.example/x.mp4".into(),
            cover: None,
            local_cover: None,
            metadata: MediaMetadata::default(),
            size: 0,
            downloaded_bytes: 0,
            progress: 0,
            status: JobStatus::Downloading,
            file_path: None,
            error: None,
            created_at: 1,
            completed_at: None,
        }
    }

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(percent_of(0, 0), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(5, 4), 100);
    }

    #[test]
    fn progress_is_monotonic_unless_regress_allowed() {
        let mut j = job();
        let up = |d, t| ProgressUpdate {
            progress: 0,
            downloaded_bytes: d,
            total_bytes: t,
        };
        assert!(j.record_progress(&up(50, 100), false));
        assert_eq!(j.progress, 50);
        assert!(!j.record_progress(&up(40, 100), false));
        assert_eq!(j.downloaded_bytes, 50);
        assert!(j.record_progress(&up(10, 100), true));
        assert_eq!(j.progress, 10);
    }

    #[test]
    fn unknown_total_uses_agent_percentage() {
        let mut j = job();
        let update = ProgressUpdate {
            progress: 42,
            downloaded_bytes: 10,
            total_bytes: 0,
        };
        assert!(j.record_progress(&update, false));
        assert_eq!(j.progress, 42);
        assert_eq!(j.size, 0);
    }

    #[test]
    fn completion_sets_required_fields() {
        let mut j = job();
        j.complete(PathBuf::from("/lib/x.mp4"), 1234, 99).unwrap();
        assert_eq!(j.status, JobStatus::Completed);
        assert_eq!(j.progress, 100);
        assert_eq!(j.downloaded_bytes, 1234);
        assert_eq!(j.completed_at, Some(99));
        assert!(j.file_path.is_some());
        assert!(j.complete(PathBuf::from("/again"), 1, 100).is_err());
    }

    #[test]
    fn requeue_clears_error_keeps_bytes() {
        let mut j = job();
        j.downloaded_bytes = 77;
        j.fail("disk full".into()).unwrap();
        j.requeue().unwrap();
        assert_eq!(j.status, JobStatus::Pending);
        assert!(j.error.is_none());
        assert_eq!(j.downloaded_bytes, 77);
    }

    #[test]
    fn serializes_flat_record() {
        let mut j = job();
        j.media = MediaKind::Episode(EpisodeRef {
            series_name: "Show".into(),
            series_id: None,
            season: 1,
            episode: 2,
        });
        let v = serde_json::to_value(&j).unwrap();
        assert_eq!(v["kind"], "episode");
        assert_eq!(v["seriesName"], "Show");
        assert_eq!(v["season"], 1);
        assert_eq!(v["downloadedBytes"], 0);
        assert_eq!(v["status"], "downloading");
    }
}
