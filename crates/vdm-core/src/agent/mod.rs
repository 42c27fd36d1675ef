//! Transfer agent contract.
//!
//! The agent performs the byte-level work (network fetch, disk writes, image
//! caching, storage accounting). The queue controller only starts, pauses and
//! cancels logical jobs through this trait and consumes progress reports.

pub mod curl;

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::control::AbortToken;
use crate::job::{Job, JobId, MediaKind, ProgressUpdate};

pub use self::curl::CurlAgent;

/// Everything the agent needs to run (or clean up after) one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub job_id: JobId,
    pub url: String,
    pub name: String,
    pub media: MediaKind,
    /// Bytes already transferred in earlier attempts. Agents continue from
    /// here when they can and may restart from zero otherwise.
    pub resume_from: u64,
}

impl TransferRequest {
    pub fn for_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            url: job.url.clone(),
            name: job.name.clone(),
            media: job.media.clone(),
            resume_from: job.downloaded_bytes,
        }
    }
}

/// Successful transfer result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub file_path: PathBuf,
    pub size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Stopped on request (pause/cancel) before finishing.
    #[error("transfer aborted")]
    Aborted,
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Disk usage of the download root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub used: u64,
    pub total: u64,
    pub available: u64,
    pub root_path: PathBuf,
}

/// Progress message routed from an agent back to the controller.
#[derive(Debug, Clone)]
pub(crate) struct ProgressMessage {
    pub job_id: JobId,
    pub attempt: u64,
    pub update: ProgressUpdate,
}

/// Handle an agent uses for one transfer attempt: progress goes out through
/// it, and pause/cancel requests come in through its abort token.
///
/// Reporting never blocks; reports are applied by the controller in the order
/// they were sent. Safe to clone and to call from blocking threads.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    job_id: JobId,
    attempt: u64,
    tx: mpsc::UnboundedSender<ProgressMessage>,
    abort: Arc<AbortToken>,
}

impl ProgressSink {
    pub(crate) fn new(
        job_id: JobId,
        attempt: u64,
        tx: mpsc::UnboundedSender<ProgressMessage>,
        abort: Arc<AbortToken>,
    ) -> Self {
        Self {
            job_id,
            attempt,
            tx,
            abort,
        }
    }

    /// A sink whose reports go nowhere (tests, one-off transfers).
    pub fn detached(job_id: impl Into<JobId>) -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self::new(job_id.into(), 0, tx, Arc::new(AbortToken::default()))
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Set when the controller paused or cancelled this attempt, possibly
    /// before the agent started it.
    pub fn abort_token(&self) -> &Arc<AbortToken> {
        &self.abort
    }

    pub fn report(&self, update: ProgressUpdate) {
        // A closed channel means the controller is gone; nothing left to notify.
        let _ = self.tx.send(ProgressMessage {
            job_id: self.job_id.clone(),
            attempt: self.attempt,
            update,
        });
    }
}

#[async_trait]
pub trait TransferAgent: Send + Sync {
    /// Run the transfer to completion. Progress goes through `progress`.
    async fn start(
        &self,
        request: TransferRequest,
        progress: ProgressSink,
    ) -> Result<TransferOutcome, TransferError>;

    /// Stop a running transfer, keeping partial data for a later resume.
    async fn pause(&self, job_id: &str) -> Result<(), TransferError>;

    /// Stop a running transfer (if any) and discard its partial data.
    async fn cancel(&self, request: &TransferRequest) -> Result<(), TransferError>;

    async fn delete_file(&self, path: &Path) -> Result<(), TransferError>;

    /// Remove the storage folder of a whole series.
    async fn delete_folder(&self, series_name: &str) -> Result<(), TransferError>;

    async fn storage_info(&self) -> Result<StorageInfo, TransferError>;

    async fn open_storage_folder(&self) -> Result<(), TransferError>;

    /// Cache the image at `url` under `key`; returns the local path.
    async fn cache_image(&self, url: &str, key: &str) -> Result<PathBuf, TransferError>;
}
