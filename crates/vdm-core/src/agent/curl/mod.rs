//! Bundled transfer agent: curl easy transfers on tokio blocking threads.
//!
//! Files are laid out under a library root (see `layout`). Each transfer
//! writes to `<final>.part` and is renamed into place on success.

mod layout;
mod transfer;
mod usage;
mod writer;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::{
    ProgressSink, StorageInfo, TransferAgent, TransferError, TransferOutcome, TransferRequest,
};
use crate::config::{TransferConfig, VdmConfig};
use crate::control::{AbortKind, AbortRegistry, AbortToken};
use crate::job::{percent_of, ProgressUpdate};

pub use layout::{extension_from_url, sanitize_component, temp_path, LibraryLayout};
use transfer::{fetch_to_file, FetchOptions};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub struct CurlAgent {
    layout: LibraryLayout,
    options: FetchOptions,
    aborts: Arc<AbortRegistry>,
}

impl CurlAgent {
    pub fn new(root: impl Into<PathBuf>, transfer: &TransferConfig) -> Self {
        Self {
            layout: LibraryLayout::new(root),
            options: FetchOptions::from(transfer),
            aborts: Arc::new(AbortRegistry::new()),
        }
    }

    pub fn from_config(cfg: &VdmConfig) -> anyhow::Result<Self> {
        Ok(Self::new(cfg.resolve_download_dir()?, &cfg.transfer_config()))
    }

    pub fn layout(&self) -> &LibraryLayout {
        &self.layout
    }

    async fn fetch(
        &self,
        url: &str,
        temp: PathBuf,
        resume_from: u64,
        token: Arc<AbortToken>,
        progress: Option<ProgressSink>,
    ) -> Result<u64, TransferError> {
        let url = url.to_string();
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || {
            let mut throttle = progress.map(ProgressThrottle::new);
            fetch_to_file(&url, &temp, resume_from, &options, &token, |done, total| {
                if let Some(t) = throttle.as_mut() {
                    t.observe(done, total);
                }
            })
        })
        .await
        .map_err(|e| TransferError::Failed(format!("transfer task: {}", e)))?
    }
}

/// Forwards progress on whole-percent changes or every `PROGRESS_INTERVAL`.
struct ProgressThrottle {
    sink: ProgressSink,
    last_pct: Option<u8>,
    last_at: Instant,
}

impl ProgressThrottle {
    fn new(sink: ProgressSink) -> Self {
        Self {
            sink,
            last_pct: None,
            last_at: Instant::now(),
        }
    }

    fn observe(&mut self, done: u64, total: u64) {
        let pct = percent_of(done, total);
        if self.last_pct == Some(pct) && self.last_at.elapsed() < PROGRESS_INTERVAL {
            return;
        }
        self.last_pct = Some(pct);
        self.last_at = Instant::now();
        self.sink.report(ProgressUpdate {
            progress: pct,
            downloaded_bytes: done,
            total_bytes: total,
        });
    }
}

async fn remove_file_if_exists(path: &Path) -> Result<(), TransferError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "deleted file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl TransferAgent for CurlAgent {
    async fn start(
        &self,
        request: TransferRequest,
        progress: ProgressSink,
    ) -> Result<TransferOutcome, TransferError> {
        let final_path = self.layout.final_path(&request);
        let temp = temp_path(&final_path);
        let token = Arc::clone(progress.abort_token());
        self.aborts.register(&request.job_id, &token);
        if token.is_aborted() {
            self.aborts.unregister(&request.job_id, &token);
            tracing::debug!(job_id = %request.job_id, "transfer stopped before it started");
            if token.requested() == Some(AbortKind::Cancel) {
                remove_file_if_exists(&temp).await?;
            }
            return Err(TransferError::Aborted);
        }
        if let Some(parent) = final_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                self.aborts.unregister(&request.job_id, &token);
                return Err(e.into());
            }
        }

        tracing::info!(job_id = %request.job_id, path = %final_path.display(), "transfer starting");
        let result = self
            .fetch(
                &request.url,
                temp.clone(),
                request.resume_from,
                Arc::clone(&token),
                Some(progress),
            )
            .await;
        self.aborts.unregister(&request.job_id, &token);

        if token.requested() == Some(AbortKind::Cancel) {
            remove_file_if_exists(&temp).await?;
            return Err(TransferError::Aborted);
        }
        let size = result?;
        tokio::fs::rename(&temp, &final_path).await?;
        tracing::info!(job_id = %request.job_id, size, "transfer finished");
        Ok(TransferOutcome {
            file_path: final_path,
            size,
        })
    }

    async fn pause(&self, job_id: &str) -> Result<(), TransferError> {
        if !self.aborts.request_abort(job_id, AbortKind::Pause) {
            tracing::debug!(job_id, "pause: no running transfer");
        }
        Ok(())
    }

    async fn cancel(&self, request: &TransferRequest) -> Result<(), TransferError> {
        if self.aborts.request_abort(&request.job_id, AbortKind::Cancel) {
            // The running transfer removes its own partial file on exit.
            return Ok(());
        }
        let temp = temp_path(&self.layout.final_path(request));
        remove_file_if_exists(&temp).await
    }

    async fn delete_file(&self, path: &Path) -> Result<(), TransferError> {
        remove_file_if_exists(path).await
    }

    async fn delete_folder(&self, series_name: &str) -> Result<(), TransferError> {
        let dir = self.layout.series_dir(series_name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(path = %dir.display(), "deleted series folder");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn storage_info(&self) -> Result<StorageInfo, TransferError> {
        let root = self.layout.root().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        let info = tokio::task::spawn_blocking(move || usage::storage_info(&root))
            .await
            .map_err(|e| TransferError::Failed(format!("storage scan: {}", e)))??;
        Ok(info)
    }

    async fn open_storage_folder(&self) -> Result<(), TransferError> {
        let root = self.layout.root();
        tokio::fs::create_dir_all(root).await?;
        std::process::Command::new("xdg-open").arg(root).spawn()?;
        Ok(())
    }

    async fn cache_image(&self, url: &str, key: &str) -> Result<PathBuf, TransferError> {
        let path = self.layout.cover_path(url, key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = temp_path(&path);
        let token = Arc::new(AbortToken::default());
        if let Err(e) = self.fetch(url, temp.clone(), 0, token, None).await {
            let _ = remove_file_if_exists(&temp).await;
            return Err(e);
        }
        tokio::fs::rename(&temp, &path).await?;
        tracing::debug!(key, path = %path.display(), "cached cover image");
        Ok(path)
    }
}
