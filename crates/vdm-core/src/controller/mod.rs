//! Queue controller: owns the job table, enforces the concurrency cap,
//! dispatches pending jobs to the transfer agent and drives persistence.
//!
//! The table lives behind one async mutex. Each mutation, its store write and
//! the matching event happen while the lock is held, so callers and agent
//! callbacks observe jobs change one step at a time. Agent calls that may be
//! slow (starting a transfer, caching artwork) run outside the lock.

mod artwork;
mod lifecycle;
mod queries;
mod table;
mod transfer;

#[cfg(test)]
mod tests;

use anyhow::Context;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use crate::agent::{ProgressMessage, TransferAgent};
use crate::config::VdmConfig;
use crate::error::{ControllerError, Result};
use crate::events::{DownloadEvent, EventBus, EventReceiver};
use crate::job::Job;
use crate::store::JobStore;

use artwork::ArtworkCache;
use table::JobTable;

/// Controller tuning, usually taken from `VdmConfig`.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Maximum jobs in the downloading state at once (0 is treated as 1).
    pub max_concurrent: usize,
    /// Minimum interval between progress writes to the store, per job.
    pub progress_persist_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&VdmConfig::default())
    }
}

impl From<&VdmConfig> for ControllerConfig {
    fn from(cfg: &VdmConfig) -> Self {
        Self {
            max_concurrent: cfg.effective_max_concurrent(),
            progress_persist_interval: cfg.progress_persist_interval(),
        }
    }
}

/// Handle to the download queue. Cheap to clone; all clones share one table.
#[derive(Clone)]
pub struct QueueController {
    inner: Arc<Inner>,
}

struct Inner {
    store: JobStore,
    agent: Arc<dyn TransferAgent>,
    events: EventBus,
    artwork: ArtworkCache,
    config: ControllerConfig,
    table: Mutex<JobTable>,
    progress_tx: mpsc::UnboundedSender<ProgressMessage>,
}

impl QueueController {
    /// Load jobs from `store` and build the controller.
    ///
    /// Jobs persisted as downloading are reclassified to paused first. Pending
    /// jobs are queued oldest first but nothing is dispatched until
    /// [`start_queue`](Self::start_queue) or the next mutating call.
    pub async fn load(
        store: JobStore,
        agent: Arc<dyn TransferAgent>,
        config: ControllerConfig,
    ) -> anyhow::Result<Self> {
        let recovered = store
            .recover_interrupted_jobs()
            .await
            .context("recover interrupted jobs")?;
        if recovered > 0 {
            tracing::info!(count = recovered, "interrupted downloads marked paused");
        }
        let jobs = store.load_jobs().await.context("load jobs")?;
        tracing::debug!(count = jobs.len(), "job table loaded");

        let config = ControllerConfig {
            max_concurrent: config.max_concurrent.max(1),
            ..config
        };
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            store,
            agent,
            events: EventBus::new(),
            artwork: ArtworkCache::default(),
            config,
            table: Mutex::new(JobTable::from_jobs(jobs)),
            progress_tx,
        });
        tokio::spawn(progress_pump(Arc::downgrade(&inner), progress_rx));
        Ok(Self { inner })
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.events.subscribe()
    }

    /// Dispatch pending jobs up to the concurrency cap.
    pub async fn start_queue(&self) {
        self.dispatch().await;
    }

    /// Resolves once no job is pending or downloading.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe();
        loop {
            if !self.inner.table.lock().await.has_outstanding() {
                return;
            }
            if rx.recv().await.is_none() {
                return;
            }
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    fn publish(&self, event: DownloadEvent) {
        self.inner.events.publish(event);
    }

    /// Write one job through to the store.
    async fn persist(&self, job: &Job) -> Result<()> {
        self.inner
            .store
            .upsert_job(job)
            .await
            .map_err(ControllerError::Store)
    }

    /// Persist on internal paths where no caller can receive the error.
    async fn persist_logged(&self, job: &Job) {
        if let Err(e) = self.persist(job).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to persist job");
        }
    }
}

/// Applies progress reports in arrival order. Ends when the controller is gone.
async fn progress_pump(inner: Weak<Inner>, mut rx: mpsc::UnboundedReceiver<ProgressMessage>) {
    while let Some(msg) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        QueueController { inner }.apply_progress(msg).await;
    }
}
