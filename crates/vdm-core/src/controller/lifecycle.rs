//! Caller-facing lifecycle operations: enqueue, pause, resume, cancel, delete.
//!
//! Operations that do not apply to the job's current status are no-ops and
//! return `Ok(false)`.

use std::path::PathBuf;

use super::QueueController;
use crate::agent::TransferRequest;
use crate::control::AbortKind;
use crate::error::{ControllerError, Result};
use crate::events::DownloadEvent;
use crate::job::{unix_millis, DownloadRequest, Job, JobStatus};

impl QueueController {
    /// Create a pending job, persist it, queue it and run a dispatch pass.
    ///
    /// Returns the job as admitted (still pending). Duplicate requests are not
    /// detected here; see the `is_*_in_queue` queries. If the store write fails
    /// the job is not admitted.
    pub async fn enqueue(&self, request: DownloadRequest) -> Result<Job> {
        request.validate().map_err(ControllerError::InvalidRequest)?;

        let job = {
            let (mut table, local_cover) = loop {
                let local_cover = self.resolve_cover(&request).await;
                let table = self.inner.table.lock().await;
                // The cover may have been released while it was being resolved.
                if let Some(path) = &local_cover {
                    if !table.cover_in_use(path)
                        && !self.inner.artwork.holds(&request.artwork_key(), path)
                    {
                        tracing::debug!(path = %path.display(), "cover released meanwhile; resolving again");
                        continue;
                    }
                }
                break (table, local_cover);
            };
            let mut created_at = unix_millis();
            let id = table.unique_id(request.media.as_str(), &request.name, &mut created_at);
            let job = Job {
                id,
                name: request.name,
                media: request.media,
                url: request.url,
                cover: request.cover,
                local_cover,
                metadata: request.metadata,
                size: 0,
                downloaded_bytes: 0,
                progress: 0,
                status: JobStatus::Pending,
                file_path: None,
                error: None,
                created_at,
                completed_at: None,
            };
            self.persist(&job).await?;
            table.jobs.insert(job.id.clone(), job.clone());
            table.queue.push_back(job.id.clone());
            tracing::info!(job_id = %job.id, kind = job.kind_str(), "job added");
            self.publish(DownloadEvent::Added(job.clone()));
            job
        };

        self.dispatch().await;
        Ok(job)
    }

    /// Cached cover for a new job. Episodes reuse a cover another job of the
    /// same series already holds; otherwise the artwork cache fetches it.
    /// Failures leave the job with its remote cover URL only.
    async fn resolve_cover(&self, request: &DownloadRequest) -> Option<PathBuf> {
        let url = request.cover.as_deref()?;
        if let Some(series) = request.media.series_name() {
            let table = self.inner.table.lock().await;
            if let Some(path) = table.series_cover(series) {
                return Some(path.to_path_buf());
            }
        }
        let key = request.artwork_key();
        match self
            .inner
            .artwork
            .resolve(self.inner.agent.as_ref(), url, &key)
            .await
        {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cover caching failed; using remote url");
                None
            }
        }
    }

    /// Pause a downloading job. The job flips to paused immediately; the agent
    /// is then asked to stop and keeps its partial data. The freed slot goes to
    /// the next pending job.
    pub async fn pause(&self, id: &str) -> Result<bool> {
        let paused = self.pause_job(id).await;
        self.dispatch().await;
        paused
    }

    /// Pause every downloading job without starting pending ones, e.g. before
    /// the process exits. Returns how many were paused.
    pub async fn pause_all(&self) -> Result<usize> {
        let ids: Vec<String> = {
            let table = self.inner.table.lock().await;
            table
                .jobs
                .values()
                .filter(|j| j.status == JobStatus::Downloading)
                .map(|j| j.id.clone())
                .collect()
        };
        let mut paused = 0;
        let mut first_err = None;
        for id in ids {
            match self.pause_job(&id).await {
                Ok(true) => paused += 1,
                Ok(false) => {}
                Err(e) => {
                    paused += 1;
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(paused),
        }
    }

    async fn pause_job(&self, id: &str) -> Result<bool> {
        let persisted = {
            let mut table = self.inner.table.lock().await;
            let Some(job) = table.jobs.get_mut(id) else {
                return Ok(false);
            };
            if job.status != JobStatus::Downloading {
                return Ok(false);
            }
            job.transition(JobStatus::Paused)?;
            let job = job.clone();
            table.abort_attempt(id, AbortKind::Pause);
            let persisted = self.persist(&job).await;
            tracing::info!(job_id = %id, "job paused");
            self.publish(DownloadEvent::Paused(job));
            persisted
        };

        if let Err(e) = self.inner.agent.pause(id).await {
            tracing::warn!(job_id = %id, error = %e, "agent pause failed");
        }
        persisted.map(|()| true)
    }

    /// Re-admit a paused or failed job at the back of the queue. The error is
    /// cleared and `downloaded_bytes` kept for the agent to interpret.
    pub async fn resume(&self, id: &str) -> Result<bool> {
        {
            let mut table = self.inner.table.lock().await;
            let Some(job) = table.jobs.get_mut(id) else {
                return Ok(false);
            };
            if !matches!(job.status, JobStatus::Paused | JobStatus::Failed) {
                return Ok(false);
            }
            job.requeue()?;
            let job = job.clone();
            table.queue.push_back(job.id.clone());
            tracing::info!(job_id = %id, resume_from = job.downloaded_bytes, "job requeued");
            if let Err(e) = self.persist(&job).await {
                drop(table);
                self.dispatch().await;
                return Err(e);
            }
        }
        self.dispatch().await;
        Ok(true)
    }

    /// Abort a job that has not completed, discard its partial data and
    /// forget it. Completed jobs are left alone (use [`delete`](Self::delete)).
    pub async fn cancel(&self, id: &str) -> Result<bool> {
        let (job, removed) = {
            let mut table = self.inner.table.lock().await;
            if table
                .jobs
                .get(id)
                .map_or(true, |j| j.status == JobStatus::Completed)
            {
                return Ok(false);
            }
            let Some(job) = table.remove(id) else {
                return Ok(false);
            };
            let removed = self.inner.store.remove_job(id).await;
            tracing::info!(job_id = %id, "job cancelled");
            self.publish(DownloadEvent::Cancelled(job.clone()));
            (job, removed)
        };

        if let Err(e) = self.inner.agent.cancel(&TransferRequest::for_job(&job)).await {
            tracing::warn!(job_id = %id, error = %e, "agent cancel failed");
        }
        self.release_cover(&job).await;
        self.dispatch().await;
        removed.map(|()| true).map_err(ControllerError::Store)
    }

    /// Remove a job in any status. Running or partial transfers are cancelled;
    /// a completed job's file is deleted.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let (job, removed) = {
            let mut table = self.inner.table.lock().await;
            let Some(job) = table.remove(id) else {
                return Ok(false);
            };
            let removed = self.inner.store.remove_job(id).await;
            tracing::info!(job_id = %id, status = %job.status, "job deleted");
            self.publish(DownloadEvent::Deleted(job.clone()));
            (job, removed)
        };

        let cleanup = match (&job.status, &job.file_path) {
            (JobStatus::Completed, Some(path)) => self.inner.agent.delete_file(path).await,
            _ => self.inner.agent.cancel(&TransferRequest::for_job(&job)).await,
        };
        if let Err(e) = cleanup {
            tracing::warn!(job_id = %id, error = %e, "file cleanup failed");
        }
        self.release_cover(&job).await;
        self.dispatch().await;
        removed.map(|()| true).map_err(ControllerError::Store)
    }

    /// Delete every episode of `series_name`, then the series folder.
    /// Returns how many jobs were removed.
    pub async fn delete_series(&self, series_name: &str) -> Result<usize> {
        let ids: Vec<String> = {
            let table = self.inner.table.lock().await;
            table
                .jobs
                .values()
                .filter(|j| j.series_name() == Some(series_name))
                .map(|j| j.id.clone())
                .collect()
        };

        let mut removed = 0;
        let mut first_err = None;
        for id in &ids {
            match self.delete(id).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    removed += 1;
                    first_err.get_or_insert(e);
                }
            }
        }
        if let Err(e) = self.inner.agent.delete_folder(series_name).await {
            tracing::warn!(series = series_name, error = %e, "series folder cleanup failed");
        }
        tracing::info!(series = series_name, count = removed, "series deleted");
        match first_err {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Delete a removed job's cached cover once no other job references it.
    async fn release_cover(&self, job: &Job) {
        let Some(cover) = &job.local_cover else {
            return;
        };
        let slot = self.inner.artwork.slot(&job.artwork_key());
        let mut cached = slot.lock().await;
        if self.inner.table.lock().await.cover_in_use(cover) {
            return;
        }
        *cached = None;
        if let Err(e) = self.inner.agent.delete_file(cover).await {
            tracing::warn!(path = %cover.display(), error = %e, "cover cleanup failed");
        }
    }

    /// Promote pending jobs to downloading, oldest first, while fewer than
    /// `max_concurrent` jobs are downloading, and hand each to the agent.
    pub(crate) async fn dispatch(&self) {
        let mut started = Vec::new();
        {
            let mut table = self.inner.table.lock().await;
            while table.downloading_count() < self.inner.config.max_concurrent {
                let Some(id) = table.queue.pop_front() else {
                    break;
                };
                let Some(job) = table.jobs.get_mut(&id) else {
                    continue;
                };
                if job.status != JobStatus::Pending {
                    continue;
                }
                if let Err(e) = job.transition(JobStatus::Downloading) {
                    tracing::warn!(job_id = %id, error = %e, "cannot dispatch");
                    continue;
                }
                let job = job.clone();
                let (attempt, abort) = table.begin_attempt(&id);
                self.persist_logged(&job).await;
                tracing::info!(job_id = %id, attempt, "job started");
                self.publish(DownloadEvent::Started(job.clone()));
                started.push((TransferRequest::for_job(&job), attempt, abort));
            }
        }
        for (request, attempt, abort) in started {
            self.spawn_transfer(request, attempt, abort);
        }
    }
}
