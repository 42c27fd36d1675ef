//! Agent callbacks: progress reports and terminal results.

use std::sync::Arc;
use tokio::time::Instant;

use super::QueueController;
use crate::agent::{ProgressMessage, ProgressSink, TransferError, TransferOutcome, TransferRequest};
use crate::control::AbortToken;
use crate::events::DownloadEvent;
use crate::job::{unix_millis, JobStatus};

impl QueueController {
    pub(super) fn spawn_transfer(
        &self,
        request: TransferRequest,
        attempt: u64,
        abort: Arc<AbortToken>,
    ) {
        let controller = self.clone();
        let sink = ProgressSink::new(
            request.job_id.clone(),
            attempt,
            self.inner.progress_tx.clone(),
            abort,
        );
        tokio::spawn(async move {
            let id = request.job_id.clone();
            let result = controller.inner.agent.start(request, sink).await;
            controller.finish_transfer(&id, attempt, result).await;
        });
    }

    /// Apply one progress report if it belongs to the job's live attempt.
    pub(super) async fn apply_progress(&self, msg: ProgressMessage) {
        let mut table = self.inner.table.lock().await;
        let Some(attempt) = table.current_attempt(&msg.job_id, msg.attempt) else {
            tracing::trace!(job_id = %msg.job_id, attempt = msg.attempt, "stale progress ignored");
            return;
        };
        let allow_regress = attempt.fresh;
        let persist_due = attempt
            .last_persist
            .map_or(true, |t| t.elapsed() >= self.inner.config.progress_persist_interval);

        let Some(job) = table.jobs.get_mut(&msg.job_id) else {
            return;
        };
        if !job.record_progress(&msg.update, allow_regress) {
            tracing::trace!(job_id = %msg.job_id, "out-of-order progress ignored");
            return;
        }
        let job = job.clone();
        if let Some(attempt) = table.attempts.get_mut(&msg.job_id) {
            attempt.fresh = false;
            if persist_due {
                attempt.last_persist = Some(Instant::now());
            }
        }
        if persist_due {
            self.persist_logged(&job).await;
        }
        self.publish(DownloadEvent::Progress(job));
    }

    /// Record the agent's terminal result, then dispatch the next job.
    pub(super) async fn finish_transfer(
        &self,
        id: &str,
        attempt: u64,
        result: Result<TransferOutcome, TransferError>,
    ) {
        {
            let mut table = self.inner.table.lock().await;
            if table.current_attempt(id, attempt).is_none() {
                tracing::debug!(job_id = %id, attempt, "result for stale attempt ignored");
                return;
            }
            table.attempts.remove(id);
            let Some(job) = table.jobs.get_mut(id) else {
                return;
            };

            let event = match result {
                Ok(outcome) => {
                    if let Err(e) = job.complete(outcome.file_path, outcome.size, unix_millis()) {
                        tracing::warn!(job_id = %id, error = %e, "cannot complete job");
                        return;
                    }
                    tracing::info!(job_id = %id, size = job.size, "job completed");
                    DownloadEvent::Completed(job.clone())
                }
                Err(TransferError::Aborted) => {
                    if let Err(e) = job.transition(JobStatus::Paused) {
                        tracing::warn!(job_id = %id, error = %e, "cannot pause job");
                        return;
                    }
                    tracing::info!(job_id = %id, "transfer stopped by agent; job paused");
                    DownloadEvent::Paused(job.clone())
                }
                Err(e) => {
                    let message = e.to_string();
                    if let Err(e) = job.fail(message.clone()) {
                        tracing::warn!(job_id = %id, error = %e, "cannot fail job");
                        return;
                    }
                    tracing::warn!(job_id = %id, error = %message, "job failed");
                    DownloadEvent::Error(job.clone())
                }
            };
            self.persist_logged(event.job()).await;
            self.publish(event);
        }
        self.dispatch().await;
    }
}
