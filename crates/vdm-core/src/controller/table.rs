//! In-memory job table: the session's source of truth.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;

use crate::control::{AbortKind, AbortToken};
use crate::job::{derive_job_id, Job, JobId, JobStatus};

/// One dispatch of a job to the agent. Results tagged with another attempt
/// number belong to an earlier downloading episode and are dropped.
#[derive(Debug)]
pub(crate) struct Attempt {
    pub id: u64,
    /// No report applied yet; the first one may move progress backwards.
    pub fresh: bool,
    pub last_persist: Option<Instant>,
    /// Shared with the agent for this dispatch.
    pub abort: Arc<AbortToken>,
}

#[derive(Debug, Default)]
pub(crate) struct JobTable {
    pub jobs: HashMap<JobId, Job>,
    /// Pending job ids in admission order.
    pub queue: VecDeque<JobId>,
    pub attempts: HashMap<JobId, Attempt>,
    next_attempt: u64,
}

impl JobTable {
    /// Table from persisted jobs; pending ones are queued oldest first.
    pub fn from_jobs(mut jobs: Vec<Job>) -> Self {
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let queue = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .map(|j| j.id.clone())
            .collect();
        Self {
            jobs: jobs.into_iter().map(|j| (j.id.clone(), j)).collect(),
            queue,
            ..Self::default()
        }
    }

    pub fn downloading_count(&self) -> usize {
        self.jobs
            .values()
            .filter(|j| j.status == JobStatus::Downloading)
            .count()
    }

    pub fn has_outstanding(&self) -> bool {
        self.jobs.values().any(|j| j.status.is_outstanding())
    }

    /// Id for a new job, bumping `created_at` until it is unused.
    pub fn unique_id(&self, kind: &str, name: &str, created_at: &mut i64) -> JobId {
        loop {
            let id = derive_job_id(kind, name, *created_at);
            if !self.jobs.contains_key(&id) {
                return id;
            }
            *created_at += 1;
        }
    }

    /// Open a new attempt; returns its number and abort token.
    pub fn begin_attempt(&mut self, id: &str) -> (u64, Arc<AbortToken>) {
        self.next_attempt += 1;
        let attempt = self.next_attempt;
        let abort = Arc::new(AbortToken::default());
        self.attempts.insert(
            id.to_string(),
            Attempt {
                id: attempt,
                fresh: true,
                last_persist: None,
                abort: Arc::clone(&abort),
            },
        );
        (attempt, abort)
    }

    /// Close the live attempt of `id`, signalling its transfer to stop.
    pub fn abort_attempt(&mut self, id: &str, kind: AbortKind) {
        if let Some(attempt) = self.attempts.remove(id) {
            attempt.abort.request(kind);
        }
    }

    /// The live attempt for `id` when it is numbered `attempt` and the job is
    /// still downloading.
    pub fn current_attempt(&mut self, id: &str, attempt: u64) -> Option<&mut Attempt> {
        let downloading = self
            .jobs
            .get(id)
            .is_some_and(|j| j.status == JobStatus::Downloading);
        self.attempts
            .get_mut(id)
            .filter(|a| downloading && a.id == attempt)
    }

    /// Drop a job from every index and return it. A running transfer is
    /// told to cancel.
    pub fn remove(&mut self, id: &str) -> Option<Job> {
        self.queue.retain(|q| q != id);
        self.abort_attempt(id, AbortKind::Cancel);
        self.jobs.remove(id)
    }

    /// Same-series job that already has a cached cover.
    pub fn series_cover(&self, series_name: &str) -> Option<&Path> {
        self.jobs
            .values()
            .filter(|j| j.series_name() == Some(series_name))
            .find_map(|j| j.local_cover.as_deref())
    }

    pub fn cover_in_use(&self, cover: &Path) -> bool {
        self.jobs
            .values()
            .any(|j| j.local_cover.as_deref() == Some(cover))
    }
}
