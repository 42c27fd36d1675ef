//! Read-only query surface over the job table.

use std::path::PathBuf;

use super::QueueController;
use crate::agent::StorageInfo;
use crate::error::Result;
use crate::job::{EpisodeRef, Job, JobKind, JobStatus};
use crate::view::{group_jobs, newest_first, GroupedView};

impl QueueController {
    pub async fn get(&self, id: &str) -> Option<Job> {
        self.inner.table.lock().await.jobs.get(id).cloned()
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<Job> {
        self.collect(|_| true).await
    }

    pub async fn list_by_status(&self, status: JobStatus) -> Vec<Job> {
        self.collect(|j| j.status == status).await
    }

    /// True when a completed job named `name` of `kind` exists.
    pub async fn is_downloaded(&self, name: &str, kind: JobKind) -> bool {
        self.any(|j| {
            j.status == JobStatus::Completed && j.media.kind() == kind && j.name == name
        })
        .await
    }

    /// True when any job (in any status) exists for this episode.
    pub async fn is_episode_in_queue(&self, series_name: &str, season: u32, episode: u32) -> bool {
        self.any(|j| {
            j.episode()
                .is_some_and(|ep| episode_matches(ep, series_name, Some(season), Some(episode)))
        })
        .await
    }

    /// True when any episode of this season has a job.
    pub async fn is_season_in_queue(&self, series_name: &str, season: u32) -> bool {
        self.any(|j| {
            j.episode()
                .is_some_and(|ep| episode_matches(ep, series_name, Some(season), None))
        })
        .await
    }

    pub async fn is_movie_in_queue(&self, name: &str) -> bool {
        self.any(|j| j.media.is_movie() && j.name == name).await
    }

    /// Local file of a completed job named `name` of `kind`.
    pub async fn offline_file_path(&self, name: &str, kind: JobKind) -> Option<PathBuf> {
        self.completed_path(|j| j.media.kind() == kind && j.name == name)
            .await
    }

    pub async fn offline_episode_path(
        &self,
        series_name: &str,
        season: u32,
        episode: u32,
    ) -> Option<PathBuf> {
        self.completed_path(|j| {
            j.episode()
                .is_some_and(|ep| episode_matches(ep, series_name, Some(season), Some(episode)))
        })
        .await
    }

    /// Movies and the series/season/episode tree, computed from the table.
    pub async fn grouped_view(&self) -> GroupedView {
        let table = self.inner.table.lock().await;
        group_jobs(table.jobs.values())
    }

    pub async fn storage_info(&self) -> Result<StorageInfo> {
        Ok(self.inner.agent.storage_info().await?)
    }

    pub async fn open_storage_folder(&self) -> Result<()> {
        Ok(self.inner.agent.open_storage_folder().await?)
    }

    async fn collect(&self, keep: impl Fn(&Job) -> bool) -> Vec<Job> {
        let table = self.inner.table.lock().await;
        let mut jobs: Vec<Job> = table.jobs.values().filter(|j| keep(*j)).cloned().collect();
        newest_first(&mut jobs);
        jobs
    }

    async fn any(&self, pred: impl Fn(&Job) -> bool) -> bool {
        self.inner.table.lock().await.jobs.values().any(pred)
    }

    async fn completed_path(&self, pred: impl Fn(&Job) -> bool) -> Option<PathBuf> {
        let table = self.inner.table.lock().await;
        table
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Completed && pred(*j))
            .max_by_key(|j| j.completed_at)
            .and_then(|j| j.file_path.clone())
    }
}

fn episode_matches(ep: &EpisodeRef, series_name: &str, season: Option<u32>, episode: Option<u32>) -> bool {
    ep.series_name == series_name
        && season.map_or(true, |s| ep.season == s)
        && episode.map_or(true, |e| ep.episode == e)
}
