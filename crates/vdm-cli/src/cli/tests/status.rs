use vdm_core::store::JobStore;
use vdm_core::{Job, JobStatus, MediaKind, MediaMetadata};

use crate::cli::commands::stored_jobs;

fn job(id: &str, status: JobStatus, created_at: i64) -> Job {
    Job {
        id: id.to_string(),
        name: id.to_string(),
        media: MediaKind::Movie,
        url: format!("http://media.test/{id}.mp4"),
        cover: None,
        local_cover: None,
        metadata: MediaMetadata::default(),
        size: 1000,
        downloaded_bytes: 250,
        progress: 25,
        status,
        file_path: None,
        error: None,
        created_at,
        completed_at: None,
    }
}

#[tokio::test]
async fn listing_leaves_live_downloads_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.db");
    // Rows as a foreground run writes them while it is downloading.
    let runner = JobStore::open_at(&path).await.unwrap();
    runner.upsert_job(&job("movie_live_1", JobStatus::Downloading, 1)).await.unwrap();
    runner.upsert_job(&job("movie_next_2", JobStatus::Pending, 2)).await.unwrap();

    let viewer = JobStore::open_at(&path).await.unwrap();
    let all = stored_jobs(&viewer, None).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["movie_next_2", "movie_live_1"]);
    assert_eq!(all[1].status, JobStatus::Downloading);

    let live = stored_jobs(&viewer, Some(JobStatus::Downloading)).await.unwrap();
    assert_eq!(live.len(), 1);
    assert!(stored_jobs(&viewer, Some(JobStatus::Paused)).await.unwrap().is_empty());

    let on_disk = runner.get_job("movie_live_1").await.unwrap().unwrap();
    assert_eq!(on_disk.status, JobStatus::Downloading);
}
