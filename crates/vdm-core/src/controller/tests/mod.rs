mod mock;

use std::sync::Arc;
use std::time::Duration;

use super::{ControllerConfig, QueueController};
use crate::job::{DownloadRequest, EpisodeRef, Job, JobStatus};
use crate::store::{open_memory, JobStore};

use mock::MockAgent;

fn config(max_concurrent: usize) -> ControllerConfig {
    ControllerConfig {
        max_concurrent,
        progress_persist_interval: Duration::ZERO,
    }
}

async fn setup(max_concurrent: usize) -> (QueueController, Arc<MockAgent>, JobStore) {
    let store = open_memory().await.unwrap();
    let agent = Arc::new(MockAgent::default());
    let ctrl = QueueController::load(store.clone(), agent.clone(), config(max_concurrent))
        .await
        .unwrap();
    (ctrl, agent, store)
}

fn movie(name: &str) -> DownloadRequest {
    DownloadRequest::movie(format!("http://media.test/{name}.mp4"), name)
}

fn episode(series: &str, season: u32, ep: u32) -> DownloadRequest {
    DownloadRequest::episode(
        format!("http://media.test/{series}/{season}/{ep}.mkv"),
        format!("{series} S{season}E{ep}"),
        EpisodeRef {
            series_name: series.to_string(),
            series_id: None,
            season,
            episode: ep,
        },
    )
    .with_cover(format!("http://img.test/{series}.jpg"))
}

/// Poll until `job_id` reaches `status` (or panic after 2s).
async fn wait_status(ctrl: &QueueController, job_id: &str, status: JobStatus) -> Job {
    for _ in 0..400 {
        if let Some(job) = ctrl.get(job_id).await {
            if job.status == status {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_id} never reached {status}: {:?}", ctrl.get(job_id).await);
}

/// Poll until `cond` holds (or panic after 2s).
async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

fn downloading(jobs: &[Job]) -> usize {
    jobs.iter().filter(|j| j.status == JobStatus::Downloading).count()
}
