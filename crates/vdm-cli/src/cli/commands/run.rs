//! `vdm run` – drive the queue in the foreground until it is idle.
//!
//! While running, the control socket accepts pause/resume/cancel/delete from
//! other `vdm` invocations. Ctrl-C pauses the active downloads and exits;
//! `vdm resume <id>` or `vdm run` continues them later.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use vdm_core::{DownloadEvent, Job, JobStatus, QueueController};

use crate::cli::control_socket;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run_foreground(ctrl: &QueueController) -> Result<()> {
    let socket = control_socket::spawn_control_listener(ctrl.clone())?;
    let mut events = ctrl.subscribe();
    let mut printer = EventPrinter::default();

    ctrl.start_queue().await;
    let idle = ctrl.wait_until_idle();
    tokio::pin!(idle);
    loop {
        tokio::select! {
            Some(event) = events.recv() => printer.print(&event),
            _ = &mut idle => break,
            res = tokio::signal::ctrl_c() => {
                res.context("listen for ctrl-c")?;
                let paused = ctrl.pause_all().await?;
                println!("\nInterrupted: paused {paused} download(s).");
                break;
            }
        }
    }
    while let Ok(event) = events.try_recv() {
        printer.print(&event);
    }
    if let Some(socket) = socket {
        socket.shutdown();
    }

    let completed = ctrl.list_by_status(JobStatus::Completed).await.len();
    let failed = ctrl.list_by_status(JobStatus::Failed).await.len();
    let paused = ctrl.list_by_status(JobStatus::Paused).await.len();
    let pending = ctrl.list_by_status(JobStatus::Pending).await.len();
    println!("{completed} completed, {failed} failed, {paused} paused, {pending} pending.");
    tracing::info!(completed, failed, paused, pending, "foreground run finished");
    Ok(())
}

/// Prints lifecycle events; progress at most every `PROGRESS_INTERVAL` per job.
#[derive(Default)]
struct EventPrinter {
    last_progress: HashMap<String, Instant>,
}

impl EventPrinter {
    fn print(&mut self, event: &DownloadEvent) {
        let job = event.job();
        match event {
            DownloadEvent::Progress(_) => {
                let now = Instant::now();
                if let Some(last) = self.last_progress.get(&job.id) {
                    if now.duration_since(*last) < PROGRESS_INTERVAL {
                        return;
                    }
                }
                self.last_progress.insert(job.id.clone(), now);
                println!("  {}  {}", label(job), progress_line(job));
            }
            DownloadEvent::Completed(_) => {
                self.last_progress.remove(&job.id);
                let path = job
                    .file_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("[completed] {} -> {}", label(job), path);
            }
            DownloadEvent::Error(_) => {
                self.last_progress.remove(&job.id);
                println!(
                    "[error]     {}: {}",
                    label(job),
                    job.error.as_deref().unwrap_or("unknown error")
                );
            }
            other => println!("[{:<9}] {} ({})", other.name(), label(job), job.id),
        }
    }
}

fn label(job: &Job) -> String {
    match job.episode() {
        Some(ep) => format!(
            "{} S{:02}E{:02} {}",
            ep.series_name, ep.season, ep.episode, job.name
        ),
        None => job.name.clone(),
    }
}

pub(crate) fn mib(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}

pub(crate) fn progress_line(job: &Job) -> String {
    if job.size > 0 {
        format!(
            "{:>3}%  {:.1} / {:.1} MiB",
            job.progress,
            mib(job.downloaded_bytes),
            mib(job.size)
        )
    } else {
        format!("{:>3}%  {:.1} MiB", job.progress, mib(job.downloaded_bytes))
    }
}
