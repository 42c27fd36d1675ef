//! `vdm status`, `vdm tree`, `vdm storage`, `vdm open-storage`.
//!
//! These only read. They never load a queue controller, so a foreground `vdm`
//! keeps sole ownership of the job store while they run beside it.

use anyhow::Result;
use vdm_core::config::VdmConfig;
use vdm_core::store::JobStore;
use vdm_core::view::{group_jobs, newest_first};
use vdm_core::{CurlAgent, Job, JobStatus, TransferAgent};

use super::run::{mib, progress_line};

/// Jobs exactly as persisted, newest first, optionally filtered by status.
pub(crate) async fn stored_jobs(store: &JobStore, status: Option<JobStatus>) -> Result<Vec<Job>> {
    let mut jobs = store.load_jobs().await?;
    if let Some(s) = status {
        jobs.retain(|j| j.status == s);
    }
    newest_first(&mut jobs);
    Ok(jobs)
}

pub async fn run_status(status: Option<JobStatus>, json: bool) -> Result<()> {
    let store = JobStore::open_default().await?;
    let jobs = stored_jobs(&store, status).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }
    if jobs.is_empty() {
        println!("No jobs.");
        return Ok(());
    }
    println!("{:<40} {:<12} {:<24} {}", "ID", "STATUS", "PROGRESS", "NAME");
    for j in jobs {
        println!(
            "{:<40} {:<12} {:<24} {}",
            j.id,
            j.status.as_str(),
            progress_line(&j),
            j.name
        );
        if let Some(err) = &j.error {
            println!("{:<40} error: {}", "", err);
        }
    }
    Ok(())
}

fn tree_entry(job: &Job) -> String {
    format!("{} [{} {}%]", job.name, job.status, job.progress)
}

pub async fn run_tree(json: bool) -> Result<()> {
    let store = JobStore::open_default().await?;
    let jobs = stored_jobs(&store, None).await?;
    let view = group_jobs(&jobs);
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    if view.movies.is_empty() && view.series.is_empty() {
        println!("No downloads.");
        return Ok(());
    }
    if !view.movies.is_empty() {
        println!("Movies");
        for movie in &view.movies {
            println!("  {}", tree_entry(movie));
        }
    }
    if !view.series.is_empty() {
        println!("Series");
        for series in &view.series {
            println!("  {} ({} episodes)", series.series_name, series.episode_count);
            for season in &series.seasons {
                println!("    Season {}", season.season);
                for ep in &season.episodes {
                    let n = ep.episode().map_or(0, |e| e.episode);
                    println!("      E{:02} {}", n, tree_entry(ep));
                }
            }
        }
    }
    Ok(())
}

pub async fn run_storage(cfg: &VdmConfig, json: bool) -> Result<()> {
    let info = CurlAgent::from_config(cfg)?.storage_info().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("Folder:    {}", info.root_path.display());
    println!("Used:      {:.1} MiB", mib(info.used));
    println!("Available: {:.1} MiB", mib(info.available));
    println!("Total:     {:.1} MiB", mib(info.total));
    Ok(())
}

pub async fn run_open_storage(cfg: &VdmConfig) -> Result<()> {
    CurlAgent::from_config(cfg)?.open_storage_folder().await?;
    Ok(())
}
