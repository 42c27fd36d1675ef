//! `vdm add movie|episode` – queue a download and run it in the foreground.

use anyhow::Result;
use vdm_core::{DownloadRequest, EpisodeRef, MediaMetadata, QueueController};

use super::run::run_foreground;
use crate::cli::{AddCommand, MetadataArgs};

fn metadata(meta: &MetadataArgs) -> MediaMetadata {
    MediaMetadata {
        plot: meta.plot.clone(),
        rating: meta.rating,
        year: meta.year,
        genres: meta.genres.clone(),
        duration_secs: meta.duration,
    }
}

fn with_meta(request: DownloadRequest, meta: &MetadataArgs) -> DownloadRequest {
    let request = request.with_metadata(metadata(meta));
    match &meta.cover {
        Some(cover) => request.with_cover(cover.as_str()),
        None => request,
    }
}

pub async fn run_add(ctrl: &QueueController, add: AddCommand) -> Result<()> {
    let request = match add {
        AddCommand::Movie { url, name, meta } => {
            if ctrl.is_movie_in_queue(&name).await {
                println!("{name} is already queued or downloaded.");
                return Ok(());
            }
            with_meta(DownloadRequest::movie(url, name), &meta)
        }
        AddCommand::Episode {
            url,
            name,
            series,
            series_id,
            season,
            episode,
            meta,
        } => {
            if ctrl.is_episode_in_queue(&series, season, episode).await {
                println!("{series} S{season:02}E{episode:02} is already queued or downloaded.");
                return Ok(());
            }
            let ep = EpisodeRef {
                series_name: series,
                series_id,
                season,
                episode,
            };
            with_meta(DownloadRequest::episode(url, name, ep), &meta)
        }
    };

    let job = ctrl.enqueue(request).await?;
    println!("Added job {}", job.id);
    run_foreground(ctrl).await
}
