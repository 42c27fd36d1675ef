//! Job read operations.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::PathBuf;

use crate::job::{EpisodeRef, Job, JobStatus, MediaKind, MediaMetadata};
use crate::store::JobStore;

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, name, kind, url, cover, local_cover, size, downloaded_bytes,
        status, progress, file_path, error, created_at, completed_at,
        series_name, series_id, season, episode,
        plot, rating, year, genres_json, duration_secs
    FROM jobs
"#;

impl JobStore {
    /// Load every job, oldest first (admission order).
    pub async fn load_jobs(&self) -> Result<Vec<Job>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_job).collect()
    }

    /// Fetch a single job by id.
    pub async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_job).transpose()
    }
}

fn to_u32(v: Option<i64>) -> Option<u32> {
    v.and_then(|n| u32::try_from(n).ok())
}

fn row_to_job(row: &SqliteRow) -> Result<Job> {
    let id: String = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;

    let media = match kind.as_str() {
        "episode" => {
            let series_name: Option<String> = row.try_get("series_name")?;
            let season = to_u32(row.try_get("season")?);
            let episode = to_u32(row.try_get("episode")?);
            match (series_name, season, episode) {
                (Some(series_name), Some(season), Some(episode)) => {
                    MediaKind::Episode(EpisodeRef {
                        series_name,
                        series_id: row.try_get("series_id")?,
                        season,
                        episode,
                    })
                }
                _ => anyhow::bail!("episode job {} lacks series linkage", id),
            }
        }
        "movie" => MediaKind::Movie,
        other => anyhow::bail!("job {} has unknown kind {:?}", id, other),
    };

    let genres_json: Option<String> = row.try_get("genres_json")?;
    let genres = genres_json
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(serde_json::from_str::<Vec<String>>)
        .transpose()
        .with_context(|| format!("job {} genres", id))?
        .unwrap_or_default();

    let status: String = row.try_get("status")?;
    let progress: i64 = row.try_get("progress")?;
    let size: i64 = row.try_get("size")?;
    let downloaded: i64 = row.try_get("downloaded_bytes")?;
    let duration: Option<i64> = row.try_get("duration_secs")?;

    Ok(Job {
        name: row.try_get("name")?,
        media,
        url: row.try_get("url")?,
        cover: row.try_get("cover")?,
        local_cover: row
            .try_get::<Option<String>, _>("local_cover")?
            .map(PathBuf::from),
        metadata: MediaMetadata {
            plot: row.try_get("plot")?,
            rating: row.try_get("rating")?,
            year: to_u32(row.try_get("year")?),
            genres,
            duration_secs: duration.and_then(|d| u64::try_from(d).ok()),
        },
        size: size.max(0) as u64,
        downloaded_bytes: downloaded.max(0) as u64,
        progress: progress.clamp(0, 100) as u8,
        status: JobStatus::from_str(&status),
        file_path: row
            .try_get::<Option<String>, _>("file_path")?
            .map(PathBuf::from),
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
        id,
    })
}
