//! Job write operations: upsert, recovery, remove.

use anyhow::Result;

use crate::job::{Job, JobStatus};
use crate::store::JobStore;

fn path_str(p: &Option<std::path::PathBuf>) -> Option<String> {
    p.as_ref().map(|p| p.to_string_lossy().into_owned())
}

impl JobStore {
    /// Insert the job, or overwrite every column of the existing row with the same id.
    pub async fn upsert_job(&self, job: &Job) -> Result<()> {
        let episode = job.episode();
        let genres_json = if job.metadata.genres.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&job.metadata.genres)?)
        };

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, name, kind, url, cover, local_cover, size, downloaded_bytes,
                status, progress, file_path, error, created_at, completed_at,
                series_name, series_id, season, episode,
                plot, rating, year, genres_json, duration_secs
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                      ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18,
                      ?19, ?20, ?21, ?22, ?23)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                url = excluded.url,
                cover = excluded.cover,
                local_cover = excluded.local_cover,
                size = excluded.size,
                downloaded_bytes = excluded.downloaded_bytes,
                status = excluded.status,
                progress = excluded.progress,
                file_path = excluded.file_path,
                error = excluded.error,
                completed_at = excluded.completed_at,
                series_name = excluded.series_name,
                series_id = excluded.series_id,
                season = excluded.season,
                episode = excluded.episode,
                plot = excluded.plot,
                rating = excluded.rating,
                year = excluded.year,
                genres_json = excluded.genres_json,
                duration_secs = excluded.duration_secs
            "#,
        )
        .bind(&job.id)
        .bind(&job.name)
        .bind(job.kind_str())
        .bind(&job.url)
        .bind(&job.cover)
        .bind(path_str(&job.local_cover))
        .bind(job.size as i64)
        .bind(job.downloaded_bytes as i64)
        .bind(job.status.as_str())
        .bind(i64::from(job.progress))
        .bind(path_str(&job.file_path))
        .bind(&job.error)
        .bind(job.created_at)
        .bind(job.completed_at)
        .bind(episode.map(|e| e.series_name.clone()))
        .bind(episode.and_then(|e| e.series_id.clone()))
        .bind(episode.map(|e| i64::from(e.season)))
        .bind(episode.map(|e| i64::from(e.episode)))
        .bind(&job.metadata.plot)
        .bind(job.metadata.rating)
        .bind(job.metadata.year.map(i64::from))
        .bind(genres_json)
        .bind(job.metadata.duration_secs.map(|d| d as i64))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rewrite any job left in `downloading` to `paused` (the transfer agent
    /// cannot have survived a restart). Call before loading jobs into memory.
    /// Returns the number of jobs reclassified.
    pub async fn recover_interrupted_jobs(&self) -> Result<u64> {
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?1
            WHERE status = ?2
            "#,
        )
        .bind(JobStatus::Paused.as_str())
        .bind(JobStatus::Downloading.as_str())
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// Permanently remove a job row.
    ///
    /// File cleanup is handled by the controller through the transfer agent.
    pub async fn remove_job(&self, id: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
