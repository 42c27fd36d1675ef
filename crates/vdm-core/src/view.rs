//! Aggregation view: movies plus a series → season → episode tree derived
//! from the flat job table. Holds no state of its own.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::job::Job;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedView {
    /// Movie jobs, newest first.
    pub movies: Vec<Job>,
    /// Series sorted by name.
    pub series: Vec<SeriesGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesGroup {
    pub series_name: String,
    pub series_id: Option<String>,
    /// Representative cover, preferring a locally cached file.
    pub cover: Option<String>,
    pub plot: Option<String>,
    pub rating: Option<f64>,
    pub episode_count: usize,
    /// Seasons in ascending order.
    pub seasons: Vec<SeasonGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonGroup {
    pub season: u32,
    /// Episodes in ascending episode order.
    pub episodes: Vec<Job>,
}

/// Sort jobs newest first; ties on creation time fall back to the id.
pub fn newest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

/// Partition `jobs` into movies and series groups.
pub fn group_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> GroupedView {
    let mut movies = Vec::new();
    let mut series: BTreeMap<&str, BTreeMap<u32, Vec<&Job>>> = BTreeMap::new();

    for job in jobs {
        match job.episode() {
            None => movies.push(job.clone()),
            Some(ep) => series
                .entry(ep.series_name.as_str())
                .or_default()
                .entry(ep.season)
                .or_default()
                .push(job),
        }
    }

    newest_first(&mut movies);

    let series = series
        .into_iter()
        .map(|(name, seasons)| series_group(name, seasons))
        .collect();

    GroupedView { movies, series }
}

fn series_group(name: &str, seasons: BTreeMap<u32, Vec<&Job>>) -> SeriesGroup {
    let all: Vec<&Job> = seasons.values().flatten().copied().collect();
    let cover = all
        .iter()
        .find(|j| j.local_cover.is_some())
        .or_else(|| all.iter().find(|j| j.cover.is_some()))
        .and_then(|j| j.display_cover());
    let series_id = all
        .iter()
        .find_map(|j| j.episode().and_then(|ep| ep.series_id.clone()));
    let plot = all.iter().find_map(|j| j.metadata.plot.clone());
    let rating = all.iter().find_map(|j| j.metadata.rating);

    let seasons = seasons
        .into_iter()
        .map(|(season, mut episodes)| {
            episodes.sort_by_key(|j| (j.episode().map_or(0, |ep| ep.episode), j.created_at));
            SeasonGroup {
                season,
                episodes: episodes.into_iter().cloned().collect(),
            }
        })
        .collect();

    SeriesGroup {
        series_name: name.to_string(),
        series_id,
        cover,
        plot,
        rating,
        episode_count: all.len(),
        seasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{EpisodeRef, JobStatus, MediaKind, MediaMetadata};
    use std::path::PathBuf;

    fn job(id: &str, media: MediaKind, created_at: i64) -> Job {
        Job {
            id: id.to_string(),
            name: id.to_string(),
            media,
            url: format!("http://example.test/{id}.mp4"),
            cover: None,
            local_cover: None,
            metadata: MediaMetadata::default(),
            size: 0,
            downloaded_bytes: 0,
            progress: 0,
            status: JobStatus::Pending,
            file_path: None,
            error: None,
            created_at,
            completed_at: None,
        }
    }

    fn ep(series: &str, season: u32, episode: u32) -> MediaKind {
        MediaKind::Episode(EpisodeRef {
            series_name: series.to_string(),
            series_id: None,
            season,
            episode,
        })
    }

    #[test]
    fn episodes_ordered_within_season() {
        let jobs = vec![job("e2", ep("X", 1, 2), 1), job("e1", ep("X", 1, 1), 2)];
        let view = group_jobs(&jobs);
        assert!(view.movies.is_empty());
        assert_eq!(view.series.len(), 1);
        let x = &view.series[0];
        assert_eq!(x.series_name, "X");
        assert_eq!(x.seasons.len(), 1);
        let order: Vec<u32> = x.seasons[0]
            .episodes
            .iter()
            .map(|j| j.episode().unwrap().episode)
            .collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn series_and_seasons_sorted_movies_newest_first() {
        let jobs = vec![
            job("m_old", MediaKind::Movie, 10),
            job("b2", ep("Beta", 2, 1), 3),
            job("m_new", MediaKind::Movie, 20),
            job("b1", ep("Beta", 1, 5), 4),
            job("a1", ep("Alpha", 1, 1), 5),
        ];
        let view = group_jobs(&jobs);
        let movies: Vec<&str> = view.movies.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(movies, vec!["m_new", "m_old"]);
        let names: Vec<&str> = view.series.iter().map(|s| s.series_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        let seasons: Vec<u32> = view.series[1].seasons.iter().map(|s| s.season).collect();
        assert_eq!(seasons, vec![1, 2]);
        assert_eq!(view.series[1].episode_count, 2);
    }

    #[test]
    fn representative_cover_prefers_local_file() {
        let mut remote = job("e1", ep("X", 1, 1), 1);
        remote.cover = Some("http://img/x.jpg".into());
        remote.metadata.plot = Some("plot".into());
        let mut cached = job("e2", ep("X", 1, 2), 2);
        cached.cover = Some("http://img/x.jpg".into());
        cached.local_cover = Some(PathBuf::from("/covers/X.jpg"));
        cached.metadata.rating = Some(8.1);

        let view = group_jobs([&remote, &cached]);
        let x = &view.series[0];
        assert_eq!(x.cover.as_deref(), Some("/covers/X.jpg"));
        assert_eq!(x.plot.as_deref(), Some("plot"));
        assert_eq!(x.rating, Some(8.1));
    }

    #[test]
    fn empty_table_gives_empty_view() {
        assert_eq!(group_jobs(&Vec::<Job>::new()), GroupedView::default());
    }
}
