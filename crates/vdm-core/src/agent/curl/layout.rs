//! On-disk library layout and filesystem-safe names.
//!
//! ```text
//! <root>/Movies/<name>.<ext>
//! <root>/Series/<series>/Season 02/<series> S02E07.<ext>
//! <root>/.covers/<key>.<ext>
//! ```

use std::path::{Path, PathBuf};

use crate::agent::TransferRequest;
use crate::job::MediaKind;

/// Longest component we produce; leaves room for extension and `.part`.
const NAME_MAX: usize = 200;

/// Sanitizes a display name into a single path component.
///
/// - Replaces NUL, `/`, `\`, control characters and `:*?"<>|` with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing spaces, dots and underscores
/// - Limits length to `NAME_MAX` bytes on a char boundary
pub fn sanitize_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let replacement = if c == '\0'
            || c == '/'
            || c == '\\'
            || c.is_control()
            || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|')
        {
            '_'
        } else {
            c
        };

        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    let result = trimmed[..take].trim_end();
    if result.is_empty() {
        "untitled".to_string()
    } else {
        result.to_string()
    }
}

/// File extension from the URL path (lowercased, 1-5 alphanumerics), else `default`.
pub fn extension_from_url(url: &str, default: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            let last = u.path_segments()?.next_back()?.to_string();
            let (_, ext) = last.rsplit_once('.')?;
            let valid = !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then(|| ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| default.to_string())
}

/// Path for the temp file: appends `.part` to the final path.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(".part");
    PathBuf::from(o)
}

#[derive(Debug, Clone)]
pub struct LibraryLayout {
    root: PathBuf,
}

impl LibraryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn series_dir(&self, series_name: &str) -> PathBuf {
        self.root.join("Series").join(sanitize_component(series_name))
    }

    /// Where a finished transfer lands.
    pub fn final_path(&self, request: &TransferRequest) -> PathBuf {
        let ext = extension_from_url(&request.url, "mp4");
        match &request.media {
            MediaKind::Movie => self
                .root
                .join("Movies")
                .join(format!("{}.{}", sanitize_component(&request.name), ext)),
            MediaKind::Episode(ep) => self
                .series_dir(&ep.series_name)
                .join(format!("Season {:02}", ep.season))
                .join(format!(
                    "{} S{:02}E{:02}.{}",
                    sanitize_component(&ep.series_name),
                    ep.season,
                    ep.episode,
                    ext
                )),
        }
    }

    pub fn cover_path(&self, url: &str, key: &str) -> PathBuf {
        let ext = extension_from_url(url, "jpg");
        self.root
            .join(".covers")
            .join(format!("{}.{}", sanitize_component(key), ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::EpisodeRef;

    #[test]
    fn removes_separators_and_reserved_chars() {
        assert_eq!(sanitize_component("AC/DC: Live"), "AC_DC_ Live");
        assert_eq!(sanitize_component("what?*"), "what");
    }

    #[test]
    fn trims_dots_and_spaces() {
        assert_eq!(sanitize_component("  ..  Heat  ..  "), "Heat");
        assert_eq!(sanitize_component("..."), "untitled");
    }

    #[test]
    fn limits_length_on_char_boundary() {
        let long = "é".repeat(300);
        let s = sanitize_component(&long);
        assert!(s.len() <= NAME_MAX);
        assert!(s.chars().all(|c| c == 'é'));
    }

    #[test]
    fn extension_from_url_path() {
        assert_eq!(extension_from_url("http://h/movie/u/p/123.mkv", "mp4"), "mkv");
        assert_eq!(extension_from_url("http://h/movie/u/p/123.MP4?token=x", "mp4"), "mp4");
        assert_eq!(extension_from_url("http://h/live/stream", "mp4"), "mp4");
        assert_eq!(extension_from_url("not a url", "jpg"), "jpg");
    }

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("/lib/Movies/Heat.mp4"));
        assert_eq!(p, PathBuf::from("/lib/Movies/Heat.mp4.part"));
    }

    #[test]
    fn episode_and_movie_paths() {
        let layout = LibraryLayout::new("/lib");
        let movie = TransferRequest {
            job_id: "m".into(),
            url: "http://h/a.mkv".into(),
            name: "Heat".into(),
            media: MediaKind::Movie,
            resume_from: 0,
        };
        assert_eq!(layout.final_path(&movie), PathBuf::from("/lib/Movies/Heat.mkv"));

        let episode = TransferRequest {
            media: MediaKind::Episode(EpisodeRef {
                series_name: "The Wire".into(),
                series_id: None,
                season: 2,
                episode: 7,
            }),
            ..movie
        };
        assert_eq!(
            layout.final_path(&episode),
            PathBuf::from("/lib/Series/The Wire/Season 02/The Wire S02E07.mkv")
        );
        assert_eq!(
            layout.cover_path("http://img/p.png", "The Wire"),
            PathBuf::from("/lib/.covers/The Wire.png")
        );
    }
}
