//! Folder context for a video file.
//!
//! The immediate parent directory often carries the show name and season
//! (`Show Name - Season 2/`), or the movie title (`Movie Title (2020)/`).
//! Generic download folders carry no signal and must never leak into titles.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::{RE_WHITESPACE, clean_title, find_release_year, normalize, strip_release_tags};
use crate::sanitize::sanitize_filename;

/// Generic container directory names that never describe their content.
pub const PROTECTED_DIR_NAMES: &[&str] = &[
    "incoming",
    "downloads",
    "download",
    "descargas",
    "descarga",
    "torrent",
    "torrents",
    "emule",
    "emule incoming",
    "incoming emule",
    "amule incoming",
    "completed",
    "complete",
    "finished",
    "temp",
    "tmp",
    "new folder",
    "nueva carpeta",
    "videos",
    "vídeos",
    "video",
    "movies",
    "películas",
    "peliculas",
    "series",
    "tv",
    "tv shows",
];

/// Season marker in a folder name: `Season 2`, `Temporada 02`, `S02`, `T2`.
static RE_FOLDER_SEASON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:(?:season|temporada|saison|staffel|stagione)\s*(?P<long>\d{1,2})|[ST](?P<short>\d{1,2}))\b")
        .expect("Failed to compile folder season regex")
});

/// `<title> - Temporada|Season ...`
static RE_TITLE_BEFORE_SEASON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<title>.+?)\s*-\s*(?:temporada|season)\b").expect("Failed to compile title regex")
});

/// Everything from a season phrase or a common release keyword onwards.
static RE_FOLDER_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:temporada|season|completa|complete|dvdrip|hdtv|web[- ]?dl|bluray)\b.*$")
        .expect("Failed to compile folder noise regex")
});

/// What the immediate parent directory says about a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentContext {
    /// Raw name of the parent directory.
    pub folder_name: String,
    /// Whole cleaned folder name, usable as a movie title.
    pub movie_title_candidate: Option<String>,
    /// Text before the season marker, usable as a show title.
    pub show_title_candidate: Option<String>,
    /// Season number found in the folder name.
    pub season_candidate: Option<u32>,
}

/// Resolves folder context while ignoring protected and source root directories.
#[derive(Debug, Clone)]
pub struct ContextResolver {
    protected_names: HashSet<String>,
    source_roots: Vec<PathBuf>,
}

impl Default for ContextResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ParentContext {
    /// Context for a folder that carries no semantic signal.
    fn empty(folder_name: String) -> Self {
        Self {
            folder_name,
            ..Self::default()
        }
    }
}

impl ContextResolver {
    /// Create a resolver with the built-in protected directory names.
    #[must_use]
    pub fn new() -> Self {
        Self {
            protected_names: PROTECTED_DIR_NAMES.iter().map(|name| protected_key(name)).collect(),
            source_roots: Vec::new(),
        }
    }

    /// Add extra protected directory names.
    #[must_use]
    pub fn with_protected_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.protected_names
            .extend(names.into_iter().map(|name| protected_key(name.as_ref())));
        self
    }

    /// Declare the source roots. Files directly inside a source root get no folder context.
    #[must_use]
    pub fn with_source_roots(mut self, roots: &[PathBuf]) -> Self {
        self.source_roots = roots.to_vec();
        self
    }

    /// Check if a directory name is in the protected set.
    ///
    /// Comparison is case-insensitive and ignores surrounding dots and spaces.
    #[must_use]
    pub fn is_protected_name(&self, name: &str) -> bool {
        let key = protected_key(name);
        key.is_empty() || self.protected_names.contains(&key)
    }

    /// Check if a directory carries no semantic signal:
    /// it has a protected name or it is one of the declared source roots.
    #[must_use]
    pub fn is_protected_dir(&self, dir: &Path) -> bool {
        if self.source_roots.iter().any(|root| root == dir) {
            return true;
        }
        dir.file_name()
            .is_none_or(|name| self.is_protected_name(&crate::os_str_to_string(name)))
    }

    /// Inspect the immediate parent directory of the given file.
    #[must_use]
    pub fn resolve_parent_context(&self, path: &Path) -> ParentContext {
        let Some(parent) = path.parent() else {
            return ParentContext::default();
        };
        let folder_name = crate::path_to_filename_string(parent);
        if self.is_protected_dir(parent) {
            return ParentContext::empty(folder_name);
        }

        let cleaned = normalize(&strip_release_tags(&folder_name));
        let movie_title_candidate = non_empty(sanitize_filename(&movie_title_with_year(&folder_name)));

        let mut show_title_candidate = None;
        let mut season_candidate = None;
        if let Some(caps) = RE_FOLDER_SEASON.captures(&cleaned) {
            season_candidate = caps
                .name("long")
                .or_else(|| caps.name("short"))
                .and_then(|number| number.as_str().parse().ok());
            let marker_start = caps.get(0).map_or(0, |m| m.start());
            show_title_candidate = non_empty(sanitize_filename(&clean_title(&cleaned[..marker_start])));

            // `Show Name/Season 02/episode.mkv`
            if show_title_candidate.is_none() {
                show_title_candidate = parent
                    .parent()
                    .filter(|grandparent| !self.is_protected_dir(grandparent))
                    .map(crate::path_to_filename_string)
                    .and_then(|name| non_empty(sanitize_filename(&clean_title(&name))));
            }
        }

        ParentContext {
            folder_name,
            movie_title_candidate,
            show_title_candidate,
            season_candidate,
        }
    }

    /// Heuristic show name from the parent directory.
    ///
    /// Takes the text before `- Temporada`/`- Season`, or the folder name
    /// with season phrases and release keywords cut off.
    #[must_use]
    pub fn guess_show_from_parent(&self, path: &Path) -> Option<String> {
        let parent = path.parent()?;
        if self.is_protected_dir(parent) {
            return None;
        }
        let folder = normalize(&strip_release_tags(&crate::path_to_filename_string(parent)));
        if let Some(caps) = RE_TITLE_BEFORE_SEASON.captures(&folder) {
            return non_empty(sanitize_filename(&normalize(&caps["title"])));
        }
        let stripped = RE_FOLDER_NOISE.replace(&folder, "");
        non_empty(sanitize_filename(&normalize(stripped.trim_matches([' ', '-']))))
    }
}

/// Cleaned folder name that keeps a release year stripped by tag removal.
fn movie_title_with_year(folder_name: &str) -> String {
    let title = clean_title(folder_name);
    match find_release_year(&normalize(folder_name)) {
        Some((year, _)) if !title.contains(&year.to_string()) => format!("{title} ({year})"),
        _ => title,
    }
}

/// Comparison key for protected names: lowercase, separators as spaces, trimmed.
fn protected_key(name: &str) -> String {
    let spaced = name.replace(['.', '_'], " ");
    RE_WHITESPACE.replace_all(spaced.trim(), " ").to_lowercase()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod context_tests {
    use super::*;

    fn resolve(path: &str) -> ParentContext {
        ContextResolver::new().resolve_parent_context(Path::new(path))
    }

    #[test]
    fn protected_folder_has_no_candidates() {
        let context = resolve("/data/Descargas/Movie Title (2020) BluRay.mkv");
        assert_eq!(context.folder_name, "Descargas");
        assert_eq!(context.movie_title_candidate, None);
        assert_eq!(context.show_title_candidate, None);
        assert_eq!(context.season_candidate, None);
    }

    #[test]
    fn protected_names_ignore_case_dots_and_spaces() {
        let resolver = ContextResolver::new();
        assert!(resolver.is_protected_name("INCOMING"));
        assert!(resolver.is_protected_name(" downloads. "));
        assert!(resolver.is_protected_name("eMule.Incoming"));
        assert!(resolver.is_protected_name("Torrent"));
        assert!(!resolver.is_protected_name("Breaking Bad"));
    }

    #[test]
    fn extra_protected_names() {
        let resolver = ContextResolver::new().with_protected_names(["Pending"]);
        assert!(resolver.is_protected_name("pending"));
        let context = resolver.resolve_parent_context(Path::new("/x/Pending/file.mkv"));
        assert_eq!(context.movie_title_candidate, None);
    }

    #[test]
    fn source_root_has_no_candidates() {
        let resolver = ContextResolver::new().with_source_roots(&[PathBuf::from("/data/inbox")]);
        let context = resolver.resolve_parent_context(Path::new("/data/inbox/Some Movie.mkv"));
        assert_eq!(context.movie_title_candidate, None);
    }

    #[test]
    fn folder_with_season_marker() {
        let context = resolve("/data/Breaking Bad - Temporada 2/01.mkv");
        assert_eq!(context.show_title_candidate.as_deref(), Some("Breaking Bad"));
        assert_eq!(context.season_candidate, Some(2));
        assert_eq!(
            context.movie_title_candidate.as_deref(),
            Some("Breaking Bad - Temporada 2")
        );
    }

    #[test]
    fn folder_with_short_season_marker() {
        let context = resolve("/data/The.Wire.S03.1080p.BluRay/file.mkv");
        assert_eq!(context.show_title_candidate.as_deref(), Some("The Wire"));
        assert_eq!(context.season_candidate, Some(3));
    }

    #[test]
    fn folder_with_spanish_short_marker() {
        let context = resolve("/data/Aida T2/file.mkv");
        assert_eq!(context.show_title_candidate.as_deref(), Some("Aida"));
        assert_eq!(context.season_candidate, Some(2));
    }

    #[test]
    fn season_only_folder_uses_grandparent() {
        let context = resolve("/library/Friends/Season 05/05 - The One.mkv");
        assert_eq!(context.show_title_candidate.as_deref(), Some("Friends"));
        assert_eq!(context.season_candidate, Some(5));
    }

    #[test]
    fn season_only_folder_in_protected_grandparent() {
        let context = resolve("/data/Downloads/Season 05/05.mkv");
        assert_eq!(context.show_title_candidate, None);
        assert_eq!(context.season_candidate, Some(5));
    }

    #[test]
    fn movie_folder() {
        let context = resolve("/data/Inception (2010) [1080p]/inception.mkv");
        assert_eq!(context.movie_title_candidate.as_deref(), Some("Inception (2010)"));
        assert_eq!(context.show_title_candidate, None);
        assert_eq!(context.season_candidate, None);
    }

    #[test]
    fn episode_code_in_folder_is_not_season() {
        let context = resolve("/data/Show S01E02 Title/file.mkv");
        assert_eq!(context.season_candidate, None);
    }

    #[test]
    fn guess_show_from_season_folder() {
        let resolver = ContextResolver::new();
        assert_eq!(
            resolver.guess_show_from_parent(Path::new("/d/Cheers - Temporada 4/x.avi")),
            Some("Cheers".to_string())
        );
        assert_eq!(
            resolver.guess_show_from_parent(Path::new("/d/Cheers Completa DVDRip/x.avi")),
            Some("Cheers".to_string())
        );
        assert_eq!(resolver.guess_show_from_parent(Path::new("/d/Incoming/x.avi")), None);
    }
}
