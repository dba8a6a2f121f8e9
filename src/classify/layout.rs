//! Destination library layout.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::sanitize::sanitize_filename;

/// Year at the end of a title, bare or in parentheses.
static RE_TRAILING_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:\((?P<paren>\d{4})\)|\b(?P<bare>\d{4}))\s*$").expect("Failed to compile trailing year regex")
});

pub const DEFAULT_MOVIES_DIR: &str = "Movies";
pub const DEFAULT_SERIES_DIR: &str = "Series";
pub const DEFAULT_SEASON_LABEL: &str = "Season";

/// Directory names used under the destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    pub movies_dir: String,
    pub series_dir: String,
    pub season_label: String,
}

impl Default for LibraryLayout {
    fn default() -> Self {
        Self {
            movies_dir: DEFAULT_MOVIES_DIR.to_string(),
            series_dir: DEFAULT_SERIES_DIR.to_string(),
            season_label: DEFAULT_SEASON_LABEL.to_string(),
        }
    }
}

impl LibraryLayout {
    /// `<root>/Movies/<title>[ (<year>)].<ext>`
    ///
    /// Returns the destination directory and filename.
    #[must_use]
    pub fn movie_destination(&self, root: &Path, title: &str, year: Option<u16>, extension: &str) -> (PathBuf, String) {
        let name = year.map_or_else(
            || title.to_string(),
            |year| format!("{} ({year})", strip_trailing_year(title, year)),
        );
        let directory = root.join(sanitize_filename(&self.movies_dir));
        (directory, sanitize_filename(&format!("{name}.{extension}")))
    }

    /// `<root>/Series/<show>/Season NN/<show> - SSxEE[-EE] [- <episode title>].<ext>`
    ///
    /// Returns the destination directory and filename.
    #[must_use]
    pub fn series_destination(
        &self,
        root: &Path,
        show_title: &str,
        season: u32,
        episodes: &[u32],
        episode_title: Option<&str>,
        extension: &str,
    ) -> (PathBuf, String) {
        let show = sanitize_filename(show_title);
        let directory = root
            .join(sanitize_filename(&self.series_dir))
            .join(&show)
            .join(sanitize_filename(&format!("{} {season:02}", self.season_label)));

        let code = episode_code(season, episodes);
        let name = match episode_title.filter(|title| !title.is_empty()) {
            Some(title) => format!("{show} - {code} - {title}.{extension}"),
            None => format!("{show} - {code}.{extension}"),
        };
        (directory, sanitize_filename(&name))
    }
}

/// `SSxEE` for a single episode, `SSxEE-EE` for a range.
#[must_use]
pub fn episode_code(season: u32, episodes: &[u32]) -> String {
    let sorted: Vec<u32> = episodes.iter().copied().sorted_unstable().dedup().collect();
    match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) if first != last => format!("{season:02}x{first:02}-{last:02}"),
        (Some(first), _) => format!("{season:02}x{first:02}"),
        _ => format!("{season:02}x01"),
    }
}

/// Remove a trailing year from the title if it is the same year that will be appended.
fn strip_trailing_year(title: &str, year: u16) -> &str {
    RE_TRAILING_YEAR
        .captures(title)
        .filter(|caps| {
            caps.name("paren")
                .or_else(|| caps.name("bare"))
                .is_some_and(|found| found.as_str() == year.to_string())
        })
        .and_then(|caps| caps.get(0))
        .filter(|found| found.start() > 0)
        .map_or(title, |found| &title[..found.start()])
}

#[cfg(test)]
mod layout_tests {
    use super::*;

    #[test]
    fn movie_without_year() {
        let (dir, name) = LibraryLayout::default().movie_destination(Path::new("/lib"), "Some Movie", None, "mkv");
        assert_eq!(dir, PathBuf::from("/lib/Movies"));
        assert_eq!(name, "Some Movie.mkv");
    }

    #[test]
    fn movie_with_year() {
        let (_, name) = LibraryLayout::default().movie_destination(Path::new("/lib"), "Some Movie", Some(2020), "mp4");
        assert_eq!(name, "Some Movie (2020).mp4");
    }

    #[test]
    fn movie_year_is_not_repeated() {
        let layout = LibraryLayout::default();
        let (_, name) = layout.movie_destination(Path::new("/lib"), "Movie Title (2020)", Some(2020), "mkv");
        assert_eq!(name, "Movie Title (2020).mkv");
        let (_, name) = layout.movie_destination(Path::new("/lib"), "Movie Title 2020", Some(2020), "mkv");
        assert_eq!(name, "Movie Title (2020).mkv");
    }

    #[test]
    fn movie_title_that_is_a_year() {
        let (_, name) = LibraryLayout::default().movie_destination(Path::new("/lib"), "1917", Some(1917), "mkv");
        assert_eq!(name, "1917 (1917).mkv");
    }

    #[test]
    fn movie_different_trailing_number_is_kept() {
        let (_, name) =
            LibraryLayout::default().movie_destination(Path::new("/lib"), "Blade Runner 2049", Some(2017), "mkv");
        assert_eq!(name, "Blade Runner 2049 (2017).mkv");
    }

    #[test]
    fn series_single_episode() {
        let (dir, name) = LibraryLayout::default().series_destination(
            Path::new("/lib"),
            "Show Name",
            2,
            &[5],
            Some("Episode Title"),
            "mkv",
        );
        assert_eq!(dir, PathBuf::from("/lib/Series/Show Name/Season 02"));
        assert_eq!(name, "Show Name - 02x05 - Episode Title.mkv");
    }

    #[test]
    fn series_without_episode_title() {
        let (_, name) =
            LibraryLayout::default().series_destination(Path::new("/lib"), "Show", 1, &[12], None, "avi");
        assert_eq!(name, "Show - 01x12.avi");
        let (_, name) =
            LibraryLayout::default().series_destination(Path::new("/lib"), "Show", 1, &[12], Some(""), "avi");
        assert_eq!(name, "Show - 01x12.avi");
    }

    #[test]
    fn series_multi_episode_range() {
        let (_, name) =
            LibraryLayout::default().series_destination(Path::new("/lib"), "Show", 1, &[2, 1, 3], None, "mkv");
        assert_eq!(name, "Show - 01x01-03.mkv");
    }

    #[test]
    fn series_segments_are_sanitized() {
        let (dir, name) = LibraryLayout::default().series_destination(
            Path::new("/lib"),
            "What If?",
            1,
            &[1],
            Some("Part 1: Start"),
            "mkv",
        );
        assert_eq!(dir, PathBuf::from("/lib/Series/What If_/Season 01"));
        assert_eq!(name, "What If_ - 01x01 - Part 1_ Start.mkv");
    }

    #[test]
    fn custom_layout() {
        let layout = LibraryLayout {
            movies_dir: "Películas".to_string(),
            series_dir: "TV".to_string(),
            season_label: "Temporada".to_string(),
        };
        let (dir, _) = layout.series_destination(Path::new("/lib"), "Aida", 3, &[1], None, "mkv");
        assert_eq!(dir, PathBuf::from("/lib/TV/Aida/Temporada 03"));
        let (dir, _) = layout.movie_destination(Path::new("/lib"), "Movie", None, "mkv");
        assert_eq!(dir, PathBuf::from("/lib/Películas"));
    }

    #[test]
    fn episode_code_formats() {
        assert_eq!(episode_code(1, &[2]), "01x02");
        assert_eq!(episode_code(10, &[100]), "10x100");
        assert_eq!(episode_code(1, &[4, 4]), "01x04");
        assert_eq!(episode_code(1, &[]), "01x01");
    }
}
