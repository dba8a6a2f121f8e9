//! Pluggable filename oracles.
//!
//! An oracle takes a bare filename and returns a best-effort guess of what it contains.
//! Oracles are consulted in a fixed preference order; a failing or panicking oracle
//! simply has no opinion, so classification never depends on any single oracle.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::normalize::{clean_episode_title, clean_title, find_release_year, normalize, strip_release_tags};

/// `Season 2 Episode 5`, `Temporada 2 Capitulo 5`
static RE_VERBOSE_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:season|temporada)\s*(?P<season>\d{1,2})\s*(?:-\s*)?(?:episode|episodio|cap[ií]tulo|cap|ep)\s*(?P<episode>\d{1,3})\b",
    )
    .expect("Failed to compile verbose episode regex")
});

/// Spanish release style `Cap.102` (season 1 episode 2) or `Capitulo 12`.
static RE_CAPITULO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcap(?:[ií]tulo)?\s*(?P<number>\d{1,4})\b").expect("Failed to compile capitulo regex")
});

/// `Season 2` or `Temporada 2` anywhere in a name.
static RE_SEASON_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:season|temporada)\s*(?P<season>\d{1,2})\b").expect("Failed to compile season regex")
});

/// Structured result of an oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleGuess {
    pub title: Option<String>,
    pub season: Option<u32>,
    pub episodes: Vec<u32>,
    pub episode_title: Option<String>,
    pub year: Option<u16>,
    pub is_episode: bool,
}

/// A "guess from filename" strategy.
pub trait FilenameOracle: Send + Sync {
    /// Short identifier used in verbose output.
    fn name(&self) -> &str;

    /// Guess the content of a bare filename (extension included).
    ///
    /// `Ok(None)` means the oracle has no opinion.
    ///
    /// # Errors
    /// Any error is treated by the adapter as "no opinion".
    fn guess(&self, filename: &str) -> Result<Option<OracleGuess>>;
}

/// Ranked list of oracles behind a single `try_parse` call.
#[derive(Default)]
pub struct ParserAdapter {
    oracles: Vec<Box<dyn FilenameOracle>>,
}

/// Built-in oracle for common release naming styles the main ladder does not cover:
/// verbose season/episode phrases, Spanish `Cap.NNN` numbering and movie release years.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseNameOracle;

impl OracleGuess {
    /// True if the guess describes an episode of a series.
    #[must_use]
    pub fn has_episode_info(&self) -> bool {
        self.is_episode || self.season.is_some() || !self.episodes.is_empty()
    }
}

impl ParserAdapter {
    /// Adapter without any oracles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter with the built-in oracles.
    #[must_use]
    pub fn with_default_oracles() -> Self {
        Self::new().with_oracle(ReleaseNameOracle)
    }

    /// Append an oracle with the lowest preference so far.
    #[must_use]
    pub fn with_oracle(mut self, oracle: impl FilenameOracle + 'static) -> Self {
        self.oracles.push(Box::new(oracle));
        self
    }

    /// Ask each oracle in order and return the first opinion.
    ///
    /// Errors and panics inside an oracle are swallowed.
    #[must_use]
    pub fn try_parse(&self, filename: &str) -> Option<OracleGuess> {
        self.oracles.iter().find_map(|oracle| {
            match panic::catch_unwind(AssertUnwindSafe(|| oracle.guess(filename))) {
                Ok(Ok(guess)) => guess,
                Ok(Err(_)) | Err(_) => None,
            }
        })
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.oracles.iter().map(|oracle| oracle.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}

impl fmt::Debug for ParserAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserAdapter").field("oracles", &self.names()).finish()
    }
}

impl FilenameOracle for ReleaseNameOracle {
    fn name(&self) -> &str {
        "release-name"
    }

    fn guess(&self, filename: &str) -> Result<Option<OracleGuess>> {
        let stem = crate::path_to_file_stem_string(Path::new(filename));
        let text = normalize(&stem);

        if let Some(caps) = RE_VERBOSE_EPISODE.captures(&text) {
            let marker = caps.get(0).map_or(0..0, |m| m.range());
            return Ok(Some(OracleGuess {
                title: title_before(&text, marker.start),
                season: caps["season"].parse().ok(),
                episodes: caps["episode"].parse::<u32>().ok().into_iter().collect(),
                episode_title: non_empty(clean_episode_title(&text[marker.end..])),
                year: None,
                is_episode: true,
            }));
        }

        if let Some(caps) = RE_CAPITULO.captures(&text) {
            let marker = caps.get(0).map_or(0..0, |m| m.range());
            let number: u32 = caps["number"].parse()?;
            let (season, episode) = if number >= 100 {
                (Some(number / 100), number % 100)
            } else {
                let season = RE_SEASON_PHRASE
                    .captures(&text)
                    .and_then(|caps| caps["season"].parse().ok());
                (season, number)
            };
            return Ok(Some(OracleGuess {
                title: title_before(&text, marker.start),
                season,
                episodes: vec![episode],
                episode_title: None,
                year: None,
                is_episode: true,
            }));
        }

        if let Some((year, start)) = find_release_year(&text) {
            return Ok(Some(OracleGuess {
                title: title_before(&text, start),
                year: Some(year),
                ..OracleGuess::default()
            }));
        }

        Ok(None)
    }
}

/// Title from the text in front of a marker:
/// cut at the first bracket and at a season phrase, then cleaned.
fn title_before(text: &str, end: usize) -> Option<String> {
    let mut title = &text[..end];
    if let Some(bracket) = title.find(['[', '(']).filter(|&index| index > 0) {
        title = &title[..bracket];
    }
    if let Some(season) = RE_SEASON_PHRASE.find(title).filter(|m| m.start() > 0) {
        title = &title[..season.start()];
    }
    non_empty(clean_title(&strip_release_tags(title)))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod oracle_tests {
    use super::*;

    struct FailingOracle;
    struct PanickingOracle;
    struct FixedOracle(OracleGuess);

    impl FilenameOracle for FailingOracle {
        fn name(&self) -> &str {
            "failing"
        }

        fn guess(&self, _filename: &str) -> Result<Option<OracleGuess>> {
            anyhow::bail!("parser not installed")
        }
    }

    impl FilenameOracle for PanickingOracle {
        fn name(&self) -> &str {
            "panicking"
        }

        fn guess(&self, _filename: &str) -> Result<Option<OracleGuess>> {
            panic!("oracle bug")
        }
    }

    impl FilenameOracle for FixedOracle {
        fn name(&self) -> &str {
            "fixed"
        }

        fn guess(&self, _filename: &str) -> Result<Option<OracleGuess>> {
            Ok(Some(self.0.clone()))
        }
    }

    fn fixed_guess() -> OracleGuess {
        OracleGuess {
            title: Some("Fixed".to_string()),
            ..OracleGuess::default()
        }
    }

    #[test]
    fn empty_adapter_has_no_opinion() {
        assert_eq!(ParserAdapter::new().try_parse("anything.mkv"), None);
    }

    #[test]
    fn failing_oracle_falls_through() {
        let adapter = ParserAdapter::new()
            .with_oracle(FailingOracle)
            .with_oracle(FixedOracle(fixed_guess()));
        assert_eq!(adapter.try_parse("x.mkv"), Some(fixed_guess()));
    }

    #[test]
    fn panicking_oracle_falls_through() {
        let adapter = ParserAdapter::new()
            .with_oracle(PanickingOracle)
            .with_oracle(FixedOracle(fixed_guess()));
        assert_eq!(adapter.try_parse("x.mkv"), Some(fixed_guess()));
    }

    #[test]
    fn first_opinion_wins() {
        let other = OracleGuess {
            title: Some("Other".to_string()),
            ..OracleGuess::default()
        };
        let adapter = ParserAdapter::new()
            .with_oracle(FixedOracle(fixed_guess()))
            .with_oracle(FixedOracle(other));
        assert_eq!(adapter.try_parse("x.mkv"), Some(fixed_guess()));
        assert_eq!(adapter.names(), vec!["fixed", "fixed"]);
    }

    #[test]
    fn release_name_verbose_episode() {
        let guess = ReleaseNameOracle
            .guess("The Crown Season 2 Episode 5 - Marionettes.mkv")
            .unwrap()
            .unwrap();
        assert_eq!(guess.title.as_deref(), Some("The Crown"));
        assert_eq!(guess.season, Some(2));
        assert_eq!(guess.episodes, vec![5]);
        assert_eq!(guess.episode_title.as_deref(), Some("Marionettes"));
        assert!(guess.has_episode_info());
    }

    #[test]
    fn release_name_spanish_capitulo() {
        let guess = ReleaseNameOracle
            .guess("Los Serrano - Temporada 1 [HDTV][Cap.102][Español Castellano].avi")
            .unwrap()
            .unwrap();
        assert_eq!(guess.title.as_deref(), Some("Los Serrano"));
        assert_eq!(guess.season, Some(1));
        assert_eq!(guess.episodes, vec![2]);
        assert!(guess.is_episode);
    }

    #[test]
    fn release_name_capitulo_with_season_phrase() {
        let guess = ReleaseNameOracle
            .guess("Aida Temporada 3 Capitulo 12.avi")
            .unwrap()
            .unwrap();
        assert_eq!(guess.title.as_deref(), Some("Aida"));
        assert_eq!(guess.season, Some(3));
        assert_eq!(guess.episodes, vec![12]);
    }

    #[test]
    fn release_name_movie_year() {
        let guess = ReleaseNameOracle
            .guess("Movie Title (2020) BluRay.mkv")
            .unwrap()
            .unwrap();
        assert_eq!(guess.title.as_deref(), Some("Movie Title"));
        assert_eq!(guess.year, Some(2020));
        assert!(!guess.has_episode_info());
    }

    #[test]
    fn release_name_scene_movie() {
        let guess = ReleaseNameOracle
            .guess("Blade.Runner.2049.2017.1080p.BluRay.x264.mkv")
            .unwrap()
            .unwrap();
        assert_eq!(guess.title.as_deref(), Some("Blade Runner 2049"));
        assert_eq!(guess.year, Some(2017));
    }

    #[test]
    fn release_name_without_signal_has_no_opinion() {
        assert_eq!(ReleaseNameOracle.guess("holiday_clip.mp4").unwrap(), None);
    }
}
