//! Classification ladder.
//!
//! Each rule looks at one file and either returns a verdict or `None` to let the next rule try.
//! Rules are evaluated in [`RULES`] order and the first verdict wins.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::context::ParentContext;
use crate::normalize::{clean_episode_title, clean_title, find_release_year, normalize, strip_release_tags};
use crate::oracle::ParserAdapter;
use crate::sanitize::sanitize_filename;

/// Movie title used when nothing else is left.
pub const UNKNOWN_MOVIE: &str = "Unknown Movie";

/// `<franchise> <number> - <title> [tags]`
static RE_NUMBERED_FRANCHISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        ^\s*
        (?P<franchise>.+?)\s+(?P<number>\d{1,3})\s*[-–—]\s*
        (?P<title>[^\[(]+?)\s*(?:\[[^\]]*\]|\([^)]*\))*\s*$",
    )
    .expect("Failed to compile numbered franchise regex")
});

/// `<title> S01E02[E03|-E03|-03]` at the start of the name.
static RE_TITLE_SXXEYY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<title>.+?)[\s._\-]*S(?P<season>\d{1,2})\s*E(?P<episode>\d{1,3})(?P<more>(?:-?E\d{1,3}|-\d{1,3})*)\b",
    )
    .expect("Failed to compile title SxxEyy regex")
});

/// `<title> 1x02[-03]` at the start of the name. A separator before the marker is required.
static RE_TITLE_NXM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<title>.+?)[\s._\-]+(?P<season>\d{1,2})x(?P<episode>\d{1,3})(?P<more>(?:-\d{1,2}x\d{1,3}|-\d{1,3})*)\b",
    )
    .expect("Failed to compile title NxM regex")
});

/// `S01E02` anywhere, delimited by non-alphanumerics.
static RE_SXXEYY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z0-9])(?P<marker>S(?P<season>\d{1,2})\s*E(?P<episode>\d{1,3})(?P<more>(?:-?E\d{1,3}|-\d{1,3})*))(?:[^a-z0-9]|$)",
    )
    .expect("Failed to compile SxxEyy regex")
});

/// `1x02` anywhere, delimited by non-alphanumerics.
static RE_NXM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z0-9])(?P<marker>(?P<season>\d{1,2})x(?P<episode>\d{1,3})(?P<more>(?:-\d{1,2}x\d{1,3}|-\d{1,3})*))(?:[^a-z0-9]|$)",
    )
    .expect("Failed to compile NxM regex")
});

/// Additional episode numbers following the first one.
static RE_MORE_EPISODES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<dash>-)?(?:E|\d{1,2}x)?(?P<number>\d{1,3})").expect("Failed to compile episode list regex")
});

/// Season phrase that ends an inline show title.
static RE_SEASON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:temporada|season)\b").expect("Failed to compile season word regex"));

/// Bare episode number at the start of a filename.
static RE_LEADING_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<episode>\d{1,3})(?:$|[\s._\-]+(?P<rest>.*)$)").expect("Failed to compile leading episode regex")
});

/// Everything a rule can look at for one file.
#[derive(Debug)]
pub struct RuleInput<'a> {
    /// Filename including extension.
    pub filename: &'a str,
    /// Filename without extension.
    pub stem: &'a str,
    /// Stem with trailing release tags removed.
    pub cleaned_stem: &'a str,
    pub context: &'a ParentContext,
    /// Heuristic show name from the parent directory.
    pub parent_guess: Option<&'a str>,
    pub oracles: &'a ParserAdapter,
}

/// Outcome of a matching rule.
///
/// Series titles are left as ranked candidates so the caller can canonicalize them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Movie {
        title: String,
        year: Option<u16>,
    },
    Series {
        title_candidates: Vec<Option<String>>,
        season: u32,
        episodes: Vec<u32>,
        episode_title: Option<String>,
    },
}

pub type Rule = fn(&RuleInput<'_>) -> Option<Verdict>;

/// The classification ladder in priority order.
pub const RULES: &[(&str, Rule)] = &[
    ("numbered-franchise", numbered_franchise),
    ("series-inline-title", series_with_inline_title),
    ("series-bare-marker", series_with_bare_marker),
    ("series-folder-season", series_from_folder_season),
    ("oracle", oracle_guess),
    ("movie-folder", movie_from_folder),
    ("movie-fallback", movie_fallback),
];

/// Run the ladder and return the name of the matching rule with its verdict.
#[must_use]
pub fn evaluate(input: &RuleInput<'_>) -> (&'static str, Verdict) {
    RULES
        .iter()
        .find_map(|(name, rule)| rule(input).map(|verdict| (*name, verdict)))
        .unwrap_or_else(|| ("movie-fallback", unknown_movie()))
}

/// `Franchise 2 - Subtitle` is a movie titled `Franchise 02 - Subtitle`.
pub fn numbered_franchise(input: &RuleInput<'_>) -> Option<Verdict> {
    let caps = RE_NUMBERED_FRANCHISE.captures(input.cleaned_stem)?;
    let franchise = normalize(&caps["franchise"]);
    let title = normalize(&caps["title"]);
    let number: u32 = caps["number"].parse().ok()?;
    if franchise.is_empty() || title.is_empty() {
        return None;
    }
    Some(Verdict::Movie {
        title: sanitize_filename(&format!("{franchise} {number:02} - {title}")),
        year: None,
    })
}

/// `Show.Name.S01E02.Episode.Title` with the show name in front of the marker.
pub fn series_with_inline_title(input: &RuleInput<'_>) -> Option<Verdict> {
    [&*RE_TITLE_SXXEYY, &*RE_TITLE_NXM].iter().find_map(|regex| {
        let caps = regex.captures(input.cleaned_stem)?;
        let title = show_title_before_marker(&caps["title"]);
        if title.is_empty() {
            return None;
        }
        let marker_end = caps.get(0).map_or(0, |m| m.end());
        Some(series_verdict(
            &caps,
            vec![Some(title)],
            episode_title_after(input.cleaned_stem, marker_end),
        ))
    })
}

/// A season/episode marker anywhere in the name, title from the text before it or the folder.
pub fn series_with_bare_marker(input: &RuleInput<'_>) -> Option<Verdict> {
    [&*RE_SXXEYY, &*RE_NXM].iter().find_map(|regex| {
        let caps = regex.captures(input.cleaned_stem)?;
        let marker = caps.name("marker")?;
        let prefix = show_title_before_marker(&input.cleaned_stem[..marker.start()]);
        let candidates = vec![
            Some(prefix),
            input.context.show_title_candidate.clone(),
            input.parent_guess.map(ToString::to_string),
        ];
        Some(series_verdict(
            &caps,
            candidates,
            episode_title_after(input.cleaned_stem, marker.end()),
        ))
    })
}

/// `Show - Season 2/05 - Title.mkv`: season and show from the folder, episode from the filename.
pub fn series_from_folder_season(input: &RuleInput<'_>) -> Option<Verdict> {
    let season = input.context.season_candidate?;
    let show = input.context.show_title_candidate.clone()?;
    let caps = RE_LEADING_EPISODE.captures(input.cleaned_stem)?;
    let episode: u32 = caps["episode"].parse().ok()?;
    let episode_title = caps
        .name("rest")
        .map(|rest| clean_episode_title(rest.as_str()))
        .filter(|title| !title.is_empty());
    Some(Verdict::Series {
        title_candidates: vec![Some(show)],
        season,
        episodes: vec![episode],
        episode_title,
    })
}

/// Ask the external oracles.
pub fn oracle_guess(input: &RuleInput<'_>) -> Option<Verdict> {
    let guess = input.oracles.try_parse(input.filename)?;
    if guess.has_episode_info() {
        let season = guess.season.or(input.context.season_candidate).unwrap_or(1);
        let episodes = if guess.episodes.is_empty() { vec![1] } else { guess.episodes };
        let episode_title = guess.episode_title.filter(|title| !title.is_empty()).or_else(|| {
            RE_SXXEYY
                .captures(input.cleaned_stem)
                .or_else(|| RE_NXM.captures(input.cleaned_stem))
                .and_then(|caps| caps.name("marker"))
                .and_then(|marker| episode_title_after(input.cleaned_stem, marker.end()))
        });
        return Some(Verdict::Series {
            title_candidates: vec![
                guess.title,
                input.context.show_title_candidate.clone(),
                input.parent_guess.map(ToString::to_string),
            ],
            season,
            episodes,
            episode_title,
        });
    }

    let title = input
        .context
        .movie_title_candidate
        .clone()
        .or(guess.title)
        .map(|title| sanitize_filename(&title))
        .filter(|title| !title.is_empty())?;
    let year = guess.year.or_else(|| find_release_year(&title).map(|(year, _)| year));
    Some(Verdict::Movie { title, year })
}

/// The parent folder names the movie.
pub fn movie_from_folder(input: &RuleInput<'_>) -> Option<Verdict> {
    let title = input.context.movie_title_candidate.clone()?;
    let year = find_release_year(&title).map(|(year, _)| year);
    Some(Verdict::Movie { title, year })
}

/// The cleaned filename is the movie title.
pub fn movie_fallback(input: &RuleInput<'_>) -> Option<Verdict> {
    let title = sanitize_filename(&clean_title(input.stem));
    if title.is_empty() {
        return Some(unknown_movie());
    }
    let year = find_release_year(&normalize(input.stem)).map(|(year, _)| year);
    Some(Verdict::Movie { title, year })
}

fn unknown_movie() -> Verdict {
    Verdict::Movie {
        title: UNKNOWN_MOVIE.to_string(),
        year: None,
    }
}

/// Show title from the text in front of an episode marker, cut at a season phrase.
fn show_title_before_marker(text: &str) -> String {
    let text = RE_SEASON_WORD.find(text).map_or(text, |season| &text[..season.start()]);
    normalize(&strip_release_tags(text))
}

/// Build a series verdict from a marker match.
fn series_verdict(caps: &Captures<'_>, title_candidates: Vec<Option<String>>, episode_title: Option<String>) -> Verdict {
    let season = caps["season"].parse().unwrap_or(1);
    let first = caps["episode"].parse().unwrap_or(1);
    let more = caps.name("more").map_or("", |m| m.as_str());
    Verdict::Series {
        title_candidates,
        season,
        episodes: parse_episode_list(first, more),
        episode_title,
    }
}

/// Episode numbers from the first episode and the rest of a multi-episode marker.
///
/// `E02E03` lists episodes, `-E05` or `-05` is a range up to that episode.
fn parse_episode_list(first: u32, more: &str) -> Vec<u32> {
    let mut episodes = vec![first];
    for caps in RE_MORE_EPISODES.captures_iter(more) {
        let Ok(number) = caps["number"].parse::<u32>() else {
            continue;
        };
        let last = episodes.last().copied().unwrap_or(first);
        if caps.name("dash").is_some() && number > last {
            episodes.extend(last + 1..=number);
        } else {
            episodes.push(number);
        }
    }
    episodes.sort_unstable();
    episodes.dedup();
    episodes
}

fn episode_title_after(text: &str, marker_end: usize) -> Option<String> {
    let title = clean_episode_title(text.get(marker_end..).unwrap_or_default());
    if title.is_empty() { None } else { Some(title) }
}
