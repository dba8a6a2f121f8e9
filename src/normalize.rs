//! Name normalization for release-style file and directory names.
//!
//! Turns names like `Show.Name.S01E02.1080p.WEB-DL` or `ShowName_[Group]` into
//! clean human-readable fragments. Everything here is pure string processing.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;

pub(crate) static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

/// Lowercase letter directly followed by an uppercase letter.
static RE_CAMEL_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").expect("Failed to compile camel case regex"));

/// A single bracketed or parenthesised group at the end of the string.
static RE_TRAILING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:\[[^\]]*\]|\([^)]*\))\s*$").expect("Failed to compile trailing tag regex")
});

/// Release group in square brackets at the start of a name.
static RE_LEADING_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[[^\]]*\]\s*").expect("Failed to compile leading group regex"));

static RE_LONG_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[–—]\s*").expect("Failed to compile dash regex"));

/// Release-scene vocabulary: resolutions, codecs, sources, languages and site domains.
/// The keyword itself is captured so the name can be truncated at its start.
static RE_RELEASE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        (?:^|[\s._\-\[(])
        (?P<keyword>
            \d{3,4}[pi] | 4k | uhd
            | [xh]\.?26[45] | hevc | avc | xvid | divx | av1 | 10bit | 8bit | hdr(?:10)?
            | aac(?:\d(?:\.\d)?)? | e?-?ac3 | dts(?:-?hd)? | ddp\d? | dd5 | atmos | truehd | flac | mp3
            | blu-?ray | bd-?rip | br-?rip | bd-?remux | remux | web-?dl | web-?rip | hdtv | pdtv
            | dvd-?rip | dvd-?scr | dvd\d? | hd-?rip | hdtc | telesync | screener
            | proper | repack
            | multi | dual | spanish | castellano | espa[ñn]ol | latino | english | vose | vostfr
            | subbed | dubbed
            | www | [\w-]+\.(?:com|net|org|info)
        )
        (?:$|[\s._\-\])])",
    )
    .expect("Failed to compile release keyword regex")
});

/// A four digit year between 1900 and 2099 as a standalone token.
static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("Failed to compile year regex"));

/// Season and episode marker at the start of an episode title.
static RE_LEADING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:S?\s*\d{1,2}\s*[xE]\s*\d{1,3})(?:\s*[-_.])?\s*").expect("Failed to compile marker regex")
});

/// Season and episode marker at the end of an episode title.
static RE_TRAILING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:[-_.])?\s*(?:S?\s*\d{1,2}\s*[xE]\s*\d{1,3})\s*$").expect("Failed to compile marker regex")
});

static CURRENT_YEAR: LazyLock<i32> = LazyLock::new(|| chrono::Local::now().year());

/// Characters trimmed from the end of a normalized name.
const TRAILING_SEPARATORS: &[char] = &[' ', '-', '–', '—', ':', ',', ';', '_', '.'];

/// Characters trimmed from the start of an episode title.
const LEADING_SEPARATORS: &[char] = &[' ', '.', '-', '_', ':', '–', '—'];

/// Turn a raw name into a clean, space separated title fragment.
///
/// Underscores and dots become spaces, camel-case words are split,
/// whitespace is collapsed and trailing separators are removed.
///
/// ```rust
/// use media_relocate::normalize::normalize;
///
/// assert_eq!(normalize("Show.Name_S01"), "Show Name S01");
/// assert_eq!(normalize("TheOfficeUS -"), "The Office US");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    let spaced = raw.replace(['_', '.'], " ");
    let split = RE_CAMEL_CASE.replace_all(&spaced, "$1 $2");
    let collapsed = RE_WHITESPACE.replace_all(&split, " ");
    collapsed.trim().trim_end_matches(TRAILING_SEPARATORS).trim().to_string()
}

/// Remove stacked trailing `[...]` and `(...)` groups and leading `[...]` release groups.
///
/// Long dashes are normalized to ` - ` and the result is trimmed of spaces and dashes.
///
/// ```rust
/// use media_relocate::normalize::strip_release_tags;
///
/// assert_eq!(strip_release_tags("Movie [1080p] (Group) [x265]"), "Movie");
/// assert_eq!(strip_release_tags("[Group] Show S01E02"), "Show S01E02");
/// assert_eq!(strip_release_tags("Show — Pilot"), "Show - Pilot");
/// ```
#[must_use]
pub fn strip_release_tags(stem: &str) -> String {
    let mut result = stem.to_string();
    loop {
        let stripped = RE_TRAILING_TAG.replace(&result, "");
        let stripped = RE_LEADING_GROUP.replace(&stripped, "");
        if stripped == result {
            break;
        }
        result = stripped.into_owned();
    }
    let result = RE_LONG_DASH.replace_all(&result, " - ");
    RE_WHITESPACE
        .replace_all(&result, " ")
        .trim_matches([' ', '-'])
        .to_string()
}

/// Truncate the name at the first release-scene keyword.
///
/// Everything from the first keyword onwards is considered noise.
/// The result can be empty when the name starts with a keyword;
/// use [`clean_title`] when an empty title is not acceptable.
#[must_use]
pub fn strip_release_keywords(name: &str) -> String {
    RE_RELEASE_KEYWORD
        .captures(name)
        .and_then(|caps| caps.name("keyword"))
        .map_or_else(
            || name.to_string(),
            |keyword| {
                name[..keyword.start()]
                    .trim_end_matches([' ', '.', '_', '-', '[', '('])
                    .to_string()
            },
        )
}

/// Full title cleanup: release tags, release keywords and normalization.
///
/// If keyword stripping would leave nothing, the name before keyword stripping is kept.
///
/// ```rust
/// use media_relocate::normalize::clean_title;
///
/// assert_eq!(clean_title("Some.Movie.2019.1080p.BluRay.x264"), "Some Movie 2019");
/// assert_eq!(clean_title("1080p"), "1080p");
/// ```
#[must_use]
pub fn clean_title(raw: &str) -> String {
    let tagless = strip_release_tags(raw);
    let stripped = strip_release_keywords(&tagless);
    let normalized = normalize(&stripped);
    if normalized.is_empty() {
        normalize(&tagless)
    } else {
        normalized
    }
}

/// Clean the text following a season/episode marker into an episode title.
///
/// Unlike [`clean_title`], this can return an empty string:
/// a remainder consisting only of release noise means there is no episode title.
#[must_use]
pub fn clean_episode_title(remainder: &str) -> String {
    let text = remainder.trim_start_matches(LEADING_SEPARATORS);
    let text = RE_LEADING_MARKER.replace(text, "");
    let text = RE_TRAILING_MARKER.replace(&text, "");
    let text = strip_release_tags(&text);
    let text = strip_release_keywords(&text);
    normalize(&text)
}

/// Find the release year in a name.
///
/// Returns the last plausible year and its byte offset.
/// A year at the very start of the name is part of the title (think "2012"),
/// and years after next year are not release years ("Blade Runner 2049").
#[must_use]
pub fn find_release_year(name: &str) -> Option<(u16, usize)> {
    let max_year = *CURRENT_YEAR + 1;
    RE_YEAR
        .captures_iter(name)
        .filter_map(|caps| caps.get(1))
        .filter(|year| year.start() > 0)
        .filter_map(|year| {
            let value: u16 = year.as_str().parse().ok()?;
            (i32::from(value) <= max_year).then_some((value, year.start()))
        })
        .last()
}
