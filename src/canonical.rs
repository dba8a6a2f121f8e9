//! Canonical show titles.
//!
//! The same show shows up under many surface forms: `Pokemon`, `Pokémon`, `pokemon`,
//! `Greys Anatomy`, `Grey's Anatomy`. Every form is reduced to a comparison key
//! (accents removed, lowercase, alphanumeric only) and mapped to one display title,
//! first through the alias table and then through a per-run memo.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::normalize::normalize;
use crate::print_warning;
use crate::sanitize::sanitize_filename;

/// Title used when nothing better can be determined.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Read-only mapping from title keys to canonical show titles.
#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    titles: HashMap<String, String>,
}

/// One entry in the alias file: a plain list of aliases or an object with an `aliases` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AliasEntry {
    List(Vec<String>),
    Detailed {
        #[serde(default)]
        aliases: Vec<String>,
    },
}

/// Per-run memory of the most complete surface form seen for each title key.
#[derive(Debug, Default, Clone)]
pub struct TitleMemo {
    titles: HashMap<String, String>,
}

/// Maps candidate titles to stable canonical titles for one classification run.
#[derive(Debug, Clone)]
pub struct TitleCanonicalizer {
    aliases: Arc<AliasTable>,
    memo: TitleMemo,
}

/// Comparison key for a title: accents stripped, lowercase, alphanumeric characters only.
///
/// ```rust
/// use media_relocate::canonical::title_key;
///
/// assert_eq!(title_key("Pokémon: The Movie"), "pokemonthemovie");
/// assert_eq!(title_key("Grey's Anatomy"), "greysanatomy");
/// ```
#[must_use]
pub fn title_key(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Clean a candidate into display form: normalized and filesystem-safe.
fn display_form(candidate: &str) -> String {
    sanitize_filename(&normalize(candidate))
}

impl AliasTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canonical title and its aliases.
    /// The canonical title is always registered as an alias of itself.
    pub fn insert<I, S>(&mut self, canonical: &str, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical = canonical.trim();
        if canonical.is_empty() {
            return;
        }
        for alias in std::iter::once(canonical.to_string()).chain(aliases.into_iter().map(|a| a.as_ref().to_string())) {
            let key = title_key(&alias);
            if !key.is_empty() {
                self.titles.insert(key, canonical.to_string());
            }
        }
    }

    /// Parse an alias table from a JSON document.
    ///
    /// # Errors
    /// Returns an error if the JSON is invalid or has an unexpected shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: HashMap<String, AliasEntry> =
            serde_json::from_str(json).context("Failed to parse alias JSON")?;
        Ok(Self::from_entries(entries))
    }

    /// Parse an alias table from a TOML document.
    ///
    /// # Errors
    /// Returns an error if the TOML is invalid or has an unexpected shape.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let entries: HashMap<String, AliasEntry> =
            toml::from_str(toml_str).map_err(|e| anyhow::anyhow!("Failed to parse alias TOML: {e}"))?;
        Ok(Self::from_entries(entries))
    }

    /// Read an alias file. Files with a `.toml` extension are parsed as TOML, everything else as JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read alias file {}", path.display()))?;
        if crate::path_to_file_extension_string(path) == "toml" {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Read an alias file if one is given, falling back to an empty table on any failure.
    #[must_use]
    pub fn load_or_default(path: Option<&Path>, verbose: bool) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        if !path.exists() {
            if verbose {
                println!("No alias file found at {}", path.display());
            }
            return Self::default();
        }
        match Self::load(path) {
            Ok(table) => {
                if verbose {
                    println!("Loaded {} title aliases from {}", table.len(), path.display());
                }
                table
            }
            Err(error) => {
                if verbose {
                    print_warning!("Ignoring alias file: {error:#}");
                }
                Self::default()
            }
        }
    }

    fn from_entries(entries: HashMap<String, AliasEntry>) -> Self {
        let mut table = Self::new();
        for (canonical, entry) in entries {
            let aliases = match entry {
                AliasEntry::List(aliases) | AliasEntry::Detailed { aliases } => aliases,
            };
            table.insert(&canonical, aliases);
        }
        table
    }

    /// Canonical title for the given title key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.titles.get(key).map(String::as_str)
    }

    /// Canonical title for the given surface form.
    #[must_use]
    pub fn lookup(&self, title: &str) -> Option<&str> {
        self.get(&title_key(title))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl TitleMemo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation of `candidate` under `key` and return the current canonical form.
    ///
    /// The first observation becomes canonical. A later one replaces it
    /// if it has more non-ASCII characters (accents) or is strictly longer.
    pub fn observe(&mut self, key: String, candidate: &str) -> String {
        match self.titles.entry(key) {
            Entry::Vacant(entry) => entry.insert(candidate.to_string()).clone(),
            Entry::Occupied(mut entry) => {
                if is_more_complete(candidate, entry.get()) {
                    entry.insert(candidate.to_string());
                }
                entry.get().clone()
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.titles.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

fn is_more_complete(candidate: &str, current: &str) -> bool {
    let non_ascii = |s: &str| s.chars().filter(|c| !c.is_ascii()).count();
    non_ascii(candidate) > non_ascii(current) || candidate.chars().count() > current.chars().count()
}

impl TitleCanonicalizer {
    /// Create a canonicalizer with a fresh memo.
    #[must_use]
    pub fn new(aliases: Arc<AliasTable>) -> Self {
        Self {
            aliases,
            memo: TitleMemo::new(),
        }
    }

    /// Map a candidate title to its canonical form.
    ///
    /// The alias table always wins. Otherwise the per-run memo decides,
    /// so the result can depend on the order titles are observed in.
    pub fn canonicalize(&mut self, candidate: &str) -> String {
        let title = display_form(candidate);
        if title.is_empty() {
            return UNKNOWN_TITLE.to_string();
        }
        let key = title_key(&title);
        if key.is_empty() {
            return title;
        }
        if let Some(canonical) = self.aliases.get(&key) {
            return canonical.to_string();
        }
        self.memo.observe(key, &title)
    }

    /// Canonical form of the first candidate that is not blank after cleaning.
    /// Returns [`UNKNOWN_TITLE`] if all candidates are blank.
    pub fn choose_title<I, S>(&mut self, candidates: I) -> String
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        candidates
            .into_iter()
            .flatten()
            .find(|candidate| !display_form(candidate.as_ref()).is_empty())
            .map_or_else(
                || UNKNOWN_TITLE.to_string(),
                |candidate| self.canonicalize(candidate.as_ref()),
            )
    }

    #[must_use]
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    #[must_use]
    pub const fn memo(&self) -> &TitleMemo {
        &self.memo
    }
}
