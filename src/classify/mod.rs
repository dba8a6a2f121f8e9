//! Classification engine.
//!
//! Decides if a video file is a movie or a series episode and computes its destination path.
//! All state needed for one run lives in [`ClassificationContext`]:
//! the read-only alias table, the per-run title memo, folder context rules and the oracles.

pub mod layout;
pub mod rules;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use crate::canonical::{AliasTable, TitleCanonicalizer};
use crate::context::ContextResolver;
use crate::media::{MediaDetails, MediaItem};
use crate::normalize::strip_release_tags;
use crate::oracle::ParserAdapter;

pub use layout::LibraryLayout;
pub use rules::{RuleInput, UNKNOWN_MOVIE, Verdict};

/// Extension used for files without one.
pub const DEFAULT_EXTENSION: &str = "mkv";

/// Everything one classification run needs.
///
/// Create one per run. The title memo inside is mutated on every call,
/// so a context should not be shared between concurrent runs.
#[derive(Debug)]
pub struct ClassificationContext {
    canonicalizer: TitleCanonicalizer,
    resolver: ContextResolver,
    oracles: ParserAdapter,
    layout: LibraryLayout,
    destination_root: PathBuf,
}

impl ClassificationContext {
    /// Context with no aliases, the built-in protected names and oracles, and the default layout.
    #[must_use]
    pub fn new(destination_root: impl Into<PathBuf>) -> Self {
        Self {
            canonicalizer: TitleCanonicalizer::new(Arc::new(AliasTable::default())),
            resolver: ContextResolver::new(),
            oracles: ParserAdapter::with_default_oracles(),
            layout: LibraryLayout::default(),
            destination_root: destination_root.into(),
        }
    }

    #[must_use]
    pub fn with_aliases(mut self, aliases: Arc<AliasTable>) -> Self {
        self.canonicalizer = TitleCanonicalizer::new(aliases);
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: ContextResolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_oracles(mut self, oracles: ParserAdapter) -> Self {
        self.oracles = oracles;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: LibraryLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub const fn canonicalizer(&self) -> &TitleCanonicalizer {
        &self.canonicalizer
    }

    #[must_use]
    pub const fn resolver(&self) -> &ContextResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn oracles(&self) -> &ParserAdapter {
        &self.oracles
    }

    #[must_use]
    pub const fn layout(&self) -> &LibraryLayout {
        &self.layout
    }

    #[must_use]
    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Classify a single video file.
    ///
    /// Never fails: names that match no rule become a movie titled after the cleaned filename.
    pub fn classify(&mut self, source_path: &Path) -> MediaItem {
        let (stem, extension) = crate::get_normalized_file_name_and_extension(source_path).unwrap_or_default();
        let extension = if extension.is_empty() {
            DEFAULT_EXTENSION.to_string()
        } else {
            extension
        };
        let filename: String = crate::path_to_filename_string(source_path).nfc().collect();
        let cleaned_stem = strip_release_tags(&stem);
        let context = self.resolver.resolve_parent_context(source_path);
        let parent_guess = self.resolver.guess_show_from_parent(source_path);

        let (rule, verdict) = rules::evaluate(&RuleInput {
            filename: &filename,
            stem: &stem,
            cleaned_stem: &cleaned_stem,
            context: &context,
            parent_guess: parent_guess.as_deref(),
            oracles: &self.oracles,
        });

        self.build_item(source_path, rule, verdict, &extension)
    }

    /// Resolve titles and compute the destination for a verdict.
    fn build_item(&mut self, source_path: &Path, rule: &'static str, verdict: Verdict, extension: &str) -> MediaItem {
        let (details, (destination_directory, destination_filename)) = match verdict {
            Verdict::Movie { title, year } => {
                let destination = self
                    .layout
                    .movie_destination(&self.destination_root, &title, year, extension);
                (MediaDetails::Movie { title, year }, destination)
            }
            Verdict::Series {
                title_candidates,
                season,
                episodes,
                episode_title,
            } => {
                let show_title = self.canonicalizer.choose_title(title_candidates);
                let episodes = if episodes.is_empty() { vec![1] } else { episodes };
                let destination = self.layout.series_destination(
                    &self.destination_root,
                    &show_title,
                    season,
                    &episodes,
                    episode_title.as_deref(),
                    extension,
                );
                (
                    MediaDetails::Series {
                        show_title,
                        season,
                        episodes,
                        episode_title,
                    },
                    destination,
                )
            }
        };

        MediaItem {
            source_path: source_path.to_path_buf(),
            details,
            destination_directory,
            destination_filename,
            rule,
        }
    }
}
