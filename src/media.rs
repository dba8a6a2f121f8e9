use std::fmt;
use std::path::{Path, PathBuf};

use colored::Colorize;

/// Movie or episodic series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Movie,
    Series,
}

/// Kind-specific identity of a video file.
///
/// Only the fields that belong to the kind exist,
/// so a movie can never carry a season number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaDetails {
    Movie {
        title: String,
        year: Option<u16>,
    },
    Series {
        show_title: String,
        season: u32,
        /// Always at least one entry, in ascending order.
        episodes: Vec<u32>,
        episode_title: Option<String>,
    },
}

/// One classified source video and where it should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub source_path: PathBuf,
    pub details: MediaDetails,
    pub destination_directory: PathBuf,
    pub destination_filename: String,
    /// Name of the classification rule that produced this item.
    pub rule: &'static str,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "Movie"),
            Self::Series => write!(f, "Series"),
        }
    }
}

impl MediaDetails {
    #[must_use]
    pub const fn content_kind(&self) -> ContentKind {
        match self {
            Self::Movie { .. } => ContentKind::Movie,
            Self::Series { .. } => ContentKind::Series,
        }
    }
}

impl MediaItem {
    #[must_use]
    pub const fn content_kind(&self) -> ContentKind {
        self.details.content_kind()
    }

    /// Show title for series, `None` for movies.
    #[must_use]
    pub fn show_title(&self) -> Option<&str> {
        match &self.details {
            MediaDetails::Series { show_title, .. } => Some(show_title),
            MediaDetails::Movie { .. } => None,
        }
    }

    /// Movie title for movies, `None` for series.
    #[must_use]
    pub fn movie_title(&self) -> Option<&str> {
        match &self.details {
            MediaDetails::Movie { title, .. } => Some(title),
            MediaDetails::Series { .. } => None,
        }
    }

    #[must_use]
    pub const fn year(&self) -> Option<u16> {
        match &self.details {
            MediaDetails::Movie { year, .. } => *year,
            MediaDetails::Series { .. } => None,
        }
    }

    #[must_use]
    pub const fn season_number(&self) -> Option<u32> {
        match &self.details {
            MediaDetails::Series { season, .. } => Some(*season),
            MediaDetails::Movie { .. } => None,
        }
    }

    #[must_use]
    pub fn episode_numbers(&self) -> Option<&[u32]> {
        match &self.details {
            MediaDetails::Series { episodes, .. } => Some(episodes),
            MediaDetails::Movie { .. } => None,
        }
    }

    #[must_use]
    pub fn episode_title(&self) -> Option<&str> {
        match &self.details {
            MediaDetails::Series { episode_title, .. } => episode_title.as_deref(),
            MediaDetails::Movie { .. } => None,
        }
    }

    /// Full destination path: directory joined with filename.
    #[must_use]
    pub fn destination_path(&self) -> PathBuf {
        self.destination_directory.join(&self.destination_filename)
    }

    /// Replace the destination with the given full path.
    pub fn set_destination_path(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            self.destination_directory = parent.to_path_buf();
        }
        self.destination_filename = crate::path_to_filename_string(path);
    }

    /// Source filename for display.
    #[must_use]
    pub fn source_filename(&self) -> String {
        crate::path_to_filename_string(&self.source_path)
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.content_kind() {
            ContentKind::Movie => "Movie ".cyan(),
            ContentKind::Series => "Series".magenta(),
        };
        write!(
            f,
            "{kind} {} -> {}",
            self.source_filename(),
            self.destination_path().display()
        )
    }
}
