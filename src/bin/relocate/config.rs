use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use itertools::Itertools;
use serde::Deserialize;

use media_relocate::classify::layout::{DEFAULT_MOVIES_DIR, DEFAULT_SEASON_LABEL, DEFAULT_SERIES_DIR};
use media_relocate::{LibraryLayout, print_error};

use crate::RelocateArgs;

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) aliases: Option<PathBuf>,
    pub(crate) auto: bool,
    pub(crate) cleanup: bool,
    pub(crate) debug: bool,
    pub(crate) destination: Option<PathBuf>,
    pub(crate) dryrun: bool,
    pub(crate) layout: LibraryLayout,
    pub(crate) oracle: bool,
    pub(crate) protected_dirs: Vec<String>,
    pub(crate) sources: Vec<PathBuf>,
    pub(crate) verbose: bool,
}

/// Config from the user config file
#[derive(Debug, Deserialize)]
struct RelocateConfig {
    #[serde(default)]
    aliases: Option<PathBuf>,
    #[serde(default)]
    auto: bool,
    #[serde(default = "default_true")]
    cleanup: bool,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    destination: Option<PathBuf>,
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    movies_dir: Option<String>,
    #[serde(default = "default_true")]
    oracle: bool,
    #[serde(default)]
    protected_dirs: Vec<String>,
    #[serde(default)]
    season_label: Option<String>,
    #[serde(default)]
    series_dir: Option<String>,
    #[serde(default)]
    sources: Vec<PathBuf>,
    #[serde(default)]
    verbose: bool,
}

/// Wrapper needed for parsing the user config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    relocate: RelocateConfig,
}

const fn default_true() -> bool {
    true
}

impl Default for RelocateConfig {
    fn default() -> Self {
        Self {
            aliases: None,
            auto: false,
            cleanup: true,
            debug: false,
            destination: None,
            dryrun: false,
            movies_dir: None,
            oracle: true,
            protected_dirs: Vec::new(),
            season_label: None,
            series_dir: None,
            sources: Vec::new(),
            verbose: false,
        }
    }
}

impl RelocateConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    fn get_user_config() -> Self {
        media_relocate::config::CONFIG_PATH
            .as_deref()
            .filter(|path| path.exists())
            .and_then(|path| {
                fs::read_to_string(path)
                    .map_err(|e| {
                        print_error!("Error reading config file {}: {e}", path.display());
                    })
                    .ok()
            })
            .and_then(|config_string| {
                Self::from_toml_str(&config_string)
                    .map_err(|e| {
                        print_error!("{e}");
                    })
                    .ok()
            })
            .unwrap_or_default()
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.relocate)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))
    }

    /// Library layout with defaults for the directory names that are not set.
    fn layout(&self) -> LibraryLayout {
        LibraryLayout {
            movies_dir: non_empty_or(self.movies_dir.as_deref(), DEFAULT_MOVIES_DIR),
            series_dir: non_empty_or(self.series_dir.as_deref(), DEFAULT_SERIES_DIR),
            season_label: non_empty_or(self.season_label.as_deref(), DEFAULT_SEASON_LABEL),
        }
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    pub fn from_args(args: RelocateArgs) -> Self {
        Self::from_parts(args, RelocateConfig::get_user_config())
    }

    /// Merge CLI arguments over the user config.
    ///
    /// Sources and destination given on the command line replace the configured ones.
    fn from_parts(args: RelocateArgs, user_config: RelocateConfig) -> Self {
        let layout = user_config.layout();
        let sources: Vec<PathBuf> = if args.sources.is_empty() {
            user_config.sources.into_iter().unique().collect()
        } else {
            args.sources.into_iter().unique().collect()
        };
        let protected_dirs: Vec<String> = user_config
            .protected_dirs
            .into_iter()
            .chain(args.protect)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unique()
            .collect();

        Self {
            aliases: args.aliases.or(user_config.aliases),
            auto: args.auto || user_config.auto,
            cleanup: user_config.cleanup && !args.keep_dirs,
            debug: args.debug || user_config.debug,
            destination: args.dest.or(user_config.destination),
            dryrun: args.print || user_config.dryrun,
            layout,
            oracle: user_config.oracle && !args.no_oracle,
            protected_dirs,
            sources,
            verbose: args.verbose || user_config.verbose,
        }
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}
