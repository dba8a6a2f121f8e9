use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;

use media_relocate::MoveReport;

use crate::config::Config;

/// Simple file logger for move runs with buffered writes
pub struct FileLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLogger {
    /// Create a new file logger, writing to ~/logs/media-relocate/relocate_<timestamp>.log
    pub(crate) fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        let log_dir = home_dir.join("logs").join(env!("CARGO_PKG_NAME"));

        if !log_dir.exists() {
            fs::create_dir_all(&log_dir).context("Failed to create log directory")?;
        }

        let log_path = log_dir.join(format!("relocate_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: log_path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log the resolved run configuration
    pub(crate) fn log_init(&mut self, config: &Config, sources: &[PathBuf], destination: &Path, items: usize) {
        let _ = writeln!(
            self.writer,
            "[{}] INIT \"{}\"",
            Self::timestamp(),
            destination.display()
        );
        for source in sources {
            let _ = writeln!(self.writer, "  source: {}", source.display());
        }
        if let Some(aliases) = &config.aliases {
            let _ = writeln!(self.writer, "  aliases: {}", aliases.display());
        }
        if !config.protected_dirs.is_empty() {
            let _ = writeln!(self.writer, "  protected_dirs: {:?}", config.protected_dirs);
        }
        let _ = writeln!(self.writer, "  movies_dir: {}", config.layout.movies_dir);
        let _ = writeln!(self.writer, "  series_dir: {}", config.layout.series_dir);
        let _ = writeln!(self.writer, "  season_label: {}", config.layout.season_label);
        let _ = writeln!(self.writer, "  oracle: {}", config.oracle);
        let _ = writeln!(self.writer, "  cleanup: {}", config.cleanup);
        let _ = writeln!(self.writer, "  items: {items}");
        let _ = self.writer.flush();
    }

    /// Log one completed move
    pub(crate) fn log_move(&mut self, source: &Path, target: &Path) {
        let _ = writeln!(
            self.writer,
            "[{}] MOVE    \"{}\" -> \"{}\"",
            Self::timestamp(),
            source.display(),
            target.display()
        );
    }

    /// Log a move or cleanup failure
    pub(crate) fn log_error(&mut self, error: &str) {
        let _ = writeln!(self.writer, "[{}] ERROR   {}", Self::timestamp(), error);
    }

    /// Log a removed source directory
    pub(crate) fn log_cleanup(&mut self, dir: &Path) {
        let _ = writeln!(self.writer, "[{}] CLEANUP \"{}\"", Self::timestamp(), dir.display());
    }

    /// Log every entry of a finished run followed by the summary
    pub(crate) fn log_report(&mut self, report: &MoveReport, duration: Duration) {
        for info in &report.moved {
            self.log_move(&info.source, &info.target);
        }
        for error in report.errors() {
            self.log_error(error);
        }
        for dir in &report.removed_dirs {
            self.log_cleanup(dir);
        }

        let _ = writeln!(self.writer, "[{}] SUMMARY", Self::timestamp());
        let _ = writeln!(self.writer, "  Files moved:      {}", report.moved.len());
        let _ = writeln!(self.writer, "  Companions moved: {}", report.companions_moved);
        let _ = writeln!(
            self.writer,
            "  Bytes moved:      {} / {}",
            media_relocate::format_size(report.bytes_done),
            media_relocate::format_size(report.bytes_total)
        );
        let _ = writeln!(self.writer, "  Move errors:      {}", report.move_errors.len());
        let _ = writeln!(self.writer, "  Cleanup errors:   {}", report.cleanup_errors.len());
        let _ = writeln!(self.writer, "  Removed dirs:     {}", report.removed_dirs.len());
        if report.cancelled {
            let _ = writeln!(self.writer, "  Cancelled by user");
        }
        let _ = writeln!(
            self.writer,
            "  Total time: {}",
            media_relocate::format_duration(duration)
        );
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
