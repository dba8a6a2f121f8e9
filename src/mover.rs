//! Move engine.
//!
//! Executes a classification plan: rename when possible, chunked copy across devices,
//! companion files alongside the video, and cleanup of emptied source directories.

use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::context::ContextResolver;
use crate::media::MediaItem;
use crate::planner::is_video_file;
use crate::sanitize::sanitize_filename;

/// Extensions of files that travel with a video when they share its stem.
pub const COMPANION_EXTENSIONS: &[&str] = &["srt", "sub", "idx", "ass", "ssa", "vtt", "nfo", "jpg", "jpeg", "png", "txt"];

/// Chunk size for cross-device copies.
pub const COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Progress callback: bytes done, bytes total and the label of the current item.
///
/// Called from whichever thread runs the plan.
pub type ProgressCallback<'a> = dyn Fn(u64, u64, &str) + Send + Sync + 'a;

/// One completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveInfo {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Result of executing a plan.
#[derive(Debug, Default, Clone)]
pub struct MoveReport {
    pub moved: Vec<MoveInfo>,
    pub companions_moved: usize,
    pub bytes_done: u64,
    pub bytes_total: u64,
    pub move_errors: Vec<String>,
    pub cleanup_errors: Vec<String>,
    pub removed_dirs: Vec<PathBuf>,
    /// True if the run stopped early because cancellation was requested.
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub enum MoveOutcome {
    /// Empty plan or nothing but zero-byte files.
    NothingToDo,
    Completed(MoveReport),
}

/// Executes move plans.
#[derive(Debug, Clone)]
pub struct MoveEngine {
    source_roots: Vec<PathBuf>,
    resolver: ContextResolver,
    cleanup: bool,
    cancel_flag: Arc<AtomicBool>,
}

/// Shared byte counter that reports every increment.
struct ProgressCounter<'a> {
    done: AtomicU64,
    total: u64,
    callback: &'a ProgressCallback<'a>,
}

impl MoveReport {
    /// All move and cleanup errors.
    pub fn errors(&self) -> impl Iterator<Item = &String> {
        self.move_errors.iter().chain(self.cleanup_errors.iter())
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.move_errors.is_empty() || !self.cleanup_errors.is_empty()
    }
}

impl<'a> ProgressCounter<'a> {
    const fn new(total: u64, callback: &'a ProgressCallback<'a>) -> Self {
        Self {
            done: AtomicU64::new(0),
            total,
            callback,
        }
    }

    fn add(&self, bytes: u64, label: &str) {
        let done = self.done.fetch_add(bytes, Ordering::SeqCst) + bytes;
        (self.callback)(done, self.total, label);
    }

    fn done(&self) -> u64 {
        self.done.load(Ordering::SeqCst)
    }
}

impl MoveEngine {
    /// Engine with cleanup enabled and the built-in protected directory names.
    #[must_use]
    pub fn new(source_roots: Vec<PathBuf>) -> Self {
        Self {
            resolver: ContextResolver::new().with_source_roots(&source_roots),
            source_roots,
            cleanup: true,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use the given resolver for protected directory names.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ContextResolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub const fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Share a cancellation flag. Setting it stops the run before the next item.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = flag;
        self
    }

    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_flag)
    }

    #[must_use]
    pub fn source_roots(&self) -> &[PathBuf] {
        &self.source_roots
    }

    /// Move every item in plan order.
    ///
    /// A failing item is recorded in the report and the rest of the plan continues.
    /// Already completed moves are never rolled back.
    pub fn execute_plan(&self, items: &[MediaItem], progress: &ProgressCallback<'_>) -> MoveOutcome {
        let companions = assign_companion_files(items);
        let bytes_total = plan_bytes(items, &companions);
        if items.is_empty() || bytes_total == 0 {
            return MoveOutcome::NothingToDo;
        }

        let counter = ProgressCounter::new(bytes_total, progress);
        let mut report = MoveReport {
            bytes_total,
            ..MoveReport::default()
        };

        for (item, item_companions) in items.iter().zip(&companions) {
            if self.cancel_flag.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }
            if let Err(error) = Self::move_item(item, item_companions, &counter, &mut report) {
                report.move_errors.push(format!(
                    "Failed to move '{}' -> '{}': {error:#}",
                    item.source_path.display(),
                    item.destination_path().display()
                ));
            }
        }

        if self.cleanup {
            self.cleanup_source_dirs(&mut report);
        }

        report.bytes_done = counter.done();
        MoveOutcome::Completed(report)
    }

    /// Move one video and its companion files.
    fn move_item(
        item: &MediaItem,
        companions: &[PathBuf],
        counter: &ProgressCounter<'_>,
        report: &mut MoveReport,
    ) -> Result<()> {
        fs::create_dir_all(&item.destination_directory).with_context(|| {
            format!(
                "Failed to create directory: {}",
                item.destination_directory.display()
            )
        })?;

        let target = unique_destination(&item.destination_path());
        let label = crate::path_to_filename_string(&target);

        move_file(&item.source_path, &target, &|bytes| counter.add(bytes, &label))?;
        report.moved.push(MoveInfo {
            source: item.source_path.clone(),
            target: target.clone(),
        });

        let target_stem = crate::path_to_file_stem_string(&target);
        for companion in companions {
            let extension = crate::os_str_to_string(companion.extension().unwrap_or_default());
            let companion_target =
                unique_destination(&item.destination_directory.join(sanitize_filename(&format!("{target_stem}.{extension}"))));
            match move_file(companion, &companion_target, &|bytes| counter.add(bytes, &label)) {
                Ok(()) => report.companions_moved += 1,
                Err(error) => report.move_errors.push(format!(
                    "Failed to move companion '{}' -> '{}': {error:#}",
                    companion.display(),
                    companion_target.display()
                )),
            }
        }

        Ok(())
    }

    /// Delete source directories left without videos after the moves.
    ///
    /// Only the directory a file was moved out of is removed together with its leftovers.
    /// Its ancestors up to the source root are removed only if they are empty afterwards.
    fn cleanup_source_dirs(&self, report: &mut MoveReport) {
        let candidates: BTreeSet<PathBuf> = report
            .moved
            .iter()
            .filter_map(|info| info.source.parent())
            .filter(|dir| self.is_removable_location(dir))
            .map(Path::to_path_buf)
            .collect();

        let mut ordered: Vec<PathBuf> = candidates.into_iter().collect();
        ordered.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));

        for dir in ordered {
            if !dir.is_dir() || self.has_content_to_keep(&dir) {
                continue;
            }
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    report.removed_dirs.push(dir.clone());
                    self.remove_empty_ancestors(&dir, report);
                }
                Err(error) => report
                    .cleanup_errors
                    .push(format!("Failed to remove directory '{}': {error}", dir.display())),
            }
        }
    }

    /// Walk up from a removed directory, removing parents that are now empty.
    fn remove_empty_ancestors(&self, dir: &Path, report: &mut MoveReport) {
        let mut current = dir.parent();
        while let Some(parent) = current {
            if !self.is_removable_location(parent) || !is_empty_dir(parent) {
                break;
            }
            if let Err(error) = fs::remove_dir(parent) {
                report
                    .cleanup_errors
                    .push(format!("Failed to remove directory '{}': {error}", parent.display()));
                break;
            }
            report.removed_dirs.push(parent.to_path_buf());
            current = parent.parent();
        }
    }

    /// Strictly inside a source root and not protected by name.
    fn is_removable_location(&self, dir: &Path) -> bool {
        let under_root = self
            .source_roots
            .iter()
            .any(|root| dir != root.as_path() && dir.starts_with(root));
        under_root && !self.resolver.is_protected_name(&crate::path_to_filename_string(dir))
    }

    /// A directory is kept if anything below it is a video or a protected directory.
    /// Unreadable entries also keep it.
    fn has_content_to_keep(&self, dir: &Path) -> bool {
        WalkDir::new(dir).min_depth(1).into_iter().any(|entry| match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    self.resolver
                        .is_protected_name(&crate::os_str_to_string(entry.file_name()))
                } else {
                    is_video_file(entry.path())
                }
            }
            Err(_) => true,
        })
    }
}

/// Reject a move request before any I/O.
///
/// # Errors
/// Returns an error if there are no sources, the destination is empty,
/// a source does not exist, or the destination is inside a source.
pub fn validate_plan_request(sources: &[PathBuf], destination: &Path) -> Result<()> {
    if sources.is_empty() {
        anyhow::bail!("No source directories given");
    }
    if destination.as_os_str().is_empty() {
        anyhow::bail!("No destination directory given");
    }
    for source in sources {
        if !source.exists() {
            anyhow::bail!("Source directory does not exist: {}", source.display());
        }
        if destination.starts_with(source) {
            anyhow::bail!(
                "Destination {} is inside source directory {}",
                destination.display(),
                source.display()
            );
        }
    }
    Ok(())
}

/// Sum of the sizes of every video and its companion files.
/// Files that cannot be read count as zero.
#[must_use]
pub fn compute_total_bytes(items: &[MediaItem]) -> u64 {
    plan_bytes(items, &assign_companion_files(items))
}

/// Companion files for each item, in plan order.
///
/// A companion shared by several videos with the same stem belongs to the first of them only.
#[must_use]
pub fn assign_companion_files(items: &[MediaItem]) -> Vec<Vec<PathBuf>> {
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    items
        .iter()
        .map(|item| {
            list_companion_files(&item.source_path)
                .into_iter()
                .filter(|companion| claimed.insert(companion.clone()))
                .collect()
        })
        .collect()
}

fn plan_bytes(items: &[MediaItem], companions: &[Vec<PathBuf>]) -> u64 {
    items
        .iter()
        .map(|item| &item.source_path)
        .chain(companions.iter().flatten())
        .map(|path| fs::metadata(path).map_or(0, |metadata| metadata.len()))
        .sum()
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none())
}

/// Files next to the video with exactly the same stem and a companion extension, sorted by name.
#[must_use]
pub fn list_companion_files(video: &Path) -> Vec<PathBuf> {
    let (Some(dir), Some(stem)) = (video.parent(), video.file_stem()) else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut companions: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.file_stem() == Some(stem)
                && COMPANION_EXTENSIONS.contains(&crate::path_to_file_extension_string(path).as_str())
        })
        .collect();
    companions.sort();
    companions
}

/// First path that does not exist: the path itself or with a ` (N)` suffix before the extension.
#[must_use]
pub fn unique_destination(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    (1..)
        .map(|index| crate::insert_suffix_before_extension(path, &format!(" ({index})")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Move a single file, reporting moved bytes.
///
/// Tries an atomic rename first. Only a cross-device error falls back to copy and delete.
///
/// # Errors
/// Returns an error if the source cannot be read, the rename fails for any other reason,
/// or the fallback copy or source removal fails.
pub fn move_file(source: &Path, target: &Path, on_bytes: &dyn Fn(u64)) -> Result<()> {
    let size = fs::metadata(source)
        .with_context(|| format!("Failed to read metadata: {}", source.display()))?
        .len();

    match fs::rename(source, target) {
        Ok(()) => {
            on_bytes(size);
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => copy_and_remove(source, target, on_bytes),
        Err(error) => Err(error).with_context(|| format!("Failed to rename to {}", target.display())),
    }
}

/// Cross-device fallback: copy the file, then delete the source.
///
/// The source is kept if the copy fails.
fn copy_and_remove(source: &Path, target: &Path, on_bytes: &dyn Fn(u64)) -> Result<()> {
    copy_with_progress(source, target, on_bytes)?;
    fs::remove_file(source).with_context(|| format!("Copied but failed to remove source file: {}", source.display()))
}

/// Copy in fixed size chunks, reporting every chunk.
///
/// The target must not exist. A partially written target is removed on failure.
/// Permissions and modification time are copied on a best-effort basis.
///
/// # Errors
/// Returns an error if reading or writing fails.
pub fn copy_with_progress(source: &Path, target: &Path, on_bytes: &dyn Fn(u64)) -> Result<()> {
    let mut input = File::open(source).with_context(|| format!("Failed to open: {}", source.display()))?;
    let mut output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .with_context(|| format!("Failed to create: {}", target.display()))?;

    if let Err(error) = copy_chunks(&mut input, &mut output, on_bytes) {
        drop(output);
        let _ = fs::remove_file(target);
        return Err(error).with_context(|| format!("Failed to copy {} to {}", source.display(), target.display()));
    }

    if let Ok(metadata) = input.metadata() {
        if let Ok(modified) = metadata.modified() {
            let _ = output.set_modified(modified);
        }
        let _ = fs::set_permissions(target, metadata.permissions());
    }
    Ok(())
}

fn copy_chunks(input: &mut File, output: &mut File, on_bytes: &dyn Fn(u64)) -> io::Result<()> {
    let mut buffer = vec![0_u8; COPY_BUFFER_SIZE];
    loop {
        let read = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };
        output.write_all(&buffer[..read])?;
        on_bytes(read as u64);
    }
    output.flush()?;
    output.sync_all()
}

#[cfg(test)]
mod mover_tests {
    use super::*;

    use std::sync::Mutex;

    use tempfile::tempdir;

    use crate::media::MediaDetails;

    fn movie_item(source: &Path, destination_dir: &Path, filename: &str) -> MediaItem {
        MediaItem {
            source_path: source.to_path_buf(),
            details: MediaDetails::Movie {
                title: "Movie".to_string(),
                year: None,
            },
            destination_directory: destination_dir.to_path_buf(),
            destination_filename: filename.to_string(),
            rule: "test",
        }
    }

    fn no_progress() -> Box<ProgressCallback<'static>> {
        Box::new(|_, _, _| {})
    }

    #[test]
    fn unique_destination_increments_suffix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("name.mkv");
        assert_eq!(unique_destination(&path), path);
        fs::write(&path, "x").unwrap();
        assert_eq!(unique_destination(&path), dir.path().join("name (1).mkv"));
        fs::write(dir.path().join("name (1).mkv"), "x").unwrap();
        assert_eq!(unique_destination(&path), dir.path().join("name (2).mkv"));
    }

    #[test]
    fn companions_match_exact_stem_and_extension() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("Movie.mkv");
        for name in ["Movie.mkv", "Movie.srt", "Movie.NFO", "Movie.jpg", "Movie.en.srt", "Movie.exe", "Other.srt"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let names: Vec<String> = list_companion_files(&video)
            .iter()
            .map(|path| crate::path_to_filename_string(path))
            .collect();
        assert_eq!(names, vec!["Movie.NFO", "Movie.jpg", "Movie.srt"]);
    }

    #[test]
    fn copy_reports_every_byte() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("big.bin");
        let target = dir.path().join("copy.bin");
        let data = vec![7_u8; COPY_BUFFER_SIZE * 2 + 123];
        fs::write(&source, &data).unwrap();

        let reported = Mutex::new(Vec::new());
        copy_with_progress(&source, &target, &|bytes| reported.lock().unwrap().push(bytes)).unwrap();

        let reported = reported.into_inner().unwrap();
        assert_eq!(reported.iter().sum::<u64>(), data.len() as u64);
        assert!(reported.iter().all(|&chunk| chunk <= COPY_BUFFER_SIZE as u64));
        assert_eq!(fs::read(&target).unwrap(), data);
        assert!(source.exists());
    }

    #[test]
    fn copy_never_overwrites() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.bin");
        let target = dir.path().join("b.bin");
        fs::write(&source, "new").unwrap();
        fs::write(&target, "old").unwrap();
        assert!(copy_with_progress(&source, &target, &|_| {}).is_err());
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn move_file_renames_and_reports_size() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.mkv");
        let target = dir.path().join("b.mkv");
        fs::write(&source, "12345").unwrap();
        let total = AtomicU64::new(0);
        move_file(&source, &target, &|bytes| {
            total.fetch_add(bytes, Ordering::SeqCst);
        })
        .unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "12345");
        assert_eq!(total.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn copy_and_remove_moves_content() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("video.mkv");
        let target = dir.path().join("moved.mkv");
        fs::write(&source, "content").unwrap();

        let total = AtomicU64::new(0);
        copy_and_remove(&source, &target, &|bytes| {
            total.fetch_add(bytes, Ordering::SeqCst);
        })
        .unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "content");
        assert_eq!(total.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn copy_and_remove_keeps_source_when_copy_fails() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("video.mkv");
        let target = dir.path().join("existing.mkv");
        fs::write(&source, "new").unwrap();
        fs::write(&target, "old").unwrap();

        assert!(copy_and_remove(&source, &target, &|_| {}).is_err());
        assert_eq!(fs::read_to_string(&source).unwrap(), "new");
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn shared_companion_belongs_to_first_item() {
        let dir = tempdir().unwrap();
        let avi = dir.path().join("Movie.avi");
        let mkv = dir.path().join("Movie.mkv");
        fs::write(&avi, "a".repeat(100)).unwrap();
        fs::write(&mkv, "b".repeat(100)).unwrap();
        fs::write(dir.path().join("Movie.srt"), "s".repeat(50)).unwrap();
        let items = vec![
            movie_item(&avi, &dir.path().join("out"), "Movie.avi"),
            movie_item(&mkv, &dir.path().join("out"), "Movie.mkv"),
        ];

        let companions = assign_companion_files(&items);
        assert_eq!(companions[0], vec![dir.path().join("Movie.srt")]);
        assert!(companions[1].is_empty());
        assert_eq!(compute_total_bytes(&items), 250);
    }

    #[test]
    fn move_file_missing_source_is_error() {
        let dir = tempdir().unwrap();
        assert!(move_file(&dir.path().join("missing"), &dir.path().join("x"), &|_| {}).is_err());
    }

    #[test]
    fn empty_plan_is_nothing_to_do() {
        let engine = MoveEngine::new(vec![]);
        assert!(matches!(engine.execute_plan(&[], &*no_progress()), MoveOutcome::NothingToDo));
    }

    #[test]
    fn zero_byte_plan_is_nothing_to_do() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("empty.mkv");
        fs::write(&source, "").unwrap();
        let item = movie_item(&source, &dir.path().join("out"), "empty.mkv");
        let engine = MoveEngine::new(vec![dir.path().to_path_buf()]);
        assert!(matches!(engine.execute_plan(&[item], &*no_progress()), MoveOutcome::NothingToDo));
        assert!(source.exists());
    }

    #[test]
    fn failing_item_does_not_stop_the_plan() {
        let source_dir = tempdir().unwrap();
        let library = tempdir().unwrap();
        let good = source_dir.path().join("good.mkv");
        fs::write(&good, "good").unwrap();
        let missing = source_dir.path().join("missing.mkv");

        let items = vec![
            movie_item(&missing, library.path(), "missing.mkv"),
            movie_item(&good, library.path(), "good.mkv"),
        ];
        let engine = MoveEngine::new(vec![source_dir.path().to_path_buf()]).with_cleanup(false);
        let MoveOutcome::Completed(report) = engine.execute_plan(&items, &*no_progress()) else {
            panic!("expected completed run");
        };
        assert_eq!(report.moved.len(), 1);
        assert_eq!(report.move_errors.len(), 1);
        assert!(report.move_errors[0].contains("missing.mkv"));
        assert!(library.path().join("good.mkv").exists());
    }

    #[test]
    fn cancellation_stops_before_next_item() {
        let source_dir = tempdir().unwrap();
        let library = tempdir().unwrap();
        let first = source_dir.path().join("first.mkv");
        let second = source_dir.path().join("second.mkv");
        fs::write(&first, "1").unwrap();
        fs::write(&second, "2").unwrap();
        let items = vec![
            movie_item(&first, library.path(), "first.mkv"),
            movie_item(&second, library.path(), "second.mkv"),
        ];

        let engine = MoveEngine::new(vec![source_dir.path().to_path_buf()]).with_cleanup(false);
        let flag = engine.cancel_flag();
        let cancel_after_first = move |_: u64, _: u64, _: &str| flag.store(true, Ordering::SeqCst);
        let MoveOutcome::Completed(report) = engine.execute_plan(&items, &cancel_after_first) else {
            panic!("expected completed run");
        };
        assert!(report.cancelled);
        assert_eq!(report.moved.len(), 1);
        assert!(second.exists());
    }

    #[test]
    fn validate_rejects_bad_requests() {
        let dir = tempdir().unwrap();
        let source = dir.path().to_path_buf();
        assert!(validate_plan_request(&[], Path::new("/lib")).is_err());
        assert!(validate_plan_request(std::slice::from_ref(&source), Path::new("")).is_err());
        assert!(validate_plan_request(&[source.join("missing")], Path::new("/lib")).is_err());
        assert!(validate_plan_request(std::slice::from_ref(&source), &source.join("library")).is_err());
        assert!(validate_plan_request(&[source], Path::new("/lib")).is_ok());
    }
}
