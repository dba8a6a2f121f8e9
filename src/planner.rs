//! Source scanning and plan building.
//!
//! Analysis is read-only: nothing here touches the files it finds.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::classify::ClassificationContext;
use crate::media::MediaItem;

/// File extensions treated as video.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "mkv", "mp4", "mov", "wmv", "flv", "m4v", "mpg", "mpeg", "webm", "m2ts",
];

/// Sample clips, trailers and release-site tags.
static RE_SAMPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:sample|trailer|\b(?:rarbg|yts|ettv|eztv)\b)").expect("Failed to compile sample regex")
});

/// Check if the path has a video file extension (case-insensitive).
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    let extension = crate::path_to_file_extension_string(path);
    VIDEO_EXTENSIONS.contains(&extension.as_str())
}

/// Check if a filename looks like a sample, trailer or release-site tagged file.
#[must_use]
pub fn is_sample_name(name: &str) -> bool {
    RE_SAMPLE.is_match(name)
}

/// Recursively collect the video files under the given source roots.
///
/// Hidden files and directories are skipped, as are samples and trailers.
/// Each root is walked in file name order so the result is reproducible.
/// Roots that are not directories are ignored.
#[must_use]
pub fn scan_sources(roots: &[PathBuf]) -> Vec<PathBuf> {
    roots
        .iter()
        .filter(|root| root.is_dir())
        .flat_map(|root| {
            WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !crate::is_hidden(entry))
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(walkdir::DirEntry::into_path)
                .filter(|path| is_video_file(path) && !is_sample_name(&crate::path_to_filename_string(path)))
        })
        .collect()
}

/// Classify every file and make the destination paths unique.
///
/// Files that are already at their destination are left out.
/// A destination that is taken by an earlier item in the plan or by an existing file
/// gets a ` (N)` suffix before the extension.
pub fn build_plan(files: &[PathBuf], context: &mut ClassificationContext) -> Vec<MediaItem> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut plan = Vec::with_capacity(files.len());
    for path in files {
        let mut item = context.classify(path);
        let destination = item.destination_path();
        if destination == item.source_path {
            continue;
        }
        let unique = unique_plan_destination(&destination, &taken);
        taken.insert(destination_key(&unique));
        if unique != destination {
            item.set_destination_path(&unique);
        }
        plan.push(item);
    }
    plan
}

/// Scan the source roots and build the plan in one go.
pub fn analyze_sources(roots: &[PathBuf], context: &mut ClassificationContext) -> Vec<MediaItem> {
    let files = scan_sources(roots);
    build_plan(&files, context)
}

/// First free variant of the destination: not already planned and not on disk.
fn unique_plan_destination(destination: &Path, taken: &HashSet<String>) -> PathBuf {
    let is_free = |path: &Path| !taken.contains(&destination_key(path)) && !path.exists();
    if is_free(destination) {
        return destination.to_path_buf();
    }
    (1..)
        .map(|index| crate::insert_suffix_before_extension(destination, &format!(" ({index})")))
        .find(|candidate| is_free(candidate))
        .unwrap_or_else(|| destination.to_path_buf())
}

/// Case-insensitive comparison key, since library shares are often case-insensitive.
fn destination_key(path: &Path) -> String {
    crate::path_to_string(path).to_lowercase()
}
