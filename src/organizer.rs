use crate::dates;
use crate::grouping;
use crate::types::{Group, LabelMap};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const DIR_MISSING: &str = "Directory does not exist.";
pub const MOVE_MISSING: &str = "Source file or destination directory does not exist.";
pub const NO_IMAGES: &str = "No image files found in the directory.";

/// Label used when a context label sanitizes down to nothing.
pub const DEFAULT_CONTEXT_LABEL: &str = "unclassified";

/// Directory label applied to extension-less files at move time. Mere
/// categorization keeps the raw empty key.
pub const NO_EXTENSION_LABEL: &str = "no_extension";

/// Files directly inside `dir`, one level deep, as absolute paths in a
/// stable order. Empty when the directory does not exist.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let root = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let mut files: Vec<PathBuf> = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Immediate subdirectories of `dir`, in a stable order.
pub fn list_folders(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let root = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let mut folders: Vec<PathBuf> = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    folders.sort();
    folders
}

/// Strip every character outside `[A-Za-z0-9_]`; fall back to the default
/// label when nothing survives.
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if cleaned.is_empty() {
        DEFAULT_CONTEXT_LABEL.to_string()
    } else {
        cleaned
    }
}

/// Move one entry into `dest_dir`, creating the directory if absent.
/// Returns true only when the entry was newly relocated; a same-named
/// entry already at the destination means skip, not overwrite.
fn move_into(entry: &Path, dest_dir: &Path) -> std::io::Result<bool> {
    let name = match entry.file_name() {
        Some(n) => n.to_owned(),
        None => return Ok(false),
    };
    std::fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(name);
    if dest.exists() {
        return Ok(false);
    }
    std::fs::rename(entry, &dest)?;
    Ok(true)
}

/// Skip-existing move that logs and swallows per-entry failures, so one bad
/// entry never aborts the batch.
fn try_move_into(entry: &Path, dest_dir: &Path) -> bool {
    match move_into(entry, dest_dir) {
        Ok(moved) => moved,
        Err(e) => {
            warn!("Could not move {}: {}", entry.display(), e);
            false
        }
    }
}

/// Move every group member into a subdirectory named after its group key.
fn move_groups(dir: &Path, groups: &[Group], key_to_dir: impl Fn(&str) -> String) -> usize {
    let mut moved = 0usize;
    for group in groups {
        let dest = dir.join(key_to_dir(&group.key));
        for member in &group.members {
            if try_move_into(member, &dest) {
                moved += 1;
            }
        }
    }
    moved
}

/// `[MOVE FILE]`: move one file into an existing destination directory.
pub fn move_file(source: &Path, dest_dir: &Path) -> String {
    if !source.is_file() || !dest_dir.is_dir() {
        return MOVE_MISSING.to_string();
    }
    match move_into(source, dest_dir) {
        Ok(true) => format!("Moved {} to {}.", source.display(), dest_dir.display()),
        Ok(false) => format!(
            "A file named {} already exists in {}; nothing moved.",
            source.file_name().unwrap_or_default().to_string_lossy(),
            dest_dir.display()
        ),
        Err(e) => {
            warn!("Move failed: {}", e);
            format!("Could not move {}: {}", source.display(), e)
        }
    }
}

/// `[ORGANIZE FILES]`: one subdirectory per extension, extension-less files
/// under the readable fallback label.
pub fn organize_by_extension(dir: &Path) -> String {
    if !dir.is_dir() {
        return DIR_MISSING.to_string();
    }
    let files = list_files(dir);
    let groups = grouping::by_extension(&files);
    let moved = move_groups(dir, &groups, |key| {
        if key.is_empty() {
            NO_EXTENSION_LABEL.to_string()
        } else {
            key.to_string()
        }
    });
    info!("Organized {} files by extension in {}", moved, dir.display());
    format!("Organized {} files by extension in {}.", moved, dir.display())
}

/// `[ORGANIZE IMAGES BY CONTEXT]`: `dir/<date>/<context>/file` layout, date
/// from the resolver chain, context from the supplied label map. Images the
/// map does not cover are left in place.
pub fn organize_images_by_date_context(dir: &Path, labels: &LabelMap) -> String {
    if !dir.is_dir() {
        return DIR_MISSING.to_string();
    }
    let images = grouping::image_files(&list_files(dir));
    if images.is_empty() {
        return NO_IMAGES.to_string();
    }

    let mut moved = 0usize;
    for image in &images {
        let context = match labels.get(image) {
            Some(label) => sanitize_label(label),
            None => continue,
        };
        let date = dates::date_folder_label(dates::resolve_date_taken(image));
        let dest = dir.join(date).join(context);
        if try_move_into(image, &dest) {
            moved += 1;
        }
    }

    format!(
        "Organized {} image files into date and context subfolders in {}.",
        moved,
        dir.display()
    )
}

/// `[ORGANIZE FOLDERS BY PATTERN]`: both destination directories are created
/// up front even when one ends up empty.
pub fn organize_folders_by_pattern(dir: &Path, pattern: &str) -> String {
    if !dir.is_dir() {
        return DIR_MISSING.to_string();
    }

    let matching_dir = dir.join("matching");
    let other_dir = dir.join("other");
    for dest in [&matching_dir, &other_dir] {
        if let Err(e) = std::fs::create_dir_all(dest) {
            warn!("Could not create {}: {}", dest.display(), e);
            return format!("Could not create destination directories in {}.", dir.display());
        }
    }

    let needle = pattern.to_lowercase();
    let mut moved = 0usize;
    for folder in list_folders(dir) {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        // The destinations themselves stay put.
        if name == "matching" || name == "other" {
            continue;
        }
        let dest = if name.to_lowercase().contains(&needle) {
            &matching_dir
        } else {
            &other_dir
        };
        if try_move_into(&folder, dest) {
            moved += 1;
        }
    }

    format!(
        "Organized {} folders by pattern in {}.",
        moved,
        dir.display()
    )
}

/// `[ORGANIZE FOLDERS BY SIZE]`: buckets are empty / small / large, with the
/// band strictly between the thresholds deliberately resolving to small.
pub fn organize_folders_by_size(dir: &Path, small: usize, large: usize) -> String {
    if !dir.is_dir() {
        return DIR_MISSING.to_string();
    }

    let mut moved = 0usize;
    for folder in list_folders(dir) {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name == "empty" || name == "small" || name == "large" {
            continue;
        }
        let count = grouping::folder_file_count(&folder);
        let bucket = grouping::size_bucket(count, small, large);
        if try_move_into(&folder, &dir.join(bucket)) {
            moved += 1;
        }
    }

    format!("Organized {} folders by size in {}.", moved, dir.display())
}
