use crate::grouping;
use crate::labeler::{ImageLabeler, LabelBatch};
use crate::organizer;
use crate::parser;
use crate::types::{render_groups, Command, Group, LabelMap};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const INVALID_ARGS: &str = "Invalid command arguments.";
pub const CANCELLED: &str = "Action cancelled.";
pub const NO_PREVIOUS: &str = "No previous file list available.";
pub const NO_CONTEXT_MAP: &str =
    "No image context map available. Categorize images by context first.";

pub type ConfirmFn = Box<dyn FnMut(&str) -> bool + Send>;

/// Routes parsed commands to the engines, gates mutating actions behind the
/// confirmation callback, and owns the per-process session state. One
/// instance per run; one command per turn.
pub struct Dispatcher {
    labeler: Option<Box<dyn ImageLabeler>>,
    confirm: ConfirmFn,
    previous_files: Option<Vec<PathBuf>>,
    last_image_context: Option<LabelMap>,
}

impl Dispatcher {
    pub fn new(labeler: Option<Box<dyn ImageLabeler>>, confirm: ConfirmFn) -> Self {
        Self {
            labeler,
            confirm,
            previous_files: None,
            last_image_context: None,
        }
    }

    /// Process one raw model response to completion and return the text to
    /// show the user. Total: never errors, never panics.
    pub async fn handle(&mut self, raw: &str) -> String {
        let command = parser::parse(raw);
        debug!("Parsed command: {:?}", command);

        if let Some(problem) = validate(&command) {
            return problem.to_string();
        }

        if command.needs_confirmation() {
            let prompt = format!("About to {}. Proceed?", command.describe());
            if !(self.confirm)(&prompt) {
                info!("User declined: {}", command.describe());
                return CANCELLED.to_string();
            }
        }

        match command {
            Command::ListFiles { dir } => self.list_files(&resolve_dir(&dir)),
            Command::MoveFile { source, dest } => {
                organizer::move_file(Path::new(&source), &resolve_dir(&dest))
            }
            Command::OrganizeFiles { dir } => organizer::organize_by_extension(&resolve_dir(&dir)),
            Command::CategorizeFiles { dir } => categorize(&resolve_dir(&dir), |files| {
                grouping::by_extension(files)
            }),
            Command::CategorizeByName { dir } => categorize(&resolve_dir(&dir), |files| {
                grouping::by_name_context(files)
            }),
            Command::CategorizeByContent { dir } => categorize(&resolve_dir(&dir), |files| {
                grouping::by_content_keyword(files)
            }),
            Command::CategorizeImages { dir } => self.categorize_images(&resolve_dir(&dir)).await,
            Command::OrganizeImages { dir } => self.organize_images(&resolve_dir(&dir)).await,
            Command::CategorizeFoldersByPattern { dir, pattern } => {
                categorize_folders_by_pattern(&resolve_dir(&dir), &pattern)
            }
            Command::OrganizeFoldersByPattern { dir, pattern } => {
                organizer::organize_folders_by_pattern(&resolve_dir(&dir), &pattern)
            }
            Command::CategorizeFoldersBySize { dir } => {
                categorize_folders_by_size(&resolve_dir(&dir))
            }
            Command::OrganizeFoldersBySize { dir, small, large } => {
                organizer::organize_folders_by_size(&resolve_dir(&dir), small, large)
            }
            Command::CountPreviousFiles => self.count_previous_files(),
            Command::Unrecognized(raw) => raw,
        }
    }

    /// `[LIST FILES]`: the result list replaces the previous one wholesale.
    fn list_files(&mut self, dir: &Path) -> String {
        let files = organizer::list_files(dir);
        let listing = if files.is_empty() {
            "No files found.".to_string()
        } else {
            files
                .iter()
                .map(|f| f.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("\n")
        };
        self.previous_files = Some(files);
        listing
    }

    fn count_previous_files(&self) -> String {
        match &self.previous_files {
            Some(files) => format!("Previous listing contains {} files.", files.len()),
            None => NO_PREVIOUS.to_string(),
        }
    }

    /// `[CATEGORIZE IMAGES BY CONTEXT]`: the retained context map is cleared
    /// before any re-population attempt, so a failed pass never leaves a
    /// stale map behind.
    async fn categorize_images(&mut self, dir: &Path) -> String {
        self.last_image_context = None;

        if !dir.is_dir() {
            return organizer::DIR_MISSING.to_string();
        }
        let images = grouping::image_files(&organizer::list_files(dir));
        if images.is_empty() {
            return organizer::NO_IMAGES.to_string();
        }

        let map = match self.labeler.as_mut() {
            Some(labeler) => label_images(labeler.as_mut(), &images).await,
            None => {
                debug!("No labeler available, falling back to extension grouping");
                extension_label_map(&images)
            }
        };

        let groups = groups_from_labels(&images, &map);
        self.last_image_context = Some(map);
        render_groups(&groups)
    }

    /// `[ORGANIZE IMAGES BY CONTEXT]`: uses the retained map when one
    /// exists. Without one, a labeler-equipped session is told to
    /// categorize first; an offline session derives the extension-fallback
    /// map inline and organizes by date and extension.
    async fn organize_images(&mut self, dir: &Path) -> String {
        if !dir.is_dir() {
            return organizer::DIR_MISSING.to_string();
        }

        match &self.last_image_context {
            Some(map) => organizer::organize_images_by_date_context(dir, map),
            None if self.labeler.is_some() => NO_CONTEXT_MAP.to_string(),
            None => {
                let images = grouping::image_files(&organizer::list_files(dir));
                let map = extension_label_map(&images);
                organizer::organize_images_by_date_context(dir, &map)
            }
        }
    }
}

fn validate(command: &Command) -> Option<&'static str> {
    let ok = match command {
        Command::ListFiles { dir }
        | Command::OrganizeFiles { dir }
        | Command::CategorizeFiles { dir }
        | Command::CategorizeByName { dir }
        | Command::CategorizeByContent { dir }
        | Command::CategorizeImages { dir }
        | Command::OrganizeImages { dir }
        | Command::CategorizeFoldersBySize { dir }
        | Command::OrganizeFoldersBySize { dir, .. } => !dir.is_empty(),
        Command::MoveFile { source, dest } => !source.is_empty() && !dest.is_empty(),
        Command::CategorizeFoldersByPattern { dir, pattern }
        | Command::OrganizeFoldersByPattern { dir, pattern } => {
            !dir.is_empty() && !pattern.is_empty()
        }
        Command::CountPreviousFiles | Command::Unrecognized(_) => true,
    };
    (!ok).then_some(INVALID_ARGS)
}

/// Directory nicknames map to OS special folders, case-insensitively.
/// Anything unmatched passes through as a literal path.
fn resolve_dir(name: &str) -> PathBuf {
    let special = match name.to_lowercase().as_str() {
        "downloads" => dirs::download_dir(),
        "documents" => dirs::document_dir(),
        "desktop" => dirs::desktop_dir(),
        "pictures" => dirs::picture_dir(),
        "music" => dirs::audio_dir(),
        "videos" => dirs::video_dir(),
        "home" => dirs::home_dir(),
        _ => None,
    };
    special.unwrap_or_else(|| PathBuf::from(name))
}

fn categorize(dir: &Path, group_fn: impl Fn(&[PathBuf]) -> Vec<Group>) -> String {
    if !dir.is_dir() {
        return organizer::DIR_MISSING.to_string();
    }
    let files = organizer::list_files(dir);
    let groups = group_fn(&files);
    if groups.is_empty() {
        return "No files to categorize.".to_string();
    }
    render_groups(&groups)
}

fn categorize_folders_by_pattern(dir: &Path, pattern: &str) -> String {
    if !dir.is_dir() {
        return organizer::DIR_MISSING.to_string();
    }
    let folders = organizer::list_folders(dir);
    render_groups(&grouping::by_folder_pattern(&folders, pattern))
}

/// Size categorization reports raw per-folder counts only; bucket labels
/// exist solely in the organize path.
fn categorize_folders_by_size(dir: &Path) -> String {
    if !dir.is_dir() {
        return organizer::DIR_MISSING.to_string();
    }
    let folders = organizer::list_folders(dir);
    if folders.is_empty() {
        return "No folders to categorize.".to_string();
    }
    folders
        .iter()
        .map(|f| format!("{}: {} files", f.display(), grouping::folder_file_count(f)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sequential labeling batch: one inference in flight at a time, backend
/// reset between images. Empty and error-prefixed labels mean skip.
async fn label_images(labeler: &mut dyn ImageLabeler, images: &[PathBuf]) -> LabelMap {
    let pb = ProgressBar::new(images.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} Labeling")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut map = LabelMap::new();
    let mut batch = LabelBatch::new(labeler);
    for image in images {
        match batch.label(image).await {
            Ok(label) => {
                let label = label.trim().to_string();
                if label.is_empty() || label.to_lowercase().starts_with("error") {
                    debug!("Skipping {}: unusable label", image.display());
                } else {
                    debug!("Labeled {} as {}", image.display(), label);
                    map.insert(image, label);
                }
            }
            Err(e) => {
                warn!("Failed to label {}: {}", image.display(), e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    map
}

/// Extension-based fallback map used when no multimodal capability exists.
fn extension_label_map(images: &[PathBuf]) -> LabelMap {
    let mut map = LabelMap::new();
    for image in images {
        map.insert(image, grouping::extension_key(image));
    }
    map
}

/// Regroup labeled images for display, first-encountered label order.
/// Unlabeled (skipped) images are left out.
fn groups_from_labels(images: &[PathBuf], map: &LabelMap) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for image in images {
        let Some(label) = map.get(image) else {
            continue;
        };
        let at = *index.entry(label.to_string()).or_insert_with(|| {
            groups.push(Group::new(label));
            groups.len() - 1
        });
        groups[at].members.push(image.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeler::testing::ScriptedLabeler;
    use crate::labeler::LabelError;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn auto_confirm() -> ConfirmFn {
        Box::new(|_| true)
    }

    fn offline(confirm: ConfirmFn) -> Dispatcher {
        Dispatcher::new(None, confirm)
    }

    #[tokio::test]
    async fn declined_confirmation_cancels_with_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"x").unwrap();

        let asked = Arc::new(AtomicUsize::new(0));
        let asked_in_cb = asked.clone();
        let mut dispatcher = offline(Box::new(move |_| {
            asked_in_cb.fetch_add(1, Ordering::SeqCst);
            false
        }));

        let raw = format!("[ORGANIZE FILES] {}", dir.path().display());
        assert_eq!(dispatcher.handle(&raw).await, CANCELLED);
        assert_eq!(asked.load(Ordering::SeqCst), 1);
        // File untouched.
        assert!(dir.path().join("a.txt").is_file());
    }

    #[tokio::test]
    async fn list_files_needs_no_confirmation_and_feeds_the_counter() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"x").unwrap();
        fs::write(dir.path().join("b.txt"), b"x").unwrap();

        // A callback that refuses everything: listing must not consult it.
        let mut dispatcher = offline(Box::new(|_| false));

        assert_eq!(
            dispatcher.handle("[COUNT PREVIOUS FILES]").await,
            NO_PREVIOUS
        );

        let raw = format!("[LIST FILES] {}", dir.path().display());
        let listing = dispatcher.handle(&raw).await;
        assert!(listing.contains("a.txt") && listing.contains("b.txt"));

        assert_eq!(
            dispatcher.handle("[COUNT PREVIOUS FILES]").await,
            "Previous listing contains 2 files."
        );
    }

    #[tokio::test]
    async fn listing_overwrites_previous_files_wholesale() {
        let full = tempfile::tempdir().unwrap();
        fs::write(full.path().join("a.txt"), b"x").unwrap();
        let empty = tempfile::tempdir().unwrap();

        let mut dispatcher = offline(auto_confirm());
        dispatcher
            .handle(&format!("[LIST FILES] {}", full.path().display()))
            .await;
        dispatcher
            .handle(&format!("[LIST FILES] {}", empty.path().display()))
            .await;

        assert_eq!(
            dispatcher.handle("[COUNT PREVIOUS FILES]").await,
            "Previous listing contains 0 files."
        );
    }

    #[tokio::test]
    async fn unrecognized_text_is_echoed() {
        let mut dispatcher = offline(auto_confirm());
        assert_eq!(
            dispatcher.handle("Sorry, I cannot help with that").await,
            "Sorry, I cannot help with that"
        );
    }

    #[tokio::test]
    async fn malformed_arguments_are_rejected_before_any_work() {
        let mut dispatcher = offline(auto_confirm());
        assert_eq!(dispatcher.handle("[MOVE FILE] /only/one").await, INVALID_ARGS);
        assert_eq!(dispatcher.handle("[LIST FILES]").await, INVALID_ARGS);
        assert_eq!(
            dispatcher.handle("[CATEGORIZE FOLDERS BY PATTERN] /tmp").await,
            INVALID_ARGS
        );
    }

    #[tokio::test]
    async fn missing_directory_yields_sentinel() {
        let mut dispatcher = offline(auto_confirm());
        assert_eq!(
            dispatcher.handle("[CATEGORIZE FILES] /no/such/place").await,
            organizer::DIR_MISSING
        );
    }

    #[tokio::test]
    async fn categorize_files_renders_extension_groups() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.TXT"), b"x").unwrap();
        fs::write(dir.path().join("b.txt"), b"x").unwrap();
        fs::write(dir.path().join("c.md"), b"x").unwrap();

        let mut dispatcher = offline(auto_confirm());
        let raw = format!("[CATEGORIZE FILES] {}", dir.path().display());
        let report = dispatcher.handle(&raw).await;

        assert!(report.contains(".txt:\n"), "got: {}", report);
        assert!(report.contains(".md:\n"), "got: {}", report);
        assert!(report.contains("a.TXT"));
        // Categorization moves nothing.
        assert!(dir.path().join("a.TXT").is_file());
    }

    #[tokio::test]
    async fn scripted_labeler_builds_context_map_skipping_bad_labels() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        fs::write(dir.path().join("c.png"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let labeler = ScriptedLabeler::new(vec![
            Ok("beach".to_string()),
            Ok("".to_string()),
            Err(LabelError::Model("backend down".to_string())),
        ]);
        let mut dispatcher = Dispatcher::new(Some(Box::new(labeler)), auto_confirm());

        let raw = format!("[CATEGORIZE IMAGES BY CONTEXT] {}", dir.path().display());
        let report = dispatcher.handle(&raw).await;

        // One usable label; the empty and errored ones are skipped.
        assert!(report.starts_with("beach:\n"), "got: {}", report);
        assert!(report.contains("a.jpg"));
        assert!(!report.contains("b.jpg"));
        assert!(!report.contains("notes.txt"));

        let map = dispatcher.last_image_context.as_ref().unwrap();
        assert_eq!(map.len(), 1);
    }

    #[tokio::test]
    async fn organize_images_without_map_but_with_labeler_reports_missing_map() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();

        let labeler = ScriptedLabeler::new(vec![]);
        let mut dispatcher = Dispatcher::new(Some(Box::new(labeler)), auto_confirm());

        let raw = format!("[ORGANIZE IMAGES BY CONTEXT] {}", dir.path().display());
        assert_eq!(dispatcher.handle(&raw).await, NO_CONTEXT_MAP);
        assert!(dir.path().join("a.jpg").is_file());
    }

    #[tokio::test]
    async fn offline_organize_images_uses_extension_fallback() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photo.jpg"), b"x").unwrap();

        let mut dispatcher = offline(auto_confirm());
        let raw = format!("[ORGANIZE IMAGES BY CONTEXT] {}", dir.path().display());
        let result = dispatcher.handle(&raw).await;

        assert!(
            result.starts_with("Organized 1 image files"),
            "got: {}",
            result
        );
        // Date folder name depends on the file's mtime; the context folder
        // under it is the extension.
        let dated: Vec<_> = organizer::list_folders(dir.path());
        assert_eq!(dated.len(), 1);
        assert!(dated[0].join("jpg/photo.jpg").is_file());
    }

    #[tokio::test]
    async fn categorize_images_clears_stale_map_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();

        let mut dispatcher = offline(auto_confirm());
        let raw = format!("[CATEGORIZE IMAGES BY CONTEXT] {}", dir.path().display());
        dispatcher.handle(&raw).await;
        assert!(dispatcher.last_image_context.is_some());

        // A failing pass (missing dir) leaves no stale map behind.
        assert_eq!(
            dispatcher
                .handle("[CATEGORIZE IMAGES BY CONTEXT] /no/such/place")
                .await,
            organizer::DIR_MISSING
        );
        assert!(dispatcher.last_image_context.is_none());
    }

    #[test]
    fn alias_table_is_case_insensitive_and_passes_unknowns_through() {
        if let Some(downloads) = dirs::download_dir() {
            assert_eq!(resolve_dir("Downloads"), downloads);
            assert_eq!(resolve_dir("DOWNLOADS"), downloads);
        }
        assert_eq!(resolve_dir("/var/data"), PathBuf::from("/var/data"));
    }
}
