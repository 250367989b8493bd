use crate::types::Group;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Extensions accepted by the image commands, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] =
    &[".jpg", ".jpeg", ".png", ".bmp", ".gif", ".webp", ".tiff"];

/// Words too common to serve as a content keyword.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "has", "had", "was",
    "one", "our", "out", "get", "his", "her", "him", "how", "new", "now", "old", "see", "two",
    "who", "way", "its", "this", "that", "with", "from", "they", "will", "have", "been", "were",
    "said", "each", "would", "there", "their", "what", "about", "which", "when", "your", "them",
    "then", "than", "some", "into", "could", "other", "these", "those",
];

/// Group the key of every entry while preserving first-encountered order of
/// both groups and members.
fn group_by_key<F>(files: &[PathBuf], key_of: F) -> Vec<Group>
where
    F: Fn(&Path) -> String,
{
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for file in files {
        let key = key_of(file);
        let at = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(Group::new(key));
            groups.len() - 1
        });
        groups[at].members.push(file.clone());
    }

    groups
}

/// Lower-invariant extension including the dot; empty string when the file
/// has none. The readable "no_extension" label is applied only when moving,
/// not here.
pub fn extension_key(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
        None => String::new(),
    }
}

pub fn by_extension(files: &[PathBuf]) -> Vec<Group> {
    group_by_key(files, extension_key)
}

/// Leading ASCII-alphanumeric run of the file stem, lowered; "other" when
/// the stem starts with anything else.
pub fn name_context_key(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let prefix: String = stem
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if prefix.is_empty() {
        "other".to_string()
    } else {
        prefix.to_lowercase()
    }
}

pub fn by_name_context(files: &[PathBuf]) -> Vec<Group> {
    group_by_key(files, name_context_key)
}

/// Most frequent qualifying word of the text, or `None` when nothing
/// qualifies. Words are runs of 3+ lowercase letters after lowering; stop
/// words are dropped; ties go to the word seen first in the text.
pub fn content_keyword(content: &str) -> Option<String> {
    let lowered = content.to_lowercase();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut position = 0usize;

    for word in lowered.split(|c: char| !c.is_ascii_lowercase()) {
        if word.len() < 3 || STOP_WORDS.contains(&word) {
            continue;
        }
        first_seen.entry(word).or_insert(position);
        *counts.entry(word).or_insert(0) += 1;
        position += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (word, count) in counts {
        let better = match best {
            None => true,
            Some((best_word, best_count)) => {
                count > best_count
                    || (count == best_count && first_seen[word] < first_seen[best_word])
            }
        };
        if better {
            best = Some((word, count));
        }
    }
    best.map(|(word, _)| word.to_string())
}

/// Content-keyword grouping over `*.txt` files only. Unreadable files are
/// treated as empty content and land in "uncategorized".
pub fn by_content_keyword(files: &[PathBuf]) -> Vec<Group> {
    let txt_files: Vec<PathBuf> = files
        .iter()
        .filter(|f| extension_key(f) == ".txt")
        .cloned()
        .collect();

    group_by_key(&txt_files, |path| {
        let content = std::fs::read_to_string(path).unwrap_or_else(|e| {
            warn!("Could not read {}: {}", path.display(), e);
            String::new()
        });
        content_keyword(&content).unwrap_or_else(|| "uncategorized".to_string())
    })
}

/// Partition folders into exactly two groups, "matching" and "not matching",
/// by case-insensitive substring containment. Both groups always exist.
pub fn by_folder_pattern(folders: &[PathBuf], pattern: &str) -> Vec<Group> {
    let needle = pattern.to_lowercase();
    let mut matching = Group::new("matching");
    let mut not_matching = Group::new("not matching");

    for folder in folders {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.contains(&needle) {
            matching.members.push(folder.clone());
        } else {
            not_matching.members.push(folder.clone());
        }
    }

    vec![matching, not_matching]
}

/// Number of files directly inside a folder, one level deep.
pub fn folder_file_count(folder: &Path) -> usize {
    WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

/// Bucket label used when organizing folders by size. The band strictly
/// between the thresholds resolves to "small"; callers rely on that.
pub fn size_bucket(count: usize, _small: usize, large: usize) -> &'static str {
    if count == 0 {
        "empty"
    } else if count >= large {
        "large"
    } else {
        "small"
    }
}

/// Filter to the fixed image extension allow-list.
pub fn image_files(files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|f| {
            let key = extension_key(f);
            IMAGE_EXTENSIONS.contains(&key.as_str())
        })
        .cloned()
        .collect()
}
