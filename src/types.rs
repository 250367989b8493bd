use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A fully parsed bracket command. Parsing is total: anything that does not
/// start with a known tag lands in `Unrecognized` carrying the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListFiles { dir: String },
    MoveFile { source: String, dest: String },
    OrganizeFiles { dir: String },
    CategorizeFiles { dir: String },
    CategorizeByName { dir: String },
    CategorizeByContent { dir: String },
    CategorizeImages { dir: String },
    OrganizeImages { dir: String },
    CategorizeFoldersByPattern { dir: String, pattern: String },
    OrganizeFoldersByPattern { dir: String, pattern: String },
    CategorizeFoldersBySize { dir: String },
    OrganizeFoldersBySize { dir: String, small: usize, large: usize },
    CountPreviousFiles,
    Unrecognized(String),
}

impl Command {
    /// Everything except plain listing and the previous-files counter sits
    /// behind the confirmation gate.
    pub fn needs_confirmation(&self) -> bool {
        !matches!(
            self,
            Command::ListFiles { .. } | Command::CountPreviousFiles | Command::Unrecognized(_)
        )
    }

    /// Short human-readable description, used in confirmation prompts.
    pub fn describe(&self) -> String {
        match self {
            Command::ListFiles { dir } => format!("list files in {}", dir),
            Command::MoveFile { source, dest } => format!("move {} to {}", source, dest),
            Command::OrganizeFiles { dir } => format!("organize files by extension in {}", dir),
            Command::CategorizeFiles { dir } => format!("categorize files by extension in {}", dir),
            Command::CategorizeByName { dir } => {
                format!("categorize files by name context in {}", dir)
            }
            Command::CategorizeByContent { dir } => {
                format!("categorize text files by content in {}", dir)
            }
            Command::CategorizeImages { dir } => format!("categorize images in {}", dir),
            Command::OrganizeImages { dir } => {
                format!("organize images by date and context in {}", dir)
            }
            Command::CategorizeFoldersByPattern { dir, pattern } => {
                format!("categorize folders matching \"{}\" in {}", pattern, dir)
            }
            Command::OrganizeFoldersByPattern { dir, pattern } => {
                format!("organize folders matching \"{}\" in {}", pattern, dir)
            }
            Command::CategorizeFoldersBySize { dir } => {
                format!("categorize folders by size in {}", dir)
            }
            Command::OrganizeFoldersBySize { dir, small, large } => format!(
                "organize folders by size in {} (small <= {}, large >= {})",
                dir, small, large
            ),
            Command::CountPreviousFiles => "count previously listed files".to_string(),
            Command::Unrecognized(raw) => raw.clone(),
        }
    }
}

/// One named group of paths produced by the grouping engine. Group sequences
/// preserve first-encountered order end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: String,
    pub members: Vec<PathBuf>,
}

impl Group {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            members: Vec::new(),
        }
    }
}

/// Render groups in the fixed report format: `key:` followed by indented
/// members, in first-encountered group order.
pub fn render_groups(groups: &[Group]) -> String {
    let mut out = String::new();
    for group in groups {
        out.push_str(&group.key);
        out.push_str(":\n");
        for member in &group.members {
            out.push_str("  ");
            out.push_str(&member.to_string_lossy());
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

/// File path -> free-text label, with case-insensitive path keys. Replaced
/// wholesale by each categorization pass, never merged.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    entries: HashMap<String, String>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_for(path: &Path) -> String {
        path.to_string_lossy().to_lowercase()
    }

    pub fn insert(&mut self, path: &Path, label: String) {
        self.entries.insert(Self::key_for(path), label);
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.entries.get(&Self::key_for(path)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_map_keys_are_case_insensitive() {
        let mut map = LabelMap::new();
        map.insert(Path::new("/Photos/IMG_001.JPG"), "beach".to_string());
        assert_eq!(map.get(Path::new("/photos/img_001.jpg")), Some("beach"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn label_map_overwrites_same_path() {
        let mut map = LabelMap::new();
        map.insert(Path::new("/a.png"), "cat".to_string());
        map.insert(Path::new("/A.PNG"), "dog".to_string());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(Path::new("/a.png")), Some("dog"));
    }

    #[test]
    fn render_groups_uses_fixed_format() {
        let groups = vec![
            Group {
                key: ".txt".to_string(),
                members: vec![PathBuf::from("/d/a.txt"), PathBuf::from("/d/b.txt")],
            },
            Group {
                key: ".md".to_string(),
                members: vec![PathBuf::from("/d/c.md")],
            },
        ];
        let rendered = render_groups(&groups);
        assert_eq!(rendered, ".txt:\n  /d/a.txt\n  /d/b.txt\n.md:\n  /d/c.md");
    }
}
