use crate::types::Command;

/// Default thresholds for folder-by-size organization when the model omits
/// them or emits something unparsable.
pub const DEFAULT_SMALL_THRESHOLD: usize = 5;
pub const DEFAULT_LARGE_THRESHOLD: usize = 20;

#[derive(Debug, Clone, Copy)]
enum TagKind {
    ListFiles,
    MoveFile,
    OrganizeFiles,
    CategorizeFiles,
    CategorizeByName,
    CategorizeByContent,
    CategorizeImages,
    OrganizeImages,
    CategorizeFoldersByPattern,
    OrganizeFoldersByPattern,
    CategorizeFoldersBySize,
    OrganizeFoldersBySize,
    CountPreviousFiles,
}

/// Tag table, matched by prefix in declared order. Longer / more specific
/// tags come before anything that could share a prefix with them, so new
/// tags must be inserted with that in mind rather than alphabetically.
const TAGS: &[(&str, TagKind)] = &[
    ("[CATEGORIZE FOLDERS BY PATTERN]", TagKind::CategorizeFoldersByPattern),
    ("[ORGANIZE FOLDERS BY PATTERN]", TagKind::OrganizeFoldersByPattern),
    ("[CATEGORIZE FOLDERS BY SIZE]", TagKind::CategorizeFoldersBySize),
    ("[ORGANIZE FOLDERS BY SIZE]", TagKind::OrganizeFoldersBySize),
    ("[CATEGORIZE IMAGES BY CONTEXT]", TagKind::CategorizeImages),
    ("[ORGANIZE IMAGES BY CONTEXT]", TagKind::OrganizeImages),
    ("[CATEGORIZE BY NAME CONTEXT]", TagKind::CategorizeByName),
    ("[CATEGORIZE BY CONTENT CONTEXT]", TagKind::CategorizeByContent),
    ("[CATEGORIZE FILES]", TagKind::CategorizeFiles),
    ("[ORGANIZE FILES]", TagKind::OrganizeFiles),
    ("[COUNT PREVIOUS FILES]", TagKind::CountPreviousFiles),
    ("[LIST FILES]", TagKind::ListFiles),
    ("[MOVE FILE]", TagKind::MoveFile),
];

/// Total parse of one raw model response into a `Command`. Never fails:
/// text that starts with no known tag becomes `Unrecognized`.
pub fn parse(raw: &str) -> Command {
    let trimmed = raw.trim();
    for (tag, kind) in TAGS {
        if let Some(rest) = trimmed.strip_prefix(tag) {
            return build(*kind, rest.trim());
        }
    }
    Command::Unrecognized(trimmed.to_string())
}

fn build(kind: TagKind, args: &str) -> Command {
    match kind {
        TagKind::ListFiles => Command::ListFiles {
            dir: clean_path(args),
        },
        TagKind::MoveFile => {
            let (source, dest) = split_first_token(args);
            Command::MoveFile {
                source: clean_path(source),
                dest: clean_path(dest),
            }
        }
        TagKind::OrganizeFiles => Command::OrganizeFiles {
            dir: clean_path(args),
        },
        TagKind::CategorizeFiles => Command::CategorizeFiles {
            dir: clean_path(args),
        },
        TagKind::CategorizeByName => Command::CategorizeByName {
            dir: clean_path(args),
        },
        TagKind::CategorizeByContent => Command::CategorizeByContent {
            dir: clean_path(args),
        },
        TagKind::CategorizeImages => Command::CategorizeImages {
            dir: clean_path(args),
        },
        TagKind::OrganizeImages => Command::OrganizeImages {
            dir: clean_path(args),
        },
        TagKind::CategorizeFoldersByPattern => {
            let (dir, pattern) = split_first_token(args);
            Command::CategorizeFoldersByPattern {
                dir: clean_path(dir),
                pattern: clean_pattern(pattern),
            }
        }
        TagKind::OrganizeFoldersByPattern => {
            let (dir, pattern) = split_first_token(args);
            Command::OrganizeFoldersByPattern {
                dir: clean_path(dir),
                pattern: clean_pattern(pattern),
            }
        }
        TagKind::CategorizeFoldersBySize => Command::CategorizeFoldersBySize {
            dir: clean_path(args),
        },
        TagKind::OrganizeFoldersBySize => {
            let (dir, rest) = split_first_token(args);
            let (small_tok, rest) = split_first_token(rest);
            let (large_tok, _) = split_first_token(rest);
            Command::OrganizeFoldersBySize {
                dir: clean_path(dir),
                small: parse_threshold(small_tok, DEFAULT_SMALL_THRESHOLD),
                large: parse_threshold(large_tok, DEFAULT_LARGE_THRESHOLD),
            }
        }
        TagKind::CountPreviousFiles => Command::CountPreviousFiles,
    }
}

/// Split on the first whitespace run only, so the second token may itself
/// contain spaces (destination paths, folder-name patterns).
fn split_first_token(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim_start()),
        None => (s, ""),
    }
}

/// Trim whitespace, surrounding quotes, and trailing path separators. The
/// leading separator of an absolute path is kept.
fn clean_path(s: &str) -> String {
    s.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_end_matches(['/', '\\'])
        .to_string()
}

fn clean_pattern(s: &str) -> String {
    s.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
}

fn parse_threshold(token: &str, default: usize) -> usize {
    token.trim().parse::<usize>().unwrap_or(default)
}
