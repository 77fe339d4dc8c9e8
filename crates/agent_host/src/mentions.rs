//! `@name` references in chat messages.

use regex::Regex;
use services::ProjectTree;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([\w\-.]+)").expect("mention pattern is valid"));

/// Outcome of resolving the mentions in one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionResolution {
    /// One path per distinct token that named a file, in first-occurrence order.
    pub resolved: Vec<PathBuf>,
    /// Tokens that named nothing (or only a directory).
    pub unresolved: Vec<String>,
}

/// Distinct `@token`s in `text`, in the order they first appear.
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MENTION_RE
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .filter(|token| seen.insert(*token))
        .map(str::to_string)
        .collect()
}

/// Map each mention to a file in `tree` by exact file name.
/// With no folder open nothing resolves.
pub fn resolve_mentions(text: &str, tree: Option<&ProjectTree>) -> MentionResolution {
    let mut resolution = MentionResolution::default();
    for token in extract_mentions(text) {
        match tree.and_then(|t| t.find_file_by_name(&token)) {
            Some(file) => resolution.resolved.push(file.path.clone()),
            None => resolution.unresolved.push(token),
        }
    }
    if !resolution.unresolved.is_empty() {
        tracing::debug!(unresolved = ?resolution.unresolved, "mentions matched no file");
    }
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_distinct_in_order() {
        let tokens = extract_mentions("compare @b.md with @a-1.txt, then @b.md again");
        assert_eq!(tokens, vec!["b.md", "a-1.txt"]);
    }

    #[test]
    fn test_extract_ignores_bare_at() {
        assert!(extract_mentions("meet @ noon").is_empty());
        assert_eq!(extract_mentions("mail me@example.com"), vec!["example.com"]);
    }

    #[test]
    fn test_resolve_skips_directories_and_unknowns() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("chapters")).unwrap();
        fs::write(dir.path().join("outline.md"), "plan").unwrap();
        let tree = ProjectTree::scan(dir.path()).unwrap();

        let res = resolve_mentions("see @chapters and @outline.md and @missing.txt", Some(&tree));
        assert_eq!(res.resolved, vec![tree.root().join("outline.md")]);
        assert_eq!(res.unresolved, vec!["chapters", "missing.txt"]);
    }

    #[test]
    fn test_resolve_without_folder() {
        let res = resolve_mentions("summarize @notes.txt", None);
        assert!(res.resolved.is_empty());
        assert_eq!(res.unresolved, vec!["notes.txt"]);
    }

    #[test]
    fn test_shallow_match_wins() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a").join("todo.md"), "deep").unwrap();
        fs::write(dir.path().join("todo.md"), "top").unwrap();
        let tree = ProjectTree::scan(dir.path()).unwrap();

        let res = resolve_mentions("@todo.md", Some(&tree));
        assert_eq!(res.resolved, vec![tree.root().join("todo.md")]);
    }
}
