//! File context attached to outgoing chat requests.
//!
//! Three sources feed a request, in this order:
//! - the file open in the active tab (its live buffer, not the disk copy)
//! - files the user pinned into the [`ContextSet`]
//! - files named by `@mentions` in the message
//!
//! A path is emitted at most once. Files that vanished or cannot be read as
//! UTF-8 are skipped without telling anyone.

use services::ProjectTree;
use shared::project::file_name;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Files the user asked to always include. Lives for the process lifetime.
///
/// Entries are never pruned when the file disappears; assembly skips them.
#[derive(Debug, Clone, Default)]
pub struct ContextSet {
    paths: BTreeSet<PathBuf>,
}

impl ContextSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `path` and return whether it is now pinned.
    /// Only regular files can be added; a pinned path can always be removed.
    pub fn toggle(&mut self, path: &Path) -> bool {
        if self.paths.remove(path) {
            return false;
        }
        if !path.is_file() {
            return false;
        }
        self.paths.insert(path.to_path_buf());
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Pinned paths in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Copy of the pinned paths, for handing to a worker.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.paths.iter().cloned().collect()
    }

    /// Pinned paths the way the tree shows them; paths outside the tree last.
    pub fn in_tree_order<'a>(&'a self, tree: &ProjectTree) -> Vec<&'a Path> {
        let mut paths: Vec<&Path> = self.iter().collect();
        paths.sort_by_key(|p| tree.position(p).unwrap_or(usize::MAX));
        paths
    }

    pub fn label(&self) -> String {
        let count = self.len();
        format!("Context: {} file{}", count, if count == 1 { "" } else { "s" })
    }
}

/// The active tab's path and buffer at the moment a message was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBuffer {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSource {
    CurrentFile,
    Pinned,
    Mention,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    pub path: PathBuf,
    pub source: BlockSource,
    pub content: String,
}

impl ContextBlock {
    pub fn header(&self) -> String {
        match self.source {
            BlockSource::CurrentFile => format!("=== Current File: {} ===", file_name(&self.path)),
            BlockSource::Pinned | BlockSource::Mention => {
                format!("=== {} ===", file_name(&self.path))
            }
        }
    }

    pub fn render(&self) -> String {
        format!("{}\n{}\n", self.header(), self.content)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    blocks: Vec<ContextBlock>,
}

impl AssembledContext {
    pub fn blocks(&self) -> &[ContextBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks separated by a blank line.
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(ContextBlock::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rough size in tokens (4 bytes per token).
    pub fn estimated_tokens(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| b.header().len() + b.content.len() + 2)
            .sum::<usize>()
            / 4
    }
}

/// Merges the three context sources into one block list.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    /// Advisory only: exceeding it logs a warning, nothing is cut.
    budget_tokens: usize,
}

impl ContextAssembler {
    pub fn new(budget_tokens: usize) -> Self {
        Self { budget_tokens }
    }

    pub fn assemble(
        &self,
        current: Option<&OpenBuffer>,
        pinned: &[PathBuf],
        mentions: &[PathBuf],
    ) -> AssembledContext {
        let mut blocks = Vec::new();
        let mut claimed: HashSet<&Path> = HashSet::new();

        if let Some(open) = current {
            claimed.insert(&open.path);
            blocks.push(ContextBlock {
                path: open.path.clone(),
                source: BlockSource::CurrentFile,
                content: open.content.clone(),
            });
        }

        // Every pinned path is claimed, readable or not, so a mention of a
        // pinned file never adds a second copy.
        for path in pinned {
            if !claimed.insert(path) {
                continue;
            }
            if let Some(content) = read_context_file(path) {
                blocks.push(ContextBlock {
                    path: path.clone(),
                    source: BlockSource::Pinned,
                    content,
                });
            }
        }

        for path in mentions {
            if !claimed.insert(path) {
                continue;
            }
            if let Some(content) = read_context_file(path) {
                blocks.push(ContextBlock {
                    path: path.clone(),
                    source: BlockSource::Mention,
                    content,
                });
            }
        }

        let assembled = AssembledContext { blocks };
        let estimate = assembled.estimated_tokens();
        if estimate > self.budget_tokens {
            tracing::warn!(
                estimate,
                budget = self.budget_tokens,
                "attached context exceeds the configured budget; sending it whole"
            );
        }
        assembled
    }
}

fn read_context_file(path: &Path) -> Option<String> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "context file missing, skipped");
        return None;
    }
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "context file unreadable, skipped");
            None
        }
    }
}
