//! Snapshot of an opened project folder.
//!
//! The tree is a flat arena of [`ProjectFile`] records in display order
//! (pre-order, directories before files, case-insensitive names) with a
//! path-keyed index. It is rebuilt wholesale whenever a folder is opened.

use anyhow::{bail, Result};
use serde::Serialize;
use shared::project::{is_hidden_name, ProjectFile};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub file: ProjectFile,
    /// 1 for direct children of the root.
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Nested form used by the web front-end.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeEntry>>,
}

#[derive(Debug, Clone)]
pub struct ProjectTree {
    root: PathBuf,
    nodes: Vec<TreeNode>,
    by_path: HashMap<PathBuf, NodeId>,
    top_level: Vec<NodeId>,
}

fn display_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_key = (!a.file_type().is_dir(), a.file_name().to_string_lossy().to_lowercase());
    let b_key = (!b.file_type().is_dir(), b.file_name().to_string_lossy().to_lowercase());
    a_key.cmp(&b_key)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && is_hidden_name(&entry.file_name().to_string_lossy())
}

impl ProjectTree {
    /// Walk `root`, skipping dot-prefixed entries and anything beneath them.
    /// Unreadable subdirectories are left out rather than failing the scan.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            bail!("{} is not a directory", root.display());
        }
        let root = std::path::absolute(root)?;

        let mut tree = Self {
            root: root.clone(),
            nodes: Vec::new(),
            by_path: HashMap::new(),
            top_level: Vec::new(),
        };

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(true)
            .sort_by(display_order)
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable tree entry");
                    continue;
                }
            };
            let path = entry.path().to_path_buf();
            let parent = path.parent().and_then(|p| tree.by_path.get(p).copied());
            let id = tree.nodes.len();
            tree.nodes.push(TreeNode {
                file: ProjectFile::new(path.clone(), entry.file_type().is_dir()),
                depth: entry.depth(),
                parent,
                children: Vec::new(),
            });
            match parent {
                Some(p) => tree.nodes[p].children.push(id),
                None => tree.top_level.push(id),
            }
            tree.by_path.insert(path, id);
        }

        tracing::info!(root = %tree.root.display(), entries = tree.nodes.len(), "project tree loaded");
        Ok(tree)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    pub fn get(&self, path: &Path) -> Option<&ProjectFile> {
        self.by_path.get(path).map(|&id| &self.nodes[id].file)
    }

    /// Index of `path` in display order, for sorting things the way the tree shows them.
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    /// All entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectFile> {
        self.nodes.iter().map(|n| &n.file)
    }

    /// The regular file named exactly `name`. The shallowest match wins;
    /// ties at one depth go to whichever comes first in display order.
    /// Directories never match.
    pub fn find_file_by_name(&self, name: &str) -> Option<&ProjectFile> {
        self.nodes
            .iter()
            .filter(|n| !n.file.is_dir && n.file.name == name)
            .min_by_key(|n| n.depth)
            .map(|n| &n.file)
    }

    pub fn to_entries(&self) -> Vec<TreeEntry> {
        self.top_level.iter().map(|&id| self.entry(id)).collect()
    }

    fn entry(&self, id: NodeId) -> TreeEntry {
        let node = &self.nodes[id];
        TreeEntry {
            name: node.file.name.clone(),
            path: node.file.path.to_string_lossy().into_owned(),
            is_dir: node.file.is_dir,
            children: node
                .file
                .is_dir
                .then(|| node.children.iter().map(|&c| self.entry(c)).collect()),
        }
    }
}
