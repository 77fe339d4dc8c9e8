//! Direct file actions behind the editor's open/save/new buttons and the
//! folder browser. Unlike context assembly, failures here are reported.

use anyhow::{Context, Result};
use serde::Serialize;
use shared::project::{file_name, is_hidden_name};
use std::fs;
use std::path::{Path, PathBuf};

/// Read a UTF-8 text file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
}

/// Read a text file, replacing invalid UTF-8 sequences.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write `content`, creating parent directories as needed.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("could not write {}", path.display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewFile {
    Created,
    AlreadyExists,
}

/// Create an empty file unless something already lives at `path`.
pub fn create_empty(path: &Path) -> Result<NewFile> {
    if path.exists() {
        return Ok(NewFile::AlreadyExists);
    }
    write_text(path, "")?;
    Ok(NewFile::Created)
}

#[derive(Debug, Clone, Serialize)]
pub struct DirLink {
    pub name: String,
    pub path: String,
}

/// One level of the folder browser.
#[derive(Debug, Clone, Serialize)]
pub struct DirListing {
    pub current: String,
    pub parent: String,
    pub dirs: Vec<DirLink>,
}

/// Non-hidden subdirectories of `dir`, sorted case-insensitively.
/// A directory we may not read yields an empty list.
pub fn browse_dirs(dir: &Path) -> Result<DirListing> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let mut dirs: Vec<DirLink> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                (!is_hidden_name(&name)).then(|| DirLink {
                    path: e.path().to_string_lossy().into_owned(),
                    name,
                })
            })
            .collect(),
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot list directory");
            Vec::new()
        }
    };
    dirs.sort_by_key(|d| d.name.to_lowercase());

    let parent = dir
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(DirListing {
        current: dir.to_string_lossy().into_owned(),
        parent,
        dirs,
    })
}

/// Drive roots (`C:\` ...) that exist on this machine. Empty off Windows.
pub fn drive_roots() -> Vec<DirLink> {
    if !cfg!(windows) {
        return Vec::new();
    }
    ('A'..='Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter)))
        .filter(|p| p.is_dir())
        .map(|p| DirLink {
            name: p.to_string_lossy().into_owned(),
            path: p.to_string_lossy().into_owned(),
        })
        .collect()
}

/// Tab title: base name, or "Untitled", with a `*` prefix when modified.
pub fn display_name(path: Option<&Path>, modified: bool) -> String {
    let name = path.map(file_name).unwrap_or_else(|| "Untitled".to_string());
    if modified {
        format!("*{}", name)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("draft.md");
        write_text(&path, "# Title").unwrap();
        assert_eq!(read_text(&path).unwrap(), "# Title");
    }

    #[test]
    fn test_lossy_read_replaces_bad_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.txt");
        fs::write(&path, [b'o', b'k', 0xff]).unwrap();
        assert!(read_text(&path).is_err());
        assert_eq!(read_text_lossy(&path).unwrap(), "ok\u{fffd}");
    }

    #[test]
    fn test_create_empty_refuses_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");
        assert_eq!(create_empty(&path).unwrap(), NewFile::Created);
        assert_eq!(create_empty(&path).unwrap(), NewFile::AlreadyExists);
    }

    #[test]
    fn test_browse_lists_visible_dirs_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("zeta")).unwrap();
        fs::create_dir(dir.path().join("Beta")).unwrap();
        fs::create_dir(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();

        let listing = browse_dirs(dir.path()).unwrap();
        let names: Vec<&str> = listing.dirs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Beta", "zeta"]);
        assert!(!listing.parent.is_empty());
        assert!(browse_dirs(&dir.path().join("file.txt")).is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(None, false), "Untitled");
        assert_eq!(display_name(None, true), "*Untitled");
        assert_eq!(display_name(Some(Path::new("/x/notes.txt")), true), "*notes.txt");
    }
}
