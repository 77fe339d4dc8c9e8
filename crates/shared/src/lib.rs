pub mod config;
pub mod theme;

pub use config::{Config, ConfigError, ConfigStore};

pub mod agent_api {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        System,
        User,
        Assistant,
    }

    impl fmt::Display for Role {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let s = match self {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            f.write_str(s)
        }
    }

    /// One entry of the message list sent to the model server.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: Role,
        pub content: String,
    }

    impl ChatMessage {
        pub fn system(content: impl Into<String>) -> Self {
            Self {
                role: Role::System,
                content: content.into(),
            }
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self {
                role: Role::User,
                content: content.into(),
            }
        }
    }
}

pub mod project {
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};

    /// A file or directory inside an opened project folder.
    ///
    /// Identity is the absolute path; `name` is the final path component.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ProjectFile {
        pub path: PathBuf,
        pub is_dir: bool,
        pub name: String,
    }

    impl ProjectFile {
        pub fn new(path: PathBuf, is_dir: bool) -> Self {
            let name = file_name(&path);
            Self { path, is_dir, name }
        }
    }

    /// Final component of a path, lossily converted. Empty for roots like `/`.
    pub fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Dot-prefixed names are hidden from the tree and from mention lookup.
    pub fn is_hidden_name(name: &str) -> bool {
        name.starts_with('.')
    }
}

#[cfg(test)]
mod tests {
    use super::agent_api::{ChatMessage, Role};
    use super::project::{is_hidden_name, ProjectFile};
    use std::path::PathBuf;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::system("be nice");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be nice");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_project_file_name() {
        let file = ProjectFile::new(PathBuf::from("/tmp/project/notes.txt"), false);
        assert_eq!(file.name, "notes.txt");
        assert!(!file.is_dir);
        assert!(is_hidden_name(".git"));
        assert!(!is_hidden_name("notes.txt"));
    }
}
