//! Filesystem and subprocess services used by the AI Writer front-ends.

pub mod files;
pub mod project_tree;
pub mod scripts;

pub use project_tree::{ProjectTree, TreeEntry};
pub use scripts::{ScriptOutput, SCRIPT_TIMEOUT};
