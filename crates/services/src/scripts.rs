//! Project script runner.
//!
//! A project may carry a `scripts/` folder of Python files. Running one never
//! fails outright: spawn errors and timeouts come back as an output with
//! return code -1 and the reason in `stderr`.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
}

impl ScriptOutput {
    fn failed(reason: String) -> Self {
        Self {
            stdout: String::new(),
            stderr: reason,
            returncode: -1,
        }
    }

    /// Text for the output dialog.
    pub fn render(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            text.push_str("\n--- stderr ---\n");
            text.push_str(&self.stderr);
        }
        text.push_str(&format!("\n\nExit code: {}", self.returncode));
        text
    }
}

/// `<root>/scripts` if it exists.
pub fn scripts_dir(root: &Path) -> Option<PathBuf> {
    let dir = root.join("scripts");
    dir.is_dir().then_some(dir)
}

/// `*.py` files directly inside `dir`, sorted by name.
pub fn list_scripts(dir: &Path) -> Vec<PathBuf> {
    let mut scripts: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "py"))
            .collect(),
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot list scripts");
            Vec::new()
        }
    };
    scripts.sort();
    scripts
}

/// Run `interpreter script` in `cwd`, capturing output.
pub async fn run_script(
    interpreter: &str,
    script: &Path,
    cwd: Option<&Path>,
    timeout: Duration,
) -> ScriptOutput {
    let mut cmd = Command::new(interpreter);
    cmd.arg(script)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    tracing::info!(script = %script.display(), "running script");
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => ScriptOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            returncode: output.status.code().unwrap_or(-1),
        },
        Ok(Err(e)) => ScriptOutput::failed(e.to_string()),
        Err(_) => ScriptOutput::failed(format!(
            "Script timed out after {} seconds.",
            timeout.as_secs()
        )),
    }
}

/// Blocking wrapper for callers on plain worker threads.
pub fn run_script_blocking(
    interpreter: &str,
    script: &Path,
    cwd: Option<&Path>,
    timeout: Duration,
) -> ScriptOutput {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(run_script(interpreter, script, cwd, timeout)),
        Err(e) => ScriptOutput::failed(format!("Failed to start async runtime: {}", e)),
    }
}
