//! State management for the AI Writer desktop app
//!
//! `AppState` wraps the toolkit-independent [`WriterSession`] with the bits
//! only the egui front end needs: dialogs, the chat input line, the settings
//! draft, and the active style.

use crate::style::StyleState;
use agent_host::{EntryRole, SaveOutcome, ScriptReport, WriterSession};
use shared::{Config, ConfigStore};
use std::path::{Path, PathBuf};

pub struct AppState {
    pub session: WriterSession,
    store: Option<ConfigStore>,
    pub style: StyleState,
    pub chat_input: String,
    pub show_file_panel: bool,
    pub show_ai_panel: bool,
    /// Edited copy of the config while the settings window is open.
    pub settings_draft: Option<Config>,
    pub show_scripts: bool,
    pub scripts_running: usize,
    pub script_report: Option<ScriptReport>,
}

impl AppState {
    pub fn new(store: Option<ConfigStore>) -> Self {
        let config = store.as_ref().map(ConfigStore::load).unwrap_or_default();
        Self {
            show_file_panel: config.show_file_panel,
            show_ai_panel: config.show_ai_panel,
            session: WriterSession::new(config),
            store,
            style: StyleState::default(),
            chat_input: String::new(),
            settings_draft: None,
            show_scripts: false,
            scripts_running: 0,
            script_report: None,
        }
    }

    /// Errors are reported in the chat panel.
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.session.push_entry(EntryRole::Error, message);
    }

    /// Apply finished background work. Returns true while anything is still
    /// pending so the caller keeps repainting.
    pub fn poll_background(&mut self) -> bool {
        self.session.poll();
        let reports = self.session.take_script_reports();
        self.scripts_running = self.scripts_running.saturating_sub(reports.len());
        if let Some(last) = reports.into_iter().last() {
            self.script_report = Some(last);
        }
        self.session.in_flight() > 0 || self.scripts_running > 0
    }

    // ── Files ────────────────────────────────────────────────────────

    pub fn open_folder_dialog(&mut self) {
        let mut dialog = rfd::FileDialog::new().set_title("Open Folder");
        if let Some(root) = self.session.root() {
            dialog = dialog.set_directory(root);
        }
        if let Some(folder) = dialog.pick_folder() {
            self.open_folder(&folder);
        }
    }

    pub fn open_folder(&mut self, folder: &Path) {
        match self.session.open_folder(folder) {
            Ok(()) => tracing::info!(folder = %folder.display(), "opened folder"),
            Err(e) => self.show_error(format!("{:#}", e)),
        }
    }

    pub fn open_file(&mut self, path: &Path) {
        if let Err(e) = self.session.open_file(path) {
            self.show_error(format!("{:#}", e));
        }
    }

    pub fn save_current(&mut self) {
        match self.session.save_current() {
            Ok(SaveOutcome::Saved(_)) => self.refresh_tree(),
            Ok(SaveOutcome::NeedsPath) => self.save_current_as_dialog(),
            Err(e) => self.show_error(format!("{:#}", e)),
        }
    }

    pub fn save_current_as_dialog(&mut self) {
        let mut dialog = rfd::FileDialog::new().set_title("Save File");
        if let Some(root) = self.session.root() {
            dialog = dialog.set_directory(root);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };
        match self.session.save_current_as(&path) {
            Ok(()) => self.refresh_tree(),
            Err(e) => self.show_error(format!("{:#}", e)),
        }
    }

    /// Pick up files created by a save.
    fn refresh_tree(&mut self) {
        if let Err(e) = self.session.reload_tree() {
            tracing::warn!(error = %e, "could not rescan folder");
        }
    }

    // ── Chat ─────────────────────────────────────────────────────────

    pub fn send_chat(&mut self) {
        let message = std::mem::take(&mut self.chat_input);
        if !self.session.send(&message) {
            // Keep whatever whitespace the user typed.
            self.chat_input = message;
        }
    }

    // ── Scripts ──────────────────────────────────────────────────────

    pub fn run_script(&mut self, script: &Path) {
        self.show_scripts = false;
        self.scripts_running += 1;
        self.session.run_script(script);
    }

    pub fn scripts(&self) -> Vec<PathBuf> {
        self.session.scripts()
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Start a draft from the live config and the current panel toggles.
    pub fn open_settings(&mut self) {
        let mut draft = self.session.config().clone();
        draft.show_file_panel = self.show_file_panel;
        draft.show_ai_panel = self.show_ai_panel;
        self.settings_draft = Some(draft);
    }

    /// Persist the draft and make it live.
    pub fn commit_settings(&mut self) {
        let Some(mut config) = self.settings_draft.take() else {
            return;
        };
        if config.editor_font.trim().is_empty() {
            config.editor_font = Config::default().editor_font;
        }
        match &self.store {
            Some(store) => {
                if let Err(e) = store.save(&config) {
                    self.show_error(format!("Could not save settings: {}", e));
                }
            }
            None => self.show_error("Could not save settings: no home directory"),
        }
        self.show_file_panel = config.show_file_panel;
        self.show_ai_panel = config.show_ai_panel;
        self.session.set_config(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"));
        (dir, store)
    }

    #[test]
    fn test_panels_follow_config() {
        let (_dir, store) = temp_store();
        store
            .save(&Config {
                show_ai_panel: false,
                ..Config::default()
            })
            .unwrap();
        let state = AppState::new(Some(store));
        assert!(state.show_file_panel);
        assert!(!state.show_ai_panel);
    }

    #[test]
    fn test_commit_settings_persists() {
        let (_dir, store) = temp_store();
        let mut state = AppState::new(Some(store.clone()));
        state.open_settings();
        if let Some(draft) = state.settings_draft.as_mut() {
            draft.temperature = 1.2;
            draft.editor_font = "  ".into();
        }
        state.commit_settings();

        assert!(state.settings_draft.is_none());
        assert_eq!(state.session.config().temperature, 1.2);
        let saved = store.load();
        assert_eq!(saved.temperature, 1.2);
        assert_eq!(saved.editor_font, "Monospace 11");
    }

    #[test]
    fn test_commit_settings_updates_panels() {
        let (_dir, store) = temp_store();
        let mut state = AppState::new(Some(store.clone()));
        state.show_file_panel = false;
        state.open_settings();
        if let Some(draft) = state.settings_draft.as_mut() {
            draft.show_ai_panel = false;
        }
        state.commit_settings();

        assert!(!state.show_file_panel);
        assert!(!state.show_ai_panel);
        let saved = store.load();
        assert!(!saved.show_file_panel);
        assert!(!saved.show_ai_panel);
    }

    #[test]
    fn test_blank_chat_input_kept() {
        let mut state = AppState::new(None);
        state.chat_input = "  ".into();
        state.send_chat();
        assert_eq!(state.chat_input, "  ");
        assert!(state.session.history().is_empty());
    }

    #[test]
    fn test_open_missing_file_reported_in_chat() {
        let (dir, _store) = temp_store();
        let mut state = AppState::new(None);
        state.open_file(&dir.path().join("missing.md"));
        let last = state.session.history().last().unwrap();
        assert_eq!(last.role, EntryRole::Error);
        assert!(last.content.contains("missing.md"));
    }

    #[test]
    fn test_save_refreshes_tree() {
        let (dir, _store) = temp_store();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        let mut state = AppState::new(None);
        state.open_folder(dir.path());
        let root = state.session.root().unwrap().to_path_buf();
        state.open_file(&root.join("a.md"));
        state.session.save_current_as(&root.join("b.md")).unwrap();
        state.refresh_tree();
        assert!(state.session.tree().unwrap().get(&root.join("b.md")).is_some());
    }
}
