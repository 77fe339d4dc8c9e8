//! Editor session state owned by the UI loop.
//!
//! Everything here is touched only from the thread that drives the
//! interface. Background work (chat sends, script runs) gets a snapshot of
//! its inputs and reports back through the session's event channel, which
//! the UI drains with [`WriterSession::poll`].

use crate::context::{ContextSet, OpenBuffer};
use crate::mentions::resolve_mentions;
use crate::orchestrator::{ChatEntry, ChatOrchestrator, ChatRequest, EntryRole};
use anyhow::{Context, Result};
use services::files::{self, display_name};
use services::scripts::{self, ScriptOutput, SCRIPT_TIMEOUT};
use services::ProjectTree;
use shared::project::file_name;
use shared::Config;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Results posted by background workers.
#[derive(Debug)]
pub enum SessionEvent {
    Chat(ChatEntry),
    ScriptFinished { script: PathBuf, output: ScriptOutput },
}

impl From<ChatEntry> for SessionEvent {
    fn from(entry: ChatEntry) -> Self {
        SessionEvent::Chat(entry)
    }
}

/// A finished script run waiting to be shown.
#[derive(Debug, Clone)]
pub struct ScriptReport {
    pub script: PathBuf,
    pub output: ScriptOutput,
}

impl ScriptReport {
    pub fn title(&self) -> String {
        format!("Script: {}", file_name(&self.script))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditorTab {
    pub path: Option<PathBuf>,
    pub buffer: String,
    pub modified: bool,
}

impl EditorTab {
    pub fn display_name(&self) -> String {
        display_name(self.path.as_deref(), self.modified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    /// The tab has never been saved; ask for a path and call `save_current_as`.
    NeedsPath,
}

pub struct WriterSession {
    config: Config,
    tree: Option<ProjectTree>,
    context: ContextSet,
    tabs: Vec<EditorTab>,
    current_tab: usize,
    history: Vec<ChatEntry>,
    script_reports: Vec<ScriptReport>,
    in_flight: usize,
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl WriterSession {
    pub fn new(config: Config) -> Self {
        let (tx, rx) = channel();
        Self {
            config,
            tree: None,
            context: ContextSet::new(),
            tabs: vec![EditorTab::default()],
            current_tab: 0,
            history: Vec::new(),
            script_reports: Vec::new(),
            in_flight: 0,
            tx,
            rx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace settings; later sends use the new values.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    // ── Project folder ───────────────────────────────────────────────

    pub fn open_folder(&mut self, root: &Path) -> Result<()> {
        let tree = ProjectTree::scan(root)
            .with_context(|| format!("could not open folder {}", root.display()))?;
        self.tree = Some(tree);
        Ok(())
    }

    /// Rescan the current folder, e.g. after files were added.
    pub fn reload_tree(&mut self) -> Result<()> {
        let Some(root) = self.tree.as_ref().map(|t| t.root().to_path_buf()) else {
            return Ok(());
        };
        self.open_folder(&root)
    }

    pub fn tree(&self) -> Option<&ProjectTree> {
        self.tree.as_ref()
    }

    pub fn root(&self) -> Option<&Path> {
        self.tree.as_ref().map(|t| t.root())
    }

    // ── Context set ──────────────────────────────────────────────────

    pub fn context(&self) -> &ContextSet {
        &self.context
    }

    pub fn toggle_context(&mut self, path: &Path) -> bool {
        self.context.toggle(path)
    }

    pub fn clear_context(&mut self) {
        self.context.clear();
    }

    pub fn context_label(&self) -> String {
        self.context.label()
    }

    /// Names of the pinned files, ordered as the file tree lists them.
    pub fn context_files(&self) -> Vec<String> {
        let paths: Vec<&Path> = match &self.tree {
            Some(tree) => self.context.in_tree_order(tree),
            None => self.context.iter().collect(),
        };
        paths.into_iter().map(file_name).collect()
    }

    // ── Tabs ─────────────────────────────────────────────────────────

    pub fn tabs(&self) -> &[EditorTab] {
        &self.tabs
    }

    pub fn current_tab_index(&self) -> usize {
        self.current_tab
    }

    pub fn current_tab(&self) -> &EditorTab {
        &self.tabs[self.current_tab]
    }

    pub fn switch_to_tab(&mut self, index: usize) {
        if index < self.tabs.len() {
            self.current_tab = index;
        }
    }

    pub fn new_tab(&mut self) {
        self.tabs.push(EditorTab::default());
        self.current_tab = self.tabs.len() - 1;
    }

    /// Focus the tab already showing `path`, or read it into a new one.
    pub fn open_file(&mut self, path: &Path) -> Result<()> {
        if let Some(index) = self.tabs.iter().position(|t| t.path.as_deref() == Some(path)) {
            self.current_tab = index;
            return Ok(());
        }
        let buffer = files::read_text(path)?;
        self.tabs.push(EditorTab {
            path: Some(path.to_path_buf()),
            buffer,
            modified: false,
        });
        self.current_tab = self.tabs.len() - 1;
        Ok(())
    }

    /// Replace the active buffer's text.
    pub fn edit_current(&mut self, text: impl Into<String>) {
        let tab = &mut self.tabs[self.current_tab];
        let text = text.into();
        if tab.buffer != text {
            tab.buffer = text;
            tab.modified = true;
        }
    }

    /// The active buffer, for widgets that edit in place. Follow a change
    /// with [`Self::mark_current_modified`].
    pub fn current_buffer_mut(&mut self) -> &mut String {
        &mut self.tabs[self.current_tab].buffer
    }

    pub fn mark_current_modified(&mut self) {
        self.tabs[self.current_tab].modified = true;
    }

    /// Close the active tab. The last tab is replaced by an empty one.
    pub fn close_current_tab(&mut self) {
        self.tabs.remove(self.current_tab);
        if self.tabs.is_empty() {
            self.tabs.push(EditorTab::default());
        }
        self.current_tab = self.current_tab.min(self.tabs.len() - 1);
    }

    pub fn save_current(&mut self) -> Result<SaveOutcome> {
        let Some(path) = self.current_tab().path.clone() else {
            return Ok(SaveOutcome::NeedsPath);
        };
        self.save_current_as(&path)?;
        Ok(SaveOutcome::Saved(path))
    }

    pub fn save_current_as(&mut self, path: &Path) -> Result<()> {
        let tab = &mut self.tabs[self.current_tab];
        files::write_text(path, &tab.buffer)?;
        tab.path = Some(path.to_path_buf());
        tab.modified = false;
        self.push_entry(EntryRole::System, format!("Saved {}", file_name(path)));
        Ok(())
    }

    // ── Chat ─────────────────────────────────────────────────────────

    pub fn history(&self) -> &[ChatEntry] {
        &self.history
    }

    pub fn push_entry(&mut self, role: EntryRole, content: impl Into<String>) {
        self.history.push(ChatEntry::new(role, content));
    }

    /// Requests sent but not yet answered.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Snapshot the inputs for `message` the way a send would.
    pub fn chat_request(&self, message: &str) -> ChatRequest {
        let tab = self.current_tab();
        let current = tab.path.as_ref().map(|path| OpenBuffer {
            path: path.clone(),
            content: tab.buffer.clone(),
        });
        ChatRequest {
            message: message.to_string(),
            current,
            pinned: self.context.snapshot(),
            mentions: resolve_mentions(message, self.tree.as_ref()).resolved,
        }
    }

    /// Post the user's message and start a request in the background.
    /// Blank input is ignored.
    pub fn send(&mut self, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            return false;
        }
        self.push_entry(EntryRole::You, message);
        let request = self.chat_request(message);
        ChatOrchestrator::new(&self.config).dispatch(request, self.tx.clone());
        self.in_flight += 1;
        true
    }

    // ── Scripts ──────────────────────────────────────────────────────

    pub fn scripts_dir(&self) -> Option<PathBuf> {
        self.root().and_then(scripts::scripts_dir)
    }

    pub fn scripts(&self) -> Vec<PathBuf> {
        self.scripts_dir()
            .map(|dir| scripts::list_scripts(&dir))
            .unwrap_or_default()
    }

    pub fn run_script(&mut self, script: &Path) {
        let interpreter = self.config.script_interpreter.clone();
        let cwd = self.scripts_dir();
        let script = script.to_path_buf();
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let output =
                scripts::run_script_blocking(&interpreter, &script, cwd.as_deref(), SCRIPT_TIMEOUT);
            let _ = tx.send(SessionEvent::ScriptFinished { script, output });
        });
    }

    /// Finished script runs, oldest first.
    pub fn take_script_reports(&mut self) -> Vec<ScriptReport> {
        std::mem::take(&mut self.script_reports)
    }

    // ── Event loop ───────────────────────────────────────────────────

    /// Apply every result posted so far. Never blocks.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            match event {
                SessionEvent::Chat(entry) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.history.push(entry);
                }
                SessionEvent::ScriptFinished { script, output } => {
                    self.script_reports.push(ScriptReport { script, output });
                }
            }
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("scripts")).unwrap();
        fs::write(dir.path().join("scripts").join("run.py"), "print('hi')").unwrap();
        dir
    }

    fn session_for(url: &str) -> WriterSession {
        WriterSession::new(Config {
            llama_cpp_url: url.to_string(),
            ..Config::default()
        })
    }

    fn wait_for_history(session: &mut WriterSession, len: usize) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while session.history().len() < len {
            assert!(Instant::now() < deadline, "no reply arrived");
            session.poll();
            thread::sleep(Duration::from_millis(20));
        }
    }

    fn fake_server(status: u16, body: &'static str) -> (String, thread::JoinHandle<serde_json::Value>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let mut sent = String::new();
            request.as_reader().read_to_string(&mut sent).unwrap();
            request
                .respond(tiny_http::Response::from_string(body).with_status_code(status))
                .unwrap();
            serde_json::from_str(&sent).unwrap()
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_pinned_and_mentioned_file_sent_once() {
        let dir = project();
        let (url, server) = fake_server(200, r#"{"choices":[{"message":{"content":"A summary."}}]}"#);
        let mut session = session_for(&url);
        session.open_folder(dir.path()).unwrap();
        let notes = session.root().unwrap().join("notes.txt");
        assert!(session.toggle_context(&notes));

        assert!(session.send("summarize @notes.txt"));
        wait_for_history(&mut session, 2);

        let sent = server.join().unwrap();
        let messages = sent["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "system");
        assert_eq!(messages[2]["role"], "user");
        let context = messages[1]["content"].as_str().unwrap();
        assert_eq!(context, "Files in context:\n=== notes.txt ===\nhello\n");

        let history = session.history();
        assert_eq!(history[0].role, EntryRole::You);
        assert_eq!(history[1].role, EntryRole::Ai);
        assert_eq!(history[1].content, "A summary.");
        assert_eq!(session.in_flight(), 0);
    }

    #[test]
    fn test_server_error_becomes_error_entry() {
        let (url, server) = fake_server(500, "internal");
        let mut session = session_for(&url);
        session.send("hello");
        wait_for_history(&mut session, 2);
        server.join().unwrap();

        let entry = &session.history()[1];
        assert_eq!(entry.role, EntryRole::Error);
        assert!(entry.content.contains("500"));
    }

    #[test]
    fn test_unreachable_server_names_url() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}", port);
        let mut session = session_for(&url);
        session.send("hello");
        wait_for_history(&mut session, 2);

        let entry = &session.history()[1];
        assert_eq!(entry.role, EntryRole::Error);
        assert!(entry.content.contains(&url));
    }

    #[test]
    fn test_blank_message_ignored() {
        let mut session = WriterSession::new(Config::default());
        assert!(!session.send("   "));
        assert!(session.history().is_empty());
        assert_eq!(session.in_flight(), 0);
    }

    #[test]
    fn test_live_buffer_used_for_current_file() {
        let dir = project();
        let mut session = WriterSession::new(Config::default());
        session.open_folder(dir.path()).unwrap();
        let notes = session.root().unwrap().join("notes.txt");
        session.open_file(&notes).unwrap();
        session.edit_current("hello, edited");
        session.toggle_context(&notes);

        let request = session.chat_request("what about @notes.txt");
        let messages = ChatOrchestrator::new(session.config()).prepare(&request);
        assert_eq!(
            messages[1].content,
            "Files in context:\n=== Current File: notes.txt ===\nhello, edited\n"
        );
    }

    #[test]
    fn test_context_files_follow_tree_order() {
        let dir = project();
        let mut session = WriterSession::new(Config::default());
        session.open_folder(dir.path()).unwrap();
        let root = session.root().unwrap().to_path_buf();
        session.toggle_context(&root.join("notes.txt"));
        session.toggle_context(&root.join("scripts").join("run.py"));

        // Folders come first in the tree, so run.py precedes notes.txt.
        assert_eq!(session.context_files(), vec!["run.py", "notes.txt"]);
        assert_eq!(session.context_label(), "Context: 2 files");
    }

    #[test]
    fn test_untitled_tab_is_not_context() {
        let mut session = WriterSession::new(Config::default());
        session.edit_current("scratch");
        let request = session.chat_request("hi");
        assert!(request.current.is_none());
        assert_eq!(ChatOrchestrator::new(session.config()).prepare(&request).len(), 2);
    }

    #[test]
    fn test_tabs_open_save_close() {
        let dir = project();
        let mut session = WriterSession::new(Config::default());
        let notes = dir.path().join("notes.txt");

        session.open_file(&notes).unwrap();
        assert_eq!(session.tabs().len(), 2);
        session.open_file(&notes).unwrap();
        assert_eq!(session.tabs().len(), 2);
        assert_eq!(session.current_tab().display_name(), "notes.txt");

        session.edit_current("changed");
        assert_eq!(session.current_tab().display_name(), "*notes.txt");
        assert_eq!(session.save_current().unwrap(), SaveOutcome::Saved(notes.clone()));
        assert_eq!(fs::read_to_string(&notes).unwrap(), "changed");
        assert_eq!(session.history().last().unwrap().content, "Saved notes.txt");

        session.switch_to_tab(0);
        assert_eq!(session.save_current().unwrap(), SaveOutcome::NeedsPath);
        session.close_current_tab();
        session.close_current_tab();
        assert_eq!(session.tabs().len(), 1);
        assert_eq!(session.current_tab().display_name(), "Untitled");
    }

    #[test]
    fn test_open_missing_file_reports_error() {
        let dir = project();
        let mut session = WriterSession::new(Config::default());
        assert!(session.open_file(&dir.path().join("nope.txt")).is_err());
        assert_eq!(session.tabs().len(), 1);
    }

    #[test]
    fn test_lists_project_scripts() {
        let dir = project();
        let mut session = WriterSession::new(Config::default());
        assert!(session.scripts().is_empty());
        session.open_folder(dir.path()).unwrap();
        let scripts = session.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].ends_with("scripts/run.py"));
    }

    #[cfg(unix)]
    #[test]
    fn test_script_result_arrives_through_poll() {
        let dir = project();
        let script = dir.path().join("scripts").join("job.sh");
        fs::write(&script, "pwd\n").unwrap();
        let mut session = WriterSession::new(Config {
            script_interpreter: "sh".into(),
            ..Config::default()
        });
        session.open_folder(dir.path()).unwrap();
        session.run_script(&script);

        let deadline = Instant::now() + Duration::from_secs(10);
        let reports = loop {
            session.poll();
            let reports = session.take_script_reports();
            if !reports.is_empty() {
                break reports;
            }
            assert!(Instant::now() < deadline, "script never finished");
            thread::sleep(Duration::from_millis(20));
        };
        assert_eq!(reports[0].title(), "Script: job.sh");
        assert_eq!(reports[0].output.returncode, 0);
        assert!(reports[0].output.stdout.trim_end().ends_with("scripts"));
    }
}
