//! JSON API behind the browser front end.
//!
//! [`handle`] is transport-free: it takes the method, raw URL and body of a
//! request and returns a [`Reply`]. `main` adapts it to `tiny_http`.

use agent_host::{ChatOrchestrator, ChatRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use services::files::{self, NewFile};
use services::scripts::{self, SCRIPT_TIMEOUT};
use services::ProjectTree;
use shared::project::file_name;
use shared::theme::Theme;
use shared::ConfigStore;
use std::path::{Path, PathBuf};
use url::Url;

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    fn ok(value: Value) -> Self {
        Self::json(200, value)
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }

    fn text(content_type: &'static str, body: String) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }
}

/// Shared by every request thread.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub store: ConfigStore,
}

#[derive(Debug, Default, Deserialize)]
struct PathBody {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Default, Deserialize)]
struct SaveBody {
    #[serde(default)]
    path: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChatBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    context_files: Vec<PathBuf>,
}

struct Query {
    path: String,
    pairs: Vec<(String, String)>,
}

impl Query {
    fn parse(raw_url: &str) -> Option<Self> {
        let url = Url::parse(&format!("http://localhost{}", raw_url)).ok()?;
        Some(Self {
            path: url.path().to_string(),
            pairs: url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        })
    }

    /// Trimmed value of `key`, empty when absent.
    fn get(&self, key: &str) -> String {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim().to_string())
            .unwrap_or_default()
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, Reply> {
    serde_json::from_str(body).map_err(|e| Reply::error(400, format!("Invalid JSON body: {}", e)))
}

/// Route one request.
pub fn handle(state: &ServerState, method: &str, raw_url: &str, body: &str) -> Reply {
    let Some(query) = Query::parse(raw_url) else {
        return Reply::error(400, "Malformed URL");
    };
    tracing::debug!(method, path = %query.path, "request");

    let result = match (method, query.path.as_str()) {
        ("GET", "/") => Ok(Reply::text("text/html; charset=utf-8", INDEX_HTML.to_string())),
        ("GET", "/api/config") => Ok(get_config(state)),
        ("POST", "/api/config") => set_config(state, body),
        ("GET", "/api/files/tree") => Ok(file_tree(state, &query)),
        ("GET", "/api/files/browse") => Ok(browse(&query)),
        ("GET", "/api/files/read") => Ok(read_file(&query)),
        ("POST", "/api/files/save") => save_file(body),
        ("POST", "/api/files/new") => new_file(body),
        ("GET", "/api/scripts/list") => Ok(list_scripts(state, &query)),
        ("POST", "/api/scripts/run") => run_script(state, body),
        ("POST", "/api/ai/chat") => ai_chat(state, body),
        ("GET", path) if path.starts_with("/api/theme/") => {
            Ok(theme_css(&path["/api/theme/".len()..]))
        }
        _ => Ok(Reply::error(404, "Not found")),
    };
    result.unwrap_or_else(|reply| reply)
}

// ── Config ───────────────────────────────────────────────────────────

fn config_json(state: &ServerState) -> Value {
    serde_json::to_value(state.store.load()).unwrap_or_else(|_| json!({}))
}

fn get_config(state: &ServerState) -> Reply {
    Reply::ok(config_json(state))
}

fn set_config(state: &ServerState, body: &str) -> Result<Reply, Reply> {
    let patch: Value = parse_body(body)?;
    let merged = state
        .store
        .load()
        .merged(&patch)
        .map_err(|e| Reply::error(400, e.to_string()))?;
    state
        .store
        .save(&merged)
        .map_err(|e| Reply::error(500, e.to_string()))?;
    tracing::info!(path = %state.store.path().display(), "config updated");
    Ok(get_config(state))
}

// ── Files ────────────────────────────────────────────────────────────

/// `?folder=` or the configured default folder, if it is a directory.
fn project_folder(state: &ServerState, query: &Query) -> Option<PathBuf> {
    let mut folder = query.get("folder");
    if folder.is_empty() {
        folder = state.store.load().default_folder;
    }
    let folder = PathBuf::from(folder);
    (!folder.as_os_str().is_empty() && folder.is_dir()).then_some(folder)
}

fn file_tree(state: &ServerState, query: &Query) -> Reply {
    let empty = json!({ "tree": [], "root": "" });
    let Some(folder) = project_folder(state, query) else {
        return Reply::ok(empty);
    };
    match ProjectTree::scan(&folder) {
        Ok(tree) => Reply::ok(json!({
            "tree": tree.to_entries(),
            "root": folder.to_string_lossy(),
        })),
        Err(e) => {
            tracing::warn!(folder = %folder.display(), error = %e, "could not scan folder");
            Reply::ok(empty)
        }
    }
}

fn browse(query: &Query) -> Reply {
    let mut target = query.get("path");
    if target.is_empty() {
        if cfg!(windows) {
            return Reply::ok(json!({ "current": "", "parent": "", "dirs": files::drive_roots() }));
        }
        target = dirs::home_dir()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
    }
    match files::browse_dirs(Path::new(&target)) {
        Ok(listing) => Reply::ok(json!(listing)),
        Err(_) => Reply::json(
            400,
            json!({ "current": target, "parent": "", "dirs": [], "error": "Not a directory" }),
        ),
    }
}

fn read_file(query: &Query) -> Reply {
    let path = query.get("path");
    if path.is_empty() || !Path::new(&path).is_file() {
        return Reply::error(404, "File not found");
    }
    match files::read_text_lossy(Path::new(&path)) {
        Ok(content) => Reply::ok(json!({ "path": path, "content": content })),
        Err(e) => Reply::error(500, format!("{:#}", e)),
    }
}

fn save_file(body: &str) -> Result<Reply, Reply> {
    let SaveBody { path, content } = parse_body(body)?;
    if path.is_empty() {
        return Err(Reply::error(400, "No path provided"));
    }
    files::write_text(Path::new(&path), &content).map_err(|e| Reply::error(500, format!("{:#}", e)))?;
    tracing::info!(path = %path, "saved");
    Ok(Reply::ok(json!({ "ok": true, "path": path })))
}

fn new_file(body: &str) -> Result<Reply, Reply> {
    let PathBody { path } = parse_body(body)?;
    if path.is_empty() {
        return Err(Reply::error(400, "No path provided"));
    }
    match files::create_empty(Path::new(&path)).map_err(|e| Reply::error(500, format!("{:#}", e)))? {
        NewFile::Created => Ok(Reply::ok(json!({ "ok": true, "path": path }))),
        NewFile::AlreadyExists => Err(Reply::error(409, "File already exists")),
    }
}

// ── Scripts ──────────────────────────────────────────────────────────

fn list_scripts(state: &ServerState, query: &Query) -> Reply {
    let Some(folder) = project_folder(state, query) else {
        return Reply::ok(json!({ "scripts": [], "error": "No folder open" }));
    };
    let Some(dir) = scripts::scripts_dir(&folder) else {
        return Reply::ok(json!({ "scripts": [], "error": "No 'scripts' folder found" }));
    };
    let scripts: Vec<Value> = scripts::list_scripts(&dir)
        .iter()
        .map(|p| json!({ "name": file_name(p), "path": p.to_string_lossy() }))
        .collect();
    Reply::ok(json!({ "scripts": scripts }))
}

fn run_script(state: &ServerState, body: &str) -> Result<Reply, Reply> {
    let PathBody { path } = parse_body(body)?;
    let script = PathBuf::from(&path);
    if path.is_empty() || !script.is_file() {
        return Err(Reply::json(
            404,
            json!({ "error": "Script not found", "stdout": "", "stderr": "", "returncode": -1 }),
        ));
    }
    let cwd = script
        .parent()
        .filter(|dir| dir.file_name().is_some_and(|name| name == "scripts"));
    let interpreter = state.store.load().script_interpreter;
    tracing::info!(script = %script.display(), %interpreter, "running script");
    let output = scripts::run_script_blocking(&interpreter, &script, cwd, SCRIPT_TIMEOUT);
    Ok(Reply::ok(json!(output)))
}

// ── Theme ────────────────────────────────────────────────────────────

fn theme_css(key: &str) -> Reply {
    match Theme::from_key(key) {
        Some(theme) => Reply::text("text/css", theme.css()),
        None => Reply::error(404, "Theme not found"),
    }
}

// ── Chat ─────────────────────────────────────────────────────────────

fn ai_chat(state: &ServerState, body: &str) -> Result<Reply, Reply> {
    let ChatBody {
        message,
        context_files,
    } = parse_body(body)?;
    let request = ChatRequest {
        message,
        pinned: context_files,
        ..ChatRequest::default()
    };
    let orchestrator = ChatOrchestrator::new(&state.store.load());
    match orchestrator.complete_blocking(&request) {
        Ok(response) => Ok(Reply::ok(json!({ "response": response }))),
        Err(e) => {
            tracing::warn!(error = %e, "chat request failed");
            let status = if e.is_upstream() { 502 } else { 500 };
            Err(Reply::error(status, e.user_message()))
        }
    }
}
