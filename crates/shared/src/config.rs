//! User configuration for AI Writer.
//!
//! The config file is a flat JSON object. Known keys are typed; anything else
//! found on disk is carried in `extra` and written back untouched on save.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful writing assistant. You have access to the user's files and can help with writing, editing, and improving text.";

fn default_llama_cpp_url() -> String {
    "http://localhost:8080".into()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> i64 {
    2000
}

fn default_context_max_tokens() -> usize {
    6000
}

fn default_editor_font() -> String {
    "Monospace 11".into()
}

fn default_theme() -> String {
    "layan-dark".into()
}

fn default_true() -> bool {
    true
}

fn default_script_interpreter() -> String {
    if cfg!(windows) {
        "python".into()
    } else {
        "python3".into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the chat-completions server (no trailing path).
    #[serde(default = "default_llama_cpp_url")]
    pub llama_cpp_url: String,
    /// Persona prompt sent as the leading system message.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Completion cap forwarded to the server; `-1` means no limit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,
    /// Advisory budget for attached file context. Never used to truncate.
    #[serde(default = "default_context_max_tokens")]
    pub context_max_tokens: usize,
    /// Pango-style font description, e.g. "Monospace 11".
    #[serde(default = "default_editor_font")]
    pub editor_font: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_true")]
    pub show_line_numbers: bool,
    #[serde(default = "default_true")]
    pub wrap_text: bool,
    /// Folder opened on startup by the web front-end when none is given.
    #[serde(default)]
    pub default_folder: String,
    #[serde(default = "default_true")]
    pub show_file_panel: bool,
    #[serde(default = "default_true")]
    pub show_ai_panel: bool,
    /// Program used to run project scripts.
    #[serde(default = "default_script_interpreter")]
    pub script_interpreter: String,
    /// Keys this version does not know about, preserved across saves.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llama_cpp_url: default_llama_cpp_url(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            context_max_tokens: default_context_max_tokens(),
            editor_font: default_editor_font(),
            theme: default_theme(),
            show_line_numbers: true,
            wrap_text: true,
            default_folder: String::new(),
            show_file_panel: true,
            show_ai_panel: true,
            script_interpreter: default_script_interpreter(),
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Parse a persisted JSON object, filling absent keys from defaults.
    ///
    /// Known keys are checked one at a time: a value of the wrong type falls
    /// back to that key's default instead of discarding the whole file.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let Value::Object(file) = serde_json::from_str::<Value>(text)? else {
            return Err(ConfigError::NotAnObject);
        };
        let mut merged = Self::default().to_map()?;
        for (key, value) in file {
            if merged.contains_key(&key) {
                let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
                if let Err(e) = serde_json::from_value::<Config>(single) {
                    tracing::warn!(key = %key, error = %e, "config value has the wrong type, using default");
                    continue;
                }
            }
            merged.insert(key, value);
        }
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    /// Overlay the keys of `patch` onto this config. Later keys win.
    pub fn merged(&self, patch: &Value) -> Result<Self, ConfigError> {
        let patch = patch.as_object().ok_or(ConfigError::NotAnObject)?;
        let mut base = self.to_map()?;
        for (key, value) in patch {
            base.insert(key.clone(), value.clone());
        }
        Ok(serde_json::from_value(Value::Object(base))?)
    }

    fn to_map(&self) -> Result<Map<String, Value>, ConfigError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(ConfigError::NotAnObject),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine the home directory")]
    NoHomeDir,

    #[error("config I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config must be a JSON object")]
    NotAnObject,
}

/// Per-OS config location under `home`.
pub fn config_path_for(home: &Path, windows: bool) -> PathBuf {
    if windows {
        home.join("AppData")
            .join("Roaming")
            .join("ai-writer")
            .join("config.json")
    } else {
        home.join(".config").join("ai-writer").join("config.json")
    }
}

/// Loads and saves a [`Config`] at one fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The platform location: roaming AppData on Windows, `~/.config` elsewhere.
    pub fn default_location() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::at(config_path_for(&home, cfg!(windows))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Defaults overlaid with whatever is persisted. Never fails: a missing
    /// file is the normal first-run case and a broken one falls back to
    /// defaults with a warning.
    pub fn load(&self) -> Config {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Config::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read config, using defaults");
                return Config::default();
            }
        };
        match Config::from_json(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unparseable config");
                Config::default()
            }
        }
    }

    /// Write the whole config, creating parent directories as needed.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}
