//! Chat orchestration: build the outgoing message list, call the model
//! server off the UI thread, and post the outcome back as a chat entry.
//!
//! Each send gets its own worker thread and its own runtime. Nothing is
//! shared with the UI except the channel the result travels on, so
//! concurrent sends may complete in any order.

use crate::context::{ContextAssembler, OpenBuffer};
use providers::{ChatError, LlamaClient, REQUEST_TIMEOUT};
use shared::agent_api::ChatMessage;
use shared::Config;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const CONTEXT_PREAMBLE: &str = "Files in context:\n";

/// Who a chat panel entry is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    You,
    Ai,
    Error,
    System,
}

impl EntryRole {
    pub fn label(&self) -> &'static str {
        match self {
            EntryRole::You => "You",
            EntryRole::Ai => "AI",
            EntryRole::Error => "Error",
            EntryRole::System => "System",
        }
    }
}

/// One line of the visible chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: EntryRole,
    pub content: String,
    pub timestamp: String,
}

impl ChatEntry {
    pub fn new(role: EntryRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
        }
    }

    pub fn render(&self) -> String {
        format!("\n[{}]\n{}\n", self.role.label(), self.content)
    }
}

/// Everything a send needs, captured when the user hits Send.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    pub current: Option<OpenBuffer>,
    pub pinned: Vec<PathBuf>,
    pub mentions: Vec<PathBuf>,
}

/// Persona, then the context message only when there is context, then the user turn.
pub fn build_messages(persona: &str, context: &str, user_message: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(persona)];
    if !context.is_empty() {
        messages.push(ChatMessage::system(format!("{}{}", CONTEXT_PREAMBLE, context)));
    }
    messages.push(ChatMessage::user(user_message));
    messages
}

/// Map a finished request onto the entry shown in the chat panel.
pub fn outcome_entry(outcome: Result<String, ChatError>) -> ChatEntry {
    match outcome {
        Ok(reply) => ChatEntry::new(EntryRole::Ai, reply),
        Err(e) => {
            tracing::warn!(error = %e, "chat request failed");
            ChatEntry::new(EntryRole::Error, e.user_message())
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOrchestrator {
    base_url: String,
    persona: String,
    temperature: f64,
    max_tokens: i64,
    assembler: ContextAssembler,
    timeout: Duration,
}

impl ChatOrchestrator {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.llama_cpp_url.clone(),
            persona: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            assembler: ContextAssembler::new(config.context_max_tokens),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The exact message list a request will send.
    pub fn prepare(&self, request: &ChatRequest) -> Vec<ChatMessage> {
        let context = self.assembler.assemble(
            request.current.as_ref(),
            &request.pinned,
            &request.mentions,
        );
        build_messages(&self.persona, &context.render(), &request.message)
    }

    pub async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let messages = self.prepare(request);
        let client = if self.timeout == REQUEST_TIMEOUT {
            LlamaClient::new(&self.base_url)
        } else {
            LlamaClient::with_timeout(&self.base_url, self.timeout)?
        };
        tracing::info!(
            endpoint = %client.endpoint(),
            messages = messages.len(),
            "sending chat request"
        );
        client
            .complete(&messages, self.temperature, self.max_tokens)
            .await
    }

    /// Run one request to completion on the calling thread.
    pub fn complete_blocking(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ChatError::Transport(format!("Failed to start async runtime: {}", e)))?;
        rt.block_on(self.complete(request))
    }

    /// Send `request` on a fresh worker thread; the resulting entry is
    /// posted on `tx`. Always posts exactly one entry, even if the worker panics.
    pub fn dispatch<T>(&self, request: ChatRequest, tx: Sender<T>) -> JoinHandle<()>
    where
        T: From<ChatEntry> + Send + 'static,
    {
        let orchestrator = self.clone();
        thread::spawn(move || {
            let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                outcome_entry(orchestrator.complete_blocking(&request))
            }));
            let entry = res.unwrap_or_else(|_| {
                ChatEntry::new(
                    EntryRole::Error,
                    "Error: the chat worker stopped unexpectedly.",
                )
            });
            // The receiver is gone only when the UI has shut down.
            let _ = tx.send(T::from(entry));
        })
    }
}
