//! Agent Host - the writing assistant's chat side
//!
//! This crate provides:
//! - `@mention` extraction and resolution against the project tree
//! - the pinned-file context set and the context assembler
//! - request building and background dispatch to the model server
//! - the editor session shared by the desktop front end

pub mod context;
pub mod mentions;
pub mod orchestrator;
pub mod session;

pub use context::{AssembledContext, BlockSource, ContextAssembler, ContextBlock, ContextSet, OpenBuffer};
pub use mentions::{extract_mentions, resolve_mentions, MentionResolution};
pub use orchestrator::{
    build_messages, outcome_entry, ChatEntry, ChatOrchestrator, ChatRequest, EntryRole,
    CONTEXT_PREAMBLE,
};
pub use session::{EditorTab, SaveOutcome, ScriptReport, SessionEvent, WriterSession};
