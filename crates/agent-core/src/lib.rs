//! # agent-core
//!
//! Provider-agnostic agent runtime for the Bull Vision bot.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait decouples the reasoning loop from the concrete
//! backend; the registry holds domain tools registered by the caller. A run
//! yields the final text plus the structured record of every tool call the
//! loop executed, so callers can act on tool output (e.g. persist fetched
//! news) without re-parsing model text.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentConfig, AgentOutcome};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
