//! # agent-runtime
//!
//! Concrete LLM providers for the Bull Vision bot.
//!
//! ## Providers
//!
//! - **OpenAI** (default): any OpenAI-compatible chat-completions endpoint,
//!   including Azure OpenAI deployments (the hosting the original service
//!   runs on).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::OpenAiProvider;
//!
//! let provider = OpenAiProvider::from_env()?;
//! let agent = Agent::new(Arc::new(provider), tools, config);
//! ```

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use agent_core::{Agent, AgentError, Conversation, LlmProvider, Message, Result, Role};
