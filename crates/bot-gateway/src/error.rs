//! Gateway Error Taxonomy
//!
//! Every error is caught at the dispatcher boundary, logged with user
//! context, and converted to a user-visible fallback message. Validation
//! failures never appear here: the wizard recovers from them locally by
//! re-prompting.

use std::time::Duration;

use advisor_store::{StoreError, UserId};
use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Defensive: the wizard was stepped without an active session.
    /// The dispatcher routes so this should never reach a user.
    #[error("No active setup session for user {0}")]
    NoActiveSession(UserId),

    /// Document store failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// LLM agent failure
    #[error("Agent error: {0}")]
    Upstream(#[from] AgentError),

    /// The agent did not answer within the configured budget
    #[error("Agent timed out after {0:?}")]
    AgentTimeout(Duration),

    /// Outbound chat transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Startup/environment problem
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Message shown to the user when this error escapes to the boundary
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Upstream(e) => e.user_message(),
            GatewayError::AgentTimeout(_) => {
                "I'm sorry, that analysis is taking longer than expected. Please try again.".into()
            }
            GatewayError::Persistence(_) => {
                "I'm sorry, I couldn't save your data right now. Please try again later.".into()
            }
            _ => "An error occurred while processing your request.".into(),
        }
    }
}
