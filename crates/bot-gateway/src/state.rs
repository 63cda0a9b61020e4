//! Application State

use std::sync::Arc;

use agent_core::LlmProvider;

use crate::dispatcher::Dispatcher;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Update dispatcher (wizard, command handlers, agent routing)
    pub dispatcher: Arc<Dispatcher>,

    /// LLM provider, exposed for the health endpoint
    pub provider: Arc<dyn LlmProvider>,
}
