//! Per-User Conversation Contexts
//!
//! Process-lifetime conversation history, one `Conversation` per Telegram
//! user. The dispatcher snapshots a copy, runs the agent on it, and writes
//! it back only when the run succeeded, so a failed turn leaves no trace.

use std::collections::HashMap;
use std::sync::Mutex;

use advisor_store::UserId;
use agent_core::Conversation;

#[derive(Default)]
pub struct ContextTable {
    table: Mutex<HashMap<UserId, Conversation>>,
}

impl ContextTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the user's conversation, creating an empty one on first use
    pub fn snapshot(&self, user: UserId) -> Conversation {
        self.table
            .lock()
            .unwrap()
            .entry(user)
            .or_insert_with(Conversation::new)
            .clone()
    }

    /// Write the (possibly grown) conversation back
    pub fn store(&self, user: UserId, conversation: Conversation) {
        self.table.lock().unwrap().insert(user, conversation);
    }
}
