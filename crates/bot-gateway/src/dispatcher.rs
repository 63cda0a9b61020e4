//! Update Dispatcher
//!
//! Routes each inbound update: callback queries go to the profile wizard,
//! recognized commands to their handlers, messages from users with an
//! active portfolio session to the wizard, and everything else to the LLM
//! agent. Every error is caught here, logged with user context, and turned
//! into a user-visible fallback message so one bad update never takes down
//! update handling.

use std::sync::Arc;
use std::time::Duration;

use advisor_store::{NewsStore, PortfolioStore, ProfileStore, UserId};
use agent_core::{
    Agent, AgentConfig, GenerationOptions, LlmProvider, Message, ToolRegistry,
};
use stock_advisor::BULL_VISION_PROMPT;

use crate::commands::{Command, HELP_TEXT, UNKNOWN_COMMAND_TEXT, WELCOME_TEXT};
use crate::context::ContextTable;
use crate::error::{GatewayError, Result};
use crate::news;
use crate::telegram::{CallbackQuery, ChatTransport, IncomingMessage, Update};
use crate::wizard::{SetupWizard, WizardReply};

const PROFILE_REQUIRED: &str = "Please set up your profile first using /profile command.";
const PORTFOLIO_REQUIRED: &str = "Please set up your portfolio first using /portfolio command.";

pub struct Dispatcher {
    wizard: SetupWizard,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    portfolios: Arc<dyn PortfolioStore>,
    profiles: Arc<dyn ProfileStore>,
    news_store: Arc<dyn NewsStore>,
    transport: Arc<dyn ChatTransport>,
    contexts: ContextTable,
    model: String,
    agent_timeout: Duration,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        portfolios: Arc<dyn PortfolioStore>,
        profiles: Arc<dyn ProfileStore>,
        news_store: Arc<dyn NewsStore>,
        transport: Arc<dyn ChatTransport>,
        model: String,
        agent_timeout: Duration,
    ) -> Self {
        let wizard = SetupWizard::with_memory_sessions(portfolios.clone(), profiles.clone());
        Self {
            wizard,
            provider,
            tools,
            portfolios,
            profiles,
            news_store,
            transport,
            contexts: ContextTable::new(),
            model,
            agent_timeout,
        }
    }

    /// Handle one update; never propagates errors
    pub async fn dispatch(&self, update: Update) {
        let update_id = update.update_id;
        if let Err(e) = self.route(&update).await {
            tracing::error!(update_id, error = %e, "error handling update");

            if let Some(chat_id) = Self::chat_of(&update) {
                let text = e.user_message();
                if let Err(send_err) = self.transport.send_text(chat_id, &text, false).await {
                    tracing::error!(chat_id, error = %send_err, "failed to send error message");
                }
            }
        }
    }

    fn chat_of(update: &Update) -> Option<i64> {
        update
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .or_else(|| {
                update
                    .callback_query
                    .as_ref()
                    .and_then(|cb| cb.message.as_ref().map(|m| m.chat.id))
            })
    }

    async fn route(&self, update: &Update) -> Result<()> {
        if let Some(cb) = &update.callback_query {
            return self.handle_callback(cb).await;
        }
        if let Some(message) = &update.message {
            return self.handle_message(message).await;
        }
        tracing::debug!(update_id = update.update_id, "ignoring unsupported update kind");
        Ok(())
    }

    async fn handle_message(&self, message: &IncomingMessage) -> Result<()> {
        let chat_id = message.chat.id;
        let Some(user) = message.from.as_ref().map(|u| u.id) else {
            return Ok(());
        };
        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };

        // Commands win over an active session: re-issuing /portfolio or
        // /profile mid-flow restarts the wizard (begin overwrites).
        if let Some(command) = Command::parse(text) {
            return self.handle_command(user, chat_id, command).await;
        }

        if self.wizard.has_portfolio_session(user) {
            let reply = self.wizard.portfolio_step(user, text).await?;
            return self.deliver(chat_id, None, reply).await;
        }

        self.handle_chat(user, chat_id, text).await
    }

    async fn handle_command(&self, user: UserId, chat_id: i64, command: Command) -> Result<()> {
        match command {
            Command::Start => self.transport.send_text(chat_id, WELCOME_TEXT, false).await,
            Command::Help => self.transport.send_text(chat_id, HELP_TEXT, false).await,
            Command::Portfolio => {
                let reply = self.wizard.begin_portfolio(user);
                self.deliver(chat_id, None, reply).await
            }
            Command::Profile => {
                let reply = self.wizard.begin_profile(user);
                self.deliver(chat_id, None, reply).await
            }
            Command::Unknown(raw) => {
                tracing::debug!(user_id = user, command = %raw, "unknown command");
                self.transport
                    .send_text(chat_id, UNKNOWN_COMMAND_TEXT, false)
                    .await
            }
        }
    }

    async fn handle_callback(&self, cb: &CallbackQuery) -> Result<()> {
        let user = cb.from.id;
        let chat_id = cb.message.as_ref().map_or(user, |m| m.chat.id);
        let message_id = cb.message.as_ref().map(|m| m.message_id);

        if let Some(data) = cb.data.as_deref() {
            if self.wizard.has_profile_session(user) {
                let reply = self.wizard.profile_choose(user, data).await?;
                self.deliver(chat_id, message_id, reply).await?;
            } else {
                tracing::debug!(user_id = user, data, "callback without active profile session");
            }
        }

        self.transport.answer_callback(&cb.id).await
    }

    /// Free text goes to the agent, gated on a completed profile and
    /// portfolio the way the original bot requires.
    async fn handle_chat(&self, user: UserId, chat_id: i64, text: &str) -> Result<()> {
        let Some(profile) = self.profiles.find(user).await? else {
            return self.transport.send_text(chat_id, PROFILE_REQUIRED, false).await;
        };
        let Some(portfolio) = self.portfolios.find(user).await? else {
            return self
                .transport
                .send_text(chat_id, PORTFOLIO_REQUIRED, false)
                .await;
        };

        let config = AgentConfig {
            system_prompt: format!(
                "{BULL_VISION_PROMPT}\n\n## User Portfolio\n{}\n\n## Investor Profile\n{}",
                portfolio.summary(),
                profile.summary()
            ),
            generation: GenerationOptions {
                model: self.model.clone(),
                ..Default::default()
            },
            ..Default::default()
        };
        let agent = Agent::new(self.provider.clone(), self.tools.clone(), config);

        let mut conversation = self.contexts.snapshot(user);
        conversation.set_system_prompt(agent.build_system_prompt());
        conversation.push(Message::user(text));

        // Bounded run: on timeout or agent failure the grown conversation is
        // discarded, leaving the stored context untouched.
        let outcome =
            match tokio::time::timeout(self.agent_timeout, agent.run(&mut conversation)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(GatewayError::AgentTimeout(self.agent_timeout)),
            };

        self.contexts.store(user, conversation);

        let inserted = news::store_fetched_news(&outcome, self.news_store.as_ref()).await;
        if inserted > 0 {
            tracing::info!(user_id = user, inserted, "stored fetched news articles");
        }

        tracing::info!(user_id = user, tool_calls = outcome.tool_results.len(), "agent replied");
        self.transport
            .send_text(chat_id, &outcome.final_text, true)
            .await
    }

    async fn deliver(
        &self,
        chat_id: i64,
        message_id: Option<i64>,
        reply: WizardReply,
    ) -> Result<()> {
        match reply {
            WizardReply::Send {
                text,
                keyboard: None,
            } => self.transport.send_text(chat_id, &text, false).await,
            WizardReply::Send {
                text,
                keyboard: Some(keyboard),
            } => self.transport.send_keyboard(chat_id, &text, keyboard).await,
            WizardReply::Edit { text, keyboard } => match message_id {
                Some(message_id) => {
                    self.transport
                        .edit_message(chat_id, message_id, &text, keyboard)
                        .await
                }
                // Defensive: a callback without its original message
                None => self.transport.send_text(chat_id, &text, false).await,
            },
            WizardReply::Ignored => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_store::{
        InvestmentGoal, InvestmentHorizon, MemoryNewsStore, MemoryPortfolioStore,
        MemoryProfileStore, PortfolioRecord, ProfileRecord, RiskTolerance,
    };
    use agent_core::error::AgentError;
    use agent_core::provider::{Completion, FinishReason};
    use agent_core::{Result as CoreResult, Tool};
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::telegram::{Chat, InlineKeyboardMarkup, TgUser};

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    #[derive(Clone, Debug, PartialEq)]
    enum Outbound {
        Text {
            chat_id: i64,
            text: String,
            markdown: bool,
        },
        Keyboard {
            chat_id: i64,
            text: String,
        },
        Edit {
            chat_id: i64,
            message_id: i64,
            text: String,
            has_keyboard: bool,
        },
        Callback(String),
    }

    #[derive(Default)]
    struct RecordingTransport {
        outbound: Mutex<Vec<Outbound>>,
    }

    impl RecordingTransport {
        fn sent(&self) -> Vec<Outbound> {
            self.outbound.lock().unwrap().clone()
        }

        fn texts(&self) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter_map(|o| match o {
                    Outbound::Text { text, .. }
                    | Outbound::Keyboard { text, .. }
                    | Outbound::Edit { text, .. } => Some(text),
                    Outbound::Callback(_) => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_text(
            &self,
            chat_id: i64,
            text: &str,
            markdown: bool,
        ) -> crate::error::Result<()> {
            self.outbound.lock().unwrap().push(Outbound::Text {
                chat_id,
                text: text.to_string(),
                markdown,
            });
            Ok(())
        }

        async fn send_keyboard(
            &self,
            chat_id: i64,
            text: &str,
            _keyboard: InlineKeyboardMarkup,
        ) -> crate::error::Result<()> {
            self.outbound.lock().unwrap().push(Outbound::Keyboard {
                chat_id,
                text: text.to_string(),
            });
            Ok(())
        }

        async fn edit_message(
            &self,
            chat_id: i64,
            message_id: i64,
            text: &str,
            keyboard: Option<InlineKeyboardMarkup>,
        ) -> crate::error::Result<()> {
            self.outbound.lock().unwrap().push(Outbound::Edit {
                chat_id,
                message_id,
                text: text.to_string(),
                has_keyboard: keyboard.is_some(),
            });
            Ok(())
        }

        async fn answer_callback(&self, callback_id: &str) -> crate::error::Result<()> {
            self.outbound
                .lock()
                .unwrap()
                .push(Outbound::Callback(callback_id.to_string()));
            Ok(())
        }

        async fn set_webhook(&self, _url: &str) -> crate::error::Result<()> {
            Ok(())
        }
    }

    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<&str>) -> Self {
            let mut replies: Vec<String> = replies.into_iter().map(String::from).collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> CoreResult<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            options: &GenerationOptions,
        ) -> CoreResult<Completion> {
            let content = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;
            Ok(Completion {
                content,
                model: options.model.clone(),
                usage: None,
                finish_reason: Some(FinishReason::Stop),
            })
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn health_check(&self) -> CoreResult<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> CoreResult<Completion> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(AgentError::Provider("should have timed out".into()))
        }
    }

    /// Tool returning a fixed news payload, standing in for the market stack
    struct CannedNewsTool;

    #[async_trait]
    impl Tool for CannedNewsTool {
        fn schema(&self) -> agent_core::ToolSchema {
            agent_core::ToolSchema {
                name: "search_stock_news".into(),
                description: "Canned news".into(),
                parameters: Vec::new(),
            }
        }

        async fn execute(
            &self,
            _call: &agent_core::ToolCall,
        ) -> CoreResult<agent_core::ToolResult> {
            Ok(
                agent_core::ToolResult::success("search_stock_news", "1 article").with_data(
                    serde_json::json!({
                        "articles": [{
                            "title": "VNM rallies",
                            "url": "https://news.example.com/vnm/rally",
                            "content": "Shares advanced.",
                            "score": 0.9
                        }]
                    }),
                ),
            )
        }
    }

    // ------------------------------------------------------------------
    // Fixture
    // ------------------------------------------------------------------

    struct Fixture {
        dispatcher: Dispatcher,
        transport: Arc<RecordingTransport>,
        portfolios: Arc<MemoryPortfolioStore>,
        profiles: Arc<MemoryProfileStore>,
        news: Arc<MemoryNewsStore>,
    }

    fn fixture_with(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Fixture {
        let transport = Arc::new(RecordingTransport::default());
        let portfolios = Arc::new(MemoryPortfolioStore::new());
        let profiles = Arc::new(MemoryProfileStore::new());
        let news = Arc::new(MemoryNewsStore::new());

        let mut tools = ToolRegistry::new();
        tools.register(CannedNewsTool);

        let dispatcher = Dispatcher::new(
            provider,
            Arc::new(tools),
            portfolios.clone(),
            profiles.clone(),
            news.clone(),
            transport.clone(),
            "test-model".into(),
            timeout,
        );

        Fixture {
            dispatcher,
            transport,
            portfolios,
            profiles,
            news,
        }
    }

    fn fixture(replies: Vec<&str>) -> Fixture {
        fixture_with(
            Arc::new(ScriptedProvider::new(replies)),
            Duration::from_secs(5),
        )
    }

    fn msg(user: i64, text: &str) -> Update {
        Update {
            update_id: 1,
            message: Some(IncomingMessage {
                message_id: 100,
                from: Some(TgUser { id: user }),
                chat: Chat { id: user },
                text: Some(text.to_string()),
            }),
            callback_query: None,
        }
    }

    fn callback(user: i64, data: &str) -> Update {
        Update {
            update_id: 2,
            message: None,
            callback_query: Some(CallbackQuery {
                id: format!("cb-{data}"),
                from: TgUser { id: user },
                message: Some(IncomingMessage {
                    message_id: 200,
                    from: None,
                    chat: Chat { id: user },
                    text: None,
                }),
                data: Some(data.to_string()),
            }),
        }
    }

    async fn seed_records(f: &Fixture, user: i64) {
        f.profiles
            .upsert(&ProfileRecord {
                user_id: user,
                risk_tolerance: RiskTolerance::Moderate,
                investment_horizon: InvestmentHorizon::MediumTerm,
                investment_goals: vec![InvestmentGoal::Growth],
            })
            .await
            .unwrap();
        f.portfolios
            .upsert(&PortfolioRecord::new(
                user,
                vec!["VNM".into(), "FPT".into()],
                &[0.5, 0.5],
            ))
            .await
            .unwrap();
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_start_and_unknown_commands() {
        let f = fixture(vec![]);

        f.dispatcher.dispatch(msg(1, "/start")).await;
        f.dispatcher.dispatch(msg(1, "/frobnicate")).await;

        let texts = f.transport.texts();
        assert!(texts[0].contains("Welcome to Bull Vision"));
        assert_eq!(texts[1], UNKNOWN_COMMAND_TEXT);
    }

    #[tokio::test]
    async fn test_portfolio_wizard_end_to_end() {
        let f = fixture(vec![]);

        f.dispatcher.dispatch(msg(123, "/portfolio")).await;
        f.dispatcher.dispatch(msg(123, "VNM, FPT, VIC")).await;
        f.dispatcher.dispatch(msg(123, "0.4, 0.3, 0.3")).await;

        let texts = f.transport.texts();
        assert!(texts[0].contains("stock symbols"));
        assert!(texts[1].contains("weights for VNM, FPT, VIC"));
        assert!(texts[2].contains("Portfolio updated successfully"));

        let record = f.portfolios.find(123).await.unwrap().unwrap();
        assert_eq!(record.symbols, ["VNM", "FPT", "VIC"]);
        assert_eq!(record.weights["VIC"], 0.3);
    }

    #[tokio::test]
    async fn test_rejected_weights_keep_wizard_active() {
        let f = fixture(vec![]);

        f.dispatcher.dispatch(msg(1, "/portfolio")).await;
        f.dispatcher.dispatch(msg(1, "VNM, FPT")).await;
        f.dispatcher.dispatch(msg(1, "0.5, 0.6")).await;

        assert!(f.transport.texts()[2].contains("Weights must sum to 1.0"));
        assert!(f.portfolios.is_empty());

        // Still in the weights step: a corrected answer completes the flow
        f.dispatcher.dispatch(msg(1, "0.5, 0.5")).await;
        assert_eq!(f.portfolios.len(), 1);
    }

    #[tokio::test]
    async fn test_profile_wizard_via_callbacks() {
        let f = fixture(vec![]);

        f.dispatcher.dispatch(msg(7, "/profile")).await;
        assert!(matches!(f.transport.sent()[0], Outbound::Keyboard { .. }));

        f.dispatcher.dispatch(callback(7, "moderate")).await;
        f.dispatcher.dispatch(callback(7, "medium_term")).await;
        f.dispatcher.dispatch(callback(7, "growth")).await;
        f.dispatcher.dispatch(callback(7, "value")).await;
        f.dispatcher.dispatch(callback(7, "DONE")).await;

        let record = f.profiles.find(7).await.unwrap().unwrap();
        assert_eq!(record.risk_tolerance, RiskTolerance::Moderate);
        assert_eq!(record.investment_horizon, InvestmentHorizon::MediumTerm);
        assert_eq!(
            record.investment_goals,
            vec![InvestmentGoal::Growth, InvestmentGoal::Value]
        );

        // Every callback was acknowledged
        let acks = f
            .transport
            .sent()
            .into_iter()
            .filter(|o| matches!(o, Outbound::Callback(_)))
            .count();
        assert_eq!(acks, 5);

        // The final edit removed the keyboard
        let last_edit = f
            .transport
            .sent()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Edit {
                    text, has_keyboard, ..
                } => Some((text, has_keyboard)),
                _ => None,
            })
            .last()
            .unwrap();
        assert!(last_edit.0.contains("updated successfully"));
        assert!(!last_edit.1);
    }

    #[tokio::test]
    async fn test_chat_requires_profile_then_portfolio() {
        let f = fixture(vec![]);

        f.dispatcher.dispatch(msg(1, "how is VNM?")).await;
        assert_eq!(f.transport.texts()[0], PROFILE_REQUIRED);

        f.profiles
            .upsert(&ProfileRecord {
                user_id: 1,
                risk_tolerance: RiskTolerance::Conservative,
                investment_horizon: InvestmentHorizon::LongTerm,
                investment_goals: vec![],
            })
            .await
            .unwrap();

        f.dispatcher.dispatch(msg(1, "how is VNM?")).await;
        assert_eq!(f.transport.texts()[1], PORTFOLIO_REQUIRED);
    }

    #[tokio::test]
    async fn test_chat_runs_agent_and_stores_news() {
        let f = fixture(vec![
            "```tool\n{\"tool\": \"search_stock_news\", \"arguments\": {\"query\": \"VNM\"}}\n```",
            "*Summary*: VNM looks stable.",
        ]);
        seed_records(&f, 42).await;

        f.dispatcher.dispatch(msg(42, "any news on VNM?")).await;

        let sent = f.transport.sent();
        assert_eq!(
            sent.last().unwrap(),
            &Outbound::Text {
                chat_id: 42,
                text: "*Summary*: VNM looks stable.".into(),
                markdown: true,
            }
        );
        assert_eq!(f.news.len(), 1);
    }

    #[tokio::test]
    async fn test_agent_timeout_sends_apology_and_keeps_context_clean() {
        let f = fixture_with(Arc::new(SlowProvider), Duration::from_millis(20));
        seed_records(&f, 9).await;

        f.dispatcher.dispatch(msg(9, "slow question")).await;

        let texts = f.transport.texts();
        assert!(texts[0].contains("taking longer than expected"));

        // The failed turn left no trace in the stored context
        assert!(f.dispatcher.contexts.snapshot(9).is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_surfaces_apology() {
        let f = fixture(vec![]); // script exhausted -> provider error
        seed_records(&f, 9).await;

        f.dispatcher.dispatch(msg(9, "hello")).await;

        let texts = f.transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("I'm sorry"));
    }

    #[tokio::test]
    async fn test_callback_without_session_is_acknowledged_only() {
        let f = fixture(vec![]);

        f.dispatcher.dispatch(callback(5, "moderate")).await;

        let sent = f.transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Outbound::Callback(_)));
    }

    #[tokio::test]
    async fn test_update_without_message_or_callback_is_ignored() {
        let f = fixture(vec![]);
        f.dispatcher
            .dispatch(Update {
                update_id: 3,
                message: None,
                callback_query: None,
            })
            .await;
        assert!(f.transport.sent().is_empty());
    }
}
