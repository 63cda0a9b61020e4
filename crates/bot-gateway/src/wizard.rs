//! Conversation Setup Wizard
//!
//! Per-user finite-state machines that collect structured data across chat
//! turns: the portfolio flow (free-text symbols, then weights) and the
//! investor profile flow (inline-keyboard choices). On completion the
//! assembled record is upserted through the store collaborator and the
//! transient session is removed.
//!
//! Concurrency: a step checks the session out of its table (`take`),
//! computes the transition on the owned value, and checks it back in only
//! for non-terminal outcomes. Two racing messages from the same user can
//! never mutate one session concurrently; the loser observes no active
//! session and is routed as ordinary traffic.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use advisor_store::{
    InvestmentGoal, InvestmentHorizon, PortfolioRecord, PortfolioStore, ProfileRecord,
    ProfileStore, RiskTolerance, UserId,
};

use crate::error::{GatewayError, Result};
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

// ============================================================================
// Sessions
// ============================================================================

/// Steps of the portfolio flow
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortfolioStep {
    WaitingForSymbols,
    WaitingForWeights,
}

/// Transient portfolio setup state for one user
#[derive(Clone, Debug)]
pub struct PortfolioSetup {
    step: PortfolioStep,
    symbols: Vec<String>,
}

impl PortfolioSetup {
    fn new() -> Self {
        Self {
            step: PortfolioStep::WaitingForSymbols,
            symbols: Vec::new(),
        }
    }

    /// Current step (exposed for tests)
    pub fn step(&self) -> PortfolioStep {
        self.step
    }

    /// Symbols collected so far (exposed for tests)
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

/// Steps of the profile flow
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileStep {
    WaitingForRiskTolerance,
    WaitingForInvestmentHorizon,
    WaitingForInvestmentGoals,
}

/// Transient profile setup state for one user
#[derive(Clone, Debug)]
pub struct ProfileSetup {
    step: ProfileStep,
    risk_tolerance: Option<RiskTolerance>,
    investment_horizon: Option<InvestmentHorizon>,
    goals: BTreeSet<InvestmentGoal>,
}

impl ProfileSetup {
    fn new() -> Self {
        Self {
            step: ProfileStep::WaitingForRiskTolerance,
            risk_tolerance: None,
            investment_horizon: None,
            goals: BTreeSet::new(),
        }
    }

    /// Current step (exposed for tests)
    pub fn step(&self) -> ProfileStep {
        self.step
    }
}

// ============================================================================
// Session store
// ============================================================================

/// Injected table of active sessions, at most one per user per flow.
///
/// The trait exists so the in-memory table can be replaced by a distributed
/// or per-user-locking store without touching wizard call sites.
pub trait SessionStore<S>: Send + Sync {
    /// Install a session, replacing any active one
    fn insert(&self, user: UserId, session: S);

    /// Atomically remove and return the active session
    fn take(&self, user: UserId) -> Option<S>;

    /// Whether the user has an active session
    fn contains(&self, user: UserId) -> bool;
}

/// Process-local session table behind a mutex
pub struct MemorySessions<S> {
    table: Mutex<HashMap<UserId, S>>,
}

impl<S> Default for MemorySessions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MemorySessions<S> {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: Send> SessionStore<S> for MemorySessions<S> {
    fn insert(&self, user: UserId, session: S) {
        self.table.lock().unwrap().insert(user, session);
    }

    fn take(&self, user: UserId) -> Option<S> {
        self.table.lock().unwrap().remove(&user)
    }

    fn contains(&self, user: UserId) -> bool {
        self.table.lock().unwrap().contains_key(&user)
    }
}

// ============================================================================
// Replies
// ============================================================================

/// What the dispatcher should do with the outcome of a wizard operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WizardReply {
    /// Send a new message
    Send {
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    /// Edit the message carrying the keyboard in place
    Edit {
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    /// Unknown choice: do nothing (the callback is still acknowledged)
    Ignored,
}

impl WizardReply {
    fn send(text: impl Into<String>) -> Self {
        WizardReply::Send {
            text: text.into(),
            keyboard: None,
        }
    }
}

// ============================================================================
// Prompts
// ============================================================================

const SYMBOLS_PROMPT: &str = "Please enter the stock symbols for your portfolio (comma-separated).\nExample: VNM, FPT, VIC";
const SYMBOLS_INVALID: &str = "Please enter at least one valid symbol.";
const WEIGHTS_NOT_NUMBERS: &str = "Please enter valid numbers for weights.";
const WEIGHTS_BAD_SUM: &str = "Weights must sum to 1.0. Please try again.";
const PORTFOLIO_SAVED: &str =
    "Portfolio updated successfully! You can now ask me questions about your portfolio.";
const PORTFOLIO_FAILED: &str = "An error occurred during portfolio setup.";

const RISK_PROMPT: &str = "What's your risk tolerance level?";
const HORIZON_PROMPT: &str = "What's your investment horizon?";
const GOALS_PROMPT: &str = "Select your investment goals (you can select multiple):";
const PROFILE_SAVED: &str = "Your investor profile has been updated successfully! 🎯\nYou can now continue with portfolio setup using /portfolio command.";
const PROFILE_FAILED: &str = "An error occurred while processing your selection.";

/// Callback payload that completes the goals step
const DONE_SIGNAL: &str = "DONE";

fn risk_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(vec![
        InlineKeyboardButton::new("Conservative 🔒", RiskTolerance::Conservative.as_str()),
        InlineKeyboardButton::new("Moderate ⚖️", RiskTolerance::Moderate.as_str()),
        InlineKeyboardButton::new("Aggressive 🚀", RiskTolerance::Aggressive.as_str()),
    ])
}

fn horizon_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(vec![
        InlineKeyboardButton::new("Short Term (< 1 year) ⏱️", InvestmentHorizon::ShortTerm.as_str()),
        InlineKeyboardButton::new("Medium Term (1-3 years) ⌛", InvestmentHorizon::MediumTerm.as_str()),
        InlineKeyboardButton::new("Long Term (> 3 years) 🗓️", InvestmentHorizon::LongTerm.as_str()),
    ])
}

fn goals_keyboard(selected: &BTreeSet<InvestmentGoal>) -> InlineKeyboardMarkup {
    let mut buttons: Vec<InlineKeyboardButton> = InvestmentGoal::ALL
        .iter()
        .map(|goal| {
            let label = if selected.contains(goal) {
                format!("✅ {}", goal.label())
            } else {
                goal.label().to_string()
            };
            InlineKeyboardButton::new(label, goal.as_str())
        })
        .collect();
    buttons.push(InlineKeyboardButton::new("Done ✅", DONE_SIGNAL));
    InlineKeyboardMarkup::single_column(buttons)
}

// ============================================================================
// Validation
// ============================================================================

/// Trimmed, upper-cased, non-blank tokens in input order
fn parse_symbols(input: &str) -> std::result::Result<Vec<String>, &'static str> {
    let symbols: Vec<String> = input
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        Err(SYMBOLS_INVALID)
    } else {
        Ok(symbols)
    }
}

/// Weights parsed against the collected symbol count
fn parse_weights(input: &str, expected: usize) -> std::result::Result<Vec<f64>, String> {
    let mut weights = Vec::new();
    for token in input.split(',') {
        match token.trim().parse::<f64>() {
            Ok(w) => weights.push(w),
            Err(_) => return Err(WEIGHTS_NOT_NUMBERS.to_string()),
        }
    }

    if weights.len() != expected {
        return Err(format!("Please enter exactly {expected} weights."));
    }

    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > advisor_store::records::WEIGHT_SUM_TOLERANCE {
        return Err(WEIGHTS_BAD_SUM.to_string());
    }

    Ok(weights)
}

// ============================================================================
// Wizard
// ============================================================================

/// The multi-step guided-input state machine
pub struct SetupWizard {
    portfolio_sessions: Arc<dyn SessionStore<PortfolioSetup>>,
    profile_sessions: Arc<dyn SessionStore<ProfileSetup>>,
    portfolios: Arc<dyn PortfolioStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl SetupWizard {
    pub fn new(
        portfolio_sessions: Arc<dyn SessionStore<PortfolioSetup>>,
        profile_sessions: Arc<dyn SessionStore<ProfileSetup>>,
        portfolios: Arc<dyn PortfolioStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            portfolio_sessions,
            profile_sessions,
            portfolios,
            profiles,
        }
    }

    /// Convenience constructor with in-memory session tables
    pub fn with_memory_sessions(
        portfolios: Arc<dyn PortfolioStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self::new(
            Arc::new(MemorySessions::new()),
            Arc::new(MemorySessions::new()),
            portfolios,
            profiles,
        )
    }

    // ------------------------------------------------------------------
    // Portfolio flow
    // ------------------------------------------------------------------

    /// Start (or silently restart) the portfolio flow
    pub fn begin_portfolio(&self, user: UserId) -> WizardReply {
        tracing::info!(user_id = user, "portfolio setup started");
        self.portfolio_sessions.insert(user, PortfolioSetup::new());
        WizardReply::send(SYMBOLS_PROMPT)
    }

    pub fn has_portfolio_session(&self, user: UserId) -> bool {
        self.portfolio_sessions.contains(user)
    }

    /// Advance the portfolio flow with one free-text answer
    pub async fn portfolio_step(&self, user: UserId, input: &str) -> Result<WizardReply> {
        let Some(mut session) = self.portfolio_sessions.take(user) else {
            return Err(GatewayError::NoActiveSession(user));
        };

        match session.step {
            PortfolioStep::WaitingForSymbols => match parse_symbols(input) {
                Err(hint) => {
                    tracing::debug!(user_id = user, step = "symbols", "invalid input");
                    self.portfolio_sessions.insert(user, session);
                    Ok(WizardReply::send(hint))
                }
                Ok(symbols) => {
                    let prompt = format!(
                        "Please enter the weights for {} (comma-separated).\nExample: 0.4, 0.3, 0.3",
                        symbols.join(", ")
                    );
                    session.symbols = symbols;
                    session.step = PortfolioStep::WaitingForWeights;
                    self.portfolio_sessions.insert(user, session);
                    Ok(WizardReply::send(prompt))
                }
            },
            PortfolioStep::WaitingForWeights => {
                match parse_weights(input, session.symbols.len()) {
                    Err(hint) => {
                        tracing::debug!(user_id = user, step = "weights", "invalid input");
                        self.portfolio_sessions.insert(user, session);
                        Ok(WizardReply::send(hint))
                    }
                    Ok(weights) => {
                        // Terminal: the session stays deleted whether or not
                        // the upsert succeeds (no retry, no stuck sessions).
                        let record = PortfolioRecord::new(user, session.symbols, &weights);
                        match self.portfolios.upsert(&record).await {
                            Ok(()) => {
                                tracing::info!(user_id = user, "portfolio saved");
                                Ok(WizardReply::send(PORTFOLIO_SAVED))
                            }
                            Err(e) => {
                                tracing::error!(user_id = user, error = %e, "portfolio upsert failed");
                                Ok(WizardReply::send(PORTFOLIO_FAILED))
                            }
                        }
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Profile flow
    // ------------------------------------------------------------------

    /// Start (or silently restart) the profile flow
    pub fn begin_profile(&self, user: UserId) -> WizardReply {
        tracing::info!(user_id = user, "profile setup started");
        self.profile_sessions.insert(user, ProfileSetup::new());
        WizardReply::Send {
            text: RISK_PROMPT.into(),
            keyboard: Some(risk_keyboard()),
        }
    }

    pub fn has_profile_session(&self, user: UserId) -> bool {
        self.profile_sessions.contains(user)
    }

    /// Advance the profile flow with one keyboard selection
    pub async fn profile_choose(&self, user: UserId, data: &str) -> Result<WizardReply> {
        let Some(mut session) = self.profile_sessions.take(user) else {
            return Err(GatewayError::NoActiveSession(user));
        };

        match session.step {
            ProfileStep::WaitingForRiskTolerance => match RiskTolerance::parse(data) {
                Some(risk) => {
                    session.risk_tolerance = Some(risk);
                    session.step = ProfileStep::WaitingForInvestmentHorizon;
                    self.profile_sessions.insert(user, session);
                    Ok(WizardReply::Edit {
                        text: HORIZON_PROMPT.into(),
                        keyboard: Some(horizon_keyboard()),
                    })
                }
                None => {
                    self.profile_sessions.insert(user, session);
                    Ok(WizardReply::Ignored)
                }
            },
            ProfileStep::WaitingForInvestmentHorizon => match InvestmentHorizon::parse(data) {
                Some(horizon) => {
                    session.investment_horizon = Some(horizon);
                    session.step = ProfileStep::WaitingForInvestmentGoals;
                    self.profile_sessions.insert(user, session);
                    Ok(WizardReply::Edit {
                        text: GOALS_PROMPT.into(),
                        keyboard: Some(goals_keyboard(&BTreeSet::new())),
                    })
                }
                None => {
                    self.profile_sessions.insert(user, session);
                    Ok(WizardReply::Ignored)
                }
            },
            ProfileStep::WaitingForInvestmentGoals => {
                if data == DONE_SIGNAL {
                    self.complete_profile(user, session).await
                } else if let Some(goal) = InvestmentGoal::parse(data) {
                    // Toggling never fails; the keyboard is refreshed in
                    // place with check marks on the selected goals.
                    if !session.goals.remove(&goal) {
                        session.goals.insert(goal);
                    }
                    let keyboard = goals_keyboard(&session.goals);
                    self.profile_sessions.insert(user, session);
                    Ok(WizardReply::Edit {
                        text: GOALS_PROMPT.into(),
                        keyboard: Some(keyboard),
                    })
                } else {
                    self.profile_sessions.insert(user, session);
                    Ok(WizardReply::Ignored)
                }
            }
        }
    }

    /// Terminal profile transition: the session stays deleted regardless of
    /// the persistence outcome.
    async fn complete_profile(&self, user: UserId, session: ProfileSetup) -> Result<WizardReply> {
        let (Some(risk), Some(horizon)) = (session.risk_tolerance, session.investment_horizon)
        else {
            // Unreachable through normal transitions; drop the corrupt session.
            tracing::error!(user_id = user, "profile session missing collected fields");
            return Ok(WizardReply::Edit {
                text: PROFILE_FAILED.into(),
                keyboard: None,
            });
        };

        let record = ProfileRecord {
            user_id: user,
            risk_tolerance: risk,
            investment_horizon: horizon,
            investment_goals: session.goals.into_iter().collect(),
        };

        match self.profiles.upsert(&record).await {
            Ok(()) => {
                tracing::info!(user_id = user, "profile saved");
                Ok(WizardReply::Edit {
                    text: PROFILE_SAVED.into(),
                    keyboard: None,
                })
            }
            Err(e) => {
                tracing::error!(user_id = user, error = %e, "profile upsert failed");
                Ok(WizardReply::Edit {
                    text: PROFILE_FAILED.into(),
                    keyboard: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_store::{MemoryPortfolioStore, MemoryProfileStore};
    use async_trait::async_trait;

    struct Fixture {
        wizard: SetupWizard,
        portfolios: Arc<MemoryPortfolioStore>,
        profiles: Arc<MemoryProfileStore>,
        portfolio_sessions: Arc<MemorySessions<PortfolioSetup>>,
    }

    fn fixture() -> Fixture {
        let portfolios = Arc::new(MemoryPortfolioStore::new());
        let profiles = Arc::new(MemoryProfileStore::new());
        let portfolio_sessions = Arc::new(MemorySessions::new());
        let wizard = SetupWizard::new(
            portfolio_sessions.clone(),
            Arc::new(MemorySessions::new()),
            portfolios.clone(),
            profiles.clone(),
        );
        Fixture {
            wizard,
            portfolios,
            profiles,
            portfolio_sessions,
        }
    }

    fn reply_text(reply: &WizardReply) -> &str {
        match reply {
            WizardReply::Send { text, .. } | WizardReply::Edit { text, .. } => text,
            WizardReply::Ignored => "",
        }
    }

    #[tokio::test]
    async fn test_symbols_are_trimmed_uppercased_in_order() {
        let f = fixture();
        f.wizard.begin_portfolio(1);

        let reply = f.wizard.portfolio_step(1, " vnm , fpt,VIC ").await.unwrap();
        assert!(reply_text(&reply).contains("weights for VNM, FPT, VIC"));

        let session = f.portfolio_sessions.take(1).unwrap();
        assert_eq!(session.step(), PortfolioStep::WaitingForWeights);
        assert_eq!(session.symbols(), ["VNM", "FPT", "VIC"]);
    }

    #[tokio::test]
    async fn test_blank_symbols_reprompt_without_advancing() {
        let f = fixture();
        f.wizard.begin_portfolio(1);

        let reply = f.wizard.portfolio_step(1, " , ,").await.unwrap();
        assert_eq!(reply_text(&reply), SYMBOLS_INVALID);

        let session = f.portfolio_sessions.take(1).unwrap();
        assert_eq!(session.step(), PortfolioStep::WaitingForSymbols);
    }

    #[tokio::test]
    async fn test_happy_path_persists_and_clears_session() {
        let f = fixture();
        f.wizard.begin_portfolio(123);
        f.wizard.portfolio_step(123, "VNM, FPT, VIC").await.unwrap();

        let reply = f.wizard.portfolio_step(123, "0.4, 0.3, 0.3").await.unwrap();
        assert_eq!(reply_text(&reply), PORTFOLIO_SAVED);
        assert!(!f.wizard.has_portfolio_session(123));

        let record = f.portfolios.find(123).await.unwrap().unwrap();
        assert_eq!(record.symbols, ["VNM", "FPT", "VIC"]);
        assert_eq!(record.weights["VNM"], 0.4);
        assert_eq!(record.weights["FPT"], 0.3);
        assert_eq!(record.weights["VIC"], 0.3);
        assert!(record.is_consistent());
        assert!(record.weights_are_normalized());
    }

    #[tokio::test]
    async fn test_weight_count_mismatch_keeps_session_and_skips_persistence() {
        let f = fixture();
        f.wizard.begin_portfolio(1);
        f.wizard.portfolio_step(1, "VNM, FPT").await.unwrap();

        let reply = f.wizard.portfolio_step(1, "0.5, 0.3, 0.2").await.unwrap();
        assert_eq!(reply_text(&reply), "Please enter exactly 2 weights.");
        assert!(f.wizard.has_portfolio_session(1));
        assert!(f.portfolios.is_empty());
    }

    #[tokio::test]
    async fn test_weight_sum_mismatch_retains_symbols() {
        let f = fixture();
        f.wizard.begin_portfolio(1);
        f.wizard.portfolio_step(1, "VNM, FPT").await.unwrap();

        let reply = f.wizard.portfolio_step(1, "0.5, 0.6").await.unwrap();
        assert_eq!(reply_text(&reply), WEIGHTS_BAD_SUM);

        let session = f.portfolio_sessions.take(1).unwrap();
        assert_eq!(session.step(), PortfolioStep::WaitingForWeights);
        assert_eq!(session.symbols(), ["VNM", "FPT"]);
        assert!(f.portfolios.is_empty());
    }

    #[tokio::test]
    async fn test_non_numeric_weights_reprompt() {
        let f = fixture();
        f.wizard.begin_portfolio(1);
        f.wizard.portfolio_step(1, "VNM").await.unwrap();

        let reply = f.wizard.portfolio_step(1, "lots").await.unwrap();
        assert_eq!(reply_text(&reply), WEIGHTS_NOT_NUMBERS);
        assert!(f.wizard.has_portfolio_session(1));
    }

    #[tokio::test]
    async fn test_weight_sum_within_tolerance_passes() {
        let f = fixture();
        f.wizard.begin_portfolio(1);
        f.wizard.portfolio_step(1, "VNM, FPT").await.unwrap();

        let reply = f.wizard.portfolio_step(1, "0.5005, 0.5").await.unwrap();
        assert_eq!(reply_text(&reply), PORTFOLIO_SAVED);
        assert_eq!(f.portfolios.len(), 1);
    }

    #[tokio::test]
    async fn test_completing_twice_overwrites() {
        let f = fixture();
        f.wizard.begin_portfolio(5);
        f.wizard.portfolio_step(5, "VNM").await.unwrap();
        f.wizard.portfolio_step(5, "1.0").await.unwrap();

        f.wizard.begin_portfolio(5);
        f.wizard.portfolio_step(5, "FPT, VIC").await.unwrap();
        f.wizard.portfolio_step(5, "0.6, 0.4").await.unwrap();

        assert_eq!(f.portfolios.len(), 1);
        let record = f.portfolios.find(5).await.unwrap().unwrap();
        assert_eq!(record.symbols, ["FPT", "VIC"]);
    }

    #[tokio::test]
    async fn test_begin_overwrites_active_session() {
        let f = fixture();
        f.wizard.begin_portfolio(1);
        f.wizard.portfolio_step(1, "VNM, FPT").await.unwrap();

        // Restarting mid-flow resets to the first step
        f.wizard.begin_portfolio(1);
        let session = f.portfolio_sessions.take(1).unwrap();
        assert_eq!(session.step(), PortfolioStep::WaitingForSymbols);
        assert!(session.symbols().is_empty());
    }

    #[tokio::test]
    async fn test_step_without_session_is_defensive_error() {
        let f = fixture();
        assert!(matches!(
            f.wizard.portfolio_step(9, "VNM").await,
            Err(GatewayError::NoActiveSession(9))
        ));
    }

    #[tokio::test]
    async fn test_profile_full_scenario() {
        let f = fixture();

        let reply = f.wizard.begin_profile(7);
        assert_eq!(reply_text(&reply), RISK_PROMPT);

        let reply = f.wizard.profile_choose(7, "moderate").await.unwrap();
        assert_eq!(reply_text(&reply), HORIZON_PROMPT);

        let reply = f.wizard.profile_choose(7, "medium_term").await.unwrap();
        assert_eq!(reply_text(&reply), GOALS_PROMPT);

        f.wizard.profile_choose(7, "growth").await.unwrap();
        f.wizard.profile_choose(7, "value").await.unwrap();

        let reply = f.wizard.profile_choose(7, "DONE").await.unwrap();
        assert_eq!(reply_text(&reply), PROFILE_SAVED);
        assert!(!f.wizard.has_profile_session(7));

        let record = f.profiles.find(7).await.unwrap().unwrap();
        assert_eq!(record.risk_tolerance, RiskTolerance::Moderate);
        assert_eq!(record.investment_horizon, InvestmentHorizon::MediumTerm);
        assert_eq!(
            record.investment_goals,
            vec![InvestmentGoal::Growth, InvestmentGoal::Value]
        );
    }

    #[tokio::test]
    async fn test_unknown_choice_is_ignored_without_advancing() {
        let f = fixture();
        f.wizard.begin_profile(7);

        let reply = f.wizard.profile_choose(7, "reckless").await.unwrap();
        assert_eq!(reply, WizardReply::Ignored);
        assert!(f.wizard.has_profile_session(7));

        // The flow still accepts a valid choice afterwards
        let reply = f.wizard.profile_choose(7, "aggressive").await.unwrap();
        assert_eq!(reply_text(&reply), HORIZON_PROMPT);
    }

    #[tokio::test]
    async fn test_goal_toggle_on_off() {
        let f = fixture();
        f.wizard.begin_profile(7);
        f.wizard.profile_choose(7, "conservative").await.unwrap();
        f.wizard.profile_choose(7, "long_term").await.unwrap();

        let reply = f.wizard.profile_choose(7, "dividend").await.unwrap();
        let WizardReply::Edit {
            keyboard: Some(kb), ..
        } = reply
        else {
            panic!("expected keyboard edit");
        };
        assert!(kb.inline_keyboard.iter().flatten().any(|b| b.text.starts_with("✅ Dividend")));

        // Toggling again deselects
        f.wizard.profile_choose(7, "dividend").await.unwrap();
        let reply = f.wizard.profile_choose(7, "DONE").await.unwrap();
        assert_eq!(reply_text(&reply), PROFILE_SAVED);

        let record = f.profiles.find(7).await.unwrap().unwrap();
        assert!(record.investment_goals.is_empty());
    }

    // Store that always fails, for the persistence-failure path
    struct FailingPortfolioStore;

    #[async_trait]
    impl PortfolioStore for FailingPortfolioStore {
        async fn upsert(&self, _record: &PortfolioRecord) -> advisor_store::Result<()> {
            Err(advisor_store::StoreError::Database("write refused".into()))
        }

        async fn find(
            &self,
            _user_id: UserId,
        ) -> advisor_store::Result<Option<PortfolioRecord>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_drops_session() {
        let wizard = SetupWizard::with_memory_sessions(
            Arc::new(FailingPortfolioStore),
            Arc::new(MemoryProfileStore::new()),
        );

        wizard.begin_portfolio(1);
        wizard.portfolio_step(1, "VNM").await.unwrap();
        let reply = wizard.portfolio_step(1, "1.0").await.unwrap();

        assert_eq!(reply_text(&reply), PORTFOLIO_FAILED);
        // Session is gone: the flow is not resumable after a store failure
        assert!(!wizard.has_portfolio_session(1));
    }
}
