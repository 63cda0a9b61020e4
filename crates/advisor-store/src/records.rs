//! Persisted Documents
//!
//! Document shapes for the portfolio, investor profile, and news
//! collections. Profile fields are closed enums so an invalid choice can
//! never reach the database.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telegram user identifier
pub type UserId = i64;

/// Tolerance allowed when checking that weights sum to 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// A user's portfolio: ordered symbols and their target weights
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRecord {
    pub user_id: UserId,
    pub symbols: Vec<String>,
    pub weights: BTreeMap<String, f64>,
}

impl PortfolioRecord {
    /// Pair up symbols and weights in order. Callers validate lengths first;
    /// extra entries on either side are dropped defensively.
    pub fn new(user_id: UserId, symbols: Vec<String>, weights: &[f64]) -> Self {
        let paired = symbols
            .iter()
            .zip(weights)
            .map(|(s, &w)| (s.clone(), w))
            .collect();
        Self {
            user_id,
            symbols,
            weights: paired,
        }
    }

    /// Every symbol has a weight and vice versa
    pub fn is_consistent(&self) -> bool {
        self.symbols.len() == self.weights.len()
            && self.symbols.iter().all(|s| self.weights.contains_key(s))
    }

    /// Weights sum to 1.0 within tolerance
    pub fn weights_are_normalized(&self) -> bool {
        let sum: f64 = self.weights.values().sum();
        (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }

    /// One-line rendering for the agent's system prompt context
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .symbols
            .iter()
            .map(|s| {
                let weight = self.weights.get(s).copied().unwrap_or(0.0);
                format!("{} {:.0}%", s, weight * 100.0)
            })
            .collect();
        parts.join(", ")
    }
}

/// Risk tolerance choices offered by the profile wizard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "conservative" => Some(Self::Conservative),
            "moderate" => Some(Self::Moderate),
            "aggressive" => Some(Self::Aggressive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

/// Investment horizon choices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentHorizon {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl InvestmentHorizon {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short_term" => Some(Self::ShortTerm),
            "medium_term" => Some(Self::MediumTerm),
            "long_term" => Some(Self::LongTerm),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::MediumTerm => "medium_term",
            Self::LongTerm => "long_term",
        }
    }
}

/// Investment goal catalog (multi-select)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentGoal {
    Growth,
    Value,
    Dividend,
}

impl InvestmentGoal {
    pub const ALL: [Self; 3] = [Self::Growth, Self::Value, Self::Dividend];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "growth" => Some(Self::Growth),
            "value" => Some(Self::Value),
            "dividend" => Some(Self::Dividend),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Growth => "growth",
            Self::Value => "value",
            Self::Dividend => "dividend",
        }
    }

    /// Button label shown in the wizard keyboard
    pub fn label(self) -> &'static str {
        match self {
            Self::Growth => "Growth 📈",
            Self::Value => "Value 💎",
            Self::Dividend => "Dividend 💰",
        }
    }
}

/// A user's investor profile
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: UserId,
    pub risk_tolerance: RiskTolerance,
    pub investment_horizon: InvestmentHorizon,
    pub investment_goals: Vec<InvestmentGoal>,
}

impl ProfileRecord {
    /// One-line rendering for the agent's system prompt context
    pub fn summary(&self) -> String {
        let goals: Vec<&str> = self.investment_goals.iter().map(|g| g.as_str()).collect();
        format!(
            "risk tolerance {}, horizon {}, goals [{}]",
            self.risk_tolerance.as_str(),
            self.investment_horizon.as_str(),
            goals.join(", ")
        )
    }
}

/// A fetched news article, deduplicated by URL
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notified: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}
