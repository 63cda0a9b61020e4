//! # advisor-store
//!
//! Persistence collaborator for the Bull Vision bot. Three document kinds,
//! all keyed by the Telegram user id (news by URL): a user's portfolio, a
//! user's investor profile, and fetched news articles.
//!
//! Stores are traits so the wizard and dispatcher can be exercised against
//! in-memory tables; the MongoDB implementations (collections `portfolios`,
//! `profiles`, `news`) live behind the default-on `mongo` feature.

pub mod error;
pub mod memory;
#[cfg(feature = "mongo")]
pub mod mongo;
pub mod records;

pub use error::{Result, StoreError};
pub use memory::{MemoryNewsStore, MemoryPortfolioStore, MemoryProfileStore};
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;
pub use records::{
    InvestmentGoal, InvestmentHorizon, NewsArticle, PortfolioRecord, ProfileRecord,
    RiskTolerance, UserId,
};

use async_trait::async_trait;

/// Portfolio documents, one per user, full overwrite on upsert
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn upsert(&self, record: &PortfolioRecord) -> Result<()>;
    async fn find(&self, user_id: UserId) -> Result<Option<PortfolioRecord>>;
}

/// Investor profile documents, one per user, full overwrite on upsert
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn upsert(&self, record: &ProfileRecord) -> Result<()>;
    async fn find(&self, user_id: UserId) -> Result<Option<ProfileRecord>>;
}

/// News articles, deduplicated by URL
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Insert the article if its URL has not been seen. Returns true if
    /// inserted.
    async fn insert_if_new(&self, article: &NewsArticle) -> Result<bool>;
}
