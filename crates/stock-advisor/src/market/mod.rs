//! Market Data Integration
//!
//! Abstraction over stock market data vendors.

mod mock;

pub use mock::MockMarketClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Candle, CompanyOverview, NewsItem};

/// Market data client trait (Strategy pattern)
///
/// Implement this for each data vendor: TCBS, SSI, Alpha Vantage, etc.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Daily candles for the trailing `days` calendar days, oldest first
    async fn daily_history(&self, symbol: &str, days: u32) -> Result<Vec<Candle>>;

    /// Company fundamentals snapshot
    async fn company_overview(&self, symbol: &str) -> Result<CompanyOverview>;

    /// Recent news for a symbol or free-text query, newest first
    async fn search_news(&self, query: &str, days: u32) -> Result<Vec<NewsItem>>;

    /// Check if the data source is reachable
    async fn health_check(&self) -> bool;

    /// Data source name
    fn name(&self) -> &str;
}
