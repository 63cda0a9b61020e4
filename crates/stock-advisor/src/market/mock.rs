//! Mock Market Data Client
//!
//! For testing and demo purposes. Generates deterministic per-symbol candle
//! series so indicator output is reproducible across runs.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};

use super::MarketDataClient;
use crate::error::{AdvisorError, Result};
use crate::model::{Candle, CompanyOverview, NewsItem};

/// Mock market client with a fixed symbol universe
pub struct MockMarketClient {
    /// History start date, keeps generated candles stable in tests
    epoch: NaiveDate,
}

impl Default for MockMarketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketClient {
    pub fn new() -> Self {
        Self {
            epoch: NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid date"),
        }
    }

    /// Base listing data for a symbol: (price, sector, industry, market cap)
    fn listing(symbol: &str) -> Option<(f64, &'static str, &'static str, f64)> {
        match symbol.to_uppercase().as_str() {
            "VNM" => Some((65.3, "Consumer Staples", "Dairy Products", 6.1e9)),
            "FPT" => Some((121.8, "Technology", "IT Services", 7.4e9)),
            "VIC" => Some((44.6, "Real Estate", "Conglomerate", 6.8e9)),
            "HPG" => Some((27.9, "Materials", "Steel", 5.2e9)),
            "VCB" => Some((91.5, "Financials", "Banking", 20.3e9)),
            "MWG" => Some((54.2, "Consumer Discretionary", "Retail", 3.1e9)),
            "SSI" => Some((33.4, "Financials", "Brokerage", 2.0e9)),
            "AAPL" => Some((212.4, "Technology", "Consumer Electronics", 3.2e12)),
            "MSFT" => Some((415.2, "Technology", "Software", 3.1e12)),
            _ => None,
        }
    }

    /// Deterministic pseudo-random stream seeded by the symbol
    fn seed(symbol: &str) -> u64 {
        symbol
            .to_uppercase()
            .bytes()
            .fold(0x9E37_79B9_7F4A_7C15_u64, |acc, b| {
                acc.rotate_left(5) ^ u64::from(b).wrapping_mul(0x100_0000_01B3)
            })
    }

    fn next(state: &mut u64) -> f64 {
        // LCG constants from Numerical Recipes
        *state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // Map the top bits to [0, 1)
        ((*state >> 11) as f64) / ((1_u64 << 53) as f64)
    }
}

#[async_trait]
impl MarketDataClient for MockMarketClient {
    async fn daily_history(&self, symbol: &str, days: u32) -> Result<Vec<Candle>> {
        let (base_price, ..) = Self::listing(symbol)
            .ok_or_else(|| AdvisorError::UnsupportedSymbol(symbol.to_string()))?;

        let mut state = Self::seed(symbol);
        let mut close = base_price;
        let mut candles = Vec::with_capacity(days as usize);

        for day in 0..days {
            // Daily return in roughly [-2%, +2%] with a slight drift
            let change = (Self::next(&mut state) - 0.48) * 0.04;
            let open = close;
            close = (close * (1.0 + change)).max(0.01);
            let high = open.max(close) * (1.0 + Self::next(&mut state) * 0.01);
            let low = open.min(close) * (1.0 - Self::next(&mut state) * 0.01);
            let volume = (500_000.0 + Self::next(&mut state) * 1_500_000.0).round();

            candles.push(Candle {
                date: self.epoch + Duration::days(i64::from(day)),
                open,
                high,
                low,
                close,
                volume,
            });
        }

        Ok(candles)
    }

    async fn company_overview(&self, symbol: &str) -> Result<CompanyOverview> {
        let (_, sector, industry, market_cap) = Self::listing(symbol)
            .ok_or_else(|| AdvisorError::UnsupportedSymbol(symbol.to_string()))?;

        Ok(CompanyOverview {
            symbol: symbol.to_uppercase(),
            sector: Some(sector.to_string()),
            industry: Some(industry.to_string()),
            market_cap: Some(market_cap),
            earnings_date: None,
        })
    }

    async fn search_news(&self, query: &str, days: u32) -> Result<Vec<NewsItem>> {
        let symbol = query.to_uppercase();
        let published = Utc
            .with_ymd_and_hms(2025, 6, 2, 8, 0, 0)
            .single()
            .expect("valid timestamp");

        Ok(vec![
            NewsItem {
                title: format!("{symbol} posts quarterly earnings update"),
                url: format!("https://news.example.com/{}/earnings", symbol.to_lowercase()),
                content: format!(
                    "{symbol} reported quarterly results covering the last {days} days of trading."
                ),
                score: 0.92,
                published_at: Some(published),
                summary: Some(format!("Earnings recap for {symbol}.")),
                source: Some("MockWire".into()),
            },
            NewsItem {
                title: format!("Analysts revise outlook on {symbol}"),
                url: format!("https://news.example.com/{}/outlook", symbol.to_lowercase()),
                content: format!("Brokerages updated their price targets for {symbol}."),
                score: 0.81,
                published_at: Some(published - Duration::days(1)),
                summary: None,
                source: Some("MockWire".into()),
            },
        ])
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "MockMarket"
    }
}
