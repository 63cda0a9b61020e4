//! Domain Models
//!
//! Core data types for stock analysis. Prices are plain `f64` series feeding
//! the indicator pipeline; nothing monetary is persisted from here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::indicators;

/// One daily OHLCV candle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Company fundamentals snapshot
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompanyOverview {
    pub symbol: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub earnings_date: Option<NaiveDate>,
}

/// A news article as returned by the market-data source
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewsItem {
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
}

/// Latest MACD values
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MacdSnapshot {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Technical and fundamental context for one symbol, the payload of the
/// `stock_context` tool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StockContext {
    pub symbol: String,

    /// Last close
    pub price: f64,

    /// 52-week (252-session) high/low over the available history
    pub week52_high: f64,
    pub week52_low: f64,

    /// Last session volume and trailing 20-session average
    pub volume: f64,
    pub avg_volume: f64,

    /// RSI-14, absent when history is too short
    pub rsi: Option<f64>,

    /// MACD(12, 26, 9) latest values
    pub macd: MacdSnapshot,

    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
}

impl StockContext {
    /// Assemble the context from a candle history (oldest first) and a
    /// company overview. Returns `None` when the history is empty.
    pub fn from_history(
        symbol: &str,
        candles: &[Candle],
        overview: &CompanyOverview,
    ) -> Option<Self> {
        let last = candles.last()?;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let macd_series = indicators::macd(&closes, 12, 26, 9);
        let macd = MacdSnapshot {
            macd: macd_series.macd.last().copied().unwrap_or(0.0),
            signal: macd_series.signal.last().copied().unwrap_or(0.0),
            histogram: macd_series.histogram.last().copied().unwrap_or(0.0),
        };

        Some(Self {
            symbol: symbol.to_uppercase(),
            price: last.close,
            week52_high: indicators::rolling_max(&highs, 252).unwrap_or(last.high),
            week52_low: indicators::rolling_min(&lows, 252).unwrap_or(last.low),
            volume: last.volume,
            avg_volume: indicators::trailing_mean(&volumes, 20).unwrap_or(last.volume),
            rsi: indicators::rsi(&closes, 14).last().copied().flatten(),
            macd,
            sector: overview.sector.clone(),
            industry: overview.industry.clone(),
            market_cap: overview.market_cap,
        })
    }

    /// Render the context as the human-readable block shown to the model
    pub fn render(&self) -> String {
        let mut out = format!(
            "{}: price {:.2}, 52w range {:.2}-{:.2}, volume {:.0} (20d avg {:.0})\n",
            self.symbol, self.price, self.week52_low, self.week52_high, self.volume, self.avg_volume
        );

        match self.rsi {
            Some(rsi) => out.push_str(&format!("RSI(14): {rsi:.1}\n")),
            None => out.push_str("RSI(14): insufficient history\n"),
        }
        out.push_str(&format!(
            "MACD(12,26,9): macd {:.3}, signal {:.3}, histogram {:.3}\n",
            self.macd.macd, self.macd.signal, self.macd.histogram
        ));

        if let Some(sector) = &self.sector {
            out.push_str(&format!("Sector: {sector}"));
            if let Some(industry) = &self.industry {
                out.push_str(&format!(" / {industry}"));
            }
            out.push('\n');
        }
        if let Some(cap) = self.market_cap {
            out.push_str(&format!("Market cap: {cap:.0}\n"));
        }

        out.trim_end().to_string()
    }
}
