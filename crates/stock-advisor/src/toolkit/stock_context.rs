//! Stock Context Tool
//!
//! Fetches price history, computes technical indicators, and attaches the
//! company fundamentals snapshot for a single symbol.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    error::AgentError,
    tool::ParameterSchema,
};

use crate::market::MarketDataClient;
use crate::model::{CompanyOverview, StockContext};

const DEFAULT_DAYS: i64 = 90;

/// Tool producing technical and fundamental context for a ticker
pub struct StockContextTool {
    market: Arc<dyn MarketDataClient>,
}

impl StockContextTool {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for StockContextTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "stock_context".into(),
            description: "Get technical and fundamental context for a stock ticker: price, 52-week range, volume, RSI, MACD, sector and market cap.".into(),
            parameters: vec![
                ParameterSchema {
                    name: "symbol".into(),
                    param_type: "string".into(),
                    description: "The stock ticker symbol to analyze (e.g., 'VNM')".into(),
                    required: true,
                },
                ParameterSchema {
                    name: "days".into(),
                    param_type: "number".into(),
                    description: "History window in days (default 90)".into(),
                    required: false,
                },
            ],
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let symbol = call
            .str_arg("symbol")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AgentError::ToolValidation("Missing symbol".into()))?
            .to_uppercase();

        let days = call
            .int_arg("days")
            .unwrap_or(DEFAULT_DAYS)
            .clamp(30, 365) as u32;

        tracing::info!(%symbol, days, "fetching stock context");

        let candles = match self.market.daily_history(&symbol, days).await {
            Ok(candles) => candles,
            Err(e) => return Ok(ToolResult::failure("stock_context", e.to_string())),
        };

        // Fundamentals are best-effort; indicators still stand without them
        let overview = self
            .market
            .company_overview(&symbol)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(%symbol, error = %e, "company overview unavailable");
                CompanyOverview::default()
            });

        let Some(context) = StockContext::from_history(&symbol, &candles, &overview) else {
            return Ok(ToolResult::failure(
                "stock_context",
                format!("No price history available for {symbol}"),
            ));
        };

        let data = serde_json::to_value(&context)?;
        Ok(ToolResult::success("stock_context", context.render()).with_data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketClient;
    use std::collections::HashMap;

    fn call(args: &[(&str, serde_json::Value)]) -> ToolCall {
        ToolCall {
            name: "stock_context".into(),
            arguments: args
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
            id: None,
        }
    }

    #[tokio::test]
    async fn test_context_for_known_symbol() {
        let tool = StockContextTool::new(Arc::new(MockMarketClient::new()));
        let result = tool
            .execute(&call(&[("symbol", serde_json::json!("vnm"))]))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.contains("VNM"));
        assert!(result.output.contains("RSI(14)"));

        let data = result.data.unwrap();
        assert_eq!(data["symbol"], "VNM");
        assert!(data["price"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_soft_failure() {
        let tool = StockContextTool::new(Arc::new(MockMarketClient::new()));
        let result = tool
            .execute(&call(&[("symbol", serde_json::json!("NOPE"))]))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.output.contains("NOPE"));
    }

    #[tokio::test]
    async fn test_missing_symbol_is_validation_error() {
        let tool = StockContextTool::new(Arc::new(MockMarketClient::new()));
        assert!(tool.execute(&call(&[])).await.is_err());
    }
}
