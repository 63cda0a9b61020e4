//! News Search Tool
//!
//! Fetches recent articles for a symbol. The structured `data` payload is
//! consumed downstream to persist previously unseen articles.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    error::AgentError,
    tool::ParameterSchema,
};

use crate::market::MarketDataClient;

const DEFAULT_DAYS: i64 = 7;

/// Tool for searching recent stock news
pub struct NewsSearchTool {
    market: Arc<dyn MarketDataClient>,
}

impl NewsSearchTool {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for NewsSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_stock_news".into(),
            description: "Search recent news and developments for a stock. Returns titles, sources, and relevance scores.".into(),
            parameters: vec![
                ParameterSchema {
                    name: "query".into(),
                    param_type: "string".into(),
                    description: "Ticker symbol or search phrase (e.g., 'FPT')".into(),
                    required: true,
                },
                ParameterSchema {
                    name: "days".into(),
                    param_type: "number".into(),
                    description: "Look-back window in days (default 7)".into(),
                    required: false,
                },
            ],
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let query = call
            .str_arg("query")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AgentError::ToolValidation("Missing query".into()))?
            .to_string();

        let days = call.int_arg("days").unwrap_or(DEFAULT_DAYS).clamp(1, 90) as u32;

        tracing::info!(%query, days, "searching stock news");

        let articles = match self.market.search_news(&query, days).await {
            Ok(articles) => articles,
            Err(e) => return Ok(ToolResult::failure("search_stock_news", e.to_string())),
        };

        if articles.is_empty() {
            return Ok(ToolResult::success(
                "search_stock_news",
                format!("No recent news found for '{query}'."),
            ));
        }

        let mut output = format!("Recent news for '{query}':\n");
        for article in &articles {
            let source = article.source.as_deref().unwrap_or("unknown");
            output.push_str(&format!(
                "  • {} [{}] (score {:.2})\n",
                article.title, source, article.score
            ));
        }

        let data = serde_json::json!({ "articles": articles });
        Ok(ToolResult::success("search_stock_news", output.trim_end()).with_data(data))
    }
}
