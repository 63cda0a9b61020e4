//! News Controller
//!
//! Extracts articles from the `search_stock_news` tool output of an agent
//! run and stores the ones whose URL has not been seen. Bad article entries
//! are skipped individually; store failures are logged and do not fail the
//! user's reply.

use advisor_store::{NewsArticle, NewsStore};
use agent_core::AgentOutcome;
use chrono::Utc;
use stock_advisor::NewsItem;

const NEWS_TOOL: &str = "search_stock_news";

fn to_article(item: NewsItem) -> NewsArticle {
    NewsArticle {
        title: item.title,
        url: item.url,
        content: item.content,
        score: item.score,
        published_at: item.published_at,
        summary: item.summary,
        source: item.source,
        notified: false,
        created_at: Utc::now(),
    }
}

/// Store previously unseen articles from the run's news tool output.
/// Returns the number of newly inserted articles.
pub async fn store_fetched_news(outcome: &AgentOutcome, store: &dyn NewsStore) -> usize {
    let Some(result) = outcome.tool_output(NEWS_TOOL) else {
        return 0;
    };
    let Some(raw) = result.data.as_ref().and_then(|d| d.get("articles")) else {
        return 0;
    };

    let items: Vec<NewsItem> = match serde_json::from_value(raw.clone()) {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(error = %e, "malformed news tool payload");
            return 0;
        }
    };

    let mut inserted = 0;
    for item in items {
        let article = to_article(item);
        match store.insert_if_new(&article).await {
            Ok(true) => inserted += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(url = %article.url, error = %e, "failed to store news article");
            }
        }
    }

    inserted
}
