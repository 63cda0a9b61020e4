//! Bull Vision Telegram Gateway
//!
//! Axum-based webhook server wiring the Telegram transport, the setup
//! wizard, the LLM agent with market-data tools, and the document store.

mod commands;
mod config;
mod context;
mod dispatcher;
mod error;
mod handlers;
mod news;
mod state;
mod telegram;
mod wizard;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{LlmProvider, ToolRegistry};
use agent_runtime::OpenAiProvider;
use stock_advisor::{
    MarketDataClient, MockMarketClient,
    tools::{NewsSearchTool, StockContextTool},
};

#[cfg(feature = "mongo")]
use advisor_store::MongoStore;
#[cfg(not(feature = "mongo"))]
use advisor_store::{MemoryNewsStore, MemoryPortfolioStore, MemoryProfileStore};
use advisor_store::{NewsStore, PortfolioStore, ProfileStore};

use crate::config::Settings;
use crate::dispatcher::Dispatcher;
use crate::handlers::{health_check, telegram_webhook};
use crate::state::AppState;
use crate::telegram::{ChatTransport, TelegramClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    // Initialize LLM provider
    let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::from_env()?);
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ LLM provider reachable ({})", provider.name()),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ LLM provider not reachable - agent replies will fail");
        }
    }

    // Market data source feeding the agent tools
    let market: Arc<dyn MarketDataClient> = Arc::new(MockMarketClient::new());

    let mut tools = ToolRegistry::new();
    tools.register(StockContextTool::new(market.clone()));
    tools.register(NewsSearchTool::new(market.clone()));

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    // Document store
    #[cfg(feature = "mongo")]
    let (portfolios, profiles, news_store) = {
        let store = MongoStore::connect(&settings.mongo_uri, &settings.mongo_db).await?;
        match store.ping().await {
            Ok(()) => tracing::info!("✓ MongoDB reachable"),
            Err(e) => tracing::warn!(error = %e, "⚠ MongoDB ping failed"),
        }
        (
            Arc::new(store.clone()) as Arc<dyn PortfolioStore>,
            Arc::new(store.clone()) as Arc<dyn ProfileStore>,
            Arc::new(store) as Arc<dyn NewsStore>,
        )
    };
    #[cfg(not(feature = "mongo"))]
    let (portfolios, profiles, news_store) = {
        tracing::warn!("⚠ Built without the mongo feature - using in-memory stores");
        (
            Arc::new(MemoryPortfolioStore::new()) as Arc<dyn PortfolioStore>,
            Arc::new(MemoryProfileStore::new()) as Arc<dyn ProfileStore>,
            Arc::new(MemoryNewsStore::new()) as Arc<dyn NewsStore>,
        )
    };

    // Chat transport + webhook registration
    let transport: Arc<dyn ChatTransport> =
        Arc::new(TelegramClient::new(&settings.telegram_bot_token)?);
    if let Some(url) = &settings.telegram_webhook_url {
        match transport.set_webhook(url).await {
            Ok(()) => tracing::info!(url = %url, "Successfully registered webhook URL"),
            Err(e) => tracing::error!(url = %url, error = %e, "Failed to register webhook URL"),
        }
    } else {
        tracing::warn!("TELEGRAM_WEBHOOK_URL not set - skipping webhook registration");
    }

    // Build application state
    let dispatcher = Arc::new(Dispatcher::new(
        provider.clone(),
        Arc::new(tools),
        portfolios,
        profiles,
        news_store,
        transport,
        settings.model.clone(),
        Duration::from_secs(settings.agent_timeout_secs),
    ));

    let state = AppState {
        dispatcher,
        provider,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/telegram/webhook", post(telegram_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("🚀 Bull Vision gateway running on http://{}", settings.bind_addr);
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                - Health check");
    tracing::info!("  POST /api/telegram/webhook  - Telegram update intake");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
