//! Agent Tools
//!
//! Market-data tools registered with the agent's tool registry.

mod news_search;
mod stock_context;

pub use news_search::NewsSearchTool;
pub use stock_context::StockContextTool;
