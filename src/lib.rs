//! Mirage - simulated cryptocurrency trading engine with a synthetic market
//! data feed.
//!
//! The core is a portfolio accounting engine: an append-only transaction
//! ledger is replayed into cost-basis-tracked positions and valued against a
//! continuously ticking, self-consistent fake market. An axum layer hosts
//! the library contracts over HTTP for the excluded presentation layer.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

use config::Config;
use services::{MarketDataFeed, PortfolioEngine};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub feed: Arc<MarketDataFeed>,
    pub engine: Arc<PortfolioEngine>,
}

// Re-export commonly used types
pub use error::AppError;
pub use services::{FeedConfig, TradeError};
pub use types::*;
