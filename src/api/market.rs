//! Market data API.
//!
//! Read-only views over the synthetic feed: headline ticks, order books and
//! candle history. Pair symbols contain a slash, so clients URL-encode them
//! (`/api/market/BTC%2FUSDT`).

use crate::error::{AppError, Result};
use crate::types::{Candle, OrderBook, PriceTick, Timeframe};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

/// Query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Timeframe label; defaults to "1D".
    pub timeframe: Option<String>,
}

/// GET /api/market
///
/// All registered symbols' current ticks.
async fn list_market(State(state): State<AppState>) -> Json<Vec<PriceTick>> {
    let snapshot = state.feed.snapshot();
    Json(snapshot.ticks.values().cloned().collect())
}

/// GET /api/market/:symbol
async fn get_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceTick>> {
    state
        .feed
        .price(&symbol)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Symbol not found: {}", symbol)))
}

/// GET /api/market/:symbol/orderbook
///
/// The current depth ladder; empty for symbols outside the universe.
async fn get_order_book(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Json<OrderBook> {
    Json(state.feed.order_book(&symbol))
}

/// GET /api/market/:symbol/history?timeframe=1D
async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Candle>>> {
    let timeframe = match query.timeframe {
        Some(label) => label
            .parse::<Timeframe>()
            .map_err(AppError::BadRequest)?,
        None => Timeframe::default(),
    };

    if !state.feed.is_registered(&symbol) {
        return Err(AppError::NotFound(format!("Symbol not found: {}", symbol)));
    }

    Ok(Json(state.feed.history(&symbol, timeframe)))
}

/// Create the market data router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_market))
        .route("/:symbol", get(get_symbol))
        .route("/:symbol/orderbook", get(get_order_book))
        .route("/:symbol/history", get(get_history))
}
