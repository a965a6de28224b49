//! Portfolio and transaction API.
//!
//! Hosts the accounting engine's contracts: submit a transaction, read the
//! computed portfolio, list the ledger.

use crate::error::{AppError, Result};
use crate::types::{Portfolio, Transaction, TransactionInput};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

/// GET /api/portfolio/:holder
///
/// 404 until the holder has at least one transaction on record.
async fn get_portfolio(
    State(state): State<AppState>,
    Path(holder): Path<String>,
) -> Result<Json<Portfolio>> {
    state.engine.ensure_holder(&holder).await;

    if state.engine.transactions(&holder).is_empty() {
        return Err(AppError::NotFound(format!(
            "No portfolio for holder: {}",
            holder
        )));
    }

    state
        .engine
        .portfolio(&holder)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No portfolio for holder: {}", holder)))
}

/// GET /api/portfolio/:holder/transactions
async fn list_transactions(
    State(state): State<AppState>,
    Path(holder): Path<String>,
) -> Json<Vec<Transaction>> {
    Json(state.engine.transactions(&holder))
}

/// POST /api/portfolio/:holder/transactions
///
/// Submit a deposit, withdrawal, buy or sell. Rejections come back as typed
/// errors; the ledger is untouched on any failure.
async fn submit_transaction(
    State(state): State<AppState>,
    Path(holder): Path<String>,
    Json(input): Json<TransactionInput>,
) -> Result<(StatusCode, Json<Transaction>)> {
    let tx = state.engine.submit_transaction(&holder, input).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

/// Create the portfolio router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:holder", get(get_portfolio))
        .route(
            "/:holder/transactions",
            get(list_transactions).post(submit_transaction),
        )
}
