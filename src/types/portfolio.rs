use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cost-basis-tracked holding, derived from the ledger. Never persisted;
/// recomputed from scratch on every valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    /// Cost basis divided by held quantity.
    pub average_price: f64,
    /// Cumulative amount paid (including fees) for the held quantity.
    pub total_cost: f64,
    /// `None` when no price was available at valuation time; such positions
    /// are excluded from portfolio totals but stay in the list so the stale
    /// condition is observable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl_percentage: Option<f64>,
    pub as_of: DateTime<Utc>,
}

impl Position {
    /// Whether a price was available when this position was valued.
    pub fn is_priced(&self) -> bool {
        self.current_value.is_some()
    }
}

/// Valuation of a holder's account at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    /// Quote-asset cash not held in positions.
    pub cash_balance: f64,
    /// Cash plus the current value of all priced positions.
    pub total_value: f64,
    /// Combined cost basis of all priced positions.
    pub total_cost: f64,
    pub total_pnl: f64,
    pub total_pnl_percentage: f64,
    pub positions: Vec<Position>,
    pub as_of: DateTime<Utc>,
}

impl Portfolio {
    /// An account that has seen no transactions yet.
    pub fn empty(as_of: DateTime<Utc>) -> Self {
        Self {
            cash_balance: 0.0,
            total_value: 0.0,
            total_cost: 0.0,
            total_pnl: 0.0,
            total_pnl_percentage: 0.0,
            positions: Vec::new(),
            as_of,
        }
    }

    /// Look up a position by symbol.
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }

    /// Held quantity for a symbol, zero if no open position.
    pub fn held_quantity(&self, symbol: &str) -> f64 {
        self.position(symbol).map(|p| p.quantity).unwrap_or(0.0)
    }
}
