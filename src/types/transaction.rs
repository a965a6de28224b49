use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a ledger entry does to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Buy,
    Sell,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "deposit"),
            TransactionKind::Withdrawal => write!(f, "withdrawal"),
            TransactionKind::Buy => write!(f, "buy"),
            TransactionKind::Sell => write!(f, "sell"),
        }
    }
}

/// Settlement status. Accepted submissions are filled synchronously, so the
/// ledger only ever writes `Completed`; the other states exist for replaying
/// histories produced elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// An immutable ledger entry. Never edited or deleted once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Monotonically increasing id, assigned at append time.
    pub id: u64,
    pub kind: TransactionKind,
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    /// Notional value of the fill, excluding fee.
    pub total: f64,
    pub fee: f64,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
}

/// Caller-supplied transaction data; id, timestamp and status are assigned
/// by the ledger at append time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub kind: TransactionKind,
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    pub total: f64,
    #[serde(default)]
    pub fee: f64,
}

impl TransactionInput {
    /// Convenience constructor for a quote-asset deposit.
    pub fn deposit(symbol: &str, quantity: f64) -> Self {
        Self {
            kind: TransactionKind::Deposit,
            symbol: symbol.to_string(),
            quantity,
            price: 1.0,
            total: quantity,
            fee: 0.0,
        }
    }

    /// Convenience constructor for a quote-asset withdrawal.
    pub fn withdrawal(symbol: &str, quantity: f64) -> Self {
        Self {
            kind: TransactionKind::Withdrawal,
            symbol: symbol.to_string(),
            quantity,
            price: 1.0,
            total: quantity,
            fee: 0.0,
        }
    }

    /// Convenience constructor for a buy fill.
    pub fn buy(symbol: &str, quantity: f64, price: f64, fee: f64) -> Self {
        Self {
            kind: TransactionKind::Buy,
            symbol: symbol.to_string(),
            quantity,
            price,
            total: quantity * price,
            fee,
        }
    }

    /// Convenience constructor for a sell fill.
    pub fn sell(symbol: &str, quantity: f64, price: f64, fee: f64) -> Self {
        Self {
            kind: TransactionKind::Sell,
            symbol: symbol.to_string(),
            quantity,
            price,
            total: quantity * price,
            fee,
        }
    }
}
