//! Append-only transaction ledger.
//!
//! One ordered list of transactions per holder, backed by a swappable
//! persistence store. Appends validate first and hit the store before the
//! entry becomes visible in memory, so a failed append leaves no trace.

use crate::types::{Transaction, TransactionInput, TransactionStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// Business and infrastructure errors surfaced to transaction submitters.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("Invalid transaction: {0}")]
    Validation(String),

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Insufficient position in {symbol}: sell {requested}, hold {held}")]
    InsufficientPosition {
        symbol: String,
        requested: f64,
        held: f64,
    },

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Ledger store error: {0}")]
    Persistence(String),
}

/// Errors from a ledger persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for TradeError {
    fn from(e: StoreError) -> Self {
        TradeError::Persistence(e.to_string())
    }
}

/// Durable backend for per-holder transaction lists.
///
/// Implementations only need to keep an ordered list per holder key and give
/// it back on load; the ledger owns validation, id assignment and ordering.
pub trait LedgerStore: Send + Sync {
    /// Load a holder's transactions in append order.
    fn load(&self, holder: &str) -> Result<Vec<Transaction>, StoreError>;

    /// Persist one appended transaction.
    fn append(&self, holder: &str, tx: &Transaction) -> Result<(), StoreError>;
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<String, Vec<Transaction>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self, holder: &str) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .get(holder)
            .cloned()
            .unwrap_or_default())
    }

    fn append(&self, holder: &str, tx: &Transaction) -> Result<(), StoreError> {
        self.rows
            .write()
            .unwrap()
            .entry(holder.to_string())
            .or_default()
            .push(tx.clone());
        Ok(())
    }
}

/// Append-only, per-holder transaction log.
pub struct TransactionLedger {
    store: Arc<dyn LedgerStore>,
    entries: RwLock<HashMap<String, Vec<Transaction>>>,
    next_id: AtomicU64,
}

impl TransactionLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Check the shape of a submission before anything is mutated.
    pub fn validate(input: &TransactionInput) -> Result<(), TradeError> {
        if input.symbol.trim().is_empty() {
            return Err(TradeError::Validation("symbol must not be empty".into()));
        }
        if !input.quantity.is_finite() || input.quantity <= 0.0 {
            return Err(TradeError::Validation(
                "quantity must be positive".into(),
            ));
        }
        if !input.price.is_finite() || input.price < 0.0 {
            return Err(TradeError::Validation(
                "price must not be negative".into(),
            ));
        }
        if !input.total.is_finite() || input.total < 0.0 {
            return Err(TradeError::Validation(
                "total must not be negative".into(),
            ));
        }
        if !input.fee.is_finite() || input.fee < 0.0 {
            return Err(TradeError::Validation("fee must not be negative".into()));
        }
        Ok(())
    }

    /// Bring a holder's history into memory.
    ///
    /// A store failure is non-fatal: the holder starts with an empty ledger
    /// and the condition is logged. Loading twice is a no-op.
    pub fn load_holder(&self, holder: &str) {
        {
            let entries = self.entries.read().unwrap();
            if entries.contains_key(holder) {
                return;
            }
        }

        let loaded = match self.store.load(holder) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Could not load ledger for {}: {} (starting empty)", holder, e);
                Vec::new()
            }
        };

        if let Some(max_id) = loaded.iter().map(|t| t.id).max() {
            self.next_id.fetch_max(max_id + 1, Ordering::SeqCst);
        }
        debug!("Loaded {} transactions for {}", loaded.len(), holder);

        self.entries
            .write()
            .unwrap()
            .entry(holder.to_string())
            .or_insert(loaded);
    }

    /// Validate and append a transaction, assigning id, timestamp and the
    /// completed status. The store write happens before the in-memory
    /// publish; either the whole append is visible or none of it is.
    pub fn append(
        &self,
        holder: &str,
        input: TransactionInput,
    ) -> Result<Transaction, TradeError> {
        Self::validate(&input)?;
        self.load_holder(holder);

        let mut entries = self.entries.write().unwrap();
        let tx = Transaction {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            kind: input.kind,
            symbol: input.symbol,
            quantity: input.quantity,
            price: input.price,
            total: input.total,
            fee: input.fee,
            timestamp: Utc::now(),
            status: TransactionStatus::Completed,
        };

        self.store.append(holder, &tx)?;
        entries.entry(holder.to_string()).or_default().push(tx.clone());

        debug!(
            "Appended {} {} {} for {}",
            tx.kind, tx.quantity, tx.symbol, holder
        );
        Ok(tx)
    }

    /// All of a holder's transactions in append order.
    pub fn transactions(&self, holder: &str) -> Vec<Transaction> {
        self.load_holder(holder);
        self.entries
            .read()
            .unwrap()
            .get(holder)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of transactions recorded for a holder.
    pub fn len(&self, holder: &str) -> usize {
        self.load_holder(holder);
        self.entries
            .read()
            .unwrap()
            .get(holder)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}
