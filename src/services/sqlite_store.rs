//! SQLite persistence for the transaction ledger.
//!
//! One `transactions` table keyed by holder id. Rows are append-only and
//! replayed in id order on load. Timestamps are stored as RFC 3339 text so
//! a file written on one machine parses unambiguously on another.

use crate::services::ledger::{LedgerStore, StoreError};
use crate::types::{Transaction, TransactionKind, TransactionStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// SQLite-backed ledger store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite ledger store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite ledger store initialized");
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                holder_id TEXT NOT NULL,
                id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                symbol TEXT NOT NULL,
                quantity REAL NOT NULL,
                price REAL NOT NULL,
                total REAL NOT NULL,
                fee REAL NOT NULL,
                timestamp TEXT NOT NULL,
                status TEXT NOT NULL,
                PRIMARY KEY (holder_id, id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_transactions_holder
             ON transactions(holder_id, id)",
            [],
        )?;

        Ok(())
    }

    /// Count all rows across holders.
    pub fn transaction_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
            .unwrap_or(0)
    }
}

impl LedgerStore for SqliteStore {
    fn load(&self, holder: &str) -> Result<Vec<Transaction>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, kind, symbol, quantity, price, total, fee, timestamp, status
                 FROM transactions
                 WHERE holder_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let rows = stmt
            .query_map(params![holder], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut transactions = Vec::new();
        for row in rows {
            let (id, kind, symbol, quantity, price, total, fee, timestamp, status) =
                row.map_err(|e| StoreError::Unavailable(e.to_string()))?;

            transactions.push(Transaction {
                id: id as u64,
                kind: parse_kind(&kind)?,
                symbol,
                quantity,
                price,
                total,
                fee,
                timestamp: parse_timestamp(&timestamp)?,
                status: parse_status(&status)?,
            });
        }

        debug!("Loaded {} transactions for {}", transactions.len(), holder);
        Ok(transactions)
    }

    fn append(&self, holder: &str, tx: &Transaction) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO transactions
             (holder_id, id, kind, symbol, quantity, price, total, fee, timestamp, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                holder,
                tx.id as i64,
                tx.kind.to_string(),
                tx.symbol,
                tx.quantity,
                tx.price,
                tx.total,
                tx.fee,
                tx.timestamp.to_rfc3339(),
                tx.status.to_string(),
            ],
        )
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(())
    }
}

fn parse_kind(s: &str) -> Result<TransactionKind, StoreError> {
    match s {
        "deposit" => Ok(TransactionKind::Deposit),
        "withdrawal" => Ok(TransactionKind::Withdrawal),
        "buy" => Ok(TransactionKind::Buy),
        "sell" => Ok(TransactionKind::Sell),
        _ => Err(StoreError::Corrupt(format!("unknown kind: {}", s))),
    }
}

fn parse_status(s: &str) -> Result<TransactionStatus, StoreError> {
    match s {
        "completed" => Ok(TransactionStatus::Completed),
        "pending" => Ok(TransactionStatus::Pending),
        "failed" => Ok(TransactionStatus::Failed),
        _ => Err(StoreError::Corrupt(format!("unknown status: {}", s))),
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionInput;

    fn tx(id: u64, input: TransactionInput) -> Transaction {
        Transaction {
            id,
            kind: input.kind,
            symbol: input.symbol,
            quantity: input.quantity,
            price: input.price,
            total: input.total,
            fee: input.fee,
            timestamp: Utc::now(),
            status: TransactionStatus::Completed,
        }
    }

    #[test]
    fn test_round_trip() {
        let store = SqliteStore::new_in_memory().unwrap();

        let deposit = tx(1, TransactionInput::deposit("USDT", 2_000.0));
        let buy = tx(2, TransactionInput::buy("BTC/USDT", 0.1, 10_000.0, 10.0));
        store.append("alice", &deposit).unwrap();
        store.append("alice", &buy).unwrap();

        let loaded = store.load("alice").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, 1);
        assert_eq!(loaded[0].kind, TransactionKind::Deposit);
        assert_eq!(loaded[1].symbol, "BTC/USDT");
        assert_eq!(loaded[1].quantity, 0.1);
        assert_eq!(loaded[1].fee, 10.0);
        assert_eq!(loaded[1].status, TransactionStatus::Completed);
    }

    #[test]
    fn test_timestamps_parse_back_exactly() {
        let store = SqliteStore::new_in_memory().unwrap();

        let entry = tx(1, TransactionInput::deposit("USDT", 1.0));
        store.append("alice", &entry).unwrap();

        let loaded = store.load("alice").unwrap();
        // RFC 3339 keeps the full instant, including sub-second precision.
        assert_eq!(loaded[0].timestamp, entry.timestamp);
    }

    #[test]
    fn test_holders_are_keyed_separately() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .append("alice", &tx(1, TransactionInput::deposit("USDT", 1.0)))
            .unwrap();
        store
            .append("bob", &tx(1, TransactionInput::deposit("USDT", 2.0)))
            .unwrap();

        assert_eq!(store.load("alice").unwrap().len(), 1);
        assert_eq!(store.load("bob").unwrap().len(), 1);
        assert_eq!(store.load("carol").unwrap().len(), 0);
        assert_eq!(store.transaction_count(), 2);
    }

    #[test]
    fn test_load_order_is_id_order() {
        let store = SqliteStore::new_in_memory().unwrap();
        // Insert out of order; load must come back sorted.
        store
            .append("alice", &tx(5, TransactionInput::deposit("USDT", 5.0)))
            .unwrap();
        store
            .append("alice", &tx(2, TransactionInput::deposit("USDT", 2.0)))
            .unwrap();

        let loaded = store.load("alice").unwrap();
        assert_eq!(loaded[0].id, 2);
        assert_eq!(loaded[1].id, 5);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let store = SqliteStore::new_in_memory().unwrap();
        let entry = tx(1, TransactionInput::deposit("USDT", 1.0));
        store.append("alice", &entry).unwrap();

        assert!(store.append("alice", &entry).is_err());
        assert_eq!(store.load("alice").unwrap().len(), 1);
    }
}
