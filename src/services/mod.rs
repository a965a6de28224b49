pub mod history;
pub mod ledger;
pub mod market_feed;
pub mod orderbook_gen;
pub mod portfolio_engine;
pub mod positions;
pub mod sqlite_store;

pub use history::HistoryStore;
pub use ledger::{LedgerStore, MemoryStore, StoreError, TradeError, TransactionLedger};
pub use market_feed::{FeedConfig, MarketDataFeed};
pub use portfolio_engine::PortfolioEngine;
pub use positions::QUOTE_ASSET;
pub use sqlite_store::SqliteStore;
