use std::env;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database path for the transaction ledger.
    pub db_path: String,
    /// Interval between market data ticks.
    pub tick_interval: Duration,
    /// Fixed RNG seed for reproducible market runs (unset = seed from OS).
    pub market_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);
        let db_path = env::var("MIRAGE_DB").unwrap_or_else(|_| "mirage.db".to_string());
        let tick_ms = env::var("MARKET_TICK_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000u64);
        let market_seed = env::var("MARKET_SEED").ok().and_then(|v| v.parse().ok());

        Self {
            host,
            port,
            db_path,
            tick_interval: Duration::from_millis(tick_ms),
            market_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            db_path: "mirage.db".to_string(),
            tick_interval: Duration::from_millis(3000),
            market_seed: None,
        }
    }
}
