use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static listing data for a tradable symbol, supplied at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSpec {
    /// Trading pair symbol (e.g. "BTC/USDT").
    pub symbol: String,
    /// Human-readable asset name.
    pub name: String,
    /// Listing price the synthetic walk starts from.
    pub price: f64,
    /// Initial 24h change percentage.
    pub change_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
}

impl SymbolSpec {
    /// The built-in symbol universe served when no custom listing is provided.
    pub fn default_universe() -> Vec<SymbolSpec> {
        vec![
            SymbolSpec {
                symbol: "BTC/USDT".to_string(),
                name: "Bitcoin".to_string(),
                price: 43_250.00,
                change_24h: 2.45,
                high_24h: 43_800.00,
                low_24h: 42_100.00,
                volume_24h: 28_500_000_000.0,
                market_cap: 847_000_000_000.0,
            },
            SymbolSpec {
                symbol: "ETH/USDT".to_string(),
                name: "Ethereum".to_string(),
                price: 2_685.50,
                change_24h: -1.23,
                high_24h: 2_750.00,
                low_24h: 2_650.00,
                volume_24h: 15_200_000_000.0,
                market_cap: 322_000_000_000.0,
            },
            SymbolSpec {
                symbol: "BNB/USDT".to_string(),
                name: "BNB".to_string(),
                price: 315.80,
                change_24h: 3.67,
                high_24h: 320.00,
                low_24h: 305.00,
                volume_24h: 950_000_000.0,
                market_cap: 47_000_000_000.0,
            },
            SymbolSpec {
                symbol: "SOL/USDT".to_string(),
                name: "Solana".to_string(),
                price: 102.45,
                change_24h: 5.23,
                high_24h: 105.00,
                low_24h: 98.50,
                volume_24h: 2_100_000_000.0,
                market_cap: 44_000_000_000.0,
            },
            SymbolSpec {
                symbol: "ADA/USDT".to_string(),
                name: "Cardano".to_string(),
                price: 0.485,
                change_24h: -2.18,
                high_24h: 0.498,
                low_24h: 0.475,
                volume_24h: 450_000_000.0,
                market_cap: 17_000_000_000.0,
            },
            SymbolSpec {
                symbol: "DOT/USDT".to_string(),
                name: "Polkadot".to_string(),
                price: 7.32,
                change_24h: 1.87,
                high_24h: 7.45,
                low_24h: 7.18,
                volume_24h: 180_000_000.0,
                market_cap: 9_500_000_000.0,
            },
        ]
    }
}

/// Live headline stats for a symbol. Only `price`, `change_24h` and `as_of`
/// move on a tick; the remaining fields keep their registered values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTick {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    /// When this tick was produced.
    pub as_of: DateTime<Utc>,
}

impl PriceTick {
    /// Build the initial tick for a newly registered symbol.
    pub fn from_spec(spec: &SymbolSpec, as_of: DateTime<Utc>) -> Self {
        Self {
            symbol: spec.symbol.clone(),
            name: spec.name.clone(),
            price: spec.price,
            change_24h: spec.change_24h,
            high_24h: spec.high_24h,
            low_24h: spec.low_24h,
            volume_24h: spec.volume_24h,
            market_cap: spec.market_cap,
            as_of,
        }
    }
}

/// An immutable, atomically published copy of the whole price table.
///
/// The feed builds a complete new snapshot each tick and swaps it in as one
/// unit, so a reader never observes a mix of old and new symbol entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub ticks: BTreeMap<String, PriceTick>,
    pub as_of: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn get(&self, symbol: &str) -> Option<&PriceTick> {
        self.ticks.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.ticks.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_universe() {
        let universe = SymbolSpec::default_universe();
        assert_eq!(universe.len(), 6);
        assert!(universe.iter().any(|s| s.symbol == "BTC/USDT"));
        assert!(universe.iter().all(|s| s.price > 0.0));
    }

    #[test]
    fn test_tick_from_spec() {
        let spec = &SymbolSpec::default_universe()[0];
        let now = Utc::now();
        let tick = PriceTick::from_spec(spec, now);

        assert_eq!(tick.symbol, "BTC/USDT");
        assert_eq!(tick.price, 43_250.00);
        assert_eq!(tick.market_cap, spec.market_cap);
        assert_eq!(tick.as_of, now);
    }

    #[test]
    fn test_tick_serialization_camel_case() {
        let spec = &SymbolSpec::default_universe()[0];
        let tick = PriceTick::from_spec(spec, Utc::now());
        let json = serde_json::to_string(&tick).unwrap();

        assert!(json.contains("\"change24h\""));
        assert!(json.contains("\"marketCap\""));
        assert!(json.contains("\"asOf\""));
    }
}
