//! Synthetic price history.
//!
//! Each symbol gets a daily random-walk candle series generated once at
//! registration. Later price ticks update only the headline stats; the
//! stored series never changes.

use crate::types::{Candle, SymbolSpec, Timeframe};
use dashmap::DashMap;
use std::sync::Arc;

/// Days of history walked back from the registration instant. The walk is
/// inclusive of day zero, so the series holds `HISTORY_DAYS + 1` candles.
pub const HISTORY_DAYS: usize = 31;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Daily volatility of the walk (5% of the running price).
const VOLATILITY: f64 = 0.05;
/// Upper bound on the high/low wick extension (2%).
const WICK_FACTOR: f64 = 0.02;

/// Generate a `days + 1` candle series for a newly registered symbol,
/// oldest first (the walk is inclusive of day zero).
///
/// The walk starts 10% below the listing price and steps once per day:
/// close moves by up to ±2.5% of the open, wicks extend up to 2% beyond the
/// body, and volume is a random slice of a tenth of the 24h volume.
pub fn generate(
    spec: &SymbolSpec,
    days: usize,
    now_ms: i64,
    rng: &mut impl rand::Rng,
) -> Vec<Candle> {
    let mut series = Vec::with_capacity(days + 1);
    let mut current = spec.price * 0.9;

    for day in (0..=days).rev() {
        let timestamp = now_ms - (day as i64) * DAY_MS;
        let change = rng.gen_range(-0.5..0.5) * VOLATILITY * current;

        let open = current;
        let close = current + change;
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..WICK_FACTOR));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..WICK_FACTOR));
        let volume = rng.gen_range(0.0..1.0) * spec.volume_24h * 0.1;

        series.push(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });

        current = close;
    }

    series
}

/// Per-symbol store of the static candle series.
pub struct HistoryStore {
    series: DashMap<String, Arc<Vec<Candle>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            series: DashMap::new(),
        }
    }

    /// Register a generated series for a symbol. Overwrites any previous
    /// series, which only happens if a symbol is registered twice.
    pub fn insert(&self, symbol: &str, candles: Vec<Candle>) {
        self.series.insert(symbol.to_string(), Arc::new(candles));
    }

    /// The timeframe-selected tail of a symbol's series; empty for unknown
    /// symbols.
    pub fn slice(&self, symbol: &str, timeframe: Timeframe) -> Vec<Candle> {
        match self.series.get(symbol) {
            Some(entry) => timeframe.slice(entry.value()).to_vec(),
            None => Vec::new(),
        }
    }

    /// Full series length for a symbol.
    pub fn len(&self, symbol: &str) -> usize {
        self.series.get(symbol).map(|e| e.len()).unwrap_or(0)
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spec() -> SymbolSpec {
        SymbolSpec::default_universe().remove(0)
    }

    #[test]
    fn test_series_length_inclusive_of_day_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let series = generate(&spec(), HISTORY_DAYS, 1_700_000_000_000, &mut rng);
        assert_eq!(series.len(), HISTORY_DAYS + 1);
    }

    #[test]
    fn test_series_is_oldest_first_and_daily() {
        let mut rng = StdRng::seed_from_u64(2);
        let now_ms = 1_700_000_000_000;
        let series = generate(&spec(), HISTORY_DAYS, now_ms, &mut rng);

        assert_eq!(series.last().unwrap().timestamp, now_ms);
        for pair in series.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, DAY_MS);
        }
    }

    #[test]
    fn test_walk_starts_ten_percent_below_listing_price() {
        let mut rng = StdRng::seed_from_u64(3);
        let s = spec();
        let series = generate(&s, HISTORY_DAYS, 1_700_000_000_000, &mut rng);
        assert!((series[0].open - s.price * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_candles_chain_and_stay_coherent() {
        let mut rng = StdRng::seed_from_u64(4);
        let series = generate(&spec(), HISTORY_DAYS, 1_700_000_000_000, &mut rng);

        for pair in series.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
        for candle in &series {
            assert!(candle.high >= candle.open.max(candle.close));
            assert!(candle.low <= candle.open.min(candle.close));
            assert!(candle.volume >= 0.0);
        }
    }

    #[test]
    fn test_store_slicing() {
        let mut rng = StdRng::seed_from_u64(5);
        let s = spec();
        let store = HistoryStore::new();
        store.insert(&s.symbol, generate(&s, HISTORY_DAYS, 1_700_000_000_000, &mut rng));

        assert_eq!(store.len(&s.symbol), 32);
        assert_eq!(store.slice(&s.symbol, Timeframe::OneHour).len(), 24);
        assert_eq!(store.slice(&s.symbol, Timeframe::OneDay).len(), 7);
        assert_eq!(store.slice(&s.symbol, Timeframe::OneWeek).len(), 30);
        assert_eq!(store.slice(&s.symbol, Timeframe::OneMonth).len(), 32);
        assert!(store.slice("XRP/USDT", Timeframe::OneDay).is_empty());
    }
}
