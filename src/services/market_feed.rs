//! Synthetic market data feed.
//!
//! Owns the live price table for a fixed symbol universe and drives it with
//! a periodic tick. Every tick builds a complete replacement table and swaps
//! it in atomically, then regenerates the order books from the swapped-in
//! snapshot and fans the snapshot out to subscribers.

use crate::services::history::{self, HistoryStore, HISTORY_DAYS};
use crate::services::orderbook_gen;
use crate::types::{Candle, OrderBook, PriceSnapshot, PriceTick, SymbolSpec, Timeframe};
use chrono::Utc;
use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Largest per-tick price move, as a fraction of the previous price.
const MAX_TICK_MOVE: f64 = 0.01;
/// Largest per-tick drift of the 24h change figure, in percentage points.
const MAX_CHANGE_DRIFT: f64 = 0.25;

/// Feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Interval between ticks.
    pub tick_interval: Duration,
    /// Days of candle history generated at registration.
    pub history_days: usize,
    /// Fixed RNG seed; `None` seeds from the OS for live runs.
    pub seed: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(3000),
            history_days: HISTORY_DAYS,
            seed: None,
        }
    }
}

/// Live price/stat table plus the derived order books and candle history for
/// a fixed, pre-registered symbol universe.
pub struct MarketDataFeed {
    /// Current table. Replaced wholesale each tick; readers clone the `Arc`
    /// and can never observe a half-updated table.
    table: RwLock<Arc<PriceSnapshot>>,
    books: DashMap<String, OrderBook>,
    history: HistoryStore,
    rng: Mutex<StdRng>,
    tick_tx: broadcast::Sender<Arc<PriceSnapshot>>,
    shutdown_tx: broadcast::Sender<()>,
    running: RwLock<bool>,
    config: FeedConfig,
}

impl MarketDataFeed {
    /// Register the universe and build the initial table, candle series and
    /// order books. The feed does not tick until [`start`](Self::start).
    pub fn new(universe: Vec<SymbolSpec>, config: FeedConfig) -> Arc<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let now = Utc::now();
        let now_ms = now.timestamp_millis();
        let history = HistoryStore::new();
        let books = DashMap::new();
        let mut ticks = BTreeMap::new();

        for spec in &universe {
            ticks.insert(spec.symbol.clone(), PriceTick::from_spec(spec, now));
            history.insert(
                &spec.symbol,
                history::generate(spec, config.history_days, now_ms, &mut rng),
            );
            books.insert(
                spec.symbol.clone(),
                orderbook_gen::generate(spec.price, &mut rng),
            );
        }

        info!("Market data feed registered {} symbols", universe.len());

        let (tick_tx, _) = broadcast::channel(64);
        let (shutdown_tx, _) = broadcast::channel(1);

        Arc::new(Self {
            table: RwLock::new(Arc::new(PriceSnapshot { ticks, as_of: now })),
            books,
            history,
            rng: Mutex::new(rng),
            tick_tx,
            shutdown_tx,
            running: RwLock::new(false),
            config,
        })
    }

    /// Feed over the built-in universe with default settings.
    pub fn with_defaults() -> Arc<Self> {
        Self::new(SymbolSpec::default_universe(), FeedConfig::default())
    }

    /// Subscribe to per-tick snapshots. Slow subscribers lag and miss ticks
    /// rather than blocking the feed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PriceSnapshot>> {
        self.tick_tx.subscribe()
    }

    /// The current price table.
    pub fn snapshot(&self) -> Arc<PriceSnapshot> {
        self.table.read().unwrap().clone()
    }

    /// Current tick for one symbol.
    pub fn price(&self, symbol: &str) -> Option<PriceTick> {
        self.snapshot().get(symbol).cloned()
    }

    /// Current order book for a symbol; empty for unknown symbols.
    pub fn order_book(&self, symbol: &str) -> OrderBook {
        self.books
            .get(symbol)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(OrderBook::empty)
    }

    /// Timeframe-selected candle history for a symbol.
    pub fn history(&self, symbol: &str, timeframe: Timeframe) -> Vec<Candle> {
        self.history.slice(symbol, timeframe)
    }

    /// Whether a symbol is part of the registered universe.
    pub fn is_registered(&self, symbol: &str) -> bool {
        self.snapshot().get(symbol).is_some()
    }

    /// Registered symbols in lexicographic order.
    pub fn symbols(&self) -> Vec<String> {
        self.snapshot().symbols().map(str::to_string).collect()
    }

    /// Run one tick: walk every price, swap the new table in, refresh the
    /// order books from the post-swap snapshot, publish to subscribers.
    ///
    /// A symbol whose new price comes out non-finite or non-positive keeps
    /// its previous tick for this round; the rest of the table still moves.
    pub fn tick(&self) {
        let previous = self.snapshot();
        let now = Utc::now();

        let snapshot = {
            let mut rng = self.rng.lock().unwrap();

            let mut ticks = BTreeMap::new();
            for (symbol, old) in &previous.ticks {
                let mut tick = old.clone();
                match next_price(old.price, &mut *rng) {
                    Some(price) => {
                        tick.price = price;
                        tick.change_24h += rng.gen_range(-MAX_CHANGE_DRIFT..MAX_CHANGE_DRIFT);
                        tick.as_of = now;
                    }
                    None => {
                        warn!("Tick for {} produced an unusable price, keeping previous", symbol);
                    }
                }
                ticks.insert(symbol.clone(), tick);
            }

            let snapshot = Arc::new(PriceSnapshot { ticks, as_of: now });
            *self.table.write().unwrap() = snapshot.clone();

            // Books always derive from the table that was just swapped in,
            // never from the one it replaced.
            for tick in snapshot.ticks.values() {
                self.books.insert(
                    tick.symbol.clone(),
                    orderbook_gen::generate(tick.price, &mut *rng),
                );
            }

            snapshot
        };

        debug!("Ticked {} symbols", snapshot.len());
        let _ = self.tick_tx.send(snapshot);
    }

    /// Spawn the periodic tick task. Idempotent; a second call while running
    /// is ignored.
    pub fn start(self: &Arc<Self>) {
        {
            let mut running = self.running.write().unwrap();
            if *running {
                return;
            }
            *running = true;
        }

        let feed = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!(
            "Market data feed ticking every {}ms",
            self.config.tick_interval.as_millis()
        );

        tokio::spawn(async move {
            let mut ticker = interval(feed.config.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick fires immediately; skip it so the
            // initial table stands for one full interval.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        feed.tick();
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Market data feed stopped");
                        break;
                    }
                }
            }
        });
    }

    /// Stop the periodic task. The current table stays readable; no further
    /// ticks are published after this returns.
    pub fn stop(&self) {
        let mut running = self.running.write().unwrap();
        if !*running {
            return;
        }
        *running = false;
        let _ = self.shutdown_tx.send(());
    }

    /// Whether the periodic task is running.
    pub fn is_running(&self) -> bool {
        *self.running.read().unwrap()
    }
}

/// Walk one price forward. `None` marks a candidate the table must not take.
fn next_price(price: f64, rng: &mut impl Rng) -> Option<f64> {
    let candidate = round2(price * (1.0 + rng.gen_range(-MAX_TICK_MOVE..MAX_TICK_MOVE)));
    if candidate.is_finite() && candidate > 0.0 {
        Some(candidate)
    } else {
        None
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
