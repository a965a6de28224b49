//! Portfolio engine.
//!
//! Connects the ledger and the market feed through an explicit event
//! pipeline: a transaction append and a price tick each become an event, and
//! a single worker task turns events into portfolio recomputes. With one
//! consumer there is never more than one recompute in flight, and a burst of
//! events coalesces into one recompute over the newest (ledger, prices)
//! pair instead of interleaving stale ones.

use crate::services::ledger::{TradeError, TransactionLedger};
use crate::services::market_feed::MarketDataFeed;
use crate::services::positions;
use crate::types::{Portfolio, Transaction, TransactionInput, TransactionKind};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info};

/// What woke the recompute worker.
enum EngineEvent {
    /// A holder's ledger grew; recompute that holder. The ack, when present,
    /// fires once the recompute that covered this append has run.
    TransactionAppended {
        holder: String,
        ack: Option<oneshot::Sender<()>>,
    },
    /// The price table moved; recompute every registered holder.
    PriceTicked,
}

/// Serialized portfolio recomputation over a ledger and a price feed.
pub struct PortfolioEngine {
    feed: Arc<MarketDataFeed>,
    ledger: Arc<TransactionLedger>,
    portfolios: DashMap<String, Portfolio>,
    holders: RwLock<HashSet<String>>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    shutdown_tx: broadcast::Sender<()>,
    /// Serializes the check-then-append section of `submit_transaction`.
    submit_lock: Mutex<()>,
}

impl PortfolioEngine {
    /// Build the engine and spawn its recompute worker. The worker also
    /// subscribes to the feed, so price ticks start flowing immediately.
    pub fn new(feed: Arc<MarketDataFeed>, ledger: Arc<TransactionLedger>) -> Arc<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);

        let engine = Arc::new(Self {
            feed,
            ledger,
            portfolios: DashMap::new(),
            holders: RwLock::new(HashSet::new()),
            event_tx,
            shutdown_tx,
            submit_lock: Mutex::new(()),
        });

        engine.spawn_worker(event_rx);
        engine
    }

    /// Open a holder's session: load their ledger and run the first
    /// recompute so the portfolio is available once this returns. A no-op
    /// for holders that already have a computed portfolio.
    pub async fn ensure_holder(&self, holder: &str) {
        let known = self.holders.read().unwrap().contains(holder);
        if known && self.portfolios.contains_key(holder) {
            return;
        }

        self.ledger.load_holder(holder);
        self.holders.write().unwrap().insert(holder.to_string());

        let (ack_tx, ack_rx) = oneshot::channel();
        let _ = self.event_tx.send(EngineEvent::TransactionAppended {
            holder: holder.to_string(),
            ack: Some(ack_tx),
        });
        let _ = ack_rx.await;
        debug!("Registered holder {}", holder);
    }

    /// Validate and record a transaction, then wait for the recompute that
    /// covers it. All rejections are returned as values and leave the
    /// ledger exactly as it was.
    pub async fn submit_transaction(
        &self,
        holder: &str,
        input: TransactionInput,
    ) -> Result<Transaction, TradeError> {
        TransactionLedger::validate(&input)?;

        let (tx, ack_rx) = {
            let _guard = self.submit_lock.lock().unwrap();

            let prices = self.feed.snapshot();
            match input.kind {
                TransactionKind::Buy | TransactionKind::Sell => {
                    if !self.feed.is_registered(&input.symbol) {
                        return Err(TradeError::SymbolNotFound(input.symbol));
                    }
                }
                TransactionKind::Deposit | TransactionKind::Withdrawal => {}
            }

            // Business checks replay the ledger as it stands right now;
            // the submit lock keeps another append from sneaking in between
            // the check and ours.
            let current = positions::compute(
                &self.ledger.transactions(holder),
                &prices,
                Utc::now(),
            )?;

            match input.kind {
                TransactionKind::Buy => {
                    let needed = input.total + input.fee;
                    if needed > current.cash_balance {
                        return Err(TradeError::InsufficientFunds {
                            needed,
                            available: current.cash_balance,
                        });
                    }
                }
                TransactionKind::Sell => {
                    let held = current.held_quantity(&input.symbol);
                    if input.quantity > held {
                        return Err(TradeError::InsufficientPosition {
                            symbol: input.symbol,
                            requested: input.quantity,
                            held,
                        });
                    }
                }
                TransactionKind::Deposit | TransactionKind::Withdrawal => {}
            }

            let tx = self.ledger.append(holder, input)?;
            self.holders.write().unwrap().insert(holder.to_string());

            let (ack_tx, ack_rx) = oneshot::channel();
            let _ = self.event_tx.send(EngineEvent::TransactionAppended {
                holder: holder.to_string(),
                ack: Some(ack_tx),
            });
            (tx, ack_rx)
        };

        // The worker acks once the recompute covering this append has run,
        // so a portfolio read after this call sees the new transaction.
        let _ = ack_rx.await;
        Ok(tx)
    }

    /// The market feed this engine is wired to.
    pub fn feed(&self) -> &Arc<MarketDataFeed> {
        &self.feed
    }

    /// Latest computed portfolio for a holder.
    pub fn portfolio(&self, holder: &str) -> Option<Portfolio> {
        self.portfolios.get(holder).map(|entry| entry.value().clone())
    }

    /// A holder's full transaction history, in append order.
    pub fn transactions(&self, holder: &str) -> Vec<Transaction> {
        self.ledger.transactions(holder)
    }

    /// Stop the recompute worker and drop its feed subscription. Portfolios
    /// computed so far stay readable.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Portfolio engine shut down");
    }

    fn spawn_worker(self: &Arc<Self>, mut event_rx: mpsc::UnboundedReceiver<EngineEvent>) {
        let engine = self.clone();
        let mut feed_rx = self.feed.subscribe();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                let first = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    event = event_rx.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                    tick = feed_rx.recv() => match tick {
                        // A lagged receiver still means prices moved.
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            EngineEvent::PriceTicked
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };

                engine.run_batch(first, &mut event_rx);
            }
            debug!("Portfolio engine worker exited");
        });
    }

    /// Collapse the pending event queue into one recompute pass. Every
    /// recompute reads the ledger and price table as of now, so processing
    /// only the newest state is safe and keeps stale work from interleaving.
    fn run_batch(&self, first: EngineEvent, event_rx: &mut mpsc::UnboundedReceiver<EngineEvent>) {
        let mut recompute_all = false;
        let mut holders: HashSet<String> = HashSet::new();
        let mut acks = Vec::new();

        let absorb = |event: EngineEvent,
                      recompute_all: &mut bool,
                      holders: &mut HashSet<String>,
                      acks: &mut Vec<oneshot::Sender<()>>| {
            match event {
                EngineEvent::TransactionAppended { holder, ack } => {
                    holders.insert(holder);
                    if let Some(ack) = ack {
                        acks.push(ack);
                    }
                }
                EngineEvent::PriceTicked => *recompute_all = true,
            }
        };

        absorb(first, &mut recompute_all, &mut holders, &mut acks);
        while let Ok(event) = event_rx.try_recv() {
            absorb(event, &mut recompute_all, &mut holders, &mut acks);
        }

        if recompute_all {
            holders.extend(self.holders.read().unwrap().iter().cloned());
        }

        let prices = self.feed.snapshot();
        let as_of = Utc::now();
        for holder in &holders {
            let transactions = self.ledger.transactions(holder);
            match positions::compute(&transactions, &prices, as_of) {
                Ok(portfolio) => {
                    self.portfolios.insert(holder.clone(), portfolio);
                }
                Err(e) => {
                    // Appends are validated against the replayed state, so a
                    // history that fails to replay indicates a corrupted
                    // store. Keep the last good portfolio visible.
                    error!("Recompute failed for {}: {}", holder, e);
                }
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }
    }
}
