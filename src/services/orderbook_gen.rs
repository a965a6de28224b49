//! Synthetic order book generation.
//!
//! Builds a 20-level bid/ask ladder around a reference price. Quantities are
//! random but the ladder shape is fixed: bids step down and asks step up by
//! 0.01% of the reference price per level, on either side of a 0.1% spread.

use crate::types::{OrderBook, OrderLevel};
use rand::Rng;

/// Number of levels per side.
pub const BOOK_DEPTH: usize = 20;

/// Half-spread as a fraction of the reference price.
const SPREAD_FACTOR: f64 = 0.001;
/// Price step between adjacent levels as a fraction of the reference price.
const LEVEL_STEP_FACTOR: f64 = 0.0001;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Generate a fresh order book around `price`.
///
/// Bids come out strictly decreasing, asks strictly increasing, and every
/// bid sits below every ask.
pub fn generate(price: f64, rng: &mut impl Rng) -> OrderBook {
    let spread = price * SPREAD_FACTOR;

    let mut bids = Vec::with_capacity(BOOK_DEPTH);
    for i in 0..BOOK_DEPTH {
        let level_price = price - spread - (i as f64) * price * LEVEL_STEP_FACTOR;
        let quantity = rng.gen_range(0.1..10.1);
        bids.push(OrderLevel {
            price: round2(level_price),
            quantity: round3(quantity),
            total: round2(level_price * quantity),
        });
    }

    let mut asks = Vec::with_capacity(BOOK_DEPTH);
    for i in 0..BOOK_DEPTH {
        let level_price = price + spread + (i as f64) * price * LEVEL_STEP_FACTOR;
        let quantity = rng.gen_range(0.1..10.1);
        asks.push(OrderLevel {
            price: round2(level_price),
            quantity: round3(quantity),
            total: round2(level_price * quantity),
        });
    }

    OrderBook { bids, asks }
}
