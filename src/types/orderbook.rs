//! Order book types for the synthetic depth ladder.

use serde::{Deserialize, Serialize};

/// A single price level in an order book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLevel {
    /// Price at this level
    pub price: f64,
    /// Quantity available at this price
    pub quantity: f64,
    /// Notional value (price * quantity)
    pub total: f64,
}

/// Bid/ask ladder around a reference price.
///
/// Bids are sorted by price descending, asks ascending; every bid price is
/// below every ask price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBook {
    pub bids: Vec<OrderLevel>,
    pub asks: Vec<OrderLevel>,
}

impl OrderBook {
    /// An order book with no depth, served for unknown symbols.
    pub fn empty() -> Self {
        Self {
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Highest bid price.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    /// Lowest ask price.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }

    /// Gap between best ask and best bid.
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_book() {
        let book = OrderBook::empty();
        assert!(book.is_empty());
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
        assert!(book.spread().is_none());
    }

    #[test]
    fn test_best_prices_and_spread() {
        let book = OrderBook {
            bids: vec![OrderLevel {
                price: 99.0,
                quantity: 1.0,
                total: 99.0,
            }],
            asks: vec![OrderLevel {
                price: 101.0,
                quantity: 1.0,
                total: 101.0,
            }],
        };

        assert_eq!(book.best_bid(), Some(99.0));
        assert_eq!(book.best_ask(), Some(101.0));
        assert_eq!(book.spread(), Some(2.0));
    }
}
