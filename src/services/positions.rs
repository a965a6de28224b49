//! Portfolio valuation.
//!
//! Replays a full transaction history into cost-basis-tracked positions and
//! values them against a price snapshot. Pure: no state survives between
//! calls, and identical inputs produce identical output.

use crate::services::ledger::TradeError;
use crate::types::{Portfolio, Position, PriceSnapshot, Transaction, TransactionKind,
    TransactionStatus};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// The quote asset. Deposits and withdrawals move cash only in this symbol;
/// all trade totals and fees are denominated in it.
pub const QUOTE_ASSET: &str = "USDT";

#[derive(Debug, Default)]
struct Accumulator {
    quantity: f64,
    total_cost: f64,
}

/// Replay `transactions` in the order given (append order; ids are monotone
/// within a holder) and value the resulting holdings against `prices`.
///
/// Only completed transactions participate. A sell of more than the held
/// quantity aborts the whole computation; the caller's ledger is not touched
/// by this error. A partial sell reduces the cost basis proportionally, so
/// the average price is unchanged across partial sells.
///
/// Positions whose symbol has no tick in `prices` come back with `None`
/// valuation fields and are left out of the portfolio totals.
pub fn compute(
    transactions: &[Transaction],
    prices: &PriceSnapshot,
    as_of: DateTime<Utc>,
) -> Result<Portfolio, TradeError> {
    let mut holdings: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut cash_balance = 0.0_f64;

    for tx in transactions {
        if tx.status != TransactionStatus::Completed {
            continue;
        }

        match tx.kind {
            TransactionKind::Deposit => {
                if tx.symbol == QUOTE_ASSET {
                    cash_balance += tx.quantity;
                }
            }
            TransactionKind::Withdrawal => {
                if tx.symbol == QUOTE_ASSET {
                    cash_balance -= tx.quantity;
                }
            }
            TransactionKind::Buy => {
                let acc = holdings.entry(tx.symbol.as_str()).or_default();
                acc.quantity += tx.quantity;
                acc.total_cost += tx.total + tx.fee;
                cash_balance -= tx.total + tx.fee;
            }
            TransactionKind::Sell => {
                let held = holdings
                    .get(tx.symbol.as_str())
                    .map(|acc| acc.quantity)
                    .unwrap_or(0.0);
                if tx.quantity > held {
                    return Err(TradeError::InsufficientPosition {
                        symbol: tx.symbol.clone(),
                        requested: tx.quantity,
                        held,
                    });
                }

                let acc = holdings.entry(tx.symbol.as_str()).or_default();
                let ratio = tx.quantity / acc.quantity;
                acc.quantity -= tx.quantity;
                acc.total_cost -= acc.total_cost * ratio;
                cash_balance += tx.total - tx.fee;
            }
        }
    }

    let mut positions = Vec::new();
    let mut total_value = cash_balance;
    let mut total_cost = 0.0_f64;

    for (symbol, acc) in &holdings {
        if acc.quantity <= 0.0 {
            continue;
        }

        let average_price = acc.total_cost / acc.quantity;
        let mut position = Position {
            symbol: symbol.to_string(),
            quantity: acc.quantity,
            average_price,
            total_cost: acc.total_cost,
            current_value: None,
            pnl: None,
            pnl_percentage: None,
            as_of,
        };

        if let Some(tick) = prices.get(symbol) {
            let current_value = acc.quantity * tick.price;
            let pnl = current_value - acc.total_cost;
            position.current_value = Some(current_value);
            position.pnl = Some(pnl);
            position.pnl_percentage = Some(if acc.total_cost > 0.0 {
                pnl / acc.total_cost * 100.0
            } else {
                0.0
            });

            total_value += current_value;
            total_cost += acc.total_cost;
        }

        positions.push(position);
    }

    let total_pnl = total_value - total_cost;
    let total_pnl_percentage = if total_cost > 0.0 {
        total_pnl / total_cost * 100.0
    } else {
        0.0
    };

    Ok(Portfolio {
        cash_balance,
        total_value,
        total_cost,
        total_pnl,
        total_pnl_percentage,
        positions,
        as_of,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PriceTick, SymbolSpec};

    fn tx(id: u64, kind: TransactionKind, symbol: &str, quantity: f64, price: f64, fee: f64) -> Transaction {
        Transaction {
            id,
            kind,
            symbol: symbol.to_string(),
            quantity,
            price,
            total: quantity * price,
            fee,
            timestamp: Utc::now(),
            status: TransactionStatus::Completed,
        }
    }

    fn snapshot(prices: &[(&str, f64)]) -> PriceSnapshot {
        let now = Utc::now();
        let ticks = prices
            .iter()
            .map(|(symbol, price)| {
                let spec = SymbolSpec {
                    symbol: symbol.to_string(),
                    name: symbol.to_string(),
                    price: *price,
                    change_24h: 0.0,
                    high_24h: *price,
                    low_24h: *price,
                    volume_24h: 0.0,
                    market_cap: 0.0,
                };
                (symbol.to_string(), PriceTick::from_spec(&spec, now))
            })
            .collect();
        PriceSnapshot { ticks, as_of: now }
    }

    #[test]
    fn test_deposit_and_buy_conservation() {
        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 2_000.0, 1.0, 0.0),
            tx(2, TransactionKind::Buy, "BTC/USDT", 0.1, 10_000.0, 10.0),
        ];
        let prices = snapshot(&[("BTC/USDT", 10_000.0)]);

        let portfolio = compute(&ledger, &prices, Utc::now()).unwrap();

        assert_eq!(portfolio.cash_balance, 2_000.0 - (1_000.0 + 10.0));
        let btc = portfolio.position("BTC/USDT").unwrap();
        assert_eq!(btc.quantity, 0.1);
        assert_eq!(btc.total_cost, 1_010.0);
        assert!((btc.average_price - 10_100.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_sell_preserves_average_price() {
        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 20_000.0, 1.0, 0.0),
            tx(2, TransactionKind::Buy, "ETH/USDT", 1.0, 10_000.0, 0.0),
            tx(3, TransactionKind::Sell, "ETH/USDT", 0.4, 12_000.0, 0.0),
        ];
        let prices = snapshot(&[("ETH/USDT", 12_000.0)]);

        let portfolio = compute(&ledger, &prices, Utc::now()).unwrap();
        let eth = portfolio.position("ETH/USDT").unwrap();

        assert!((eth.quantity - 0.6).abs() < 1e-12);
        assert!((eth.total_cost - 6_000.0).abs() < 1e-9);
        assert!((eth.average_price - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_sell_proceeds_net_of_fee_hit_cash() {
        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 10_000.0, 1.0, 0.0),
            tx(2, TransactionKind::Buy, "SOL/USDT", 10.0, 100.0, 1.0),
            tx(3, TransactionKind::Sell, "SOL/USDT", 10.0, 110.0, 1.1),
        ];
        let prices = snapshot(&[("SOL/USDT", 110.0)]);

        let portfolio = compute(&ledger, &prices, Utc::now()).unwrap();

        // 10000 - (1000 + 1) + (1100 - 1.1)
        assert!((portfolio.cash_balance - 10_097.9).abs() < 1e-9);
        // Fully sold positions drop out of the list.
        assert!(portfolio.position("SOL/USDT").is_none());
    }

    #[test]
    fn test_over_sell_is_rejected_not_clamped() {
        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 10_000.0, 1.0, 0.0),
            tx(2, TransactionKind::Buy, "BTC/USDT", 0.1, 10_000.0, 0.0),
            tx(3, TransactionKind::Sell, "BTC/USDT", 0.2, 10_000.0, 0.0),
        ];
        let prices = snapshot(&[("BTC/USDT", 10_000.0)]);

        let err = compute(&ledger, &prices, Utc::now()).unwrap_err();
        match err {
            TradeError::InsufficientPosition {
                symbol,
                requested,
                held,
            } => {
                assert_eq!(symbol, "BTC/USDT");
                assert_eq!(requested, 0.2);
                assert_eq!(held, 0.1);
            }
            other => panic!("expected InsufficientPosition, got {other:?}"),
        }
    }

    #[test]
    fn test_sell_of_never_held_symbol_is_rejected() {
        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 10_000.0, 1.0, 0.0),
            tx(2, TransactionKind::Sell, "ADA/USDT", 5.0, 0.5, 0.0),
        ];
        let prices = snapshot(&[("ADA/USDT", 0.5)]);

        assert!(matches!(
            compute(&ledger, &prices, Utc::now()),
            Err(TradeError::InsufficientPosition { held, .. }) if held == 0.0
        ));
    }

    #[test]
    fn test_idempotent_and_bit_identical() {
        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 5_000.0, 1.0, 0.0),
            tx(2, TransactionKind::Buy, "BTC/USDT", 0.05, 40_000.0, 2.0),
            tx(3, TransactionKind::Buy, "ETH/USDT", 1.0, 2_600.0, 2.6),
            tx(4, TransactionKind::Sell, "ETH/USDT", 0.5, 2_700.0, 1.35),
        ];
        let prices = snapshot(&[("BTC/USDT", 41_000.0), ("ETH/USDT", 2_650.0)]);
        let as_of = Utc::now();

        let a = compute(&ledger, &prices, as_of).unwrap();
        let b = compute(&ledger, &prices, as_of).unwrap();

        assert_eq!(a.cash_balance.to_bits(), b.cash_balance.to_bits());
        assert_eq!(a.total_value.to_bits(), b.total_value.to_bits());
        assert_eq!(a.total_pnl.to_bits(), b.total_pnl.to_bits());
        assert_eq!(a.positions.len(), b.positions.len());
        for (pa, pb) in a.positions.iter().zip(b.positions.iter()) {
            assert_eq!(pa.symbol, pb.symbol);
            assert_eq!(pa.quantity.to_bits(), pb.quantity.to_bits());
            assert_eq!(pa.total_cost.to_bits(), pb.total_cost.to_bits());
            assert_eq!(
                pa.current_value.unwrap().to_bits(),
                pb.current_value.unwrap().to_bits()
            );
        }
    }

    #[test]
    fn test_unpriced_position_is_flagged_not_zeroed() {
        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 1_000.0, 1.0, 0.0),
            tx(2, TransactionKind::Buy, "DOT/USDT", 10.0, 7.0, 0.0),
        ];
        let prices = snapshot(&[]);

        let portfolio = compute(&ledger, &prices, Utc::now()).unwrap();
        let dot = portfolio.position("DOT/USDT").unwrap();

        assert!(!dot.is_priced());
        assert_eq!(dot.quantity, 10.0);
        assert_eq!(dot.total_cost, 70.0);
        assert!(dot.current_value.is_none());
        // Excluded from the valued totals, but cash still reflects the buy.
        assert_eq!(portfolio.total_value, portfolio.cash_balance);
        assert_eq!(portfolio.total_cost, 0.0);
    }

    #[test]
    fn test_pending_and_failed_transactions_are_skipped() {
        let mut pending = tx(2, TransactionKind::Buy, "BTC/USDT", 1.0, 10_000.0, 0.0);
        pending.status = TransactionStatus::Pending;
        let mut failed = tx(3, TransactionKind::Deposit, "USDT", 9_999.0, 1.0, 0.0);
        failed.status = TransactionStatus::Failed;

        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 100.0, 1.0, 0.0),
            pending,
            failed,
        ];
        let prices = snapshot(&[("BTC/USDT", 10_000.0)]);

        let portfolio = compute(&ledger, &prices, Utc::now()).unwrap();
        assert_eq!(portfolio.cash_balance, 100.0);
        assert!(portfolio.positions.is_empty());
    }

    #[test]
    fn test_non_quote_deposit_does_not_move_cash() {
        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 100.0, 1.0, 0.0),
            tx(2, TransactionKind::Deposit, "BTC", 1.0, 0.0, 0.0),
            tx(3, TransactionKind::Withdrawal, "BTC", 1.0, 0.0, 0.0),
        ];
        let prices = snapshot(&[]);

        let portfolio = compute(&ledger, &prices, Utc::now()).unwrap();
        assert_eq!(portfolio.cash_balance, 100.0);
    }

    #[test]
    fn test_totals_follow_prices() {
        let ledger = vec![
            tx(1, TransactionKind::Deposit, "USDT", 2_000.0, 1.0, 0.0),
            tx(2, TransactionKind::Buy, "BTC/USDT", 0.1, 10_000.0, 10.0),
        ];
        let prices = snapshot(&[("BTC/USDT", 11_000.0)]);

        let portfolio = compute(&ledger, &prices, Utc::now()).unwrap();
        let btc = portfolio.position("BTC/USDT").unwrap();

        assert!((btc.current_value.unwrap() - 1_100.0).abs() < 1e-9);
        assert!((btc.pnl.unwrap() - 90.0).abs() < 1e-9);
        assert!((portfolio.total_value - (990.0 + 1_100.0)).abs() < 1e-9);
        assert!((portfolio.total_cost - 1_010.0).abs() < 1e-9);
        assert!((portfolio.total_pnl - (portfolio.total_value - 1_010.0)).abs() < 1e-9);
    }
}
