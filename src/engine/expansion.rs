//! Dual-leg expansion: every trade acquires one currency and disposes another.

use crate::domain::{sort_legs_stable, Currency, Direction, LegEvent, LegKind, NormalizedTrade};
use std::collections::BTreeMap;

/// Split a trade into its two single-currency legs.
///
/// A buy acquires `currency` and disposes `fill_currency`; a sell is the
/// mirror. `seq` orders the trade within the input; its legs take `2*seq`
/// and `2*seq + 1`.
pub fn expand_trade(trade: &NormalizedTrade, seq: usize) -> [LegEvent; 2] {
    let base = |kind: LegKind, offset: usize| LegEvent {
        currency: trade.currency.clone(),
        kind,
        amount: trade.amount,
        basis: trade.basis,
        timestamp: trade.timestamp,
        platform: trade.platform.clone(),
        currency_pair: trade.currency_pair.clone(),
        seq: seq * 2 + offset,
    };
    let fill = |kind: LegKind, offset: usize| LegEvent {
        currency: trade.fill_currency.clone(),
        kind,
        amount: trade.fill_amount,
        basis: trade.fill_basis,
        timestamp: trade.timestamp,
        platform: trade.platform.clone(),
        currency_pair: trade.currency_pair.clone(),
        seq: seq * 2 + offset,
    };

    match trade.direction {
        Direction::Buy => [base(LegKind::Acquire, 0), fill(LegKind::Dispose, 1)],
        Direction::Sell => [base(LegKind::Dispose, 0), fill(LegKind::Acquire, 1)],
    }
}

/// Expand all trades and group the legs into per-currency, time-ordered streams.
///
/// USD legs are skipped: USD is the basis currency and holds no lots.
/// Zero-quantity legs (the fill side of a fork or airdrop) are skipped too.
pub fn expand_trades(trades: &[NormalizedTrade]) -> BTreeMap<Currency, Vec<LegEvent>> {
    let mut streams: BTreeMap<Currency, Vec<LegEvent>> = BTreeMap::new();

    for (seq, trade) in trades.iter().enumerate() {
        for leg in expand_trade(trade, seq) {
            if leg.currency.is_usd() || leg.amount.is_zero() {
                continue;
            }
            streams.entry(leg.currency.clone()).or_default().push(leg);
        }
    }

    for legs in streams.values_mut() {
        sort_legs_stable(legs);
    }
    streams
}
