//! Balance replay for diagnosing an oversold currency.
//!
//! When a disposal exceeds what is held, the cause is almost always a trade,
//! transfer or gift the user forgot to import. Replaying the stream with the
//! running balance after each event shows where the balance first goes short.

use crate::domain::{Decimal, LegEvent, LegKind, Platform, Timestamp};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceStep {
    pub timestamp: Timestamp,
    pub platform: Platform,
    pub kind: LegKind,
    pub amount: Decimal,
    /// Balance after this event. Negative only on the failing disposal.
    pub balance: Decimal,
}

/// Running balance after each of `legs[..=upto]`.
pub fn replay_balances(legs: &[LegEvent], upto: usize) -> Vec<BalanceStep> {
    let mut balance = Decimal::zero();
    legs.iter()
        .take(upto.saturating_add(1))
        .map(|leg| {
            match leg.kind {
                LegKind::Acquire => balance += leg.amount,
                LegKind::Dispose => balance -= leg.amount,
            }
            BalanceStep {
                timestamp: leg.timestamp,
                platform: leg.platform.clone(),
                kind: leg.kind,
                amount: leg.amount,
                balance,
            }
        })
        .collect()
}

/// Emit the replay as WARN log lines.
pub fn log_replay(currency: &str, steps: &[BalanceStep]) {
    tracing::warn!(currency, "re-creating the history of buys and sells");
    for step in steps {
        tracing::warn!(
            currency,
            date = %step.timestamp,
            event = %step.kind,
            amount = %step.amount,
            balance = %step.balance,
            platform = %step.platform,
            "balance replay"
        );
    }
}
