//! Runs the LIFO matcher over every currency stream.

use crate::domain::{Currency, LegEvent, Lot, PnlRecord};
use crate::engine::lifo::{LedgerError, LifoMatcher, LotStack};
use crate::engine::replay::{log_replay, replay_balances};
use std::collections::BTreeMap;

/// Outputs of one currency's completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyLedger {
    pub currency: Currency,
    pub records: Vec<PnlRecord>,
    /// Lots still held at the end of the history.
    pub remaining: LotStack,
}

/// Results across currencies. A failed currency does not stop the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerRun {
    pub ledgers: BTreeMap<Currency, CurrencyLedger>,
    pub failures: BTreeMap<Currency, LedgerError>,
}

impl LedgerRun {
    /// All PnL records, grouped by currency in symbol order.
    pub fn records(&self) -> impl Iterator<Item = &PnlRecord> {
        self.ledgers.values().flat_map(|l| l.records.iter())
    }

    /// All unsold lots, grouped by currency in symbol order.
    pub fn remaining_lots(&self) -> impl Iterator<Item = &Lot> {
        self.ledgers.values().flat_map(|l| l.remaining.lots().iter())
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Match one currency's time-ordered legs.
///
/// With `replay` set, an exhaustion error carries the running balance up to
/// and including the failing disposal.
pub fn run_currency(
    currency: &Currency,
    legs: &[LegEvent],
    replay: bool,
) -> Result<CurrencyLedger, LedgerError> {
    let mut matcher = LifoMatcher::new(currency.clone());

    for (idx, leg) in legs.iter().enumerate() {
        if let Err(mut err) = matcher.process(leg) {
            if let LedgerError::Exhausted(exhausted) = &mut err {
                if replay {
                    exhausted.replay = Some(replay_balances(legs, idx));
                }
            }
            return Err(err);
        }
    }

    let (records, remaining) = matcher.into_outputs();
    Ok(CurrencyLedger {
        currency: currency.clone(),
        records,
        remaining,
    })
}

/// Match every currency stream. Streams are independent; each is processed
/// sequentially in its own order.
pub fn run_ledger(streams: &BTreeMap<Currency, Vec<LegEvent>>, replay: bool) -> LedgerRun {
    let mut run = LedgerRun::default();

    for (currency, legs) in streams {
        tracing::debug!(%currency, events = legs.len(), "calculating LIFO");
        match run_currency(currency, legs, replay) {
            Ok(ledger) => {
                run.ledgers.insert(currency.clone(), ledger);
            }
            Err(err) => {
                tracing::warn!(%currency, kind = err.kind(), error = %err, "ledger failed");
                if let Some(steps) = err.replay() {
                    log_replay(currency.as_str(), steps);
                }
                run.failures.insert(currency.clone(), err);
            }
        }
    }

    run
}
