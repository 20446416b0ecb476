//! Per-currency LIFO lot matching.
//!
//! A disposal is matched against the most recently acquired lot first. The
//! matching loop is an explicit state machine so every branch can be driven
//! and checked on its own:
//!
//! - `Consuming { remaining }`: pop the newest lot and realize a fragment.
//! - `Residual { lot }`: the popped lot was larger than the fragment; its
//!   remainder goes back on the stack unchanged apart from the amount.
//! - `Exhausted`: the disposal is fully matched.

use crate::domain::{Currency, Decimal, LegEvent, LegKind, Lot, PnlRecord, RecordKind, Timestamp};
use crate::engine::replay::BalanceStep;
use chrono::Duration;
use thiserror::Error;

/// Minimum holding period for long-term treatment.
pub const LONG_TERM_DAYS: i64 = 365;

/// Unsold lots of one currency, newest last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LotStack {
    lots: Vec<Lot>,
}

impl LotStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, lot: Lot) {
        debug_assert!(lot.amount.is_positive(), "lots must hold a positive amount");
        self.lots.push(lot);
    }

    pub fn pop(&mut self) -> Option<Lot> {
        self.lots.pop()
    }

    /// Total quantity held across all lots.
    pub fn total(&self) -> Decimal {
        self.lots.iter().map(|l| l.amount).sum()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Lots from oldest to newest.
    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }
}

/// A disposal asked for more than the stack holds.
///
/// The trade history is incomplete: an acquisition or an import is missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "cannot dispose {requested} {currency} on {at} ({platform}): only {available} held; \
     a purchase, transfer or gift of {currency} is probably missing"
)]
pub struct LedgerExhaustionError {
    pub currency: Currency,
    pub at: Timestamp,
    pub platform: String,
    pub requested: Decimal,
    pub available: Decimal,
    /// Running balance after every event up to the failing one, when requested.
    pub replay: Option<Vec<BalanceStep>>,
}

/// A currency whose history cannot be matched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Exhausted(#[from] LedgerExhaustionError),

    #[error(
        "pnl of {amount} {currency} sold on {at} at basis {sell_basis} \
         against basis {buy_basis} overflows the decimal range"
    )]
    PnlOverflow {
        currency: Currency,
        at: Timestamp,
        amount: Decimal,
        buy_basis: Decimal,
        sell_basis: Decimal,
    },
}

impl LedgerError {
    pub fn currency(&self) -> &Currency {
        match self {
            LedgerError::Exhausted(e) => &e.currency,
            LedgerError::PnlOverflow { currency, .. } => currency,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Exhausted(_) => "ledger_exhausted",
            LedgerError::PnlOverflow { .. } => "pnl_overflow",
        }
    }

    pub fn replay(&self) -> Option<&[BalanceStep]> {
        match self {
            LedgerError::Exhausted(e) => e.replay.as_deref(),
            LedgerError::PnlOverflow { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchState {
    Consuming { remaining: Decimal },
    Residual { lot: Lot },
    Exhausted,
}

/// LIFO matcher for a single currency.
pub struct LifoMatcher {
    currency: Currency,
    stack: LotStack,
    records: Vec<PnlRecord>,
}

impl LifoMatcher {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            stack: LotStack::new(),
            records: Vec::new(),
        }
    }

    pub fn stack(&self) -> &LotStack {
        &self.stack
    }

    pub fn records(&self) -> &[PnlRecord] {
        &self.records
    }

    /// Apply one leg of this matcher's currency.
    pub fn process(&mut self, leg: &LegEvent) -> Result<(), LedgerError> {
        debug_assert_eq!(leg.currency, self.currency);
        match leg.kind {
            LegKind::Acquire => {
                self.acquire(leg);
                Ok(())
            }
            LegKind::Dispose => self.dispose(leg),
        }
    }

    fn acquire(&mut self, leg: &LegEvent) {
        if !leg.amount.is_positive() {
            tracing::debug!(currency = %self.currency, at = %leg.timestamp, "skipping empty acquisition");
            return;
        }

        self.stack.push(Lot {
            currency: self.currency.clone(),
            amount: leg.amount,
            basis: leg.basis,
            acquired_at: leg.timestamp,
            platform: leg.platform.clone(),
            currency_pair: leg.currency_pair.clone(),
        });

        self.records.push(PnlRecord {
            kind: RecordKind::Acquisition,
            currency: self.currency.clone(),
            currency_pair: leg.currency_pair.clone(),
            buy_date: leg.timestamp,
            sell_date: None,
            holding_duration: None,
            long_term: None,
            buy_platform: leg.platform.clone(),
            sell_platform: None,
            amount: leg.amount,
            buy_basis: leg.basis,
            sell_basis: None,
            pnl: None,
        });
    }

    fn dispose(&mut self, leg: &LegEvent) -> Result<(), LedgerError> {
        let available = self.stack.total();
        if leg.amount > available {
            return Err(LedgerExhaustionError {
                currency: self.currency.clone(),
                at: leg.timestamp,
                platform: leg.platform.to_string(),
                requested: leg.amount,
                available,
                replay: None,
            }
            .into());
        }

        let mut state = MatchState::Consuming {
            remaining: leg.amount,
        };
        while state != MatchState::Exhausted {
            state = self.step(state, leg)?;
        }
        Ok(())
    }

    /// Advance the matching state machine by one transition for `leg`.
    ///
    /// A fragment whose PnL overflows is an error and leaves the popped lot
    /// off the stack.
    pub fn step(&mut self, state: MatchState, leg: &LegEvent) -> Result<MatchState, LedgerError> {
        let next = match state {
            MatchState::Exhausted => MatchState::Exhausted,
            MatchState::Residual { lot } => {
                self.stack.push(lot);
                MatchState::Exhausted
            }
            MatchState::Consuming { remaining } => {
                if !remaining.is_positive() {
                    return Ok(MatchState::Exhausted);
                }
                // dispose() checked the total, so a lot is always available here.
                let Some(lot) = self.stack.pop() else {
                    return Ok(MatchState::Exhausted);
                };

                let matched = remaining.min(lot.amount);
                self.realize(leg, &lot, matched)?;

                if lot.amount > matched {
                    MatchState::Residual {
                        lot: lot.residual(lot.amount - matched),
                    }
                } else if remaining == matched {
                    MatchState::Exhausted
                } else {
                    MatchState::Consuming {
                        remaining: remaining - matched,
                    }
                }
            }
        };
        Ok(next)
    }

    fn realize(&mut self, leg: &LegEvent, lot: &Lot, matched: Decimal) -> Result<(), LedgerError> {
        let pnl = leg
            .basis
            .checked_sub(lot.basis)
            .and_then(|spread| matched.checked_mul(spread))
            .ok_or_else(|| LedgerError::PnlOverflow {
                currency: self.currency.clone(),
                at: leg.timestamp,
                amount: matched,
                buy_basis: lot.basis,
                sell_basis: leg.basis,
            })?;

        let held = leg.timestamp.since(lot.acquired_at);
        self.records.push(PnlRecord {
            kind: RecordKind::Disposal,
            currency: self.currency.clone(),
            currency_pair: leg.currency_pair.clone(),
            buy_date: lot.acquired_at,
            sell_date: Some(leg.timestamp),
            holding_duration: Some(held),
            long_term: Some(held >= Duration::days(LONG_TERM_DAYS)),
            buy_platform: lot.platform.clone(),
            sell_platform: Some(leg.platform.clone()),
            amount: matched,
            buy_basis: lot.basis,
            sell_basis: Some(leg.basis),
            pnl: Some(pnl),
        });
        Ok(())
    }

    /// Records in processing order and the lots still held.
    pub fn into_outputs(self) -> (Vec<PnlRecord>, LotStack) {
        (self.records, self.stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurrencyPair, Platform};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn leg(kind: LegKind, amount: &str, basis: &str, day: u32) -> LegEvent {
        LegEvent {
            currency: Currency::new("BTC"),
            kind,
            amount: d(amount),
            basis: d(basis),
            timestamp: Timestamp::from_ymd(2018, 1, day).unwrap(),
            platform: Platform::new("gemini"),
            currency_pair: CurrencyPair::parse("BTC-USD").unwrap(),
            seq: day as usize,
        }
    }

    fn matcher_with(lots: &[(&str, &str, u32)]) -> LifoMatcher {
        let mut m = LifoMatcher::new(Currency::new("BTC"));
        for (amount, basis, day) in lots {
            m.process(&leg(LegKind::Acquire, amount, basis, *day)).unwrap();
        }
        m
    }

    #[test]
    fn test_step_residual_when_lot_larger() {
        let mut m = matcher_with(&[("3", "10", 1)]);
        let sell = leg(LegKind::Dispose, "1", "15", 2);

        let next = m
            .step(MatchState::Consuming { remaining: d("1") }, &sell)
            .unwrap();
        match &next {
            MatchState::Residual { lot } => {
                assert_eq!(lot.amount, d("2"));
                assert_eq!(lot.basis, d("10"));
            }
            other => panic!("expected Residual, got {:?}", other),
        }
        assert!(m.stack().is_empty());

        let done = m.step(next, &sell).unwrap();
        assert_eq!(done, MatchState::Exhausted);
        assert_eq!(m.stack().total(), d("2"));
    }

    #[test]
    fn test_step_exhausted_on_exact_match() {
        let mut m = matcher_with(&[("1", "10", 1)]);
        let sell = leg(LegKind::Dispose, "1", "15", 2);
        let next = m
            .step(MatchState::Consuming { remaining: d("1") }, &sell)
            .unwrap();
        assert_eq!(next, MatchState::Exhausted);
        assert!(m.stack().is_empty());
    }

    #[test]
    fn test_step_keeps_consuming_across_lots() {
        let mut m = matcher_with(&[("1", "10", 1), ("1", "20", 2)]);
        let sell = leg(LegKind::Dispose, "1.5", "30", 3);
        let next = m
            .step(MatchState::Consuming { remaining: d("1.5") }, &sell)
            .unwrap();
        assert_eq!(next, MatchState::Consuming { remaining: d("0.5") });
        assert_eq!(m.stack().len(), 1);
    }

    #[test]
    fn test_step_exhausted_is_terminal() {
        let mut m = matcher_with(&[("1", "10", 1)]);
        let sell = leg(LegKind::Dispose, "1", "15", 2);
        assert_eq!(m.step(MatchState::Exhausted, &sell), Ok(MatchState::Exhausted));
        assert_eq!(m.stack().len(), 1);
    }

    #[test]
    fn test_zero_disposal_emits_nothing() {
        let mut m = matcher_with(&[("1", "10", 1)]);
        m.process(&leg(LegKind::Dispose, "0", "15", 2)).unwrap();
        assert_eq!(m.records().len(), 1);
        assert_eq!(m.stack().total(), d("1"));
    }

    #[test]
    fn test_oversell_leaves_stack_untouched() {
        let mut m = matcher_with(&[("1", "10", 1)]);
        let err = match m.process(&leg(LegKind::Dispose, "1.0000001", "15", 2)) {
            Err(LedgerError::Exhausted(err)) => err,
            other => panic!("expected exhaustion, got {:?}", other),
        };
        assert_eq!(err.requested, d("1.0000001"));
        assert_eq!(err.available, d("1"));
        assert_eq!(m.stack().total(), d("1"));
        assert!(m.stack().lots().iter().all(|l| l.amount.is_positive()));
    }

    #[test]
    fn test_pnl_overflow_is_an_error() {
        let mut m = matcher_with(&[("10", "1", 1)]);
        let err = m
            .process(&leg(LegKind::Dispose, "10", "70000000000000000000000000000", 2))
            .unwrap_err();
        assert_eq!(err.kind(), "pnl_overflow");
        assert_eq!(err.currency(), &Currency::new("BTC"));
        assert!(err.replay().is_none());
        assert_eq!(m.records().len(), 1);
    }

    #[test]
    fn test_large_pnl_within_range() {
        let mut m = matcher_with(&[("2", "0", 1)]);
        m.process(&leg(LegKind::Dispose, "2", "30000000000000000000000000000", 2))
            .unwrap();
        assert_eq!(
            m.records()[1].pnl,
            Some(d("60000000000000000000000000000"))
        );
    }

    #[test]
    fn test_acquisition_audit_record_has_no_pnl() {
        let m = matcher_with(&[("2", "10", 1)]);
        let rec = &m.records()[0];
        assert_eq!(rec.kind, RecordKind::Acquisition);
        assert_eq!(rec.pnl, None);
        assert_eq!(rec.sell_date, None);
        assert_eq!(rec.long_term, None);
    }
}
