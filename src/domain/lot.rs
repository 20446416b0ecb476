//! Lots, leg events and PnL records: the ledger's units of account.

use crate::domain::{Currency, CurrencyPair, Decimal, Platform, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// An unconsumed quantity of one currency with a known basis and date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub currency: Currency,
    /// Always > 0.
    pub amount: Decimal,
    /// USD per unit at acquisition.
    pub basis: Decimal,
    pub acquired_at: Timestamp,
    pub platform: Platform,
    pub currency_pair: CurrencyPair,
}

impl Lot {
    /// A copy of this lot holding `amount`, with date, basis and origin unchanged.
    pub fn residual(&self, amount: Decimal) -> Lot {
        Lot {
            amount,
            ..self.clone()
        }
    }
}

/// Whether a leg adds to or removes from holdings of its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegKind {
    Acquire,
    Dispose,
}

impl std::fmt::Display for LegKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegKind::Acquire => write!(f, "acquire"),
            LegKind::Dispose => write!(f, "dispose"),
        }
    }
}

/// One single-currency side of a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegEvent {
    pub currency: Currency,
    pub kind: LegKind,
    pub amount: Decimal,
    pub basis: Decimal,
    pub timestamp: Timestamp,
    pub platform: Platform,
    pub currency_pair: CurrencyPair,
    /// Position in the input stream; breaks timestamp ties.
    pub seq: usize,
}

/// Distinguishes the acquisition audit trail from realized disposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Acquisition,
    Disposal,
}

/// One row of the PnL ledger.
///
/// Disposal records are one per (disposal fragment, lot) match. Acquisition
/// records only trace when a lot was opened; their sell-side fields and `pnl`
/// are `None` and they never contribute to totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnlRecord {
    pub kind: RecordKind,
    pub currency: Currency,
    pub currency_pair: CurrencyPair,
    pub buy_date: Timestamp,
    pub sell_date: Option<Timestamp>,
    pub holding_duration: Option<Duration>,
    pub long_term: Option<bool>,
    pub buy_platform: Platform,
    pub sell_platform: Option<Platform>,
    pub amount: Decimal,
    pub buy_basis: Decimal,
    pub sell_basis: Option<Decimal>,
    pub pnl: Option<Decimal>,
}

impl PnlRecord {
    pub fn is_disposal(&self) -> bool {
        self.kind == RecordKind::Disposal
    }
}
