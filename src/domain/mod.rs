//! Domain types for the tax-lot ledger.
//!
//! This module provides:
//! - Exact numeric handling via the Decimal wrapper
//! - Domain primitives: Timestamp, Currency, CurrencyPair, Platform, Direction
//! - The raw field mapping exchanged between adapters and the normalizer
//! - NormalizedTrade, Lot, LegEvent and PnlRecord
//! - Stable leg ordering for deterministic processing

pub mod decimal;
pub mod lot;
pub mod ordering;
pub mod primitives;
pub mod raw;
pub mod trade;

pub use decimal::Decimal;
pub use lot::{LegEvent, LegKind, Lot, PnlRecord, RecordKind};
pub use ordering::{sort_legs_stable, LegOrderingKey};
pub use primitives::{Currency, CurrencyPair, Direction, PairParseError, Platform, Timestamp};
pub use raw::{RawFieldMapping, RawRow, RawValue};
pub use trade::NormalizedTrade;
