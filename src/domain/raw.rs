//! Loosely typed records exchanged between adapters and the normalizer.

use crate::domain::{Decimal, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;

/// One CSV row as exported by an exchange: header name -> cell text.
pub type RawRow = BTreeMap<String, String>;

/// A single value in a [`RawFieldMapping`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Timestamp(Timestamp),
    Decimal(Decimal),
    Text(String),
}

impl RawValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Timestamp(_) => "timestamp",
            RawValue::Decimal(_) => "decimal",
            RawValue::Text(_) => "text",
        }
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Timestamp(t) => write!(f, "{}", t),
            RawValue::Decimal(d) => write!(f, "{}", d),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Canonical field set produced by an exchange adapter for one trade.
///
/// Required keys: `timestamp`, `amount`, `fill_amount`, `price`,
/// `currency_pair`, `direction`. Optional: `platform`. Every other column of
/// the source row is kept in `extras` for error reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawFieldMapping {
    pub fields: BTreeMap<String, RawValue>,
    pub extras: RawRow,
}

impl RawFieldMapping {
    pub const TIMESTAMP: &'static str = "timestamp";
    pub const AMOUNT: &'static str = "amount";
    pub const FILL_AMOUNT: &'static str = "fill_amount";
    pub const PRICE: &'static str = "price";
    pub const CURRENCY_PAIR: &'static str = "currency_pair";
    pub const DIRECTION: &'static str = "direction";
    pub const PLATFORM: &'static str = "platform";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp(mut self, ts: Timestamp) -> Self {
        self.fields
            .insert(Self::TIMESTAMP.to_string(), RawValue::Timestamp(ts));
        self
    }

    pub fn with_decimal(mut self, key: &str, value: Decimal) -> Self {
        self.fields.insert(key.to_string(), RawValue::Decimal(value));
        self
    }

    pub fn with_text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.to_string(), RawValue::Text(value.into()));
        self
    }

    pub fn with_extras(mut self, extras: RawRow) -> Self {
        self.extras = extras;
        self
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    /// Render the mapping as a single line for error reports.
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
