//! Trade normalization: validates raw field mappings and derives USD fields.
//!
//! This module provides:
//! - Schema checks on the canonical field set (SchemaError)
//! - Currency legs, native USD value, basis and fill basis
//! - The small-trade filter with its zero-cost allowlist
//! - Batch normalization that surfaces every exclusion with its record

use crate::domain::{
    Currency, CurrencyPair, Decimal, Direction, NormalizedTrade, Platform, RawFieldMapping,
    RawValue, Timestamp,
};
use crate::error::TradeError;
use crate::rates::{RateGranularity, RateTable};
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

/// Platforms whose trades legitimately have a near-zero side.
pub const ZERO_COST_PLATFORMS: [&str; 4] = ["fork", "ico", "airdrop", "gift"];

/// Default dust threshold below which either side of a trade is excluded.
pub const DEFAULT_SMALL_TRADE_THRESHOLD: &str = "0.0000001";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerSettings {
    pub small_trade_threshold: Decimal,
    pub rate_granularity: RateGranularity,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            small_trade_threshold: Decimal::from_str(DEFAULT_SMALL_TRADE_THRESHOLD)
                .unwrap_or_default(),
            rate_granularity: RateGranularity::Daily,
        }
    }
}

/// A mapping produced by an adapter, tagged with the exchange it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTrade {
    pub exchange: String,
    pub mapping: RawFieldMapping,
}

impl RawTrade {
    pub fn new(exchange: impl Into<String>, mapping: RawFieldMapping) -> Self {
        Self {
            exchange: exchange.into(),
            mapping,
        }
    }
}

/// A record left out of the ledger, with the reason and the record itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub exchange: String,
    pub raw: RawFieldMapping,
    pub error: TradeError,
}

/// An adapter emitted a mapping without the canonical fields.
#[derive(Debug, Clone, Error)]
#[error("adapter {exchange} produced an unusable mapping ({error}): {}", .raw.describe())]
pub struct SchemaViolation {
    pub exchange: String,
    pub raw: RawFieldMapping,
    pub error: TradeError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub trades: Vec<NormalizedTrade>,
    pub exclusions: Vec<Exclusion>,
}

pub struct Normalizer<'a> {
    rates: &'a RateTable,
    settings: NormalizerSettings,
}

impl<'a> Normalizer<'a> {
    pub fn new(rates: &'a RateTable, settings: NormalizerSettings) -> Self {
        Self { rates, settings }
    }

    /// Normalize one mapping from `exchange`.
    pub fn normalize(
        &self,
        raw: &RawFieldMapping,
        exchange: &str,
    ) -> Result<NormalizedTrade, TradeError> {
        let timestamp = required_timestamp(raw)?;
        let amount = required_decimal(raw, RawFieldMapping::AMOUNT)?;
        let fill_amount = required_decimal(raw, RawFieldMapping::FILL_AMOUNT)?;
        let price = required_decimal(raw, RawFieldMapping::PRICE)?;
        let pair_text = required_text(raw, RawFieldMapping::CURRENCY_PAIR)?;
        let direction_text = required_text(raw, RawFieldMapping::DIRECTION)?;

        let direction = Direction::parse(direction_text).ok_or_else(|| {
            TradeError::NotATrade(format!("direction {:?} is not buy or sell", direction_text))
        })?;
        let currency_pair = CurrencyPair::parse(pair_text)
            .map_err(|e| TradeError::Schema(e.to_string()))?;

        if amount.is_negative() || fill_amount.is_negative() {
            return Err(TradeError::Malformed(format!(
                "negative quantity: amount={}, fill_amount={}",
                amount, fill_amount
            )));
        }

        let platform = match raw.get(RawFieldMapping::PLATFORM) {
            Some(RawValue::Text(p)) if !p.trim().is_empty() => Platform::new(p.as_str()),
            Some(RawValue::Text(_)) | None => Platform::new(exchange),
            Some(other) => {
                return Err(TradeError::Schema(format!(
                    "platform should be text, got {}",
                    other.type_name()
                )))
            }
        };

        let currency = currency_pair.base.clone();
        let fill_currency = currency_pair.quote.clone();
        let native_value = self.native_value(fill_amount, &fill_currency, timestamp)?;

        self.check_size(amount, fill_amount, &platform)?;

        let basis = native_value.checked_div(amount).ok_or_else(|| {
            TradeError::Malformed(format!(
                "basis overflows: {} USD over {} {} (fill {} {})",
                native_value, amount, currency, fill_amount, fill_currency
            ))
        })?;
        let fill_basis = native_value
            .checked_div(fill_amount)
            .unwrap_or_else(Decimal::zero);

        let trade_key = NormalizedTrade::compute_trade_key(
            timestamp,
            &platform,
            direction,
            &currency_pair,
            &amount,
            &fill_amount,
            &price,
        );

        Ok(NormalizedTrade {
            trade_key,
            timestamp,
            platform,
            direction,
            currency_pair,
            amount,
            fill_amount,
            price,
            currency,
            fill_currency,
            fill_type: direction.opposite(),
            native_value,
            native_currency: Currency::usd(),
            basis,
            fill_basis,
        })
    }

    /// Normalize a batch, collecting every per-row failure.
    ///
    /// A schema violation aborts the batch: it means an adapter is broken and
    /// every row it produced is suspect.
    pub fn normalize_batch<I>(&self, raws: I) -> Result<NormalizationReport, SchemaViolation>
    where
        I: IntoIterator<Item = RawTrade>,
    {
        let mut report = NormalizationReport::default();
        for raw in raws {
            match self.normalize(&raw.mapping, &raw.exchange) {
                Ok(trade) => report.trades.push(trade),
                Err(error @ TradeError::Schema(_)) => {
                    return Err(SchemaViolation {
                        exchange: raw.exchange,
                        raw: raw.mapping,
                        error,
                    })
                }
                Err(error) => {
                    tracing::debug!(exchange = %raw.exchange, %error, "excluded record");
                    report.exclusions.push(Exclusion {
                        exchange: raw.exchange,
                        raw: raw.mapping,
                        error,
                    });
                }
            }
        }
        Ok(report)
    }

    /// USD value of the fill side.
    fn native_value(
        &self,
        fill_amount: Decimal,
        fill_currency: &Currency,
        at: Timestamp,
    ) -> Result<Decimal, TradeError> {
        if fill_currency.is_usd() {
            return Ok(fill_amount);
        }
        let rate = self
            .rates
            .lookup(fill_currency, at, self.settings.rate_granularity)?;
        if rate.is_zero() {
            return Err(TradeError::Malformed(format!(
                "zero {} rate on {}",
                fill_currency,
                at.date()
            )));
        }
        fill_amount.checked_div(rate).ok_or_else(|| {
            TradeError::Malformed(format!(
                "USD value of {} {} at rate {} on {} overflows",
                fill_amount,
                fill_currency,
                rate,
                at.date()
            ))
        })
    }

    fn check_size(
        &self,
        amount: Decimal,
        fill_amount: Decimal,
        platform: &Platform,
    ) -> Result<(), TradeError> {
        let threshold = self.settings.small_trade_threshold;
        let too_small = amount < threshold || fill_amount < threshold;
        let allowlisted = ZERO_COST_PLATFORMS.contains(&platform.as_str());

        // The allowlist covers the fill side only; a lot needs a positive amount.
        if (too_small && !allowlisted) || amount.is_zero() {
            return Err(TradeError::TradeTooSmall {
                amount,
                fill_amount,
            });
        }
        Ok(())
    }
}

fn required<'m>(raw: &'m RawFieldMapping, key: &str) -> Result<&'m RawValue, TradeError> {
    raw.get(key)
        .ok_or_else(|| TradeError::Schema(format!("missing field: {}", key)))
}

fn mistyped(key: &str, expected: &str, got: &RawValue) -> TradeError {
    TradeError::Schema(format!(
        "{} should be {}, got {}",
        key,
        expected,
        got.type_name()
    ))
}

fn required_timestamp(raw: &RawFieldMapping) -> Result<Timestamp, TradeError> {
    match required(raw, RawFieldMapping::TIMESTAMP)? {
        RawValue::Timestamp(t) => Ok(*t),
        other => Err(mistyped(RawFieldMapping::TIMESTAMP, "timestamp", other)),
    }
}

fn required_decimal(raw: &RawFieldMapping, key: &str) -> Result<Decimal, TradeError> {
    match required(raw, key)? {
        RawValue::Decimal(d) => Ok(*d),
        other => Err(mistyped(key, "decimal", other)),
    }
}

fn required_text<'m>(raw: &'m RawFieldMapping, key: &str) -> Result<&'m str, TradeError> {
    match required(raw, key)? {
        RawValue::Text(s) => Ok(s.as_str()),
        other => Err(mistyped(key, "text", other)),
    }
}
