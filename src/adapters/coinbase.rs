//! Coinbase retail and Coinbase Pro fill exports.

use super::{abs_decimal, cell, mapping, parse_timestamp, ExchangeAdapter, ParserState, RowOutcome};
use crate::domain::{RawFieldMapping, RawRow};
use crate::error::TradeError;

/// Coinbase retail transaction history. Only USD buys and sells are trades.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinbaseAdapter;

impl CoinbaseAdapter {
    fn parse_row(&self, row: &RawRow) -> Result<RawFieldMapping, TradeError> {
        let kind = cell(row, "Transaction Type")?.to_ascii_lowercase();
        match kind.as_str() {
            "buy" | "sell" => {}
            "trade" => {
                return Err(TradeError::Unsupported(format!(
                    "crypto-to-crypto conversions must be entered as manual trades: {}",
                    row.get("Notes").map(String::as_str).unwrap_or_default()
                )))
            }
            other => {
                return Err(TradeError::NotATrade(format!(
                    "coinbase transaction type {:?}",
                    other
                )))
            }
        }

        let timestamp = parse_timestamp(cell(row, "Timestamp")?, &["%Y-%m-%dT%H:%M:%SZ"])?;
        let asset = cell(row, "Asset")?.to_ascii_uppercase();
        Ok(mapping(
            timestamp,
            &kind,
            format!("{}-USD", asset),
            abs_decimal(cell(row, "Quantity Transacted")?, "Quantity Transacted")?,
            abs_decimal(
                cell(row, "USD Total (inclusive of fees)")?,
                "USD Total (inclusive of fees)",
            )?,
            abs_decimal(
                cell(row, "USD Spot Price at Transaction")?,
                "USD Spot Price at Transaction",
            )?,
        ))
    }
}

impl ExchangeAdapter for CoinbaseAdapter {
    fn name(&self) -> &'static str {
        "coinbase"
    }

    fn header_rows(&self) -> usize {
        7
    }

    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome) {
        (state, self.parse_row(row).into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoinbaseProAdapter;

impl CoinbaseProAdapter {
    fn parse_row(&self, row: &RawRow) -> Result<RawFieldMapping, TradeError> {
        let timestamp = parse_timestamp(cell(row, "created at")?, &["%Y-%m-%dT%H:%M:%S%.fZ"])?;
        Ok(mapping(
            timestamp,
            cell(row, "side")?,
            cell(row, "product")?.to_ascii_uppercase(),
            abs_decimal(cell(row, "size")?, "size")?,
            abs_decimal(cell(row, "total")?, "total")?,
            abs_decimal(cell(row, "price")?, "price")?,
        ))
    }
}

impl ExchangeAdapter for CoinbaseProAdapter {
    fn name(&self) -> &'static str {
        "coinbase_pro"
    }

    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome) {
        (state, self.parse_row(row).into())
    }
}
