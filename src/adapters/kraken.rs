//! Kraken trade ledger export.
//!
//! Kraken names assets with its own four-letter codes (`XXBT`, `XETH`,
//! `ZUSD`) and concatenates them into pairs such as `XETHXXBT`.

use super::{
    abs_decimal, canonical_symbol, cell, mapping, parse_timestamp, split_on_quote,
    ExchangeAdapter, ParserState, RowOutcome,
};
use crate::domain::{RawFieldMapping, RawRow};
use crate::error::TradeError;

const QUOTES: [&str; 8] = ["USDT", "USDC", "USD", "EUR", "GBP", "CAD", "XBT", "ETH"];

#[derive(Debug, Clone, Copy, Default)]
pub struct KrakenAdapter;

impl KrakenAdapter {
    fn parse_row(&self, row: &RawRow) -> Result<RawFieldMapping, TradeError> {
        let timestamp = parse_timestamp(
            cell(row, "time")?,
            &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"],
        )?;
        Ok(mapping(
            timestamp,
            cell(row, "type")?,
            kraken_pair(cell(row, "pair")?)?,
            abs_decimal(cell(row, "vol")?, "vol")?,
            abs_decimal(cell(row, "cost")?, "cost")?,
            abs_decimal(cell(row, "price")?, "price")?,
        ))
    }
}

/// `XETHXXBT` -> `ETH-BTC`, `XXBTZUSD` -> `BTC-USD`, `DOTUSD` -> `DOT-USD`.
fn kraken_pair(pair: &str) -> Result<String, TradeError> {
    let pair = pair.trim().to_ascii_uppercase();
    let prefixed = |code: &str| code.starts_with('X') || code.starts_with('Z');

    let (base, quote) = if pair.is_ascii() && pair.len() == 8 && prefixed(&pair[..4]) && prefixed(&pair[4..]) {
        (pair[1..4].to_string(), pair[5..].to_string())
    } else {
        split_on_quote(&pair, &QUOTES)
            .ok_or_else(|| TradeError::Malformed(format!("unrecognized kraken pair {:?}", pair)))?
    };
    Ok(format!("{}-{}", canonical_symbol(&base), canonical_symbol(&quote)))
}

impl ExchangeAdapter for KrakenAdapter {
    fn name(&self) -> &'static str {
        "kraken"
    }

    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome) {
        (state, self.parse_row(row).into())
    }
}
