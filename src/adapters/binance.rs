//! Binance trade history and order history exports.

use super::{
    abs_decimal, canonical_symbol, cell, mapping, parse_timestamp, split_on_quote,
    ExchangeAdapter, ParserState, RowOutcome,
};
use crate::domain::{RawFieldMapping, RawRow};
use crate::error::TradeError;

/// Quote assets of Binance markets. `USD` itself is never a Binance quote.
const QUOTES: [&str; 7] = ["USDC", "USDT", "TUSD", "BUSD", "DAI", "BTC", "ETH"];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `ETHBTC` -> `ETH-BTC`, `BCCUSDT` -> `BCH-USDT`.
fn binance_pair(market: &str) -> Result<String, TradeError> {
    let (base, quote) = split_on_quote(market, &QUOTES).ok_or_else(|| {
        TradeError::Malformed(format!(
            "binance market {:?} does not end in one of {:?}",
            market, QUOTES
        ))
    })?;
    Ok(format!("{}-{}", canonical_symbol(&base), quote))
}

/// Trade history: one row per fill.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceAdapter;

impl BinanceAdapter {
    fn parse_row(&self, row: &RawRow) -> Result<RawFieldMapping, TradeError> {
        let timestamp = parse_timestamp(cell(row, "Date(UTC)")?, &[DATE_FORMAT])?;
        Ok(mapping(
            timestamp,
            cell(row, "Type")?,
            binance_pair(cell(row, "Market")?)?,
            abs_decimal(cell(row, "Amount")?, "Amount")?,
            abs_decimal(cell(row, "Total")?, "Total")?,
            abs_decimal(cell(row, "Price")?, "Price")?,
        ))
    }
}

impl ExchangeAdapter for BinanceAdapter {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome) {
        (state, self.parse_row(row).into())
    }
}

/// Order history: an order row carrying `Pair` and `Side`, followed by its
/// fill rows, which leave both blank and carry `Date(UTC)`, `Price`,
/// `Executed` (base quantity) and `Amount` (quote total).
#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceOrdersAdapter;

impl BinanceOrdersAdapter {
    fn fill(&self, row: &RawRow, state: &ParserState) -> Result<RawFieldMapping, TradeError> {
        let (Some(pair), Some(side)) = (&state.current_pair, &state.current_direction) else {
            return Err(TradeError::Malformed(
                "fill row without a preceding order row".to_string(),
            ));
        };
        let timestamp = parse_timestamp(cell(row, "Date(UTC)")?, &[DATE_FORMAT])?;
        Ok(mapping(
            timestamp,
            side,
            binance_pair(pair)?,
            abs_decimal(cell(row, "Executed")?, "Executed")?,
            abs_decimal(cell(row, "Amount")?, "Amount")?,
            abs_decimal(cell(row, "Price")?, "Price")?,
        ))
    }
}

impl ExchangeAdapter for BinanceOrdersAdapter {
    fn name(&self) -> &'static str {
        "binance_orders"
    }

    fn platform(&self) -> &'static str {
        "binance"
    }

    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome) {
        let pair = match cell(row, "Pair") {
            Ok(pair) => pair,
            Err(err) => return (state, RowOutcome::Error(err)),
        };

        if pair.is_empty() {
            let outcome: RowOutcome = self.fill(row, &state).into();
            return (state, outcome);
        }

        let next = ParserState {
            current_pair: Some(pair.to_string()),
            current_direction: row.get("Side").map(|s| s.to_ascii_lowercase()),
        };
        (next, RowOutcome::Skip)
    }
}
