//! Slash-separated market exports: Poloniex and Liqui.

use super::{
    abs_decimal, canonical_symbol, cell, mapping, parse_timestamp, ExchangeAdapter, ParserState,
    RowOutcome,
};
use crate::domain::{RawFieldMapping, RawRow};
use crate::error::TradeError;

/// `ETH/BTC` -> `ETH-BTC`, applying ticker renames to the base.
pub(crate) fn slash_pair(market: &str) -> Result<String, TradeError> {
    match market.trim().split_once('/') {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() => Ok(format!(
            "{}-{}",
            canonical_symbol(base),
            quote.trim().to_ascii_uppercase()
        )),
        _ => Err(TradeError::Malformed(format!(
            "market {:?} is not BASE/QUOTE",
            market
        ))),
    }
}

/// Columns shared by both exchanges; only the date format differs.
fn market_row(row: &RawRow, date_format: &str) -> Result<RawFieldMapping, TradeError> {
    let timestamp = parse_timestamp(cell(row, "Date")?, &[date_format])?;
    Ok(mapping(
        timestamp,
        cell(row, "Type")?,
        slash_pair(cell(row, "Market")?)?,
        abs_decimal(cell(row, "Amount")?, "Amount")?,
        abs_decimal(cell(row, "Total")?, "Total")?,
        abs_decimal(cell(row, "Price")?, "Price")?,
    ))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PoloniexAdapter;

impl ExchangeAdapter for PoloniexAdapter {
    fn name(&self) -> &'static str {
        "poloniex"
    }

    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome) {
        (state, market_row(row, "%Y-%m-%d %H:%M:%S").into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LiquiAdapter;

impl ExchangeAdapter for LiquiAdapter {
    fn name(&self) -> &'static str {
        "liqui"
    }

    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome) {
        (state, market_row(row, "%d.%m.%Y %H:%M:%S").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::row;
    use crate::domain::{RawValue, Timestamp};

    #[test]
    fn test_slash_pair_renames() {
        assert_eq!(slash_pair("BCHSV/BTC").unwrap(), "BSV-BTC");
        assert_eq!(slash_pair("BCHABC/BTC").unwrap(), "BCH-BTC");
        assert_eq!(slash_pair("STR/USDT").unwrap(), "STR-USDT");
        assert!(slash_pair("ETHBTC").is_err());
    }

    #[test]
    fn test_liqui_date_format() {
        let r = row(&[
            ("Date", "15.03.2018 00:00:00"),
            ("Market", "ETH/BTC"),
            ("Type", "Sell"),
            ("Price", "0.07"),
            ("Amount", "1"),
            ("Total", "0.07"),
        ]);
        let (state, outcome) = LiquiAdapter.parse(&r, ParserState::default());
        assert_eq!(state, ParserState::default());
        match outcome {
            RowOutcome::Trade(m) => assert_eq!(
                m.get(RawFieldMapping::TIMESTAMP),
                Some(&RawValue::Timestamp(Timestamp::from_ymd(2018, 3, 15).unwrap()))
            ),
            other => panic!("expected a trade, got {:?}", other),
        }
    }
}
