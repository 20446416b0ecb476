//! Exchange adapters: one implementation per exchange export format.
//!
//! Every adapter maps a CSV row of its exchange to the canonical
//! [`RawFieldMapping`]. Adapters are stateless values; formats that spread a
//! trade over several rows thread an explicit [`ParserState`] through
//! [`ExchangeAdapter::parse`] instead of mutating themselves.

use crate::domain::{Decimal, RawFieldMapping, RawRow, Timestamp};
use crate::error::TradeError;
use crate::normalize::{Exclusion, RawTrade, SchemaViolation};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::io::BufRead;

pub mod binance;
pub mod bitfinex;
pub mod bittrex;
pub mod coinbase;
pub mod gemini;
pub mod kraken;
pub mod manual;
pub mod poloniex;

pub use binance::{BinanceAdapter, BinanceOrdersAdapter};
pub use bitfinex::BitfinexAdapter;
pub use bittrex::BittrexAdapter;
pub use coinbase::{CoinbaseAdapter, CoinbaseProAdapter};
pub use gemini::GeminiAdapter;
pub use kraken::KrakenAdapter;
pub use manual::ManualAdapter;
pub use poloniex::{LiquiAdapter, PoloniexAdapter};

/// Context carried from one row to the next by multi-row formats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserState {
    pub current_pair: Option<String>,
    pub current_direction: Option<String>,
}

/// What an adapter made of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Trade(RawFieldMapping),
    /// A row that carries no trade of its own (e.g. an order header).
    Skip,
    Error(TradeError),
}

impl From<Result<RawFieldMapping, TradeError>> for RowOutcome {
    fn from(result: Result<RawFieldMapping, TradeError>) -> Self {
        match result {
            Ok(mapping) => RowOutcome::Trade(mapping),
            Err(err) => RowOutcome::Error(err),
        }
    }
}

pub trait ExchangeAdapter: Send + Sync + fmt::Debug {
    /// Registry key and data directory name.
    fn name(&self) -> &'static str;

    /// Platform recorded on the trades this adapter produces.
    fn platform(&self) -> &'static str {
        self.name()
    }

    /// Preamble lines to skip before the CSV header.
    fn header_rows(&self) -> usize {
        0
    }

    /// Map one row. Returns the state for the next row alongside the outcome.
    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome);
}

/// Names of every registered adapter.
pub const EXCHANGES: [&str; 11] = [
    "binance",
    "binance_orders",
    "bitfinex",
    "bittrex",
    "coinbase",
    "coinbase_pro",
    "gemini",
    "kraken",
    "liqui",
    "manual",
    "poloniex",
];

/// Look up an adapter by exchange name.
pub fn adapter_for(name: &str) -> Option<Box<dyn ExchangeAdapter>> {
    let adapter: Box<dyn ExchangeAdapter> = match name {
        "binance" => Box::new(BinanceAdapter),
        "binance_orders" => Box::new(BinanceOrdersAdapter),
        "bitfinex" => Box::new(BitfinexAdapter),
        "bittrex" => Box::new(BittrexAdapter),
        "coinbase" => Box::new(CoinbaseAdapter),
        "coinbase_pro" => Box::new(CoinbaseProAdapter),
        "gemini" => Box::new(GeminiAdapter),
        "kraken" => Box::new(KrakenAdapter),
        "liqui" => Box::new(LiquiAdapter),
        "manual" => Box::new(ManualAdapter),
        "poloniex" => Box::new(PoloniexAdapter),
        _ => return None,
    };
    Some(adapter)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterOutput {
    pub trades: Vec<RawTrade>,
    pub rejected: Vec<Exclusion>,
}

/// Run `adapter` over `rows` in order, threading its parser state.
///
/// Row-level rejections are collected with their row. A schema error means
/// the export does not match the adapter and aborts the file.
pub fn run_adapter(
    adapter: &dyn ExchangeAdapter,
    rows: Vec<RawRow>,
) -> Result<AdapterOutput, SchemaViolation> {
    let mut output = AdapterOutput::default();
    let mut state = ParserState::default();

    for row in rows {
        let (next, outcome) = adapter.parse(&row, state);
        state = next;
        match outcome {
            RowOutcome::Trade(mapping) => output
                .trades
                .push(RawTrade::new(adapter.platform(), mapping.with_extras(row))),
            RowOutcome::Skip => {}
            RowOutcome::Error(error @ TradeError::Schema(_)) => {
                return Err(SchemaViolation {
                    exchange: adapter.name().to_string(),
                    raw: RawFieldMapping::new().with_extras(row),
                    error,
                })
            }
            RowOutcome::Error(error) => output.rejected.push(Exclusion {
                exchange: adapter.name().to_string(),
                raw: RawFieldMapping::new().with_extras(row),
                error,
            }),
        }
    }

    Ok(output)
}

/// Read CSV rows after skipping `header_rows` preamble lines.
///
/// Cells are trimmed, NUL bytes are dropped and blank rows are skipped.
pub fn read_rows<R: std::io::Read>(reader: R, header_rows: usize) -> Result<Vec<RawRow>, csv::Error> {
    let mut buf = std::io::BufReader::new(reader);
    let mut line = Vec::new();
    for _ in 0..header_rows {
        line.clear();
        buf.read_until(b'\n', &mut line)?;
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(buf);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.replace('\0', ""))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.replace('\0', "")))
            .collect();
        if row.values().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

// Shared cell helpers for the adapters.

/// A column the adapter relies on. Its absence means the file is not in the
/// format the adapter expects.
pub(crate) fn cell<'r>(row: &'r RawRow, column: &str) -> Result<&'r str, TradeError> {
    row.get(column)
        .map(|s| s.as_str())
        .ok_or_else(|| TradeError::Schema(format!("missing column: {}", column)))
}

/// The first of `columns` present in the row.
pub(crate) fn cell_any<'r>(row: &'r RawRow, columns: &[&str]) -> Result<&'r str, TradeError> {
    columns
        .iter()
        .find_map(|c| row.get(*c))
        .map(|s| s.as_str())
        .ok_or_else(|| TradeError::Schema(format!("missing column: one of {:?}", columns)))
}

/// Absolute decimal value of a cell. Exports sign quantities inconsistently.
pub(crate) fn abs_decimal(value: &str, column: &str) -> Result<Decimal, TradeError> {
    Decimal::from_str_canonical(value)
        .map(|d| d.abs())
        .map_err(|_| TradeError::Malformed(format!("{} is not a number: {:?}", column, value)))
}

/// Parse a timestamp trying each format; date-only formats give midnight.
pub(crate) fn parse_timestamp(value: &str, formats: &[&str]) -> Result<Timestamp, TradeError> {
    let value = value.trim();
    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Timestamp::new(dt));
        }
        if let Some(midnight) = NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(Timestamp::new(midnight));
        }
    }
    Err(TradeError::Malformed(format!(
        "unrecognized timestamp {:?}",
        value
    )))
}

/// Canonical mapping from already-parsed values.
pub(crate) fn mapping(
    timestamp: Timestamp,
    direction: &str,
    pair: String,
    amount: Decimal,
    fill_amount: Decimal,
    price: Decimal,
) -> RawFieldMapping {
    RawFieldMapping::new()
        .with_timestamp(timestamp)
        .with_text(RawFieldMapping::DIRECTION, direction.trim().to_ascii_lowercase())
        .with_text(RawFieldMapping::CURRENCY_PAIR, pair)
        .with_decimal(RawFieldMapping::AMOUNT, amount)
        .with_decimal(RawFieldMapping::FILL_AMOUNT, fill_amount)
        .with_decimal(RawFieldMapping::PRICE, price)
}

/// Split a concatenated symbol such as `ETHBTC` on the longest known quote.
pub(crate) fn split_on_quote(symbol: &str, quotes: &[&str]) -> Option<(String, String)> {
    let symbol = symbol.trim().to_ascii_uppercase();
    let mut quotes: Vec<&str> = quotes.to_vec();
    quotes.sort_by_key(|q| std::cmp::Reverse(q.len()));
    quotes.into_iter().find_map(|quote| {
        symbol
            .strip_suffix(quote)
            .filter(|base| !base.is_empty())
            .map(|base| (base.to_string(), quote.to_string()))
    })
}

/// Ticker renames applied across exchanges.
pub(crate) fn canonical_symbol(symbol: &str) -> String {
    match symbol.trim().to_ascii_uppercase().as_str() {
        "BCC" | "BCHABC" => "BCH".to_string(),
        "BCHSV" => "BSV".to_string(),
        "XBT" => "BTC".to_string(),
        "XDG" => "DOGE".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) fn row(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawValue;

    #[test]
    fn test_read_rows_skips_preamble_and_blank_rows() {
        let csv = "Transactions\nUser,x\n\nTimestamp,Asset\n2018-01-01T00:00:00Z,BTC\n,\n";
        let rows = read_rows(csv.as_bytes(), 3).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Asset"], "BTC");
    }

    #[test]
    fn test_read_rows_strips_nul_bytes() {
        let csv = "a,b\n1\0,2\n";
        let rows = read_rows(csv.as_bytes(), 0).unwrap();
        assert_eq!(rows[0]["a"], "1");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let ts = parse_timestamp("03/04/2018", &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y"]).unwrap();
        assert_eq!(ts, Timestamp::from_ymd(2018, 3, 4).unwrap());
        assert!(parse_timestamp("yesterday", &["%Y-%m-%d"]).is_err());
    }

    #[test]
    fn test_split_on_quote_prefers_longest() {
        let quotes = ["USDT", "TUSD", "BTC", "ETH"];
        assert_eq!(
            split_on_quote("ethusdt", &quotes),
            Some(("ETH".to_string(), "USDT".to_string()))
        );
        assert_eq!(
            split_on_quote("BTCTUSD", &quotes),
            Some(("BTC".to_string(), "TUSD".to_string()))
        );
        assert_eq!(split_on_quote("BTC", &quotes), None);
        assert_eq!(split_on_quote("ETHEUR", &quotes), None);
    }

    #[test]
    fn test_registry_covers_every_exchange() {
        for name in EXCHANGES {
            let adapter = adapter_for(name).unwrap();
            assert_eq!(adapter.name(), name);
        }
        assert!(adapter_for("mtgox").is_none());
    }

    #[test]
    fn test_run_adapter_collects_rejections_and_keeps_row() {
        let adapter = adapter_for("poloniex").unwrap();
        let rows = vec![
            row(&[
                ("Date", "2018-01-01 10:00:00"),
                ("Market", "ETH/BTC"),
                ("Type", "Buy"),
                ("Price", "0.05"),
                ("Amount", "2"),
                ("Total", "0.1"),
            ]),
            row(&[
                ("Date", "not a date"),
                ("Market", "ETH/BTC"),
                ("Type", "Buy"),
                ("Price", "0.05"),
                ("Amount", "2"),
                ("Total", "0.1"),
            ]),
        ];
        let out = run_adapter(adapter.as_ref(), rows).unwrap();
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].exchange, "poloniex");
        assert_eq!(out.trades[0].mapping.extras["Market"], "ETH/BTC");
        assert_eq!(
            out.trades[0].mapping.get(RawFieldMapping::CURRENCY_PAIR),
            Some(&RawValue::Text("ETH-BTC".to_string()))
        );
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].raw.extras["Date"], "not a date");
    }

    #[test]
    fn test_run_adapter_aborts_on_missing_column() {
        let adapter = adapter_for("kraken").unwrap();
        let err = run_adapter(adapter.as_ref(), vec![row(&[("when", "x")])]).unwrap_err();
        assert_eq!(err.exchange, "kraken");
    }
}
