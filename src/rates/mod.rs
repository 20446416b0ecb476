//! Immutable historical exchange-rate snapshot.
//!
//! A rate is expressed as units of a currency per 1 USD, so the USD value of
//! `amount` units is `amount / rate`. The table is loaded once before
//! normalization and only read afterwards.

use crate::domain::{Currency, Decimal, Timestamp};
use crate::error::TradeError;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Stablecoins pegged at 1 on every date that carries a BTC rate.
pub const USD_STABLECOINS: [&str; 6] = ["USDT", "USDC", "DAI", "TUSD", "GUSD", "PAX"];

#[derive(Debug, Error)]
pub enum RateTableError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid date {0:?}")]
    InvalidDate(String),
    #[error("invalid rate for {currency} on {date}: {value:?}")]
    InvalidRate {
        date: String,
        currency: String,
        value: String,
    },
}

/// Which timestamp resolution rate lookups use.
///
/// `Daily` resolves every trade against its calendar day, which can misprice
/// volatile same-day trades. `Hourly` prefers an hourly rate when the table
/// has one and falls back to the daily rate otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateGranularity {
    #[default]
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Default)]
pub struct RateTable {
    daily: BTreeMap<NaiveDate, HashMap<Currency, Decimal>>,
    hourly: BTreeMap<NaiveDateTime, HashMap<Currency, Decimal>>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_daily(&mut self, date: NaiveDate, currency: Currency, rate: Decimal) {
        self.daily.entry(date).or_default().insert(currency, rate);
    }

    pub fn insert_hourly(&mut self, hour: NaiveDateTime, currency: Currency, rate: Decimal) {
        self.hourly.entry(hour).or_default().insert(currency, rate);
    }

    pub fn with_daily(mut self, date: NaiveDate, currency: &str, rate: Decimal) -> Self {
        self.insert_daily(date, Currency::new(currency), rate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty() && self.hourly.is_empty()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.daily.keys().next_back().copied()
    }

    pub fn daily_rate(&self, date: NaiveDate, currency: &Currency) -> Option<Decimal> {
        self.daily.get(&date).and_then(|m| m.get(currency)).copied()
    }

    /// Rate of `currency` at `at`, resolved according to `granularity`.
    pub fn lookup(
        &self,
        currency: &Currency,
        at: Timestamp,
        granularity: RateGranularity,
    ) -> Result<Decimal, TradeError> {
        if granularity == RateGranularity::Hourly {
            if let Some(rate) = self
                .hourly
                .get(&at.hour_bucket())
                .and_then(|m| m.get(currency))
            {
                return Ok(*rate);
            }
        }

        self.daily_rate(at.date(), currency)
            .ok_or_else(|| TradeError::RateNotFound {
                currency: currency.clone(),
                date: at.date(),
            })
    }

    /// Load a `date,currency,rate` history.
    ///
    /// `date` is either `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`; the latter
    /// populates the hourly table.
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self, RateTableError> {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            date: String,
            currency: String,
            rate: String,
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut table = RateTable::new();
        for record in reader.deserialize::<Row>() {
            let row = record?;
            let rate = Decimal::from_str_canonical(&row.rate).map_err(|_| {
                RateTableError::InvalidRate {
                    date: row.date.clone(),
                    currency: row.currency.clone(),
                    value: row.rate.clone(),
                }
            })?;
            let currency = Currency::new(&row.currency);

            if let Ok(hour) = NaiveDateTime::parse_from_str(&row.date, "%Y-%m-%d %H:%M:%S") {
                table.insert_hourly(Timestamp::new(hour).hour_bucket(), currency, rate);
                continue;
            }

            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
                .map_err(|_| RateTableError::InvalidDate(row.date.clone()))?;
            let pegs_stablecoins = currency.as_str() == "BTC";
            table.insert_daily(date, currency, rate);
            if pegs_stablecoins {
                for coin in USD_STABLECOINS {
                    table.insert_daily(date, Currency::new(coin), Decimal::one());
                }
            }
        }

        tracing::debug!(
            days = table.daily.len(),
            hours = table.hourly.len(),
            "loaded exchange rates"
        );
        Ok(table)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RateTableError> {
        let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
        Self::from_csv_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    const CSV: &str = "date,currency,rate\n\
        2018-01-01,BTC,0.0000725\n\
        2018-01-01,ETH,0.00131\n\
        2018-01-02,ETH,0.00115\n\
        2018-01-02 14:00:00,ETH,0.0011\n";

    #[test]
    fn test_parse_daily_rates() {
        let table = RateTable::from_csv_reader(CSV.as_bytes()).unwrap();
        assert_eq!(
            table.daily_rate(date(2018, 1, 1), &Currency::new("ETH")),
            Some(dec("0.00131"))
        );
        assert_eq!(table.latest_date(), Some(date(2018, 1, 2)));
    }

    #[test]
    fn test_stablecoins_pegged_on_btc_dates() {
        let table = RateTable::from_csv_reader(CSV.as_bytes()).unwrap();
        for coin in USD_STABLECOINS {
            assert_eq!(
                table.daily_rate(date(2018, 1, 1), &Currency::new(coin)),
                Some(Decimal::one())
            );
        }
        // No BTC row on the 2nd, so no peg either.
        assert_eq!(table.daily_rate(date(2018, 1, 2), &Currency::new("USDT")), None);
    }

    #[test]
    fn test_lookup_daily_ignores_time_of_day() {
        let table = RateTable::from_csv_reader(CSV.as_bytes()).unwrap();
        let at = Timestamp::new(date(2018, 1, 2).and_hms_opt(14, 30, 0).unwrap());
        let rate = table
            .lookup(&Currency::new("ETH"), at, RateGranularity::Daily)
            .unwrap();
        assert_eq!(rate, dec("0.00115"));
    }

    #[test]
    fn test_lookup_hourly_prefers_hour_then_falls_back() {
        let table = RateTable::from_csv_reader(CSV.as_bytes()).unwrap();
        let in_hour = Timestamp::new(date(2018, 1, 2).and_hms_opt(14, 30, 0).unwrap());
        let other_hour = Timestamp::new(date(2018, 1, 2).and_hms_opt(9, 0, 0).unwrap());
        let eth = Currency::new("ETH");

        assert_eq!(
            table.lookup(&eth, in_hour, RateGranularity::Hourly).unwrap(),
            dec("0.0011")
        );
        assert_eq!(
            table.lookup(&eth, other_hour, RateGranularity::Hourly).unwrap(),
            dec("0.00115")
        );
    }

    #[test]
    fn test_lookup_missing_is_rate_not_found() {
        let table = RateTable::from_csv_reader(CSV.as_bytes()).unwrap();
        let at = Timestamp::from_ymd(2019, 6, 1).unwrap();
        let err = table
            .lookup(&Currency::new("ETH"), at, RateGranularity::Daily)
            .unwrap_err();
        assert_eq!(
            err,
            TradeError::RateNotFound {
                currency: Currency::new("ETH"),
                date: date(2019, 6, 1),
            }
        );
    }

    #[test]
    fn test_invalid_rate_errors() {
        let csv = "date,currency,rate\n2018-01-01,BTC,abc\n";
        let err = RateTable::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, RateTableError::InvalidRate { .. }));
    }

    #[test]
    fn test_invalid_date_errors() {
        let csv = "date,currency,rate\n01/02/2018,BTC,1\n";
        let err = RateTable::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, RateTableError::InvalidDate(_)));
    }
}
