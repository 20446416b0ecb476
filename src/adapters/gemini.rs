//! Gemini transaction history.
//!
//! Dates are spreadsheet serial numbers and amounts live in per-currency
//! columns (`BTC Amount`, `USD Amount`) formatted for display.

use super::{cell, mapping, ExchangeAdapter, ParserState, RowOutcome};
use crate::domain::{Decimal, RawFieldMapping, RawRow, Timestamp};
use crate::error::TradeError;
use chrono::{Duration, NaiveDate};

/// Offset applied to the export's serial dates to bring them to UTC.
const EXPORT_UTC_OFFSET_HOURS: i64 = -7;

#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiAdapter;

impl GeminiAdapter {
    fn parse_row(&self, row: &RawRow) -> Result<RawFieldMapping, TradeError> {
        let kind = cell(row, "Type")?.to_ascii_lowercase();
        if kind != "buy" && kind != "sell" {
            return Err(TradeError::NotATrade(format!("gemini type {:?}", kind)));
        }

        let timestamp = serial_date(cell(row, "Date")?)?;
        let symbol = cell(row, "Symbol")?.trim().to_ascii_uppercase();
        if symbol.len() < 4 || !symbol.is_ascii() {
            return Err(TradeError::Malformed(format!("symbol {:?}", symbol)));
        }
        let (base, quote) = symbol.split_at(3);

        let amount = display_amount(row, base)?;
        let fill_amount = display_amount(row, quote)?;
        let price = fill_amount.checked_div(amount).unwrap_or_else(Decimal::zero);

        Ok(mapping(
            timestamp,
            &kind,
            format!("{}-{}", base, quote),
            amount,
            fill_amount,
            price,
        ))
    }
}

/// Days since 1899-12-30, as spreadsheets count them.
fn serial_date(value: &str) -> Result<Timestamp, TradeError> {
    let malformed = || TradeError::Malformed(format!("serial date {:?}", value));
    let days: f64 = value.trim().parse().map_err(|_| malformed())?;
    if !days.is_finite() || days < 0.0 {
        return Err(malformed());
    }

    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(malformed)?;
    let millis = ((days - 2.0) * 86_400_000.0).round() as i64;
    let at = epoch
        .checked_add_signed(Duration::milliseconds(millis))
        .and_then(|t| t.checked_add_signed(Duration::hours(EXPORT_UTC_OFFSET_HOURS)))
        .ok_or_else(malformed)?;
    Ok(Timestamp::new(at))
}

/// Parse a display amount such as `$1,234.50 USD` or `(0.5 BTC)`.
fn display_amount(row: &RawRow, currency: &str) -> Result<Decimal, TradeError> {
    let column = format!("{} Amount", currency);
    let text = cell(row, &column)?;
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | '-'))
        .collect();
    Decimal::from_str_canonical(&digits)
        .map(|d| d.abs())
        .map_err(|_| TradeError::Malformed(format!("{} is not a number: {:?}", column, text)))
}

impl ExchangeAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome) {
        (state, self.parse_row(row).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::row;
    use crate::domain::RawValue;

    #[test]
    fn test_serial_date() {
        // 43101 is 2018-01-01 in spreadsheet serial days.
        let ts = serial_date("43101.5").unwrap();
        let expected = NaiveDate::from_ymd_opt(2018, 1, 1)
            .unwrap()
            .and_hms_opt(5, 0, 0)
            .unwrap();
        assert_eq!(ts, Timestamp::new(expected));
        assert!(serial_date("yesterday").is_err());
    }

    #[test]
    fn test_gemini_buy() {
        let r = row(&[
            ("Date", "43101"),
            ("Type", "Buy"),
            ("Symbol", "ETHUSD"),
            ("USD Amount", "($1,500.00)"),
            ("ETH Amount", "2.0 ETH"),
        ]);
        let m = GeminiAdapter.parse_row(&r).unwrap();
        assert_eq!(
            m.get(RawFieldMapping::CURRENCY_PAIR),
            Some(&RawValue::Text("ETH-USD".into()))
        );
        assert_eq!(
            m.get(RawFieldMapping::FILL_AMOUNT),
            Some(&RawValue::Decimal(Decimal::from(1500)))
        );
        assert_eq!(
            m.get(RawFieldMapping::PRICE),
            Some(&RawValue::Decimal(Decimal::from(750)))
        );
    }

    #[test]
    fn test_gemini_credit_not_a_trade() {
        let r = row(&[("Date", "43101"), ("Type", "Credit"), ("Symbol", "BTC")]);
        assert!(matches!(
            GeminiAdapter.parse_row(&r),
            Err(TradeError::NotATrade(_))
        ));
    }
}
