//! Hand-entered trades: forks, ICOs, gifts and anything no exchange exports.
//!
//! Columns: `created_at`, `amount`, `fill_amount`, `currency_pair`, `type`,
//! `price` and an optional `platform` that replaces the exchange name.

use super::{abs_decimal, cell, mapping, parse_timestamp, ExchangeAdapter, ParserState, RowOutcome};
use crate::domain::{Decimal, RawFieldMapping, RawRow};
use crate::error::TradeError;

const DATE_FORMATS: [&str; 4] = ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ManualAdapter;

impl ManualAdapter {
    fn parse_row(&self, row: &RawRow) -> Result<RawFieldMapping, TradeError> {
        let timestamp = parse_timestamp(cell(row, "created_at")?, &DATE_FORMATS)?;
        let amount = abs_decimal(cell(row, "amount")?, "amount")?;
        let fill_amount = abs_decimal(cell(row, "fill_amount")?, "fill_amount")?;
        let pair = cell(row, "currency_pair")?.trim().to_ascii_uppercase();

        // A blank or unparseable price is derived from the two sides.
        let price = match row.get("price").map(|p| abs_decimal(p, "price")) {
            Some(Ok(price)) => price,
            _ => fill_amount.checked_div(amount).unwrap_or_else(Decimal::zero),
        };

        let mut out = mapping(
            timestamp,
            cell(row, "type")?,
            pair,
            amount,
            fill_amount,
            price,
        );
        if let Some(platform) = row.get("platform").filter(|p| !p.is_empty()) {
            out = out.with_text(RawFieldMapping::PLATFORM, platform.to_ascii_lowercase());
        }
        Ok(out)
    }
}

impl ExchangeAdapter for ManualAdapter {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn parse(&self, row: &RawRow, state: ParserState) -> (ParserState, RowOutcome) {
        (state, self.parse_row(row).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::row;
    use crate::domain::{RawValue, Timestamp};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_fork_row_with_platform() {
        let r = row(&[
            ("created_at", "08/01/2017"),
            ("amount", "1.5"),
            ("fill_amount", "0"),
            ("currency_pair", "bch-usd"),
            ("type", "Buy"),
            ("price", "0"),
            ("platform", "Fork"),
        ]);
        let m = ManualAdapter.parse_row(&r).unwrap();
        assert_eq!(
            m.get(RawFieldMapping::TIMESTAMP),
            Some(&RawValue::Timestamp(Timestamp::from_ymd(2017, 8, 1).unwrap()))
        );
        assert_eq!(
            m.get(RawFieldMapping::PLATFORM),
            Some(&RawValue::Text("fork".into()))
        );
        assert_eq!(
            m.get(RawFieldMapping::CURRENCY_PAIR),
            Some(&RawValue::Text("BCH-USD".into()))
        );
        assert_eq!(
            m.get(RawFieldMapping::DIRECTION),
            Some(&RawValue::Text("buy".into()))
        );
    }

    #[test]
    fn test_price_derived_when_blank() {
        let r = row(&[
            ("created_at", "01/02/2018 13:00:00"),
            ("amount", "-4"),
            ("fill_amount", "10"),
            ("currency_pair", "ETH-BTC"),
            ("type", "sell"),
            ("price", ""),
        ]);
        let m = ManualAdapter.parse_row(&r).unwrap();
        assert_eq!(m.get(RawFieldMapping::AMOUNT), Some(&RawValue::Decimal(d("4"))));
        assert_eq!(m.get(RawFieldMapping::PRICE), Some(&RawValue::Decimal(d("2.5"))));
        assert_eq!(m.get(RawFieldMapping::PLATFORM), None);
    }

    #[test]
    fn test_bad_amount_is_malformed() {
        let r = row(&[
            ("created_at", "01/02/2018"),
            ("amount", "lots"),
            ("fill_amount", "10"),
            ("currency_pair", "ETH-BTC"),
            ("type", "sell"),
        ]);
        assert!(matches!(
            ManualAdapter.parse_row(&r),
            Err(TradeError::Malformed(_))
        ));
    }
}
