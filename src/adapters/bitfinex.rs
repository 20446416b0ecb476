//! Bitfinex trade history. The sign of `Amount` gives the direction.

use super::{abs_decimal, cell, mapping, parse_timestamp, ExchangeAdapter, ParserState, RowOutcome};
use crate::adapters::poloniex::slash_pair;
use crate::domain::{Decimal, RawFieldMapping, RawRow};
use crate::error::TradeError;

#[derive(Debug, Clone, Copy, Default)]
pub struct BitfinexAdapter;

impl BitfinexAdapter {
    fn parse_row(&self, row: &RawRow) -> Result<RawFieldMapping, TradeError> {
        let timestamp = parse_timestamp(cell(row, "Date")?, &["%Y-%m-%d %H:%M:%S"])?;

        let raw_amount = cell(row, "Amount")?;
        let signed = Decimal::from_str_canonical(raw_amount)
            .map_err(|_| TradeError::Malformed(format!("Amount is not a number: {:?}", raw_amount)))?;
        let direction = if signed.is_positive() {
            "buy"
        } else if signed.is_negative() {
            "sell"
        } else {
            return Err(TradeError::Malformed(
                "bitfinex trade with zero amount is neither buy nor sell".to_string(),
            ));
        };

        let amount = signed.abs();
        let price = abs_decimal(cell(row, "Price")?, "Price")?;
        let fill_amount = amount.checked_mul(price).ok_or_else(|| {
            TradeError::Malformed(format!("fill of {} at price {} overflows", amount, price))
        })?;
        Ok(mapping(
            timestamp,
            direction,
            slash_pair(cell(row, "Pair")?)?,
            amount,
            fill_amount,
            price,
        ))
    }
}

impl ExchangeAdapter for BitfinexAdapter {
    fn name(&self) -> &'static str {
        "bitfinex"
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

    fn bitfinex_row(amount: &str) -> RawRow {
        priced_row(amount, "2.5")
    }

    fn priced_row(amount: &str, price: &str) -> RawRow {
        row(&[
            ("#", "1"),
            ("Pair", "IOT/USD"),
            ("Amount", amount),
            ("Price", price),
            ("Fee", "-0.1"),
            ("Date", "2018-01-07 12:00:00"),
        ])
    }

    #[test]
    fn test_negative_amount_is_sell() {
        let m = BitfinexAdapter.parse_row(&bitfinex_row("-4")).unwrap();
        assert_eq!(
            m.get(RawFieldMapping::DIRECTION),
            Some(&RawValue::Text("sell".into()))
        );
        assert_eq!(
            m.get(RawFieldMapping::FILL_AMOUNT),
            Some(&RawValue::Decimal(Decimal::from(10)))
        );
        assert_eq!(
            m.get(RawFieldMapping::CURRENCY_PAIR),
            Some(&RawValue::Text("IOT-USD".into()))
        );
    }

    #[test]
    fn test_positive_amount_is_buy() {
        let m = BitfinexAdapter.parse_row(&bitfinex_row("4")).unwrap();
        assert_eq!(
            m.get(RawFieldMapping::DIRECTION),
            Some(&RawValue::Text("buy".into()))
        );
    }

    #[test]
    fn test_fill_overflow_rejected() {
        let err = BitfinexAdapter
            .parse_row(&priced_row("-70000000000000000000000000000", "2"))
            .unwrap_err();
        assert!(matches!(err, TradeError::Malformed(msg) if msg.ends_with("overflows")));
    }

    #[test]
    fn test_zero_amount_rejected() {
        assert!(matches!(
            BitfinexAdapter.parse_row(&bitfinex_row("0")),
            Err(TradeError::Malformed(_))
        ));
    }
}
