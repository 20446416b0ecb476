//! Bittrex order history.
//!
//! Markets are written quote first (`BTC-ETH`), the order type carries the
//! direction (`LIMIT_BUY`) and `Price` is the order total before commission.

use super::{
    abs_decimal, canonical_symbol, cell, cell_any, mapping, parse_timestamp, ExchangeAdapter,
    ParserState, RowOutcome,
};
use crate::domain::{Decimal, RawFieldMapping, RawRow};
use crate::error::TradeError;

#[derive(Debug, Clone, Copy, Default)]
pub struct BittrexAdapter;

impl BittrexAdapter {
    fn parse_row(&self, row: &RawRow) -> Result<RawFieldMapping, TradeError> {
        let timestamp = parse_timestamp(cell(row, "Closed")?, &["%m/%d/%Y %I:%M:%S %p"])?;

        let order_type = cell_any(row, &["Type", "OrderType"])?;
        let direction = order_type
            .split_once('_')
            .map(|(_, side)| side)
            .ok_or_else(|| TradeError::Malformed(format!("order type {:?}", order_type)))?;

        let exchange = cell(row, "Exchange")?;
        let pair = match exchange.split_once('-') {
            Some((quote, base)) => format!(
                "{}-{}",
                canonical_symbol(base),
                quote.trim().to_ascii_uppercase()
            ),
            None => {
                return Err(TradeError::Malformed(format!(
                    "market {:?} is not QUOTE-BASE",
                    exchange
                )))
            }
        };

        let amount = abs_decimal(cell(row, "Quantity")?, "Quantity")?;
        let total = abs_decimal(cell(row, "Price")?, "Price")?;
        let commission = abs_decimal(
            cell_any(row, &["CommissionPaid", "Commission"])?,
            "Commission",
        )?;
        let fill_amount = total - commission;
        let price = fill_amount.checked_div(amount).unwrap_or_else(Decimal::zero);

        Ok(mapping(timestamp, direction, pair, amount, fill_amount, price))
    }
}

impl ExchangeAdapter for BittrexAdapter {
    fn name(&self) -> &'static str {
        "bittrex"
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

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_bittrex_order() {
        let r = row(&[
            ("OrderUuid", "abc"),
            ("Exchange", "BTC-BCC"),
            ("Type", "LIMIT_SELL"),
            ("Quantity", "2"),
            ("Limit", "0.1"),
            ("CommissionPaid", "0.0005"),
            ("Price", "0.2005"),
            ("Opened", "12/01/2017 11:00:00 PM"),
            ("Closed", "12/01/2017 11:30:00 PM"),
        ]);
        let m = BittrexAdapter.parse_row(&r).unwrap();
        assert_eq!(
            m.get(RawFieldMapping::CURRENCY_PAIR),
            Some(&RawValue::Text("BCH-BTC".into()))
        );
        assert_eq!(
            m.get(RawFieldMapping::DIRECTION),
            Some(&RawValue::Text("sell".into()))
        );
        assert_eq!(m.get(RawFieldMapping::FILL_AMOUNT), Some(&RawValue::Decimal(d("0.2"))));
        assert_eq!(m.get(RawFieldMapping::PRICE), Some(&RawValue::Decimal(d("0.1"))));
    }

    #[test]
    fn test_bittrex_commission_column_variant() {
        let r = row(&[
            ("Exchange", "USDT-BTC"),
            ("OrderType", "LIMIT_BUY"),
            ("Quantity", "1"),
            ("Commission", "25"),
            ("Price", "10025"),
            ("Closed", "1/2/2018 9:05:00 AM"),
        ]);
        let m = BittrexAdapter.parse_row(&r).unwrap();
        assert_eq!(
            m.get(RawFieldMapping::CURRENCY_PAIR),
            Some(&RawValue::Text("BTC-USDT".into()))
        );
        assert_eq!(m.get(RawFieldMapping::FILL_AMOUNT), Some(&RawValue::Decimal(d("10000"))));
    }
}
