//! Per-disposal rows for a tax accountant.

use crate::domain::{Currency, Decimal, PnlRecord, Timestamp};
use crate::engine::aggregate::REPORT_DP;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxReportRow {
    pub currency: Currency,
    pub amount: Decimal,
    pub buy_date: Timestamp,
    pub sell_date: Timestamp,
    pub buy_basis: Decimal,
    pub sell_basis: Decimal,
    pub pnl: Decimal,
    pub long_term: bool,
}

/// Disposal rows ordered by sale date; ties keep ledger order.
pub fn tax_report_rows<'a, I>(records: I) -> Vec<TaxReportRow>
where
    I: IntoIterator<Item = &'a PnlRecord>,
{
    let mut rows: Vec<TaxReportRow> = records
        .into_iter()
        .filter(|r| r.is_disposal())
        .filter_map(|r| {
            Some(TaxReportRow {
                currency: r.currency.clone(),
                amount: r.amount,
                buy_date: r.buy_date,
                sell_date: r.sell_date?,
                buy_basis: r.buy_basis.round_dp(REPORT_DP),
                sell_basis: r.sell_basis?.round_dp(REPORT_DP),
                pnl: r.pnl?.round_dp(REPORT_DP),
                long_term: r.long_term.unwrap_or(false),
            })
        })
        .collect();
    rows.sort_by_key(|r| r.sell_date);
    rows
}
