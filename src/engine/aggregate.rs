//! Year x holding-period PnL totals.

use crate::domain::{Decimal, PnlRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Decimal places of reported totals.
pub const REPORT_DP: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TermTotals {
    pub short_term: Decimal,
    pub long_term: Decimal,
}

impl TermTotals {
    pub fn total(&self) -> Decimal {
        self.short_term + self.long_term
    }
}

/// Realized PnL by tax year (year of sale).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PnlMatrix {
    pub years: BTreeMap<i32, TermTotals>,
}

impl PnlMatrix {
    pub fn get(&self, year: i32) -> Option<&TermTotals> {
        self.years.get(&year)
    }
}

/// Sum disposal PnL per (sale year, long_term), rounding only the final sums.
pub fn aggregate_pnl<'a, I>(records: I) -> PnlMatrix
where
    I: IntoIterator<Item = &'a PnlRecord>,
{
    let mut years: BTreeMap<i32, TermTotals> = BTreeMap::new();

    for record in records.into_iter().filter(|r| r.is_disposal()) {
        let (Some(sell_date), Some(pnl)) = (record.sell_date, record.pnl) else {
            continue;
        };
        let bucket = years.entry(sell_date.year()).or_default();
        if record.long_term.unwrap_or(false) {
            bucket.long_term += pnl;
        } else {
            bucket.short_term += pnl;
        }
    }

    for totals in years.values_mut() {
        totals.short_term = totals.short_term.round_dp(REPORT_DP);
        totals.long_term = totals.long_term.round_dp(REPORT_DP);
    }

    PnlMatrix { years }
}
