//! CSV reports written at the end of a run.

use crate::domain::{Decimal, Lot, NormalizedTrade, PnlRecord};
use crate::engine::{LedgerError, PnlMatrix, TaxReportRow};
use crate::normalize::Exclusion;
use crate::pipeline::TaxRun;
use serde::Serialize;
use std::io;
use std::path::Path;

pub const TRADES_FILE: &str = "trades.csv";
pub const PNL_FILE: &str = "pnl.csv";
pub const TOTAL_PNL_FILE: &str = "total_pnl.csv";
pub const TAX_REPORT_FILE: &str = "tax_reporting_data.csv";
pub const ERRORS_FILE: &str = "errors.csv";
pub const REMAINING_FUNDS_FILE: &str = "remaining_funds.csv";

#[derive(Serialize)]
struct TradeRow<'a> {
    trade_key: &'a str,
    created_at: String,
    platform: &'a str,
    #[serde(rename = "type")]
    direction: String,
    currency_pair: String,
    amount: Decimal,
    fill_amount: Decimal,
    price: Decimal,
    currency: &'a str,
    fill_currency: &'a str,
    fill_type: String,
    native_value: Decimal,
    native_currency: &'a str,
    basis: Decimal,
    fill_basis: Decimal,
}

#[derive(Serialize)]
struct PnlRow<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    currency: &'a str,
    currency_pair: String,
    buy_date: String,
    sell_date: Option<String>,
    holding_days: Option<i64>,
    long_term: Option<bool>,
    buy_platform: &'a str,
    sell_platform: Option<&'a str>,
    amount: Decimal,
    buy_basis: Decimal,
    sell_basis: Option<Decimal>,
    pnl: Option<Decimal>,
}

#[derive(Serialize)]
struct TotalRow {
    year: i32,
    short_term: Decimal,
    long_term: Decimal,
    total: Decimal,
}

#[derive(Serialize)]
struct TaxRow<'a> {
    currency: &'a str,
    amount: Decimal,
    buy_date: String,
    sell_date: String,
    buy_basis: Decimal,
    sell_basis: Decimal,
    pnl: Decimal,
    long_term: bool,
}

#[derive(Serialize)]
struct ErrorRow<'a> {
    source: &'a str,
    kind: &'a str,
    message: String,
    record: String,
}

#[derive(Serialize)]
struct LotRow<'a> {
    currency: &'a str,
    amount: Decimal,
    basis: Decimal,
    acquired_at: String,
    platform: &'a str,
    currency_pair: String,
}

pub fn write_trades<W: io::Write>(writer: W, trades: &[NormalizedTrade]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for t in trades {
        wtr.serialize(TradeRow {
            trade_key: &t.trade_key,
            created_at: t.timestamp.to_string(),
            platform: t.platform.as_str(),
            direction: t.direction.to_string(),
            currency_pair: t.currency_pair.to_string(),
            amount: t.amount,
            fill_amount: t.fill_amount,
            price: t.price,
            currency: t.currency.as_str(),
            fill_currency: t.fill_currency.as_str(),
            fill_type: t.fill_type.to_string(),
            native_value: t.native_value,
            native_currency: t.native_currency.as_str(),
            basis: t.basis,
            fill_basis: t.fill_basis,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// The full ledger: acquisitions and disposal fragments at full precision.
pub fn write_pnl<'a, W, I>(writer: W, records: I) -> Result<(), csv::Error>
where
    W: io::Write,
    I: IntoIterator<Item = &'a PnlRecord>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(PnlRow {
            kind: if r.is_disposal() { "disposal" } else { "acquisition" },
            currency: r.currency.as_str(),
            currency_pair: r.currency_pair.to_string(),
            buy_date: r.buy_date.to_string(),
            sell_date: r.sell_date.map(|t| t.to_string()),
            holding_days: r.holding_duration.map(|d| d.num_days()),
            long_term: r.long_term,
            buy_platform: r.buy_platform.as_str(),
            sell_platform: r.sell_platform.as_ref().map(|p| p.as_str()),
            amount: r.amount,
            buy_basis: r.buy_basis,
            sell_basis: r.sell_basis,
            pnl: r.pnl,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_total_pnl<W: io::Write>(writer: W, matrix: &PnlMatrix) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (year, totals) in &matrix.years {
        wtr.serialize(TotalRow {
            year: *year,
            short_term: totals.short_term,
            long_term: totals.long_term,
            total: totals.total(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_tax_report<W: io::Write>(writer: W, rows: &[TaxReportRow]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in rows {
        wtr.serialize(TaxRow {
            currency: r.currency.as_str(),
            amount: r.amount,
            buy_date: r.buy_date.to_string(),
            sell_date: r.sell_date.to_string(),
            buy_basis: r.buy_basis,
            sell_basis: r.sell_basis,
            pnl: r.pnl,
            long_term: r.long_term,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Exclusions with their source record, then currencies that could not be
/// matched.
pub fn write_errors<'a, W, I>(
    writer: W,
    exclusions: &[Exclusion],
    failures: I,
) -> Result<(), csv::Error>
where
    W: io::Write,
    I: IntoIterator<Item = &'a LedgerError>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for e in exclusions {
        let record = if e.raw.extras.is_empty() {
            e.raw.describe()
        } else {
            serde_json::to_string(&e.raw.extras).unwrap_or_else(|_| e.raw.describe())
        };
        wtr.serialize(ErrorRow {
            source: &e.exchange,
            kind: e.error.kind().as_str(),
            message: e.error.to_string(),
            record,
        })?;
    }
    for f in failures {
        let record = f
            .replay()
            .and_then(|steps| serde_json::to_string(steps).ok())
            .unwrap_or_default();
        wtr.serialize(ErrorRow {
            source: f.currency().as_str(),
            kind: f.kind(),
            message: f.to_string(),
            record,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_remaining_funds<'a, W, I>(writer: W, lots: I) -> Result<(), csv::Error>
where
    W: io::Write,
    I: IntoIterator<Item = &'a Lot>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for lot in lots {
        wtr.serialize(LotRow {
            currency: lot.currency.as_str(),
            amount: lot.amount,
            basis: lot.basis,
            acquired_at: lot.acquired_at.to_string(),
            platform: lot.platform.as_str(),
            currency_pair: lot.currency_pair.to_string(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write every report of `run` into `dir`, creating it if needed.
pub fn write_all(run: &TaxRun, dir: &Path) -> Result<(), crate::error::AppError> {
    std::fs::create_dir_all(dir)?;
    let create = |name: &str| std::fs::File::create(dir.join(name));

    write_trades(create(TRADES_FILE)?, &run.trades)?;
    write_pnl(create(PNL_FILE)?, run.ledger.records())?;
    write_total_pnl(create(TOTAL_PNL_FILE)?, &run.matrix)?;
    write_tax_report(create(TAX_REPORT_FILE)?, &run.report)?;
    write_errors(create(ERRORS_FILE)?, &run.exclusions, run.ledger.failures.values())?;
    write_remaining_funds(create(REMAINING_FUNDS_FILE)?, run.ledger.remaining_lots())?;

    tracing::info!(dir = %dir.display(), "reports written");
    Ok(())
}
