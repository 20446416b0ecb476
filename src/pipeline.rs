//! The batch: adapters, normalization, LIFO matching and reports.

use crate::adapters::{read_rows, run_adapter, AdapterOutput, ExchangeAdapter};
use crate::domain::NormalizedTrade;
use crate::engine::{
    aggregate_pnl, expand_trades, run_ledger, tax_report_rows, LedgerRun, PnlMatrix, TaxReportRow,
};
use crate::error::{AppError, ErrorKind};
use crate::normalize::{Exclusion, Normalizer, NormalizerSettings, SchemaViolation};
use crate::rates::RateTable;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Everything one run produces.
#[derive(Debug, Clone, Default)]
pub struct TaxRun {
    /// Accepted trades ordered by timestamp; ties keep input order.
    pub trades: Vec<NormalizedTrade>,
    /// Adapter rejections first, then normalizer exclusions.
    pub exclusions: Vec<Exclusion>,
    pub ledger: LedgerRun,
    pub matrix: PnlMatrix,
    pub report: Vec<TaxReportRow>,
}

pub struct TaxPipeline<'a> {
    rates: &'a RateTable,
    settings: NormalizerSettings,
    balance_replay: bool,
}

impl<'a> TaxPipeline<'a> {
    pub fn new(rates: &'a RateTable, settings: NormalizerSettings) -> Self {
        Self {
            rates,
            settings,
            balance_replay: true,
        }
    }

    pub fn with_balance_replay(mut self, enabled: bool) -> Self {
        self.balance_replay = enabled;
        self
    }

    /// Run the batch over adapter outputs in the order given.
    pub fn run<I>(&self, inputs: I) -> Result<TaxRun, SchemaViolation>
    where
        I: IntoIterator<Item = AdapterOutput>,
    {
        let mut raws = Vec::new();
        let mut exclusions = Vec::new();
        for input in inputs {
            raws.extend(input.trades);
            exclusions.extend(input.rejected);
        }

        let normalizer = Normalizer::new(self.rates, self.settings.clone());
        let normalized = normalizer.normalize_batch(raws)?;
        exclusions.extend(normalized.exclusions);

        let mut trades = normalized.trades;
        trades.sort_by_key(|t| t.timestamp);
        log_summary(&trades, &exclusions);

        let streams = expand_trades(&trades);
        let ledger = run_ledger(&streams, self.balance_replay);
        if !ledger.is_complete() {
            tracing::warn!(
                failed = ledger.failures.len(),
                "some currencies could not be matched; their PnL is missing from the totals"
            );
        }

        let matrix = aggregate_pnl(ledger.records());
        let report = tax_report_rows(ledger.records());

        Ok(TaxRun {
            trades,
            exclusions,
            ledger,
            matrix,
            report,
        })
    }
}

fn log_summary(trades: &[NormalizedTrade], exclusions: &[Exclusion]) {
    let mut per_platform: BTreeMap<&str, usize> = BTreeMap::new();
    for trade in trades {
        *per_platform.entry(trade.platform.as_str()).or_default() += 1;
    }
    for (platform, count) in &per_platform {
        tracing::info!(platform, count, "trades");
    }
    let zero_cost = trades.iter().filter(|t| t.is_zero_cost()).count();
    if zero_cost > 0 {
        tracing::info!(count = zero_cost, "zero-cost acquisitions");
    }

    let mut per_kind: BTreeMap<ErrorKind, usize> = BTreeMap::new();
    for exclusion in exclusions {
        *per_kind.entry(exclusion.error.kind()).or_default() += 1;
    }
    for (kind, count) in &per_kind {
        if matches!(kind, ErrorKind::NotATrade | ErrorKind::TradeTooSmall) {
            tracing::info!(kind = %kind, count, "excluded records");
        } else {
            tracing::warn!(kind = %kind, count, "rejected records");
        }
    }
}

/// CSV files directly under `dir`, in name order.
fn csv_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Run `adapter` over every CSV export in `dir`. A missing directory yields
/// no trades.
pub fn load_exchange_dir(adapter: &dyn ExchangeAdapter, dir: &Path) -> Result<AdapterOutput, AppError> {
    let mut output = AdapterOutput::default();
    if !dir.is_dir() {
        tracing::debug!(exchange = adapter.name(), dir = %dir.display(), "no exports");
        return Ok(output);
    }

    for path in csv_files(dir)? {
        let file = File::open(&path)?;
        let rows = read_rows(file, adapter.header_rows()).map_err(|source| AppError::Input {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(exchange = adapter.name(), file = %path.display(), rows = rows.len(), "read export");

        let parsed = run_adapter(adapter, rows)?;
        output.trades.extend(parsed.trades);
        output.rejected.extend(parsed.rejected);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::adapter_for;
    use std::io::Write;

    #[test]
    fn test_missing_dir_is_empty() {
        let adapter = adapter_for("kraken").unwrap();
        let out = load_exchange_dir(adapter.as_ref(), Path::new("/nonexistent/kraken")).unwrap();
        assert!(out.trades.is_empty());
        assert!(out.rejected.is_empty());
    }

    #[test]
    fn test_reads_only_csv_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let header = "Date,Market,Type,Price,Amount,Total\n";
        for (name, date) in [("b.csv", "2018-01-02"), ("a.csv", "2018-01-01")] {
            let mut f = File::create(dir.path().join(name)).unwrap();
            writeln!(f, "{}{} 00:00:00,ETH/BTC,Buy,0.1,1,0.1", header, date).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let adapter = adapter_for("poloniex").unwrap();
        let out = load_exchange_dir(adapter.as_ref(), dir.path()).unwrap();
        assert_eq!(out.trades.len(), 2);
        assert_eq!(out.trades[0].mapping.extras["Date"], "2018-01-01 00:00:00");
    }
}
