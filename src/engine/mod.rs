//! Pure computation engine for the tax-lot ledger.
//!
//! Trades are expanded into single-currency legs, each currency's legs are
//! matched LIFO against its own lot stack, and the realized records are
//! aggregated per tax year.

pub mod aggregate;
pub mod expansion;
pub mod ledger;
pub mod lifo;
pub mod replay;
pub mod report;

pub use aggregate::{aggregate_pnl, PnlMatrix, TermTotals};
pub use expansion::{expand_trade, expand_trades};
pub use ledger::{run_currency, run_ledger, CurrencyLedger, LedgerRun};
pub use lifo::{LedgerError, LedgerExhaustionError, LifoMatcher, LotStack, MatchState, LONG_TERM_DAYS};
pub use replay::{replay_balances, BalanceStep};
pub use report::{tax_report_rows, TaxReportRow};
