use crate::domain::{Currency, Decimal};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Why a single record could not become a NormalizedTrade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    /// A required canonical field is absent or has the wrong type. Points at
    /// a broken adapter, not at the row.
    #[error("schema error: {0}")]
    Schema(String),
    #[error("not a trade: {0}")]
    NotATrade(String),
    #[error("trade too small: amount={amount}, fill_amount={fill_amount}")]
    TradeTooSmall { amount: Decimal, fill_amount: Decimal },
    #[error("no {currency} rate for {date}")]
    RateNotFound { currency: Currency, date: NaiveDate },
    /// An adapter could not parse a cell value.
    #[error("malformed row: {0}")]
    Malformed(String),
    /// A row type the adapter deliberately refuses.
    #[error("unsupported row: {0}")]
    Unsupported(String),
}

/// Flat classification of [`TradeError`] for summaries and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Schema,
    NotATrade,
    TradeTooSmall,
    RateNotFound,
    Malformed,
    Unsupported,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Schema => "schema",
            ErrorKind::NotATrade => "not_a_trade",
            ErrorKind::TradeTooSmall => "trade_too_small",
            ErrorKind::RateNotFound => "rate_not_found",
            ErrorKind::Malformed => "malformed",
            ErrorKind::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TradeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TradeError::Schema(_) => ErrorKind::Schema,
            TradeError::NotATrade(_) => ErrorKind::NotATrade,
            TradeError::TradeTooSmall { .. } => ErrorKind::TradeTooSmall,
            TradeError::RateNotFound { .. } => ErrorKind::RateNotFound,
            TradeError::Malformed(_) => ErrorKind::Malformed,
            TradeError::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    /// Soft errors are expected exclusions (deposits, dust). Everything else
    /// needs the user's attention.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            TradeError::NotATrade(_) | TradeError::TradeTooSmall { .. }
        )
    }
}

/// Top-level failure of a batch run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("rate table error: {0}")]
    Rates(#[from] crate::rates::RateTableError),
    #[error(transparent)]
    Schema(#[from] crate::normalize::SchemaViolation),
    #[error("reading {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("unknown exchange: {0}")]
    UnknownExchange(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
