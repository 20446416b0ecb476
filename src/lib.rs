pub mod adapters;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod rates;

pub use adapters::{adapter_for, ExchangeAdapter, ParserState, RowOutcome};
pub use config::Config;
pub use domain::{
    Currency, CurrencyPair, Decimal, Direction, LegEvent, Lot, NormalizedTrade, PnlRecord,
    Platform, RawFieldMapping, Timestamp,
};
pub use engine::{LedgerError, LedgerExhaustionError, LedgerRun, PnlMatrix, TaxReportRow};
pub use error::{AppError, ErrorKind, TradeError};
pub use normalize::{Exclusion, Normalizer, NormalizerSettings, RawTrade, SchemaViolation};
pub use pipeline::{TaxPipeline, TaxRun};
pub use rates::{RateGranularity, RateTable};
