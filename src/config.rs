use crate::adapters::EXCHANGES;
use crate::domain::Decimal;
use crate::normalize::{NormalizerSettings, DEFAULT_SMALL_TRADE_THRESHOLD};
use crate::rates::RateGranularity;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the exchange exports, one subdirectory per exchange.
    pub data_dir: PathBuf,
    pub rates_path: PathBuf,
    pub output_dir: PathBuf,
    pub small_trade_threshold: Decimal,
    pub rate_granularity: RateGranularity,
    /// Attach a running-balance replay to exhaustion errors.
    pub balance_replay: bool,
    pub exchanges: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(
            env_map
                .get("DATA_DIR")
                .map(|s| s.as_str())
                .unwrap_or("data"),
        );

        let rates_path = env_map
            .get("RATES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("exchange_rates.csv"));

        let output_dir = PathBuf::from(
            env_map
                .get("OUTPUT_DIR")
                .map(|s| s.as_str())
                .unwrap_or("output"),
        );

        let small_trade_threshold = env_map
            .get("SMALL_TRADE_THRESHOLD")
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SMALL_TRADE_THRESHOLD)
            .parse::<Decimal>()
            .ok()
            .filter(|d| !d.is_negative())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SMALL_TRADE_THRESHOLD".to_string(),
                    "must be a non-negative decimal".to_string(),
                )
            })?;

        let rate_granularity = match env_map
            .get("RATE_GRANULARITY")
            .map(|s| s.as_str())
            .unwrap_or("daily")
        {
            "daily" => RateGranularity::Daily,
            "hourly" => RateGranularity::Hourly,
            other => {
                return Err(ConfigError::InvalidValue(
                    "RATE_GRANULARITY".to_string(),
                    format!("must be daily or hourly, got {}", other),
                ))
            }
        };

        let balance_replay = match env_map
            .get("BALANCE_REPLAY")
            .map(|s| s.as_str())
            .unwrap_or("true")
        {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "BALANCE_REPLAY".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        let exchanges = parse_exchanges_from_map(&env_map)?;

        Ok(Config {
            data_dir,
            rates_path,
            output_dir,
            small_trade_threshold,
            rate_granularity,
            balance_replay,
            exchanges,
        })
    }

    pub fn normalizer_settings(&self) -> NormalizerSettings {
        NormalizerSettings {
            small_trade_threshold: self.small_trade_threshold,
            rate_granularity: self.rate_granularity,
        }
    }
}

fn parse_exchanges_from_map(env_map: &HashMap<String, String>) -> Result<Vec<String>, ConfigError> {
    let Some(list) = env_map.get("EXCHANGES") else {
        return Ok(EXCHANGES.iter().map(|s| s.to_string()).collect());
    };

    let exchanges: Vec<String> = list
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    if let Some(unknown) = exchanges.iter().find(|e| !EXCHANGES.contains(&e.as_str())) {
        return Err(ConfigError::InvalidValue(
            "EXCHANGES".to_string(),
            format!("unknown exchange {}", unknown),
        ));
    }
    Ok(exchanges)
}
