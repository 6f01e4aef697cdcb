use crate::domain::SeasonId;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub price_api_url: String,
    pub quote_currency: String,
    pub batch_size: i64,
    pub run_timeout: Duration,
    pub price_fetch_timeout: Duration,
    pub season_id: Option<SeasonId>,
    pub finalize_strategy: FinalizeStrategy,
    pub log_format: LogFormat,
}

/// How the staging table is turned into ranking records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeStrategy {
    /// One `INSERT ... SELECT` using `ROW_NUMBER()`.
    Window,
    /// Sorted keyset scan with an in-process rank counter.
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

pub const DEFAULT_BATCH_SIZE: i64 = 1000;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let price_api_url = env_map
            .get("PRICE_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.upbit.com".to_string());

        let quote_currency = env_map
            .get("QUOTE_CURRENCY")
            .map(|s| s.trim().to_ascii_uppercase())
            .unwrap_or_else(|| "KRW".to_string());

        let batch_size = parse_positive(&env_map, "BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        let run_timeout =
            Duration::from_secs(parse_positive(&env_map, "RUN_TIMEOUT_SECS", 300)? as u64);
        let price_fetch_timeout =
            Duration::from_secs(parse_positive(&env_map, "PRICE_FETCH_TIMEOUT_SECS", 10)? as u64);

        let season_id = env_map
            .get("SEASON_ID")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>().map(SeasonId::new).map_err(|_| {
                    ConfigError::InvalidValue(
                        "SEASON_ID".to_string(),
                        "must be a valid i64".to_string(),
                    )
                })
            })
            .transpose()?;

        let finalize_strategy = match env_map
            .get("FINALIZE_STRATEGY")
            .map(|s| s.as_str())
            .unwrap_or("window")
        {
            "window" => FinalizeStrategy::Window,
            "streaming" => FinalizeStrategy::Streaming,
            other => {
                return Err(ConfigError::InvalidValue(
                    "FINALIZE_STRATEGY".to_string(),
                    format!("must be window or streaming, got {}", other),
                ))
            }
        };

        let log_format = match env_map
            .get("LOG_FORMAT")
            .map(|s| s.as_str())
            .unwrap_or("pretty")
        {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LOG_FORMAT".to_string(),
                    format!("must be pretty or json, got {}", other),
                ))
            }
        };

        Ok(Config {
            database_path,
            price_api_url,
            quote_currency,
            batch_size,
            run_timeout,
            price_fetch_timeout,
            season_id,
            finalize_strategy,
            log_format,
        })
    }
}

fn parse_positive(
    env_map: &HashMap<String, String>,
    key: &str,
    default: i64,
) -> Result<i64, ConfigError> {
    let Some(raw) = env_map.get(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be a positive integer".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/rank.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.price_api_url, "https://api.upbit.com");
        assert_eq!(config.quote_currency, "KRW");
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.run_timeout, Duration::from_secs(300));
        assert_eq!(config.price_fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.season_id, None);
        assert_eq!(config.finalize_strategy, FinalizeStrategy::Window);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("BATCH_SIZE".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "BATCH_SIZE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_run_timeout() {
        let mut env_map = setup_required_env();
        env_map.insert("RUN_TIMEOUT_SECS".to_string(), "soon".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "RUN_TIMEOUT_SECS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_season_override() {
        let mut env_map = setup_required_env();
        env_map.insert("SEASON_ID".to_string(), " 42 ".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.season_id, Some(SeasonId::new(42)));
    }

    #[test]
    fn test_invalid_season_override() {
        let mut env_map = setup_required_env();
        env_map.insert("SEASON_ID".to_string(), "current".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SEASON_ID"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_streaming_strategy() {
        let mut env_map = setup_required_env();
        env_map.insert("FINALIZE_STRATEGY".to_string(), "streaming".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.finalize_strategy, FinalizeStrategy::Streaming);
    }

    #[test]
    fn test_invalid_finalize_strategy() {
        let mut env_map = setup_required_env();
        env_map.insert("FINALIZE_STRATEGY".to_string(), "sorted".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "FINALIZE_STRATEGY"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_log_format() {
        let mut env_map = setup_required_env();
        env_map.insert("LOG_FORMAT".to_string(), "xml".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "LOG_FORMAT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
