use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::Address;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub event_feed_url: String,
    /// The conditional tokens contract whose events are indexed.
    pub conditional_tokens_address: Address,
    /// Oracle addresses reporting scalar questions, injected at deployment.
    pub scalar_oracles: Vec<Address>,
    /// Oracle addresses reporting categorical questions.
    pub categorical_oracles: Vec<Address>,
    pub sync_interval_ms: u64,
    pub sync_batch_size: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn parse_address(key: &str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_address_list(key: &str, env_map: &HashMap<String, String>) -> Result<Vec<Address>, ConfigError> {
    match env_map.get(key) {
        Some(value) => value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| parse_address(key, s))
            .collect(),
        None => Ok(Vec::new()),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let event_feed_url = env_map
            .get("EVENT_FEED_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("EVENT_FEED_URL".to_string()))?;

        let conditional_tokens_address = env_map
            .get("CONDITIONAL_TOKENS_ADDRESS")
            .ok_or_else(|| ConfigError::MissingEnv("CONDITIONAL_TOKENS_ADDRESS".to_string()))
            .and_then(|s| parse_address("CONDITIONAL_TOKENS_ADDRESS", s))?;

        let scalar_oracles = parse_address_list("SCALAR_ORACLES", &env_map)?;
        let categorical_oracles = parse_address_list("CATEGORICAL_ORACLES", &env_map)?;

        let sync_interval_ms = env_map
            .get("SYNC_INTERVAL_MS")
            .map(|s| s.as_str())
            .unwrap_or("5000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SYNC_INTERVAL_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let sync_batch_size = env_map
            .get("SYNC_BATCH_SIZE")
            .map(|s| s.as_str())
            .unwrap_or("500")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SYNC_BATCH_SIZE".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            event_feed_url,
            conditional_tokens_address,
            scalar_oracles,
            categorical_oracles,
            sync_interval_ms,
            sync_batch_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "0x00112233445566778899aabbccddeeff00112233";

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert(
            "EVENT_FEED_URL".to_string(),
            "http://localhost:9000".to_string(),
        );
        map.insert(
            "CONDITIONAL_TOKENS_ADDRESS".to_string(),
            CONTRACT.to_string(),
        );
        map
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.sync_interval_ms, 5000);
        assert_eq!(config.sync_batch_size, 500);
        assert!(config.scalar_oracles.is_empty());
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_event_feed_url() {
        let mut env_map = setup_required_env();
        env_map.remove("EVENT_FEED_URL");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "EVENT_FEED_URL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_contract_address() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "CONDITIONAL_TOKENS_ADDRESS".to_string(),
            "not_an_address".to_string(),
        );
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CONDITIONAL_TOKENS_ADDRESS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_oracle_lists_parsed() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "SCALAR_ORACLES".to_string(),
            format!("{}, {}", CONTRACT, "0xffeeddccbbaa99887766554433221100ffeeddcc"),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.scalar_oracles.len(), 2);
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
