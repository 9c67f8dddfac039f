//! Configuration management for the native ledger

use crate::crypto::{public_key_from_hex, Address};
use crate::error::{ChainError, Result};
use crate::native::Distribution;
use secp256k1::PublicKey;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChainConfig {
    /// Hex-encoded compressed secp256k1 public keys.
    #[serde(default)]
    pub book_keepers: Vec<String>,
    /// JSON manifest of the initial governance token distribution.
    #[serde(default)]
    pub distribution: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

/// One allocation in a distribution manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Allocation {
    pub address: String,
    pub amount: u64,
}

impl ChainConfig {
    pub fn book_keeper_keys(&self) -> Result<Vec<PublicKey>> {
        self.book_keepers.iter().map(|k| public_key_from_hex(k)).collect()
    }
}

/// Reads a JSON array of `{"address": "<hex>", "amount": n}` entries.
pub fn load_distribution(path: impl AsRef<Path>) -> Result<Distribution> {
    let raw = fs::read_to_string(path.as_ref())?;
    parse_distribution(&raw)
}

pub fn parse_distribution(raw: &str) -> Result<Distribution> {
    let allocations: Vec<Allocation> = serde_json::from_str(raw)?;
    let entries = allocations
        .iter()
        .map(|a| Ok((Address::from_hex(&a.address)?, a.amount)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Distribution::new(entries))
}

pub fn load_config() -> Result<Config> {
    load_config_from("config.toml")
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    let config_str = fs::read_to_string(path.as_ref()).unwrap_or_default();
    let config: Config = if config_str.trim().is_empty() {
        // Sane defaults when the file is absent
        Config {
            database: DatabaseConfig::default(),
            chain: ChainConfig::default(),
            logging: LoggingConfig::default(),
        }
    } else {
        toml::from_str(&config_str)?
    };

    if config.database.path.is_empty() {
        return Err(ChainError::ConfigError("database.path must be set in config.toml".to_string()));
    }
    if config.logging.level.is_empty() {
        return Err(ChainError::ConfigError("logging.level must not be empty".to_string()));
    }
    config.chain.book_keeper_keys()?;

    Ok(config)
}

fn default_db_path() -> String {
    "./data/ledger.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_from("/nonexistent/config.toml").unwrap();
        assert_eq!(config.database.path, "./data/ledger.db");
        assert_eq!(config.logging.level, "info");
        assert!(config.chain.book_keepers.is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let key = hex::encode(KeyPair::generate().public_key_bytes());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[database]\npath = \"/tmp/x.db\"\n\n[chain]\nbook_keepers = [\"{}\"]\ndistribution = \"alloc.json\"\n\n[logging]\nlevel = \"debug\"",
            key
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.database.path, "/tmp/x.db");
        assert_eq!(config.chain.book_keeper_keys().unwrap().len(), 1);
        assert_eq!(config.chain.distribution.as_deref(), Some("alloc.json"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"\"").unwrap();
        assert!(matches!(load_config_from(file.path()), Err(ChainError::ConfigError(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chain]\nbook_keepers = [\"zz\"]").unwrap();
        assert!(load_config_from(file.path()).is_err());
    }

    #[test]
    fn test_parse_distribution_manifest() {
        let a = Address::native(7);
        let raw = format!(r#"[{{"address": "{}", "amount": 600}}, {{"address": "0x{}", "amount": 400}}]"#, a.to_hex(), a.to_hex());
        let distribution = parse_distribution(&raw).unwrap();
        assert_eq!(distribution.entries, vec![(a, 600), (a, 400)]);

        assert!(parse_distribution(r#"[{"address": "abc", "amount": 1}]"#).is_err());
        assert!(parse_distribution("not json").is_err());
    }
}
