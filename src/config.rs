//! Server configuration.
//!
//! All sizes are bytes. The log and index budgets are usually given on the
//! command line as textual megabytes ("64" for the log, "8" for the
//! index); [`ServerConfig::size_log_and_hash_table`] applies those.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for one master server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Locator other servers use to reach this master.
    #[serde(default = "default_local_locator")]
    pub local_locator: String,

    /// Locator of the coordinator.
    #[serde(default = "default_coordinator_locator")]
    pub coordinator_locator: String,

    /// Address the RPC server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Capacity of one log segment (default: 64 KiB).
    #[serde(default = "default_segment_bytes")]
    pub segment_bytes: usize,

    /// Total byte budget for the in-memory log (default: 64 MiB).
    #[serde(default = "default_log_bytes")]
    pub log_bytes: usize,

    /// Byte budget for the object index (default: 8 MiB).
    #[serde(default = "default_hash_table_bytes")]
    pub hash_table_bytes: usize,
}

fn default_local_locator() -> String {
    "tcp:host=127.0.0.1,port=54500".to_string()
}

fn default_coordinator_locator() -> String {
    "tcp:host=127.0.0.1,port=54400".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:54500".to_string()
}

fn default_segment_bytes() -> usize {
    64 * 1024
}

fn default_log_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_hash_table_bytes() -> usize {
    8 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            local_locator: default_local_locator(),
            coordinator_locator: default_coordinator_locator(),
            listen_addr: default_listen_addr(),
            segment_bytes: default_segment_bytes(),
            log_bytes: default_log_bytes(),
            hash_table_bytes: default_hash_table_bytes(),
        }
    }
}

impl ServerConfig {
    /// Apply textual megabyte sizes for the log and the index.
    pub fn size_log_and_hash_table(
        &mut self,
        log_megs: &str,
        hash_table_megs: &str,
    ) -> Result<(), ConfigError> {
        self.log_bytes = parse_megabytes(log_megs)?;
        self.hash_table_bytes = parse_megabytes(hash_table_megs)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A size argument was not a positive integer number of megabytes.
    #[error("invalid size \"{0}\": expected a positive number of megabytes")]
    InvalidSize(String),
}

fn parse_megabytes(text: &str) -> Result<usize, ConfigError> {
    let megs: usize = text
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidSize(text.to_string()))?;
    if megs == 0 {
        return Err(ConfigError::InvalidSize(text.to_string()));
    }
    Ok(megs * 1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.segment_bytes, 64 * 1024);
        assert_eq!(config.log_bytes, 64 * 1024 * 1024);
        assert_eq!(config.hash_table_bytes, 8 * 1024 * 1024);
        assert_eq!(config.listen_addr, "0.0.0.0:54500");
    }

    #[test]
    fn test_size_log_and_hash_table() {
        let mut config = ServerConfig::default();
        config.size_log_and_hash_table("64", "8").unwrap();
        assert_eq!(config.log_bytes, 64 * 1024 * 1024);
        assert_eq!(config.hash_table_bytes, 8 * 1024 * 1024);

        config.size_log_and_hash_table(" 2 ", "1").unwrap();
        assert_eq!(config.log_bytes, 2 * 1024 * 1024);
        assert_eq!(config.hash_table_bytes, 1024 * 1024);
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let mut config = ServerConfig::default();
        assert!(config.size_log_and_hash_table("sixty-four", "8").is_err());
        assert!(config.size_log_and_hash_table("64", "0").is_err());
        assert!(config.size_log_and_hash_table("", "8").is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{"listen_addr":"0.0.0.0:9000"}"#).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.segment_bytes, 64 * 1024);
    }
}
