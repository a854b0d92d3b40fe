//! Configuration file management.
//!
//! Read from `$COMB_DATA_DIR/config.toml`; every section and field is
//! optional.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "COMB_DATA_DIR";

/// Daemon configuration, `config.toml` in the data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub storage: StorageConfig,
    pub rpc: RpcConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides `$COMB_DATA_DIR` and `~/.comb-rewards`.
    pub data_dir: Option<PathBuf>,
    /// Keep the ledger in memory only. Everything is lost on exit.
    pub ephemeral: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Defaults to `comb.sock` in the data directory.
    pub socket_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for the `comb` targets: trace, debug, info, warn or error.
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl DaemonConfig {
    /// Read `config.toml` from the default data directory, or use defaults
    /// when there is none.
    pub fn load() -> anyhow::Result<Self> {
        let path = default_data_dir().join("config.toml");
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(anyhow::anyhow!("reading {}: {e}", path.display())),
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Ledger database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("rewards.db")
    }

    pub fn socket_path(&self) -> PathBuf {
        self.rpc
            .socket_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("comb.sock"))
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".comb-rewards"),
        None => std::env::temp_dir().join("comb-rewards"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert!(!config.storage.ephemeral);
        assert_eq!(config.logging.log_level, "info");
        assert!(config.rpc.socket_path.is_none());
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = DaemonConfig::default();
        config.storage.ephemeral = true;
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed = DaemonConfig::parse(&toml_str).expect("parse");
        assert_eq!(parsed.logging.log_level, "info");
        assert!(parsed.storage.ephemeral);
    }

    #[test]
    fn test_partial_config() {
        let config = DaemonConfig::parse(
            r#"
            [storage]
            data_dir = "/var/lib/comb"

            [logging]
            log_level = "debug"
            "#,
        )
        .expect("parse");
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/comb"));
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/comb/rewards.db"));
        assert_eq!(config.socket_path(), PathBuf::from("/var/lib/comb/comb.sock"));
        assert_eq!(config.logging.log_level, "debug");
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = DaemonConfig::parse("").expect("parse");
        assert_eq!(config.logging.log_level, "info");
        assert!(!config.storage.ephemeral);
    }

    #[test]
    fn test_explicit_socket_path() {
        let config = DaemonConfig::parse(
            r#"
            [rpc]
            socket_path = "/run/comb/rpc.sock"
            "#,
        )
        .expect("parse");
        assert_eq!(config.socket_path(), PathBuf::from("/run/comb/rpc.sock"));
    }
}
