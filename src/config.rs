//! Process configuration.
//!
//! [`ServerConfig`] collects everything the binary needs to wire the counter.
//! Values come from `COUNTER_*` environment variables and fall back to
//! defaults when a variable is unset. A set but invalid value is an error,
//! never silently replaced by the default.

use crate::application::scheduler::{EvictionConfig, EvictionConfigError};
use crate::domain::snapshot::MalformedLinePolicy;
use crate::infrastructure::file_snapshot::{SnapshotConfig, WriteMode};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// Default snapshot location.
pub const DEFAULT_SNAPSHOT_PATH: &str = "./resources/tmp/storage.txt";
/// Default time allowed for in-flight requests at shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
/// Default health check body.
pub const DEFAULT_HEALTH_MESSAGE: &str = "OK";

/// Error returned when configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Eviction(#[from] EvictionConfigError),

    /// Shutdown grace period must be greater than zero
    #[error("shutdown grace period must be greater than 0")]
    ZeroShutdownGrace,

    #[error("snapshot path must not be empty")]
    EmptySnapshotPath,

    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Configuration of the counter server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,
    /// Snapshot location and behavior
    pub snapshot: SnapshotConfig,
    /// Eviction scheduling
    pub eviction: EvictionConfig,
    /// Time allowed for in-flight requests once shutdown starts
    pub shutdown_grace: Duration,
    /// Body of the health check response
    pub health_message: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            snapshot: SnapshotConfig::new(DEFAULT_SNAPSHOT_PATH).with_create_if_missing(true),
            eviction: EvictionConfig::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            health_message: DEFAULT_HEALTH_MESSAGE.to_string(),
        }
    }
}

impl ServerConfig {
    /// Build a validated configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::ZeroShutdownGrace` if `shutdown_grace` is zero,
    /// or `ConfigError::EmptySnapshotPath` if the snapshot path is empty.
    pub fn new(
        bind_addr: SocketAddr,
        snapshot: SnapshotConfig,
        eviction: EvictionConfig,
        shutdown_grace: Duration,
    ) -> Result<Self, ConfigError> {
        if shutdown_grace.is_zero() {
            return Err(ConfigError::ZeroShutdownGrace);
        }
        if snapshot.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptySnapshotPath);
        }

        Ok(Self {
            bind_addr,
            snapshot,
            eviction,
            shutdown_grace,
            health_message: DEFAULT_HEALTH_MESSAGE.to_string(),
        })
    }

    /// Set the health check body.
    pub fn with_health_message(mut self, message: impl Into<String>) -> Self {
        self.health_message = message.into();
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("COUNTER_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(bind.clone()))?;

        let path = lookup("COUNTER_SNAPSHOT_PATH")
            .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string());

        let create = parse_bool(&lookup, "COUNTER_SNAPSHOT_CREATE", true)?;
        let write_mode = if parse_bool(&lookup, "COUNTER_SNAPSHOT_ATOMIC", false)? {
            WriteMode::AtomicReplace
        } else {
            WriteMode::InPlace
        };
        let malformed_lines = match lookup("COUNTER_MALFORMED_LINES") {
            Some(value) => MalformedLinePolicy::from_name(&value).ok_or(
                ConfigError::InvalidValue {
                    key: "COUNTER_MALFORMED_LINES",
                    value,
                },
            )?,
            None => MalformedLinePolicy::default(),
        };

        let interval = parse_millis(
            &lookup,
            "COUNTER_EVICTION_INTERVAL_MS",
            crate::application::scheduler::DEFAULT_EVICTION_INTERVAL,
        )?;
        let shutdown_grace =
            parse_millis(&lookup, "COUNTER_SHUTDOWN_GRACE_MS", DEFAULT_SHUTDOWN_GRACE)?;

        let snapshot = SnapshotConfig::new(path)
            .with_create_if_missing(create)
            .with_malformed_lines(malformed_lines)
            .with_write_mode(write_mode);

        let config = Self::new(
            bind_addr,
            snapshot,
            EvictionConfig::new(interval)?,
            shutdown_grace,
        )?;

        Ok(match lookup("COUNTER_HEALTH_MESSAGE") {
            Some(message) => config.with_health_message(message),
            None => config,
        })
    }
}

fn parse_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

fn parse_millis<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };

    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.snapshot.path, PathBuf::from("./resources/tmp/storage.txt"));
        assert!(config.snapshot.create_if_missing);
        assert_eq!(config.snapshot.write_mode, WriteMode::InPlace);
        assert_eq!(config.eviction.interval, Duration::from_millis(100));
        assert_eq!(config.shutdown_grace, Duration::from_secs(10));
        assert_eq!(config.health_message, "OK");
    }

    #[test]
    fn test_all_values_set() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("COUNTER_BIND_ADDR", "127.0.0.1:9000"),
            ("COUNTER_SNAPSHOT_PATH", "/var/lib/counter/snapshot"),
            ("COUNTER_EVICTION_INTERVAL_MS", "250"),
            ("COUNTER_SHUTDOWN_GRACE_MS", "3000"),
            ("COUNTER_SNAPSHOT_CREATE", "false"),
            ("COUNTER_SNAPSHOT_ATOMIC", "true"),
            ("COUNTER_MALFORMED_LINES", "reject"),
            ("COUNTER_HEALTH_MESSAGE", "alive"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.snapshot.path, PathBuf::from("/var/lib/counter/snapshot"));
        assert!(!config.snapshot.create_if_missing);
        assert_eq!(config.snapshot.write_mode, WriteMode::AtomicReplace);
        assert_eq!(config.snapshot.malformed_lines, MalformedLinePolicy::Reject);
        assert_eq!(config.eviction.interval, Duration::from_millis(250));
        assert_eq!(config.shutdown_grace, Duration::from_millis(3000));
        assert_eq!(config.health_message, "alive");
    }

    #[test]
    fn test_invalid_bind_address() {
        let result = ServerConfig::from_lookup(lookup_from(&[("COUNTER_BIND_ADDR", ":8080")]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidBindAddress(":8080".to_string()))
        );
    }

    #[test]
    fn test_zero_eviction_interval() {
        let result =
            ServerConfig::from_lookup(lookup_from(&[("COUNTER_EVICTION_INTERVAL_MS", "0")]));
        assert_eq!(
            result,
            Err(ConfigError::Eviction(EvictionConfigError::ZeroInterval))
        );
    }

    #[test]
    fn test_zero_shutdown_grace() {
        let result = ServerConfig::from_lookup(lookup_from(&[("COUNTER_SHUTDOWN_GRACE_MS", "0")]));
        assert_eq!(result, Err(ConfigError::ZeroShutdownGrace));
    }

    #[test]
    fn test_empty_snapshot_path() {
        let result = ServerConfig::from_lookup(lookup_from(&[("COUNTER_SNAPSHOT_PATH", "")]));
        assert_eq!(result, Err(ConfigError::EmptySnapshotPath));
    }

    #[test]
    fn test_invalid_numbers_and_flags() {
        let result =
            ServerConfig::from_lookup(lookup_from(&[("COUNTER_EVICTION_INTERVAL_MS", "fast")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "COUNTER_EVICTION_INTERVAL_MS",
                ..
            })
        ));

        let result = ServerConfig::from_lookup(lookup_from(&[("COUNTER_SNAPSHOT_ATOMIC", "maybe")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "COUNTER_SNAPSHOT_ATOMIC",
                ..
            })
        ));

        let result = ServerConfig::from_lookup(lookup_from(&[("COUNTER_MALFORMED_LINES", "ignore")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "COUNTER_MALFORMED_LINES",
                ..
            })
        ));
    }

    #[test]
    fn test_bool_spellings() {
        for value in ["1", "TRUE", " yes ", "on"] {
            let config =
                ServerConfig::from_lookup(lookup_from(&[("COUNTER_SNAPSHOT_ATOMIC", value)]))
                    .unwrap();
            assert_eq!(config.snapshot.write_mode, WriteMode::AtomicReplace);
        }
    }

    #[test]
    fn test_new_validates() {
        let snapshot = SnapshotConfig::new("storage.txt");
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        assert!(ServerConfig::new(
            addr,
            snapshot.clone(),
            EvictionConfig::default(),
            Duration::from_secs(1)
        )
        .is_ok());
        assert_eq!(
            ServerConfig::new(addr, snapshot, EvictionConfig::default(), Duration::ZERO),
            Err(ConfigError::ZeroShutdownGrace)
        );
    }
}
