use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unknown bridge mode: {0} (expected \"simulated\" or \"live\")")]
    UnknownMode(String),
}

/// Which transport the bridge talks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    Simulated,
    Live,
}

impl BridgeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeMode::Simulated => "simulated",
            BridgeMode::Live => "live",
        }
    }
}

impl FromStr for BridgeMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "sim" | "offline" => Ok(BridgeMode::Simulated),
            "live" => Ok(BridgeMode::Live),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub mode: BridgeMode,
    pub endpoint_url: String,
    pub callback_url: String,
    pub network: String,
    pub port: u16,
    /// Ceiling for the initialization wait before a call falls back.
    pub init_timeout: Duration,
    pub poll_interval: Duration,
    /// Deadline for a dispatched call to receive its callback.
    pub call_timeout: Duration,
    pub simulated_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: BridgeMode::Simulated,
            endpoint_url: "http://127.0.0.1:8787".to_string(),
            callback_url: "http://127.0.0.1:8080/v1/bridge/callbacks".to_string(),
            network: "testnet".to_string(),
            port: 8080,
            init_timeout: Duration::from_millis(10_000),
            poll_interval: Duration::from_millis(100),
            call_timeout: Duration::from_millis(30_000),
            simulated_delay: Duration::from_millis(100),
        }
    }
}

impl BridgeConfig {
    /// Load config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mode = match lookup("BRIDGE_MODE") {
            Some(value) => value.parse()?,
            None => defaults.mode,
        };

        let port = match lookup("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value,
            })?,
            None => defaults.port,
        };

        let poll_interval = millis(&lookup, "POLL_INTERVAL_MS", defaults.poll_interval)?;
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "POLL_INTERVAL_MS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            mode,
            endpoint_url: lookup("BRIDGE_ENDPOINT_URL").unwrap_or(defaults.endpoint_url),
            callback_url: lookup("BRIDGE_CALLBACK_URL").unwrap_or(defaults.callback_url),
            network: lookup("NETWORK").unwrap_or(defaults.network),
            port,
            init_timeout: millis(&lookup, "INIT_TIMEOUT_MS", defaults.init_timeout)?,
            poll_interval,
            call_timeout: millis(&lookup, "CALL_TIMEOUT_MS", defaults.call_timeout)?,
            simulated_delay: millis(&lookup, "SIMULATED_DELAY_MS", defaults.simulated_delay)?,
        })
    }
}

fn millis<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = BridgeConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.mode, BridgeMode::Simulated);
        assert_eq!(config.init_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = BridgeConfig::from_lookup(lookup_from(&[
            ("BRIDGE_MODE", "LIVE"),
            ("BRIDGE_ENDPOINT_URL", "http://bridge:9000"),
            ("INIT_TIMEOUT_MS", "2500"),
            ("CALL_TIMEOUT_MS", "750"),
            ("PORT", "9090"),
        ]))
        .unwrap();

        assert_eq!(config.mode, BridgeMode::Live);
        assert_eq!(config.endpoint_url, "http://bridge:9000");
        assert_eq!(config.init_timeout, Duration::from_millis(2500));
        assert_eq!(config.call_timeout, Duration::from_millis(750));
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err =
            BridgeConfig::from_lookup(lookup_from(&[("BRIDGE_MODE", "browser")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownMode("browser".to_string()));

        let err =
            BridgeConfig::from_lookup(lookup_from(&[("INIT_TIMEOUT_MS", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "INIT_TIMEOUT_MS", .. }));

        let err =
            BridgeConfig::from_lookup(lookup_from(&[("POLL_INTERVAL_MS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "POLL_INTERVAL_MS", .. }));
    }
}
