use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use monitor_core::GIB;

use crate::error::{AppError, Result};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_CAP_GB: u64 = 500;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

const STATE_FILE_NAME: &str = "traffic_state.json";

/// Runtime configuration, read once at startup from the environment.
/// Missing credentials are fatal; everything else has a default.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub username: String,
    pub password: String,
    pub data_dir: PathBuf,
    pub cap_gb: u64,
    pub poll_interval: Duration,
    pub bind_addr: String,
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let username = require(&get, "MONITOR_USER")?;
        let password = require(&get, "MONITOR_PASS")?;
        let data_dir = get("DATA_DIR")
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
            .into();
        let cap_gb = parse_or(&get, "TRAFFIC_CAP_GB", DEFAULT_CAP_GB)?;
        let poll_secs = parse_or(&get, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        Ok(Self {
            username,
            password,
            data_dir,
            cap_gb,
            poll_interval: Duration::from_secs(poll_secs),
            bind_addr,
        })
    }

    pub fn cap_bytes(&self) -> u64 {
        self.cap_gb * GIB
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE_NAME)
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    get(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("environment variable {key} must be set")))
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map_err(|err| AppError::InvalidInput(format!("invalid {key}: {err}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_credentials_are_fatal() {
        let err = MonitorConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err =
            MonitorConfig::from_lookup(lookup(&[("MONITOR_USER", "admin")])).unwrap_err();
        assert!(err.to_string().contains("MONITOR_PASS"));
    }

    #[test]
    fn empty_credentials_count_as_missing() {
        let err = MonitorConfig::from_lookup(lookup(&[
            ("MONITOR_USER", ""),
            ("MONITOR_PASS", "secret"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("MONITOR_USER"));
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("MONITOR_USER", "admin"),
            ("MONITOR_PASS", "secret"),
        ]))
        .expect("config");
        assert_eq!(config.cap_gb, 500);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(config.state_path().ends_with("traffic_state.json"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("MONITOR_USER", "admin"),
            ("MONITOR_PASS", "secret"),
            ("DATA_DIR", "/var/lib/egress-monitor"),
            ("TRAFFIC_CAP_GB", "100"),
            ("POLL_INTERVAL_SECS", "30"),
            ("BIND_ADDR", "127.0.0.1:9000"),
        ]))
        .expect("config");
        assert_eq!(config.cap_gb, 100);
        assert_eq!(config.cap_bytes(), 100 * GIB);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/egress-monitor"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = MonitorConfig::from_lookup(lookup(&[
            ("MONITOR_USER", "admin"),
            ("MONITOR_PASS", "secret"),
            ("TRAFFIC_CAP_GB", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TRAFFIC_CAP_GB"));
    }
}
