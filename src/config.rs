// src/config.rs

use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Context};
use chrono::Duration;
use tracing::info;

/// One year.
const MAX_RETENTION_HOURS: i64 = 24 * 365;
/// One day.
const MAX_DUPLICATE_WINDOW_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub payment_key_secret: String,
    pub order_retention_hours: i64,
    pub duplicate_window_secs: i64,
    pub cleanup_interval_secs: u64,
    pub status_update_retries: u32,
}

impl Config {
    /// Reads settings from the process environment (`.env` is loaded by `main`).
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cfg = Self {
            port: try_load(&lookup, "PORT", 8080)?,
            database_url: required(&lookup, "DATABASE_URL")?,
            db_max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            payment_key_secret: required(&lookup, "PAYMENT_KEY_SECRET")?,
            order_retention_hours: try_load(&lookup, "ORDER_RETENTION_HOURS", 24)?,
            duplicate_window_secs: try_load(&lookup, "DUPLICATE_WINDOW_SECS", 120)?,
            cleanup_interval_secs: try_load(&lookup, "CLEANUP_INTERVAL_SECS", 900)?,
            status_update_retries: try_load(&lookup, "STATUS_UPDATE_RETRIES", 3)?,
        };
        if !(1..=MAX_RETENTION_HOURS).contains(&cfg.order_retention_hours) {
            return Err(anyhow!(
                "ORDER_RETENTION_HOURS must be between 1 and {MAX_RETENTION_HOURS}"
            ));
        }
        if !(0..=MAX_DUPLICATE_WINDOW_SECS).contains(&cfg.duplicate_window_secs) {
            return Err(anyhow!(
                "DUPLICATE_WINDOW_SECS must be between 0 and {MAX_DUPLICATE_WINDOW_SECS}"
            ));
        }
        Ok(cfg)
    }

    pub fn order_retention(&self) -> Duration {
        Duration::hours(self.order_retention_hours)
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::seconds(self.duplicate_window_secs)
    }
}

fn required<F>(lookup: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{key} must be set"))
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key} value '{raw}'")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/wedine"),
            ("PAYMENT_KEY_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.order_retention(), Duration::hours(24));
        assert_eq!(cfg.duplicate_window(), Duration::seconds(120));
        assert_eq!(cfg.cleanup_interval_secs, 900);
        assert_eq!(cfg.status_update_retries, 3);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/wedine"),
            ("PAYMENT_KEY_SECRET", "secret"),
            ("PORT", "9000"),
            ("ORDER_RETENTION_HOURS", "48"),
            ("CLEANUP_INTERVAL_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.order_retention(), Duration::hours(48));
        assert_eq!(cfg.cleanup_interval_secs, 0);
    }

    #[test]
    fn missing_or_bad_values_fail() {
        assert!(Config::from_lookup(lookup(&[("PAYMENT_KEY_SECRET", "s")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("PAYMENT_KEY_SECRET", "s"),
            ("PORT", "eighty"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("PAYMENT_KEY_SECRET", "s"),
            ("ORDER_RETENTION_HOURS", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn out_of_range_durations_fail_at_load() {
        let base = [("DATABASE_URL", "postgres://x"), ("PAYMENT_KEY_SECRET", "s")];
        for (key, value) in [
            ("ORDER_RETENTION_HOURS", "9223372036854775807"),
            ("ORDER_RETENTION_HOURS", "8761"),
            ("DUPLICATE_WINDOW_SECS", "-1"),
            ("DUPLICATE_WINDOW_SECS", "9223372036854775807"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push((key, value));
            assert!(Config::from_lookup(lookup(&pairs)).is_err(), "{key}={value}");
        }

        let mut pairs = base.to_vec();
        pairs.push(("ORDER_RETENTION_HOURS", "8760"));
        pairs.push(("DUPLICATE_WINDOW_SECS", "86400"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.order_retention(), Duration::hours(8760));
        assert_eq!(cfg.duplicate_window(), Duration::seconds(86_400));
    }
}
