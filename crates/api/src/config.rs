//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use fulfillment::EngineConfig;
use messaging::{RetryPolicy, TopicConfig};

/// Process configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: `3000`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `KAFKA_BROKERS` comma separated broker list (default: `"localhost:9092"`)
/// - `KAFKA_TOPIC` topic carrying every message (default: `"orders"`)
/// - `KAFKA_PARTITIONS` / `KAFKA_REPLICATION_FACTOR` (default: `1` / `1`)
/// - `SEND_MAX_ATTEMPTS` publish attempts before giving up (default: `5`)
/// - `SEND_RETRY_DELAY_MS` pause between attempts (default: `200`)
/// - `COMMAND_TIMEOUT_MS` bound on one command's downstream calls (default: `5000`)
/// - `KITCHEN_ENABLED` handle `request-item` in-process (default: `true`)
/// - `KITCHEN_TIME_SCALE` multiplier on preparation times (default: `1.0`)
/// - `NOTIFY_MAX_IN_FLIGHT` concurrent background notifications (default: `64`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub topic: TopicConfig,
    pub send_max_attempts: u32,
    pub send_retry_delay: Duration,
    pub command_timeout: Duration,
    pub kitchen_enabled: bool,
    pub kitchen_time_scale: f64,
    pub notify_max_in_flight: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Values that are missing or fail to parse keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let brokers = lookup("KAFKA_BROKERS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|broker| !broker.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|brokers| !brokers.is_empty())
            .unwrap_or(defaults.topic.brokers);

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            topic: TopicConfig {
                brokers,
                topic: lookup("KAFKA_TOPIC").unwrap_or(defaults.topic.topic),
                partitions: parse_var(&lookup, "KAFKA_PARTITIONS")
                    .unwrap_or(defaults.topic.partitions),
                replication_factor: parse_var(&lookup, "KAFKA_REPLICATION_FACTOR")
                    .unwrap_or(defaults.topic.replication_factor),
            },
            send_max_attempts: parse_var(&lookup, "SEND_MAX_ATTEMPTS")
                .filter(|attempts: &u32| *attempts > 0)
                .unwrap_or(defaults.send_max_attempts),
            send_retry_delay: parse_var(&lookup, "SEND_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.send_retry_delay),
            command_timeout: parse_var(&lookup, "COMMAND_TIMEOUT_MS")
                .filter(|millis: &u64| *millis > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.command_timeout),
            kitchen_enabled: lookup("KITCHEN_ENABLED")
                .and_then(|value| parse_flag(&value))
                .unwrap_or(defaults.kitchen_enabled),
            kitchen_time_scale: parse_var(&lookup, "KITCHEN_TIME_SCALE")
                .filter(|scale: &f64| scale.is_finite() && *scale >= 0.0)
                .unwrap_or(defaults.kitchen_time_scale),
            notify_max_in_flight: parse_var(&lookup, "NOTIFY_MAX_IN_FLIGHT")
                .filter(|limit: &u32| *limit > 0)
                .unwrap_or(defaults.notify_max_in_flight),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            command_timeout: self.command_timeout,
            retry: RetryPolicy::new(self.send_max_attempts, self.send_retry_delay),
            kitchen_enabled: self.kitchen_enabled,
            kitchen_time_scale: self.kitchen_time_scale,
            notify_max_in_flight: self.notify_max_in_flight,
            ..EngineConfig::default()
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| value.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            topic: TopicConfig::default(),
            send_max_attempts: 5,
            send_retry_delay: Duration::from_millis(200),
            command_timeout: engine.command_timeout,
            kitchen_enabled: engine.kitchen_enabled,
            kitchen_time_scale: engine.kitchen_time_scale,
            notify_max_in_flight: engine.notify_max_in_flight,
        }
    }
}
