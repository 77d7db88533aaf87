use std::time::Duration;

use anyhow::{bail, ensure};
use tracing::trace;

use crate::util::parse_override;

pub const MQTT_HOST: &str = "MQTT_HOST";
pub const MQTT_PORT: &str = "MQTT_PORT";
pub const MQTT_BASE_TOPIC: &str = "MQTT_BASE_TOPIC";
pub const MQTT_CLIENT_ID: &str = "MQTT_CLIENT_ID";
pub const PROMETHEUS_PORT: &str = "PROMETHEUS_PORT";
pub const WINDOW_SIZE: &str = "WINDOW_SIZE";
pub const MIN_SAMPLES: &str = "MIN_SAMPLES";
pub const ANOMALY_WARN: &str = "ANOMALY_WARN";
pub const ANOMALY_CRIT: &str = "ANOMALY_CRIT";
pub const BATTERY_LOW_GRACE_SEC: &str = "BATTERY_LOW_GRACE_SEC";
pub const BATTERY_LOW_BATTERY_WEIGHT: &str = "BATTERY_LOW_BATTERY_WEIGHT";

/// Service configuration, built once at start-up and handed to each component.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// Port of the scrape endpoint
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,

    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Topics are `{base_topic}/telemetry` and `{base_topic}/event`
    #[serde(default = "default_base_topic")]
    pub base_topic: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct AnalyticsConfig {
    /// Capacity of the sliding window
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Below this many samples the score is pinned to 0
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    #[serde(default = "default_anomaly_warn")]
    pub anomaly_warn: f64,

    #[serde(default = "default_anomaly_crit")]
    pub anomaly_crit: f64,

    /// How long a `BATTERY_LOW` event keeps the pipeline in grace
    #[serde(default = "default_grace_sec")]
    pub battery_low_grace_sec: u64,

    /// Multiplier applied to the battery delta while in grace
    #[serde(default = "default_battery_weight")]
    pub battery_low_battery_weight: f64,
}

impl AnalyticsConfig {
    pub fn grace_window(&self) -> Duration {
        Duration::from_secs(self.battery_low_grace_sec)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            prometheus_port: default_prometheus_port(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            base_topic: default_base_topic(),
            client_id: default_client_id(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            min_samples: default_min_samples(),
            anomaly_warn: default_anomaly_warn(),
            anomaly_crit: default_anomaly_crit(),
            battery_low_grace_sec: default_grace_sec(),
            battery_low_battery_weight: default_battery_weight(),
        }
    }
}

fn default_mqtt_host() -> String {
    String::from("mqtt")
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_base_topic() -> String {
    String::from("drone/alpha")
}

fn default_client_id() -> String {
    String::from("ml-analytics")
}

fn default_prometheus_port() -> u16 {
    9108
}

fn default_window_size() -> usize {
    60
}

fn default_min_samples() -> usize {
    20
}

fn default_anomaly_warn() -> f64 {
    0.6
}

fn default_anomaly_crit() -> f64 {
    0.85
}

fn default_grace_sec() -> u64 {
    120
}

fn default_battery_weight() -> f64 {
    0.2
}

impl Config {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Config {
        Config::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    ///
    /// Unset or unparsable values keep the current setting.
    pub fn with_overrides<F>(mut self, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        fn apply<T, F>(lookup: &F, name: &str, target: &mut T)
        where
            T: std::str::FromStr,
            T::Err: std::fmt::Display,
            F: Fn(&str) -> Option<String>,
        {
            if let Some(value) = parse_override(name, lookup(name)) {
                *target = value;
            }
        }

        apply(&lookup, MQTT_HOST, &mut self.mqtt.host);
        apply(&lookup, MQTT_PORT, &mut self.mqtt.port);
        apply(&lookup, MQTT_BASE_TOPIC, &mut self.mqtt.base_topic);
        apply(&lookup, MQTT_CLIENT_ID, &mut self.mqtt.client_id);
        apply(&lookup, PROMETHEUS_PORT, &mut self.prometheus_port);

        let analytics = &mut self.analytics;
        apply(&lookup, WINDOW_SIZE, &mut analytics.window_size);
        apply(&lookup, MIN_SAMPLES, &mut analytics.min_samples);
        apply(&lookup, ANOMALY_WARN, &mut analytics.anomaly_warn);
        apply(&lookup, ANOMALY_CRIT, &mut analytics.anomaly_crit);
        apply(&lookup, BATTERY_LOW_GRACE_SEC, &mut analytics.battery_low_grace_sec);
        apply(
            &lookup,
            BATTERY_LOW_BATTERY_WEIGHT,
            &mut analytics.battery_low_battery_weight,
        );

        trace!("resolved config: {self:?}");
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let AnalyticsConfig {
            window_size,
            min_samples,
            anomaly_warn,
            anomaly_crit,
            battery_low_battery_weight,
            ..
        } = self.analytics;

        ensure!(
            !self.mqtt.base_topic.trim().is_empty(),
            "{MQTT_BASE_TOPIC} must not be empty"
        );
        ensure!(window_size > 0, "{WINDOW_SIZE} must be at least 1");
        ensure!(min_samples > 0, "{MIN_SAMPLES} must be at least 1");

        for (name, value) in [(ANOMALY_WARN, anomaly_warn), (ANOMALY_CRIT, anomaly_crit)] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must be within [0, 1], got {value}"
            );
        }
        if anomaly_warn > anomaly_crit {
            bail!("{ANOMALY_WARN} ({anomaly_warn}) must not exceed {ANOMALY_CRIT} ({anomaly_crit})");
        }

        ensure!(
            battery_low_battery_weight > 0.0 && battery_low_battery_weight <= 1.0,
            "{BATTERY_LOW_BATTERY_WEIGHT} must be within (0, 1], got {battery_low_battery_weight}"
        );

        Ok(())
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
