use crate::position::Accuracy;
use crate::sensor::SamplingRate;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelemetryConfig {
    pub position: PositionConfig,
    pub sensors: SensorsConfig,
    pub classifier: ClassifierConfig,
    pub activation: ActivationConfig,
    pub notification: NotificationConfig,
    pub simulation: SimulationConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PositionConfig {
    /// Requested interval between position batches in milliseconds
    #[serde(default = "default_position_interval_ms")]
    pub interval_ms: u64,

    /// Requested accuracy class
    #[serde(default)]
    pub accuracy: Accuracy,

    /// Per-consumer queue depth; older fixes are dropped for slow consumers
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SensorsConfig {
    /// Sampling rate requested for both channels
    #[serde(default)]
    pub rate: SamplingRate,

    /// Start both channels when the presentation first becomes visible
    #[serde(default = "default_start_on_launch")]
    pub start_on_launch: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    /// Gravity constant subtracted from accelerometer magnitudes (m/s²)
    #[serde(default = "default_gravity")]
    pub gravity: f64,

    /// Net acceleration thresholds for low, medium and high intensity
    #[serde(default = "default_accelerometer_thresholds")]
    pub accelerometer_thresholds: [f64; 3],

    /// Angular rate thresholds (rad/s)
    #[serde(default = "default_gyroscope_thresholds")]
    pub gyroscope_thresholds: [f64; 3],
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActivationConfig {
    /// Start the notification bridge even when only the background tier was refused
    #[serde(default)]
    pub notify_on_background_denial: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Identifier of the single ongoing notice
    #[serde(default = "default_notice_id")]
    pub notice_id: u32,

    #[serde(default = "default_notice_title")]
    pub title: String,
}

/// Behaviour of the simulated host subsystems
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulationConfig {
    #[serde(default)]
    pub foreground_granted: bool,

    #[serde(default)]
    pub background_granted: bool,

    #[serde(default = "default_true")]
    pub grant_foreground_on_request: bool,

    #[serde(default = "default_true")]
    pub grant_background_on_request: bool,

    #[serde(default = "default_true")]
    pub background_tier_supported: bool,

    /// Time a simulated permission prompt stays open
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_true")]
    pub accelerometer_present: bool,

    #[serde(default = "default_true")]
    pub gyroscope_present: bool,

    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    #[serde(default = "default_origin_latitude")]
    pub origin_latitude: f64,

    #[serde(default = "default_origin_longitude")]
    pub origin_longitude: f64,

    /// Whether the simulated notice host supports named channels
    #[serde(default = "default_true")]
    pub notice_channels_supported: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Interval between console status reports
    #[serde(default = "default_report_interval_seconds")]
    pub report_interval_seconds: u64,

    /// Read single-key commands from the terminal
    #[serde(default)]
    pub keyboard_enabled: bool,
}

impl TelemetryConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("loctrack.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("position.interval_ms", default_position_interval_ms())?
            .set_default("position.accuracy", "High")?
            .set_default(
                "position.subscriber_buffer",
                default_subscriber_buffer() as i64,
            )?
            .set_default("sensors.rate", "Normal")?
            .set_default("sensors.start_on_launch", default_start_on_launch())?
            .set_default("classifier.gravity", default_gravity())?
            .set_default(
                "classifier.accelerometer_thresholds",
                default_accelerometer_thresholds().to_vec(),
            )?
            .set_default(
                "classifier.gyroscope_thresholds",
                default_gyroscope_thresholds().to_vec(),
            )?
            .set_default("activation.notify_on_background_denial", false)?
            .set_default("notification.channel_id", default_channel_id())?
            .set_default("notification.channel_name", default_channel_name())?
            .set_default("notification.notice_id", default_notice_id())?
            .set_default("notification.title", default_notice_title())?
            .set_default("simulation.foreground_granted", false)?
            .set_default("simulation.background_granted", false)?
            .set_default("simulation.grant_foreground_on_request", true)?
            .set_default("simulation.grant_background_on_request", true)?
            .set_default("simulation.background_tier_supported", true)?
            .set_default("simulation.request_delay_ms", default_request_delay_ms())?
            .set_default("simulation.accelerometer_present", true)?
            .set_default("simulation.gyroscope_present", true)?
            .set_default(
                "simulation.sample_interval_ms",
                default_sample_interval_ms(),
            )?
            .set_default("simulation.origin_latitude", default_origin_latitude())?
            .set_default("simulation.origin_longitude", default_origin_longitude())?
            .set_default("simulation.notice_channels_supported", true)?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default(
                "system.report_interval_seconds",
                default_report_interval_seconds(),
            )?
            .set_default("system.keyboard_enabled", false)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // LOCTRACK_<SECTION>__<KEY>, e.g. LOCTRACK_POSITION__INTERVAL_MS
            .add_source(
                Environment::with_prefix("LOCTRACK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: TelemetryConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.position.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Position interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.position.subscriber_buffer == 0 {
            return Err(ConfigError::Message(
                "Position subscriber_buffer must be greater than 0".to_string(),
            ));
        }

        if !(self.classifier.gravity > 0.0) {
            return Err(ConfigError::Message(
                "Classifier gravity must be greater than 0".to_string(),
            ));
        }

        validate_thresholds(
            "accelerometer_thresholds",
            &self.classifier.accelerometer_thresholds,
        )?;
        validate_thresholds(
            "gyroscope_thresholds",
            &self.classifier.gyroscope_thresholds,
        )?;

        if self.notification.channel_id.trim().is_empty() {
            return Err(ConfigError::Message(
                "Notification channel_id must not be empty".to_string(),
            ));
        }

        if self.simulation.sample_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Simulation sample_interval_ms must be greater than 0".to_string(),
            ));
        }

        if !(-90.0..=90.0).contains(&self.simulation.origin_latitude)
            || !(-180.0..=180.0).contains(&self.simulation.origin_longitude)
        {
            return Err(ConfigError::Message(
                "Simulation origin must be a valid latitude/longitude".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.system.report_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Report interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_thresholds(name: &str, thresholds: &[f64; 3]) -> Result<(), ConfigError> {
    let [low, medium, high] = *thresholds;
    if !(low >= 0.0 && low < medium && medium < high) {
        return Err(ConfigError::Message(format!(
            "Classifier {} must be non-negative and strictly ascending, got {:?}",
            name, thresholds
        )));
    }
    Ok(())
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            position: PositionConfig {
                interval_ms: default_position_interval_ms(),
                accuracy: Accuracy::default(),
                subscriber_buffer: default_subscriber_buffer(),
            },
            sensors: SensorsConfig {
                rate: SamplingRate::default(),
                start_on_launch: default_start_on_launch(),
            },
            classifier: ClassifierConfig {
                gravity: default_gravity(),
                accelerometer_thresholds: default_accelerometer_thresholds(),
                gyroscope_thresholds: default_gyroscope_thresholds(),
            },
            activation: ActivationConfig {
                notify_on_background_denial: false,
            },
            notification: NotificationConfig {
                channel_id: default_channel_id(),
                channel_name: default_channel_name(),
                notice_id: default_notice_id(),
                title: default_notice_title(),
            },
            simulation: SimulationConfig {
                foreground_granted: false,
                background_granted: false,
                grant_foreground_on_request: true,
                grant_background_on_request: true,
                background_tier_supported: true,
                request_delay_ms: default_request_delay_ms(),
                accelerometer_present: true,
                gyroscope_present: true,
                sample_interval_ms: default_sample_interval_ms(),
                origin_latitude: default_origin_latitude(),
                origin_longitude: default_origin_longitude(),
                notice_channels_supported: true,
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                report_interval_seconds: default_report_interval_seconds(),
                keyboard_enabled: false,
            },
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_position_interval_ms() -> u64 {
    5000
}
fn default_subscriber_buffer() -> usize {
    16
}

fn default_start_on_launch() -> bool {
    true
}

fn default_gravity() -> f64 {
    crate::classifier::STANDARD_GRAVITY
}
fn default_accelerometer_thresholds() -> [f64; 3] {
    [0.5, 1.5, 3.0]
}
fn default_gyroscope_thresholds() -> [f64; 3] {
    [0.3, 1.0, 2.0]
}

fn default_channel_id() -> String {
    "location_channel".to_string()
}
fn default_channel_name() -> String {
    "Location Service".to_string()
}
fn default_notice_id() -> u32 {
    1
}
fn default_notice_title() -> String {
    "Location Tracker".to_string()
}

fn default_request_delay_ms() -> u64 {
    500
}
fn default_sample_interval_ms() -> u64 {
    200
}
fn default_origin_latitude() -> f64 {
    37.4220
}
fn default_origin_longitude() -> f64 {
    -122.0841
}

fn default_event_bus_capacity() -> usize {
    100
}
fn default_report_interval_seconds() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.position.interval_ms, 5000);
        assert_eq!(config.position.accuracy, Accuracy::High);
        assert_eq!(config.sensors.rate, SamplingRate::Normal);
        assert_eq!(config.classifier.accelerometer_thresholds, [0.5, 1.5, 3.0]);
        assert_eq!(config.notification.channel_id, "location_channel");
        assert_eq!(config.notification.notice_id, 1);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TelemetryConfig::load_from_file(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.position.subscriber_buffer, 16);
        assert_eq!(config.classifier.gravity, 9.8);
        assert_eq!(config.notification.title, "Location Tracker");
        assert!(config.sensors.start_on_launch);
        assert!(!config.activation.notify_on_background_denial);
    }

    #[test]
    fn test_load_from_file_overrides() {
        let file = write_config(
            r#"
[position]
interval_ms = 1000
accuracy = "Balanced"

[sensors]
rate = "Game"

[classifier]
gyroscope_thresholds = [0.1, 0.2, 0.4]

[activation]
notify_on_background_denial = true

[simulation]
background_tier_supported = false
"#,
        );

        let config = TelemetryConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.position.interval_ms, 1000);
        assert_eq!(config.position.accuracy, Accuracy::Balanced);
        assert_eq!(config.position.subscriber_buffer, 16);
        assert_eq!(config.sensors.rate, SamplingRate::Game);
        assert_eq!(config.classifier.gyroscope_thresholds, [0.1, 0.2, 0.4]);
        assert_eq!(config.classifier.accelerometer_thresholds, [0.5, 1.5, 3.0]);
        assert!(config.activation.notify_on_background_denial);
        assert!(!config.simulation.background_tier_supported);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_variable_override() {
        env::set_var("LOCTRACK_NOTIFICATION__CHANNEL_NAME", "Tracking");

        let dir = tempfile::tempdir().unwrap();
        let config = TelemetryConfig::load_from_file(dir.path().join("absent.toml"));

        env::remove_var("LOCTRACK_NOTIFICATION__CHANNEL_NAME");

        assert_eq!(config.unwrap().notification.channel_name, "Tracking");
    }

    #[test]
    fn test_config_validation() {
        let mut config = TelemetryConfig::default();

        config.position.interval_ms = 0;
        assert!(config.validate().is_err());
        config.position.interval_ms = 5000;

        config.classifier.accelerometer_thresholds = [1.5, 0.5, 3.0];
        assert!(config.validate().is_err());
        config.classifier.accelerometer_thresholds = [0.5, 1.5, 3.0];

        config.classifier.gravity = 0.0;
        assert!(config.validate().is_err());
        config.classifier.gravity = 9.8;

        config.system.event_bus_capacity = 0;
        assert!(config.validate().is_err());
        config.system.event_bus_capacity = 100;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serializes_to_toml() {
        let config = TelemetryConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();

        assert!(rendered.contains("[position]"));
        assert!(rendered.contains("accuracy = \"High\""));
        assert!(rendered.contains("channel_id = \"location_channel\""));
    }
}
