use crate::aircraft::NotifyPolicy;
use crate::enrichment::{DEFAULT_ROUTE_LOOKUP_URL, DEFAULT_TRACKING_SITE_URL};
use crate::ingestor::config::FeedConfig;

#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ApplicationConfig {
    pub feed: FeedConfig,
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    pub notification: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ApplicationConfig {
    pub fn construct_from_path(
        path: &std::path::Path,
    ) -> Result<ApplicationConfig, errors::ApplicationConfigError> {
        let string =
            std::fs::read_to_string(path).map_err(|error| errors::ApplicationConfigError::Io {
                source: error,
                path: path.to_path_buf(),
            })?;

        toml::from_str(&string).map_err(|error| errors::ApplicationConfigError::Parse {
            source: error,
            path: path.to_path_buf(),
        })
    }
}

fn default_receiver_url() -> String {
    String::from("http://localhost:8080")
}

/// Where the receiver's own position comes from.
///
/// `latitude`/`longitude` skip the HTTP bootstrap when both are set.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ReceiverConfig {
    #[serde(default = "default_receiver_url")]
    pub url: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            url: default_receiver_url(),
            latitude: None,
            longitude: None,
        }
    }
}

fn default_distance_nm() -> f64 {
    0.5
}

fn default_altitude_ft() -> f64 {
    3000.0
}

#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct NotifyConfig {
    #[serde(default = "default_distance_nm")]
    pub distance_nm: f64,
    #[serde(default = "default_altitude_ft")]
    pub altitude_ft: f64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig {
            distance_nm: default_distance_nm(),
            altitude_ft: default_altitude_ft(),
        }
    }
}

impl NotifyConfig {
    #[must_use]
    pub fn policy(&self) -> NotifyPolicy {
        NotifyPolicy {
            max_distance_nm: self.distance_nm,
            max_altitude_ft: self.altitude_ft,
        }
    }
}

fn default_enabled_services() -> String {
    String::from("adsbdb")
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_cache_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("cache")
}

fn default_route_lookup_url() -> String {
    String::from(DEFAULT_ROUTE_LOOKUP_URL)
}

fn default_tracking_site_url() -> String {
    String::from(DEFAULT_TRACKING_SITE_URL)
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ServicesConfig {
    /// Comma separated provider names, e.g. `"adsbdb, flightAware"`.
    #[serde(default = "default_enabled_services")]
    pub enabled: String,
    #[serde(default)]
    pub always_check: bool,
    #[serde(default)]
    pub airports_file: Option<std::path::PathBuf>,
    #[serde(default)]
    pub states_file: Option<std::path::PathBuf>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Where providers keep state across restarts.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: std::path::PathBuf,
    #[serde(default = "default_route_lookup_url")]
    pub route_lookup_url: String,
    #[serde(default = "default_tracking_site_url")]
    pub tracking_site_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        ServicesConfig {
            enabled: default_enabled_services(),
            always_check: false,
            airports_file: None,
            states_file: None,
            http_timeout_secs: default_http_timeout_secs(),
            cache_dir: default_cache_dir(),
            route_lookup_url: default_route_lookup_url(),
            tracking_site_url: default_tracking_site_url(),
        }
    }
}

impl ServicesConfig {
    #[must_use]
    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }
}

fn default_title() -> String {
    String::from("Flight")
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
pub struct NotificationConfig {
    /// Webhook aggregator endpoint the alert is posted to.
    pub api_url: String,
    #[serde(default)]
    pub urls: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub template_file: Option<std::path::PathBuf>,
}

#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<log::LevelFilter>,
}

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ApplicationConfigError {
        #[error("Failed to read config file '{}': {source}", path.display())]
        Io {
            source: std::io::Error,
            path: std::path::PathBuf,
        },

        #[error("Failed to parse config file '{}': {source}", path.display())]
        Parse {
            source: toml::de::Error,
            path: std::path::PathBuf,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::errors::ApplicationConfigError;
    use super::ApplicationConfig;

    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn when_only_required_fields_given_then_defaults_fill_the_rest() {
        let file = write_config(
            r#"
            [feed]
            host = "piaware.local"

            [notification]
            api_url = "http://apprise.local:8000/notify"
            "#,
        );

        let config = ApplicationConfig::construct_from_path(file.path()).expect("config loads");

        assert_eq!(config.feed.host, "piaware.local");
        assert_eq!(config.feed.port, 30047);
        assert_eq!(config.feed.reconnect_interval_ms, 15_000);
        assert_eq!(config.feed.max_reconnect_attempts, 5);
        assert_eq!(config.receiver.url, "http://localhost:8080");
        assert_eq!(config.receiver.latitude, None);
        assert!((config.notify.distance_nm - 0.5).abs() < f64::EPSILON);
        assert!((config.notify.altitude_ft - 3000.0).abs() < f64::EPSILON);
        assert_eq!(config.services.enabled, "adsbdb");
        assert!(!config.services.always_check);
        assert_eq!(config.services.http_timeout_secs, 10);
        assert_eq!(config.services.cache_dir, std::path::PathBuf::from("cache"));
        assert_eq!(config.services.route_lookup_url, "https://api.adsbdb.com");
        assert_eq!(config.notification.title, "Flight");
        assert_eq!(config.logging.level, None);
    }

    #[test]
    fn when_all_sections_given_then_values_are_used() {
        let file = write_config(
            r#"
            [feed]
            host = "10.0.0.5"
            port = 30003
            reconnect_interval_ms = 500
            max_reconnect_attempts = 12

            [receiver]
            url = "http://10.0.0.5:8080"
            latitude = 40.0
            longitude = -75.0

            [notify]
            distance_nm = 1.5
            altitude_ft = 10000

            [services]
            enabled = "adsbdb, flightAware"
            always_check = true
            airports_file = "/etc/overhead/airports.json"
            cache_dir = "/var/lib/overhead"

            [notification]
            api_url = "http://apprise.local:8000/notify"
            urls = "pover://user@token"
            title = "Overhead"

            [logging]
            level = "debug"
            "#,
        );

        let config = ApplicationConfig::construct_from_path(file.path()).expect("config loads");

        assert_eq!(config.feed.address(), "10.0.0.5:30003");
        assert_eq!(config.feed.max_reconnect_attempts, 12);
        assert_eq!(config.receiver.latitude, Some(40.0));
        let policy = config.notify.policy();
        assert!((policy.max_distance_nm - 1.5).abs() < f64::EPSILON);
        assert!((policy.max_altitude_ft - 10000.0).abs() < f64::EPSILON);
        assert_eq!(config.services.enabled, "adsbdb, flightAware");
        assert!(config.services.always_check);
        assert_eq!(
            config.services.airports_file.as_deref(),
            Some(std::path::Path::new("/etc/overhead/airports.json"))
        );
        assert_eq!(
            config.services.cache_dir,
            std::path::PathBuf::from("/var/lib/overhead")
        );
        assert_eq!(config.notification.urls, "pover://user@token");
        assert_eq!(config.logging.level, Some(log::LevelFilter::Debug));
    }

    #[test]
    fn when_notification_endpoint_missing_then_parse_fails() {
        let file = write_config(
            r#"
            [feed]
            host = "piaware.local"
            "#,
        );

        let error = ApplicationConfig::construct_from_path(file.path()).expect_err("must fail");
        assert!(matches!(error, ApplicationConfigError::Parse { .. }));
    }

    #[test]
    fn when_file_missing_then_io_error_names_the_path() {
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("missing.toml");

        let error = ApplicationConfig::construct_from_path(&path).expect_err("must fail");

        assert!(matches!(error, ApplicationConfigError::Io { .. }));
        assert!(error.to_string().contains("missing.toml"));
    }
}
