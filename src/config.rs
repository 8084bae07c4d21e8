use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::sync::Semaphore;
use url::Url;

use crate::error::Error;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings shared by every component, loaded once at startup.
///
/// The target lists live in the same file but are read separately by
/// [`crate::registry::TargetRegistry::load`], so a broken target list never
/// prevents the monitor itself from starting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub webhook_url: String,
    pub send_alerts: bool,
    pub retain_logs: bool,
    pub check_file_size: bool,
    pub max_file_size_mb: u64,
    pub concurrent_requests: usize,
    /// Per-request timeout in seconds.
    pub timeout: f64,
    pub global_accessibility_texts: Vec<String>,
    /// Number of rounds to run, `-1` runs forever.
    pub num_runs: i64,
    /// Pause between rounds in seconds.
    pub iteration_delay: f64,
    pub log_file: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            send_alerts: false,
            retain_logs: true,
            check_file_size: false,
            max_file_size_mb: 2048,
            concurrent_requests: 10,
            timeout: 10.0,
            global_accessibility_texts: Vec::new(),
            num_runs: 1,
            iteration_delay: 0.0,
            log_file: PathBuf::from("app.log"),
        }
    }
}

impl MonitorConfig {
    /// Loads and validates the settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if alerts are
    /// enabled without a usable webhook URL, or if a numeric setting is out
    /// of range.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<MonitorConfig, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates settings from TOML text.
    ///
    /// # Errors
    ///
    /// Same as [`MonitorConfig::load`], minus the I/O failures.
    pub fn from_toml(content: &str) -> Result<MonitorConfig, Error> {
        let mut config: MonitorConfig = toml::from_str(content)?;

        // if webhook_url is not set but alerts are wanted, use env with dotenvy
        if config.send_alerts && config.webhook_url.is_empty() {
            config.webhook_url = dotenvy::var("WEBHOOK_URL")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the scheduler and checker rely on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending setting, or
    /// [`Error::WebhookUrl`] for a malformed webhook URL.
    pub fn validate(&self) -> Result<(), Error> {
        if self.concurrent_requests == 0 {
            return Err(Error::Config(
                "concurrent_requests must be greater than 0".to_string(),
            ));
        }
        if self.concurrent_requests > Semaphore::MAX_PERMITS {
            return Err(Error::Config(format!(
                "concurrent_requests must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.concurrent_requests
            )));
        }
        if Duration::try_from_secs_f64(self.timeout).is_err() || self.timeout <= 0.0 {
            return Err(Error::Config(format!(
                "timeout must be a positive, representable number of seconds, got {}",
                self.timeout
            )));
        }
        if Duration::try_from_secs_f64(self.iteration_delay).is_err() {
            return Err(Error::Config(format!(
                "iteration_delay must be a non-negative, representable number of seconds, got {}",
                self.iteration_delay
            )));
        }
        if self.num_runs < -1 {
            return Err(Error::Config(format!(
                "num_runs must be -1 (run forever) or at least 0, got {}",
                self.num_runs
            )));
        }
        if self.send_alerts {
            Url::parse(&self.webhook_url)?;
        }
        Ok(())
    }

    /// Per-request timeout. Unrepresentable values, which
    /// [`MonitorConfig::validate`] rejects, saturate to [`Duration::MAX`].
    #[must_use]
    pub fn timeout_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout).unwrap_or(Duration::MAX)
    }

    /// Pause between rounds, saturating like
    /// [`MonitorConfig::timeout_duration`].
    #[must_use]
    pub fn iteration_delay_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.iteration_delay).unwrap_or(Duration::MAX)
    }

    /// `None` when the monitor should run until stopped.
    #[must_use]
    pub fn run_limit(&self) -> Option<u64> {
        u64::try_from(self.num_runs).ok()
    }

    /// Size in bytes above which the log file is deleted after a run.
    #[must_use]
    pub fn max_log_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Finds the config file to use.
///
/// `WEBMONITOR_CONFIG` wins, then `config.toml` in the working directory,
/// then `webmonitor/config.toml` under the user's config directory.
pub fn default_path() -> PathBuf {
    if let Ok(path) = dotenvy::var("WEBMONITOR_CONFIG") {
        return PathBuf::from(path);
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return local;
    }

    dirs::config_dir()
        .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE_NAME))
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_toml() {
        let toml_content = r#"
            webhook_url = "https://chat.example.com/hooks/abcdefg"
            send_alerts = true
            retain_logs = false
            check_file_size = true
            max_file_size_mb = 5
            concurrent_requests = 4
            timeout = 2.5
            global_accessibility_texts = ["Welcome", "Sign in"]
            num_runs = -1
            iteration_delay = 30

            [[do_not_monitor]]
            url = "https://intranet.example.com"

            [[monitor]]
            url = "https://www.example.com"
        "#;

        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        write!(temp_file, "{toml_content}").expect("Failed to write to temp file");

        let config = MonitorConfig::load(temp_file.path()).expect("Failed to parse config");

        assert_eq!(config.webhook_url, "https://chat.example.com/hooks/abcdefg");
        assert!(config.send_alerts);
        assert!(!config.retain_logs);
        assert!(config.check_file_size);
        assert_eq!(config.max_log_bytes(), 5 * 1024 * 1024);
        assert_eq!(config.concurrent_requests, 4);
        assert_eq!(config.timeout_duration(), Duration::from_millis(2500));
        assert_eq!(config.global_accessibility_texts, vec!["Welcome", "Sign in"]);
        assert_eq!(config.run_limit(), None);
        assert_eq!(config.iteration_delay_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = MonitorConfig::from_toml("").expect("Empty config should be valid");

        assert_eq!(config.webhook_url, "");
        assert!(!config.send_alerts);
        assert!(config.retain_logs);
        assert!(!config.check_file_size);
        assert_eq!(config.max_file_size_mb, 2048);
        assert_eq!(config.concurrent_requests, 10);
        assert_eq!(config.timeout_duration(), Duration::from_secs(10));
        assert!(config.global_accessibility_texts.is_empty());
        assert_eq!(config.run_limit(), Some(1));
        assert_eq!(config.iteration_delay_duration(), Duration::ZERO);
        assert_eq!(config.log_file, PathBuf::from("app.log"));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let err = MonitorConfig::from_toml("concurrent_requests = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_non_positive_timeout_is_rejected() {
        let err = MonitorConfig::from_toml("timeout = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        let err = MonitorConfig::from_toml("iteration_delay = -1").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_concurrency_above_semaphore_capacity_is_rejected() {
        let err = MonitorConfig::from_toml("concurrent_requests = 4000000000000000000").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");

        let at_capacity = format!("concurrent_requests = {}", Semaphore::MAX_PERMITS);
        assert!(MonitorConfig::from_toml(&at_capacity).is_ok());
    }

    #[test]
    fn test_huge_timeout_is_rejected() {
        let err = MonitorConfig::from_toml("timeout = 1e20").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_huge_delay_is_rejected() {
        let err = MonitorConfig::from_toml("iteration_delay = 1e20").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_duration_helpers_saturate_on_unvalidated_values() {
        let config = MonitorConfig {
            timeout: 1e20,
            iteration_delay: f64::NAN,
            ..MonitorConfig::default()
        };
        assert_eq!(config.timeout_duration(), Duration::MAX);
        assert_eq!(config.iteration_delay_duration(), Duration::MAX);
    }

    #[test]
    #[serial]
    fn test_webhook_falls_back_to_env() {
        // SAFETY: env access is serialized across tests with #[serial]
        unsafe { std::env::set_var("WEBHOOK_URL", "https://chat.example.com/hooks/from-env") };

        let config = MonitorConfig::from_toml("send_alerts = true");

        unsafe { std::env::remove_var("WEBHOOK_URL") };
        let config = config.expect("Webhook should come from the environment");
        assert_eq!(config.webhook_url, "https://chat.example.com/hooks/from-env");
    }

    #[test]
    #[serial]
    fn test_missing_webhook_env_is_an_error() {
        // SAFETY: env access is serialized across tests with #[serial]
        unsafe { std::env::remove_var("WEBHOOK_URL") };

        let err = MonitorConfig::from_toml("send_alerts = true").unwrap_err();
        assert!(matches!(err, Error::MissingWebhook(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_num_runs_below_minus_one_is_rejected() {
        let err = MonitorConfig::from_toml("num_runs = -2").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_malformed_webhook_is_rejected_when_alerting() {
        let err = MonitorConfig::from_toml(
            r#"
            send_alerts = true
            webhook_url = "not a url"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::WebhookUrl(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_malformed_webhook_is_ignored_without_alerts() {
        let config = MonitorConfig::from_toml(r#"webhook_url = "not a url""#)
            .expect("Webhook is unused when alerts are off");
        assert!(!config.send_alerts);
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let err = MonitorConfig::from_toml("timeout = ").unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let err = MonitorConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "unexpected error: {err}");
    }
}
