//! Configuration for the registration proxy.

use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Proxy configuration.
///
/// The three Matrix settings are read from `MATRIX_TOKEN`, `MATRIX_SERVER`
/// and `MATRIX_SHARED_SECRET`; nested sections use `__` as separator
/// (e.g. `ABUSE__THRESHOLD=5`).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Token users must present to register
    pub matrix_token: SecretString,

    /// Homeserver base URL
    pub matrix_server: String,

    /// Synapse `registration_shared_secret`
    pub matrix_shared_secret: SecretString,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Homeserver client configuration
    #[serde(default)]
    pub homeserver: HomeserverConfig,

    /// Abuse tracking configuration
    #[serde(default)]
    pub abuse: AbuseConfig,

    /// Input validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Take the client address from `X-Forwarded-For` (only behind a trusted proxy)
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// Header carrying a client fingerprint set by a trusted proxy
    #[serde(default)]
    pub fingerprint_header: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HomeserverConfig {
    /// Timeout applied to each admin API call
    #[serde(default = "default_homeserver_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbuseConfig {
    /// Counted failures before an actor is blocked
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// How long a block lasts
    #[serde(default = "default_block_duration", with = "humantime_serde")]
    pub block_duration: Duration,

    /// Failures older than this no longer count
    #[serde(default = "default_failure_window", with = "humantime_serde")]
    pub failure_window: Duration,

    /// Upper bound on tracked actors
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Interval of the background sweep of expired records
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// Whether "user already exists" counts as a failure
    #[serde(default)]
    pub count_user_exists: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Minimum password length in characters
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Submissions per minute from one client address
    #[serde(default = "default_per_client_rpm")]
    pub per_client_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl ServerConfig {
    /// Address the HTTP server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .listen_addr
            .parse()
            .with_context(|| format!("SERVER__LISTEN_ADDR is not an IP address: {}", self.listen_addr))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            trust_forwarded_for: false,
            fingerprint_header: None,
        }
    }
}

impl Default for HomeserverConfig {
    fn default() -> Self {
        Self {
            timeout: default_homeserver_timeout(),
        }
    }
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            block_duration: default_block_duration(),
            failure_window: default_failure_window(),
            max_entries: default_max_entries(),
            sweep_interval: default_sweep_interval(),
            count_user_exists: false,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_client_per_minute: default_per_client_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_homeserver_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_threshold() -> u32 {
    5
}

fn default_block_duration() -> Duration {
    Duration::from_secs(6 * 60 * 60)
}

fn default_failure_window() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_max_entries() -> usize {
    100_000
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_min_password_length() -> usize {
    3
}

fn default_per_client_rpm() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.normalize()?;
        Ok(config)
    }

    /// Trim the server URL and reject settings the broker cannot run with.
    pub fn normalize(&mut self) -> Result<()> {
        self.matrix_server = self.matrix_server.trim_end_matches('/').to_string();

        if !self.matrix_server.starts_with("http://") && !self.matrix_server.starts_with("https://")
        {
            bail!("MATRIX_SERVER must be an http(s) URL");
        }
        if self.matrix_token.expose_secret().is_empty() {
            bail!("MATRIX_TOKEN must not be empty");
        }
        if self.matrix_shared_secret.expose_secret().is_empty() {
            bail!("MATRIX_SHARED_SECRET must not be empty");
        }
        if self.abuse.threshold == 0 {
            bail!("ABUSE__THRESHOLD must be at least 1");
        }
        if self.abuse.max_entries == 0 {
            bail!("ABUSE__MAX_ENTRIES must be at least 1");
        }
        self.server.socket_addr()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Config {
        serde_json::from_value(serde_json::json!({
            "matrix_token": "letmein",
            "matrix_server": "https://matrix.example.org/",
            "matrix_shared_secret": "s3cr3t",
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = minimal();
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.trust_forwarded_for);
        assert_eq!(config.abuse.threshold, 5);
        assert_eq!(config.abuse.block_duration, Duration::from_secs(21_600));
        assert!(!config.abuse.count_user_exists);
        assert_eq!(config.validation.min_password_length, 3);
        assert_eq!(config.homeserver.timeout, Duration::from_secs(10));
        assert_eq!(config.rate_limit.per_client_per_minute, 10);
    }

    #[test]
    fn test_normalize_trims_trailing_slash() {
        let mut config = minimal();
        config.normalize().unwrap();
        assert_eq!(config.matrix_server, "https://matrix.example.org");
    }

    #[test]
    fn test_normalize_rejects_bad_values() {
        let mut config = minimal();
        config.matrix_server = "matrix.example.org".into();
        assert!(config.normalize().is_err());

        let mut config = minimal();
        config.abuse.threshold = 0;
        assert!(config.normalize().is_err());
    }

    #[test]
    fn test_listen_addr() {
        let mut config = minimal();
        config.server.listen_addr = "127.0.0.1".into();
        config.server.port = 9000;
        config.normalize().unwrap();
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );

        for bad in ["localhost", "0.0.0.0:8080", "", "300.1.1.1"] {
            let mut config = minimal();
            config.server.listen_addr = bad.into();
            assert!(config.normalize().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_humantime_durations() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "matrix_token": "t",
            "matrix_server": "http://localhost:8008",
            "matrix_shared_secret": "s",
            "abuse": { "block_duration": "2h", "sweep_interval": "30s" },
        }))
        .unwrap();
        assert_eq!(config.abuse.block_duration, Duration::from_secs(7200));
        assert_eq!(config.abuse.sweep_interval, Duration::from_secs(30));
    }
}
