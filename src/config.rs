//! Server configuration loaded from the environment.
//!
//! Every setting has a default. A variable that is set but cannot be parsed
//! is an error rather than a silent fallback.

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::optimization::DEFAULT_TIMEOUT_SECS;
use crate::optimizer::{DEFAULT_AVERAGE_SPEED_KMPH, DEFAULT_FUEL_L_PER_100KM};

/// Default port for the HTTP server.
pub const DEFAULT_PORT: u16 = 7860;

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings for the dashboard server.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Upper bound on a single optimization run.
    pub optimize_timeout: Duration,
    pub average_speed_kmph: f64,
    pub fuel_l_per_100km: f64,
    /// Seed the demo dataset at startup.
    pub seed_demo: bool,
    /// Print the banner and run summaries to stdout.
    pub console: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            optimize_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            average_speed_kmph: DEFAULT_AVERAGE_SPEED_KMPH,
            fuel_l_per_100km: DEFAULT_FUEL_L_PER_100KM,
            seed_demo: false,
            console: true,
        }
    }
}

impl AppConfig {
    /// Loads configuration from process environment variables.
    ///
    /// Optional variables:
    /// - `LOGISTICS_HOST` -- bind address (default `0.0.0.0`)
    /// - `LOGISTICS_PORT` -- bind port (default `7860`)
    /// - `LOGISTICS_OPTIMIZE_TIMEOUT_SECS` -- optimizer timeout (default `30`)
    /// - `LOGISTICS_AVERAGE_SPEED_KMPH` -- speed used for time savings (default `40`)
    /// - `LOGISTICS_FUEL_L_PER_100KM` -- consumption used for fuel savings (default `12`)
    /// - `LOGISTICS_SEED_DEMO` -- seed demo data at startup (default `false`)
    /// - `LOGISTICS_CONSOLE` -- colored console output (default `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value if set.
    ///
    /// ```
    /// use logistics_dashboard::config::AppConfig;
    ///
    /// let config = AppConfig::from_lookup(|key| match key {
    ///     "LOGISTICS_PORT" => Some("8080".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.port, 8080);
    /// assert!(!config.seed_demo);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout_key = "LOGISTICS_OPTIMIZE_TIMEOUT_SECS";
        let timeout_secs: u64 = load(&lookup, timeout_key, DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(out_of_range(timeout_key, timeout_secs, "must be at least 1 second"));
        }

        let speed_key = "LOGISTICS_AVERAGE_SPEED_KMPH";
        let average_speed_kmph = load(&lookup, speed_key, defaults.average_speed_kmph)?;
        if !(average_speed_kmph > 0.0 && average_speed_kmph.is_finite()) {
            return Err(out_of_range(speed_key, average_speed_kmph, "must be a positive number"));
        }

        let fuel_key = "LOGISTICS_FUEL_L_PER_100KM";
        let fuel_l_per_100km = load(&lookup, fuel_key, defaults.fuel_l_per_100km)?;
        if !(fuel_l_per_100km >= 0.0 && fuel_l_per_100km.is_finite()) {
            return Err(out_of_range(fuel_key, fuel_l_per_100km, "must be a non-negative number"));
        }

        Ok(Self {
            host: load(&lookup, "LOGISTICS_HOST", defaults.host)?,
            port: load(&lookup, "LOGISTICS_PORT", defaults.port)?,
            optimize_timeout: Duration::from_secs(timeout_secs),
            average_speed_kmph,
            fuel_l_per_100km,
            seed_demo: load(&lookup, "LOGISTICS_SEED_DEMO", defaults.seed_demo)?,
            console: load(&lookup, "LOGISTICS_CONSOLE", defaults.console)?,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn load<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn out_of_range(key: &'static str, value: impl Display, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
