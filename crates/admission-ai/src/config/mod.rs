use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::verification::{Platform, ProviderConfig};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 90;

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub verification: VerificationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            verification: VerificationConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Provider credentials, call limits, and the document root used by verification runs.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub providers: Vec<ProviderConfig>,
    /// `None` lets provider calls run without a deadline.
    pub provider_timeout: Option<Duration>,
    pub document_root: PathBuf,
}

impl VerificationConfig {
    fn load() -> Result<Self, ConfigError> {
        let timeout_secs = match env::var("APP_PROVIDER_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout)?,
            Err(_) => DEFAULT_PROVIDER_TIMEOUT_SECS,
        };
        let provider_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        let document_root = env::var("APP_DOCUMENT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./documents"));

        let mut providers = Vec::new();
        for platform in Platform::ALL {
            if let Some(config) = load_provider(platform)? {
                providers.push(config);
            }
        }

        Ok(Self {
            providers,
            provider_timeout,
            document_root,
        })
    }
}

fn load_provider(platform: Platform) -> Result<Option<ProviderConfig>, ConfigError> {
    let prefix = platform.env_prefix();
    let credential = match env::var(format!("APP_{prefix}_API_KEY")) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => return Ok(None),
    };

    let model = env::var(format!("APP_{prefix}_MODEL"))
        .unwrap_or_else(|_| platform.default_model().to_string());

    let enabled_var = format!("APP_{prefix}_ENABLED");
    let enabled = match env::var(&enabled_var) {
        Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag { name: enabled_var })?,
        Err(_) => true,
    };

    let endpoint = env::var(format!("APP_{prefix}_ENDPOINT")).ok();

    Ok(Some(ProviderConfig {
        platform,
        credential,
        model,
        enabled,
        endpoint,
    }))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidFlag { name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "APP_PROVIDER_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidFlag { name } => {
                write!(f, "{name} must be one of true/false/1/0/yes/no/on/off")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}
