use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::scoring::{
    CategoryId, CategoryWeight, CompositePolicy, ReadinessBlueprint, ScoringError,
};

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
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
        let format = LogFormat::parse(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        )?;

        let category_weights = match env::var("READINESS_CATEGORY_WEIGHTS") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_category_weights(&raw)?),
            _ => None,
        };
        let require_complete = match env::var("READINESS_REQUIRE_COMPLETE") {
            Ok(raw) => parse_flag(&raw)?,
            Err(_) => false,
        };

        let scoring = ScoringConfig {
            category_weights,
            require_complete,
        };
        scoring.policy_override()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            scoring,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat(raw.to_string())),
        }
    }
}

/// Composite policy overrides applied on top of the standard blueprint.
#[derive(Debug, Clone, Default)]
pub struct ScoringConfig {
    pub category_weights: Option<Vec<CategoryWeight>>,
    pub require_complete: bool,
}

impl ScoringConfig {
    fn policy_override(&self) -> Result<Option<CompositePolicy>, ConfigError> {
        self.category_weights
            .clone()
            .map(|weights| CompositePolicy::new(weights, self.require_complete))
            .transpose()
            .map_err(ConfigError::InvalidPolicy)
    }

    /// Applies the configured policy to a blueprint.
    pub fn apply(&self, blueprint: ReadinessBlueprint) -> Result<ReadinessBlueprint, ConfigError> {
        let policy = match self.policy_override()? {
            Some(policy) => policy,
            None => blueprint
                .policy()
                .clone()
                .requiring_completion(self.require_complete),
        };
        blueprint
            .with_policy(policy)
            .map_err(ConfigError::InvalidPolicy)
    }
}

/// Parses `category=weight` pairs separated by commas.
fn parse_category_weights(raw: &str) -> Result<Vec<CategoryWeight>, ConfigError> {
    raw.split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let (key, weight) = pair
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidCategoryWeights(pair.trim().to_string()))?;
            let category = key
                .parse::<CategoryId>()
                .map_err(|_| ConfigError::InvalidCategoryWeights(pair.trim().to_string()))?;
            let weight = weight
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidCategoryWeights(pair.trim().to_string()))?;
            Ok(CategoryWeight::new(category, weight))
        })
        .collect()
}

fn parse_flag(raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag(raw.to_string())),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidCategoryWeights(String),
    InvalidFlag(String),
    InvalidPolicy(ScoringError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json' (found '{value}')")
            }
            ConfigError::InvalidCategoryWeights(pair) => write!(
                f,
                "READINESS_CATEGORY_WEIGHTS entries must look like 'pointer_2=25' (found '{pair}')"
            ),
            ConfigError::InvalidFlag(value) => {
                write!(f, "READINESS_REQUIRE_COMPLETE must be true or false (found '{value}')")
            }
            ConfigError::InvalidPolicy(err) => write!(f, "invalid composite policy: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPolicy(err) => Some(err),
            ConfigError::InvalidPort
            | ConfigError::InvalidLogFormat(_)
            | ConfigError::InvalidCategoryWeights(_)
            | ConfigError::InvalidFlag(_) => None,
        }
    }
}
