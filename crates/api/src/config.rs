//! Startup configuration.
//!
//! Loaded and validated once in `main`; the typed [`AppConfig`] is then passed
//! into every component that needs it. Nothing reads the process environment
//! after startup.

use core::num::NonZeroU32;
use core::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_AUTH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 20;
const DEFAULT_RATE_LIMIT_BURST: u32 = 40;
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

const DATABASE_SCHEMES: [&str; 2] = ["postgres://", "postgresql://"];
const DATABASE_SCHEME_MESSAGE: &str = "DATABASE_URL must use the postgres:// or postgresql:// scheme";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Every absent or unparseable item, reported together.
    #[error("{}", describe_incomplete(.missing, .invalid))]
    Incomplete {
        missing: Vec<&'static str>,
        invalid: Vec<String>,
    },

    /// The only problem is the database URL scheme. Alongside other problems
    /// it is listed under `invalid` instead.
    #[error("{DATABASE_SCHEME_MESSAGE}")]
    UnsupportedDatabaseScheme,
}

fn describe_incomplete(missing: &[&'static str], invalid: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!(
            "missing required configuration: {}",
            missing.join(", ")
        ));
    }
    if !invalid.is_empty() {
        parts.push(format!("invalid configuration: {}", invalid.join(", ")));
    }
    parts.join("; ")
}

#[derive(Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    pub jwt_secret: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub webhook_secret: String,
    /// Allowed cross-origin values. Empty means permissive (never in production).
    pub cors_origins: Vec<HeaderValue>,
    /// Budget for the whole authorization pipeline of one request.
    pub auth_timeout: Duration,
    pub rate_limit_per_second: NonZeroU32,
    pub rate_limit_burst: NonZeroU32,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("port", &self.port)
            .field("jwt_secret", &"<redacted>")
            .field("database_url", &"<redacted>")
            .field("database_max_connections", &self.database_max_connections)
            .field("webhook_secret", &"<redacted>")
            .field("cors_origins", &self.cors_origins)
            .field("auth_timeout", &self.auth_timeout)
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build and validate the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        let mut required = |key: &'static str| {
            let value = get(key);
            if value.is_none() {
                missing.push(key);
            }
            value
        };
        let jwt_secret = required("JWT_SECRET");
        let database_url = required("DATABASE_URL");
        let webhook_secret = required("WEBHOOK_SECRET");

        let scheme_ok = database_url
            .as_deref()
            .is_none_or(|url| DATABASE_SCHEMES.iter().any(|s| url.starts_with(s)));

        let environment = match get("APP_ENV") {
            None => Environment::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                invalid.push(format!("APP_ENV ({raw:?} is not development, test or production)"));
                Environment::default()
            }),
        };

        let cors_raw = get("CORS_ORIGIN");
        if environment.is_production() && cors_raw.is_none() {
            missing.push("CORS_ORIGIN");
        }
        let mut cors_origins = Vec::new();
        for origin in cors_raw.iter().flat_map(|v| v.split(',')).map(str::trim) {
            if origin.is_empty() {
                continue;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => cors_origins.push(value),
                Err(_) => invalid.push(format!("CORS_ORIGIN ({origin:?} is not a valid origin)")),
            }
        }

        let port = parse_or(&get, "PORT", DEFAULT_PORT, &mut invalid);
        let auth_timeout_ms = parse_or(&get, "AUTH_TIMEOUT_MS", DEFAULT_AUTH_TIMEOUT_MS, &mut invalid);
        let database_max_connections = parse_or(
            &get,
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_DATABASE_MAX_CONNECTIONS,
            &mut invalid,
        );
        let rate_limit_per_second = parse_or(
            &get,
            "RATE_LIMIT_PER_SECOND",
            NonZeroU32::new(DEFAULT_RATE_LIMIT_PER_SECOND).unwrap_or(NonZeroU32::MIN),
            &mut invalid,
        );
        let rate_limit_burst = parse_or(
            &get,
            "RATE_LIMIT_BURST",
            NonZeroU32::new(DEFAULT_RATE_LIMIT_BURST).unwrap_or(NonZeroU32::MIN),
            &mut invalid,
        );

        if !missing.is_empty() || !invalid.is_empty() {
            if !scheme_ok {
                invalid.push(DATABASE_SCHEME_MESSAGE.to_string());
            }
            return Err(ConfigError::Incomplete { missing, invalid });
        }
        if !scheme_ok {
            return Err(ConfigError::UnsupportedDatabaseScheme);
        }
        let (Some(jwt_secret), Some(database_url), Some(webhook_secret)) =
            (jwt_secret, database_url, webhook_secret)
        else {
            return Err(ConfigError::Incomplete { missing, invalid });
        };

        Ok(Self {
            environment,
            port,
            jwt_secret,
            database_url,
            database_max_connections,
            webhook_secret,
            cors_origins,
            auth_timeout: Duration::from_millis(auth_timeout_ms),
            rate_limit_per_second,
            rate_limit_burst,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T, invalid: &mut Vec<String>) -> T
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            invalid.push(format!("{key} ({raw:?} is not a valid number)"));
            default
        }),
    }
}
