//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::Duration;
use std::net::SocketAddr;
use tracing::Level;

/// Longest accepted session lifetime: one year.
const MAX_EXPIRATION_HOURS: i64 = 24 * 365;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub github_client_id: String,
    pub github_client_secret: String,
    pub github_token_url: String,
    pub github_api_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: Duration,
    pub frontend_url: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| {
            let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
            format!("0.0.0.0:{}", port)
        });
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;
        let db_max_connections = parsed_or("DB_MAX_CONNECTIONS", 5)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Identity Provider Settings ---
        let github_client_id = required("GITHUB_CLIENT_ID")?;
        let github_client_secret = required("GITHUB_CLIENT_SECRET")?;
        let github_token_url = std::env::var("GITHUB_TOKEN_URL")
            .unwrap_or_else(|_| "https://github.com/login/oauth/access_token".to_string());
        let github_api_url =
            std::env::var("GITHUB_API_URL").unwrap_or_else(|_| "https://api.github.com".to_string());

        // --- Load Session Settings ---
        let jwt_secret = required("JWT_SECRET")?;
        let jwt_expiration = session_lifetime(parsed_or("JWT_EXPIRATION_HOURS", 24 * 7)?)?;

        // --- Load Browser-facing Settings ---
        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let allowed_origins = checked_origins(parse_origins(
            &std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        ))?;

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            github_client_id,
            github_client_secret,
            github_token_url,
            github_api_url,
            jwt_secret,
            jwt_expiration,
            frontend_url,
            allowed_origins,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name.to_string())),
    }
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

fn session_lifetime(hours: i64) -> Result<Duration, ConfigError> {
    if !(1..=MAX_EXPIRATION_HOURS).contains(&hours) {
        return Err(ConfigError::InvalidValue(
            "JWT_EXPIRATION_HOURS".to_string(),
            format!("must be between 1 and {}", MAX_EXPIRATION_HOURS),
        ));
    }
    Ok(Duration::hours(hours))
}

/// Credentialed CORS needs explicit origins, so a wildcard is refused.
fn checked_origins(origins: Vec<String>) -> Result<Vec<String>, ConfigError> {
    if origins.iter().any(|o| o == "*") {
        return Err(ConfigError::InvalidValue(
            "ALLOWED_ORIGINS".to_string(),
            "a wildcard origin cannot be combined with credentials; list the origins".to_string(),
        ));
    }
    Ok(origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_split() {
        assert_eq!(
            parse_origins(" http://localhost:3000/, https://snippedia.dev ,,"),
            vec!["http://localhost:3000", "https://snippedia.dev"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn wildcard_origin_is_rejected() {
        let err = checked_origins(parse_origins("https://snippedia.dev, *")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref name, _) if name == "ALLOWED_ORIGINS"));
        assert!(checked_origins(parse_origins("https://snippedia.dev")).is_ok());
    }

    #[test]
    fn session_lifetime_is_bounded() {
        assert_eq!(session_lifetime(168).unwrap(), Duration::days(7));
        assert_eq!(session_lifetime(MAX_EXPIRATION_HOURS).unwrap(), Duration::days(365));
        for hours in [0, -1, MAX_EXPIRATION_HOURS + 1, 3_000_000_000] {
            assert!(matches!(
                session_lifetime(hours),
                Err(ConfigError::InvalidValue(ref name, _)) if name == "JWT_EXPIRATION_HOURS"
            ));
        }
    }
}
