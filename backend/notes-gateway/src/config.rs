//! Configuration for the notes gateway
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)

use crypto_core::jwt::CredentialCodec;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::info;

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Credential configuration
    pub jwt: JwtConfig,

    /// GraphQL configuration
    pub graphql: GraphQLConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared signing secret
    #[serde(skip_serializing)]
    pub secret: String,
    /// Lifetime of issued credentials; `None` issues non-expiring credentials
    pub expiry_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLConfig {
    /// Enable GraphQL Playground
    pub playground: bool,
    /// Enable introspection
    pub introspection: bool,
    /// Max query depth
    pub max_depth: usize,
    /// Max query complexity
    pub max_complexity: u64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// `JWT_SECRET` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let jwt = Self::jwt_from_env()?;

        let config = Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env("SERVER_PORT", 8080)?,
                workers: parse_env("SERVER_WORKERS", num_cpus::get())?,
            },
            jwt,
            graphql: GraphQLConfig {
                playground: parse_env("GRAPHQL_PLAYGROUND", true)?,
                introspection: parse_env("GRAPHQL_INTROSPECTION", true)?,
                max_depth: parse_env("GRAPHQL_MAX_DEPTH", 10)?,
                max_complexity: parse_env("GRAPHQL_MAX_COMPLEXITY", 1000)?,
            },
        };

        info!(
            max_depth = config.graphql.max_depth,
            max_complexity = config.graphql.max_complexity,
            credential_expiry_seconds = ?config.jwt.expiry_seconds,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load credential configuration from environment variables
    pub fn jwt_from_env() -> Result<JwtConfig> {
        let secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| GatewayError::Config("JWT_SECRET must be set".to_string()))?;

        // 0 and unset both mean "no expiry"
        let expiry_seconds = match env::var("JWT_EXPIRY_SECONDS") {
            Ok(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                GatewayError::Config(format!("Invalid JWT_EXPIRY_SECONDS: {}", e))
            })?),
            Err(_) => None,
        }
        .filter(|seconds| *seconds > 0);

        Ok(JwtConfig {
            secret,
            expiry_seconds,
        })
    }
}

impl JwtConfig {
    /// Build the process-wide credential codec
    pub fn credential_codec(&self) -> Result<CredentialCodec> {
        let ttl = self
            .expiry_seconds
            .map(|seconds| {
                i64::try_from(seconds)
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .ok_or_else(|| {
                        GatewayError::Config(format!(
                            "JWT_EXPIRY_SECONDS out of range: {}",
                            seconds
                        ))
                    })
            })
            .transpose()?;

        Ok(CredentialCodec::new(&self.secret, ttl)?)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiry_seconds", &self.expiry_seconds)
            .finish()
    }
}

/// Read and parse an environment variable, falling back to `default` when unset
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 8] = [
        "JWT_SECRET",
        "JWT_EXPIRY_SECONDS",
        "SERVER_HOST",
        "SERVER_PORT",
        "GRAPHQL_MAX_DEPTH",
        "GRAPHQL_MAX_COMPLEXITY",
        "GRAPHQL_PLAYGROUND",
        "GRAPHQL_INTROSPECTION",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();
        env::set_var("JWT_SECRET", "test-secret-key");

        let config = Config::from_env().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.graphql.max_depth, 10);
        assert_eq!(config.graphql.max_complexity, 1000);
        assert!(config.graphql.playground);
        assert!(config.jwt.expiry_seconds.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_secret_is_config_error() {
        clear_env();
        assert!(matches!(Config::from_env(), Err(GatewayError::Config(_))));

        env::set_var("JWT_SECRET", "   ");
        assert!(matches!(Config::jwt_from_env(), Err(GatewayError::Config(_))));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env() {
        clear_env();
        env::set_var("JWT_SECRET", "test-secret-key");
        env::set_var("JWT_EXPIRY_SECONDS", "7200");

        let config = Config::jwt_from_env().unwrap();
        assert_eq!(config.secret, "test-secret-key");
        assert_eq!(config.expiry_seconds, Some(7200));
        assert_eq!(
            config.credential_codec().unwrap().ttl(),
            Some(chrono::Duration::seconds(7200))
        );

        env::set_var("JWT_EXPIRY_SECONDS", "0");
        assert!(Config::jwt_from_env().unwrap().expiry_seconds.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_config_error() {
        clear_env();
        env::set_var("JWT_SECRET", "test-secret-key");
        env::set_var("GRAPHQL_MAX_DEPTH", "deep");

        assert!(matches!(Config::from_env(), Err(GatewayError::Config(_))));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_limits_from_env() {
        clear_env();
        env::set_var("JWT_SECRET", "test-secret-key");
        env::set_var("GRAPHQL_MAX_DEPTH", "5");
        env::set_var("GRAPHQL_MAX_COMPLEXITY", "250");

        let config = Config::from_env().unwrap();
        assert_eq!(config.graphql.max_depth, 5);
        assert_eq!(config.graphql.max_complexity, 250);

        clear_env();
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = JwtConfig {
            secret: "super-secret".to_string(),
            expiry_seconds: None,
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
