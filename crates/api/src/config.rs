//! Runtime configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

use gatehouse_auth::EntityRef;
use gatehouse_core::DomainError;

pub const BIND_ENV: &str = "GATEHOUSE_BIND";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const BOOTSTRAP_ADMIN_ENV: &str = "GATEHOUSE_BOOTSTRAP_ADMIN";

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid GATEHOUSE_BIND '{value}': {source}")]
    InvalidBind {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("invalid GATEHOUSE_BOOTSTRAP_ADMIN '{value}': {source}")]
    InvalidBootstrapAdmin { value: String, source: DomainError },

    #[error("JWT_SECRET must not be empty")]
    EmptySecret,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    pub jwt_secret: String,
    /// Subject granted `manage_grants` at start-up, if any.
    pub bootstrap_admin: Option<EntityRef>,
}

impl ApiConfig {
    /// Config with the given secret and defaults for everything else.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            bootstrap_admin: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_bind = lookup(BIND_ENV).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = raw_bind
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidBind {
                value: raw_bind.clone(),
                source,
            })?;

        let jwt_secret = match lookup(JWT_SECRET_ENV) {
            Some(secret) if secret.trim().is_empty() => return Err(ConfigError::EmptySecret),
            Some(secret) => secret,
            None => {
                tracing::warn!("{JWT_SECRET_ENV} not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let bootstrap_admin = lookup(BOOTSTRAP_ADMIN_ENV)
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                raw.trim()
                    .parse::<EntityRef>()
                    .map_err(|source| ConfigError::InvalidBootstrapAdmin { value: raw, source })
            })
            .transpose()?;

        Ok(Self {
            bind,
            jwt_secret,
            bootstrap_admin,
        })
    }
}
