/*
 * Responsibility
 * - Load settings from the environment (signing algorithm, secret, token TTL, users, ...)
 * - Validate them up front (missing / invalid values abort startup)
 * - Never print key material (SecretKey redacts itself)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::Algorithm;

use crate::services::auth::claims::ClaimsFormat;
use crate::services::auth::jwt::{SecretKey, parse_hmac_algorithm};
use crate::services::users::{UserRecord, parse_users};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Token issuance / verification settings.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub signing_algorithm: Algorithm,
    pub secret_key: SecretKey,
    pub token_ttl_seconds: u64,
    // Clock skew tolerated on `exp`
    pub token_leeway_seconds: u64,
    // Written to and required in `iss` when set
    pub issuer: Option<String>,
    pub claims_format: ClaimsFormat,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub auth: AuthConfig,
    pub users: Vec<UserRecord>,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or("AUTH_PORT", &lookup, 4000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("AUTH_PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let signing_algorithm = match lookup("AUTH_SIGNING_ALGORITHM") {
            Some(name) => parse_hmac_algorithm(&name)
                .ok_or(ConfigError::Invalid("AUTH_SIGNING_ALGORITHM"))?,
            None => Algorithm::HS512,
        };

        let secret_key = lookup("AUTH_SECRET_KEY")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("AUTH_SECRET_KEY"))
            .and_then(|raw| parse_secret(&raw))?;

        let token_ttl_seconds = parse_or("AUTH_TOKEN_TTL_SECONDS", &lookup, 600)?; // 10 min
        if token_ttl_seconds == 0 {
            return Err(ConfigError::Invalid("AUTH_TOKEN_TTL_SECONDS"));
        }
        let token_leeway_seconds = parse_or("AUTH_TOKEN_LEEWAY_SECONDS", &lookup, 0)?;

        let issuer = lookup("AUTH_ISSUER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let claims_format = match lookup("AUTH_CLAIMS_FORMAT") {
            Some(s) => s
                .parse::<ClaimsFormat>()
                .map_err(|_| ConfigError::Invalid("AUTH_CLAIMS_FORMAT"))?,
            None => ClaimsFormat::default(),
        };

        let users = parse_users(&lookup("AUTH_USERS").unwrap_or_default())
            .map_err(|_| ConfigError::Invalid("AUTH_USERS"))?;

        let request_timeout =
            Duration::from_secs(parse_or("HTTP_REQUEST_TIMEOUT_SECONDS", &lookup, 30)?);
        let body_limit_bytes = parse_or("HTTP_BODY_LIMIT_BYTES", &lookup, 1024 * 1024)?;

        Ok(Config {
            addr,
            app_env,
            auth: AuthConfig {
                signing_algorithm,
                secret_key,
                token_ttl_seconds,
                token_leeway_seconds,
                issuer,
                claims_format,
            },
            users,
            request_timeout,
            body_limit_bytes,
        })
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

// `base64:<data>` for binary keys, anything else is taken as UTF-8 bytes.
fn parse_secret(raw: &str) -> Result<SecretKey, ConfigError> {
    let bytes = match raw.strip_prefix("base64:") {
        Some(encoded) => STANDARD
            .decode(encoded.trim())
            .map_err(|_| ConfigError::Invalid("AUTH_SECRET_KEY"))?,
        None => raw.as_bytes().to_vec(),
    };
    SecretKey::new(bytes).ok_or(ConfigError::Invalid("AUTH_SECRET_KEY"))
}
