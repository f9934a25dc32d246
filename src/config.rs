/*
 * Responsibility
 * - 環境変数からの設定読み込み (listen address, authority, chain composition)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
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

/// Which identity stage leads the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Offline signature/expiry check against the JWKS.
    Verify,
    /// Signature check plus online introspection.
    Introspect,
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verify" | "jwks" => Ok(Self::Verify),
            "introspect" | "introspection" => Ok(Self::Introspect),
            _ => Err(ConfigError::Invalid("AUTH_MODE")),
        }
    }
}

#[derive(Debug)]
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

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub http_timeout: Duration,
    pub http_body_limit_bytes: usize,

    pub auth_base_url: Url,
    pub auth_realm: String,
    pub auth_client_id: String,
    pub auth_client_secret: String,
    pub auth_audience: String,

    pub auth_mode: AuthMode,
    pub auth_permissions_enabled: bool,
    pub auth_token_audience: Option<String>,
    pub auth_allowed_algorithms: Vec<Algorithm>,
    pub access_token_leeway_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the client secret
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("auth_base_url", &self.auth_base_url.as_str())
            .field("auth_realm", &self.auth_realm)
            .field("auth_client_id", &self.auth_client_id)
            .field("auth_mode", &self.auth_mode)
            .field("auth_permissions_enabled", &self.auth_permissions_enabled)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins =
            parse_list(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        let http_timeout = Duration::from_secs(
            std::env::var("HTTP_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        );

        let http_body_limit_bytes = std::env::var("HTTP_BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        let auth_base_url = std::env::var("AUTH_BASE_URL")
            .map_err(|_| ConfigError::Missing("AUTH_BASE_URL"))
            .and_then(|v| Url::parse(&v).map_err(|_| ConfigError::Invalid("AUTH_BASE_URL")))?;

        let auth_realm = required("AUTH_REALM")?;
        let auth_client_id = required("AUTH_CLIENT_ID")?;
        let auth_client_secret = required("AUTH_CLIENT_SECRET")?;

        let auth_audience = std::env::var("AUTH_AUDIENCE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| auth_client_id.clone());

        let auth_mode = std::env::var("AUTH_MODE")
            .map(|v| v.parse::<AuthMode>())
            .unwrap_or(Ok(AuthMode::Verify))?;

        let auth_permissions_enabled = match std::env::var("AUTH_PERMISSIONS_ENABLED") {
            Ok(v) => parse_bool(&v).ok_or(ConfigError::Invalid("AUTH_PERMISSIONS_ENABLED"))?,
            Err(_) => true,
        };

        let auth_token_audience = std::env::var("AUTH_TOKEN_AUDIENCE")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let auth_allowed_algorithms = parse_algorithms(
            &std::env::var("AUTH_ALLOWED_ALGORITHMS").unwrap_or_else(|_| "RS256".to_string()),
        )?;

        let access_token_leeway_seconds = std::env::var("ACCESS_TOKEN_LEEWAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            http_timeout,
            http_body_limit_bytes,
            auth_base_url,
            auth_realm,
            auth_client_id,
            auth_client_secret,
            auth_audience,
            auth_mode,
            auth_permissions_enabled,
            auth_token_audience,
            auth_allowed_algorithms,
            access_token_leeway_seconds,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_algorithms(raw: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let algorithms = parse_list(raw)
        .iter()
        .map(|name| {
            Algorithm::from_str(name).map_err(|_| ConfigError::Invalid("AUTH_ALLOWED_ALGORITHMS"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if algorithms.is_empty() {
        return Err(ConfigError::Invalid("AUTH_ALLOWED_ALGORITHMS"));
    }
    Ok(algorithms)
}
