use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;

const DEFAULT_API_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub jwt_secret: String,
    /// Browser origin of the web app, the only one allowed by CORS.
    pub web_origin: HeaderValue,
    /// Deadline after which a running report is cancelled and answered with 408.
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        let addr_value = env::var("API_ADDR").unwrap_or_else(|_| DEFAULT_API_ADDR.to_string());
        let addr = addr_value
            .parse()
            .map_err(|_| ConfigError::Invalid("API_ADDR", addr_value.clone()))?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }

        let web_url = env::var("WEB_URL").map_err(|_| ConfigError::Missing("WEB_URL"))?;
        let web_origin = parse_origin(&web_url)?;

        let request_timeout_secs = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS", value))?,
            Err(_) => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            addr,
            jwt_secret,
            web_origin,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

/// Origins never carry a trailing slash, so `https://app.example/` is accepted as well.
pub fn parse_origin(value: &str) -> Result<HeaderValue, ConfigError> {
    let origin = value.trim().trim_end_matches('/');
    if origin.is_empty() {
        return Err(ConfigError::Missing("WEB_URL"));
    }
    HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid("WEB_URL", value.to_string()))
}
