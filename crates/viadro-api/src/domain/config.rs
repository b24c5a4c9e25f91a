//! Server configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Lowest bcrypt cost accepted by the hashing library.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Main server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Deployment environment name, reported by the healthcheck
    pub environment: String,
    pub http: HttpConfig,
    pub tokens: TokenConfig,
    pub security: SecurityConfig,
    pub cache: CacheConfig,
    pub limits: LimitsConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
    pub shutdown: ShutdownConfig,
}

impl ServerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.activation_ttl.is_zero() || self.tokens.authentication_ttl.is_zero() {
            return Err(ConfigError::InvalidTtl("token lifetimes cannot be 0".into()));
        }

        if self.cache.enabled && self.cache.ttl.is_zero() {
            return Err(ConfigError::InvalidTtl("cache ttl cannot be 0".into()));
        }
        if self.cache.ttl > MAX_CACHE_TTL {
            return Err(ConfigError::InvalidTtl("cache ttl cannot exceed 30 days".into()));
        }

        if !(MIN_BCRYPT_COST..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "bcrypt_cost must be between {} and 31",
                MIN_BCRYPT_COST
            )));
        }

        if self.rate_limit.enabled && self.rate_limit.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "requests_per_second cannot be 0".into(),
            ));
        }

        if self.limits.max_json_body == 0 || self.limits.max_upload_size == 0 {
            return Err(ConfigError::InvalidLimit("body limits cannot be 0".into()));
        }

        if self.storage.public_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.public_base_url is required".into()));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: IpAddr,
    /// Port (default: 4000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 4000,
        }
    }
}

/// Token lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    #[serde(with = "humantime_serde")]
    pub activation_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub authentication_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            activation_ttl: Duration::from_secs(3 * 24 * 60 * 60),
            authentication_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Credential and proxy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
    /// Proxies whose `X-Forwarded-For` is trusted for client IP extraction
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: crate::domain::credentials::BCRYPT_COST,
            trusted_proxies: Vec::new(),
        }
    }
}

/// Listing response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Request body limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max JSON body size in bytes (default: 1MB)
    pub max_json_body: usize,
    /// Max multipart upload size in bytes (default: 32MB)
    pub max_upload_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_json_body: 1024 * 1024,
            max_upload_size: 32 * 1024 * 1024,
        }
    }
}

/// Per-IP rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests per second per IP (reads)
    pub requests_per_second: u32,
    /// Requests per second per IP (POST, PUT, PATCH, DELETE)
    pub writes_per_second: u32,
    /// Burst allowance (token bucket)
    pub burst_size: u32,
    pub enabled: bool,
    /// IPs exempt from rate limiting
    pub whitelist: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
            writes_per_second: 1,
            burst_size: 4,
            enabled: true,
            whitelist: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    /// Max age for preflight cache, in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            expose_headers: vec!["Location".to_string(), "X-Request-Id".to_string()],
            max_age: 86400,
        }
    }
}

/// Object storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for uploaded objects; `None` keeps objects in memory
    pub root: Option<PathBuf>,
    /// Base URL prepended to object keys to form document links
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: Some(PathBuf::from("./uploads")),
            public_base_url: "http://localhost:4000/files".to_string(),
        }
    }
}

/// Outgoing mail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub sender: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: "Viadro <no-reply@viadro.local>".to_string(),
        }
    }
}

/// Graceful shutdown
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long to wait for background tasks after the listener closes
    #[serde(with = "humantime_serde")]
    pub grace: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
pub(crate) mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() != 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        let number = |digits: &str| digits.trim().parse::<u64>().map_err(|_| "invalid duration");
        // "ms" must be checked before 's' and 'm'
        if let Some(ms) = s.strip_suffix("ms") {
            number(ms).map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            number(secs).map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            number(mins).map(|m| Duration::from_secs(m * 60))
        } else if let Some(hours) = s.strip_suffix('h') {
            number(hours).map(|h| Duration::from_secs(h * 3600))
        } else if let Some(days) = s.strip_suffix('d') {
            number(days).map(|d| Duration::from_secs(d * 86_400))
        } else {
            // Plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
