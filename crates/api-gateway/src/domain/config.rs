//! Gateway configuration with validation.
//!
//! Defaults, then an optional JSON file, then `RASPUTIN_*` environment
//! variables. Only the binary's loader reads the environment; the bridge is
//! handed a [`BridgeConfig`](crate::ipc::BridgeConfig) built from this.

use serde::{Deserialize, Serialize};
use shared_broker::{DEFAULT_INGRESS_CHANNEL, REPLY_CHANNEL_PREFIX};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Longest accepted reply or request timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// Main gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Broker connection and channel naming
    pub broker: BrokerConfig,
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Destination channel per backing service
    pub services: ServicesConfig,
    /// Request validation limits
    pub limits: LimitsConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeouts.reply.is_zero() {
            return Err(ConfigError::InvalidTimeout("reply timeout cannot be 0".into()));
        }
        if self.timeouts.request.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }
        if self.timeouts.reply > MAX_TIMEOUT || self.timeouts.request > MAX_TIMEOUT {
            return Err(ConfigError::InvalidTimeout(format!(
                "timeouts cannot exceed {MAX_TIMEOUT:?} (reply {:?}, request {:?})",
                self.timeouts.reply, self.timeouts.request
            )));
        }
        if self.timeouts.request < self.timeouts.reply {
            return Err(ConfigError::InvalidTimeout(format!(
                "request timeout ({:?}) is shorter than reply timeout ({:?})",
                self.timeouts.request, self.timeouts.reply
            )));
        }

        if self.broker.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("broker endpoint cannot be empty".into()));
        }
        let names = [
            ("broker.ingress_channel", &self.broker.ingress_channel),
            ("broker.reply_prefix", &self.broker.reply_prefix),
            ("services.books", &self.services.books),
            ("services.users", &self.services.users),
            ("services.loans", &self.services.loans),
        ];
        if let Some((field, _)) = names.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::EmptyName(*field));
        }

        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Load a JSON configuration file. Missing sections take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay `RASPUTIN_*` variables on top of `self`.
    ///
    /// # Environment Variables
    ///
    /// - `RASPUTIN_HTTP_PORT`: HTTP port
    /// - `RASPUTIN_BROKER_ENDPOINT`: broker connection string
    /// - `RASPUTIN_INGRESS_CHANNEL`: router ingress channel
    /// - `RASPUTIN_REPLY_TIMEOUT`: reply wait, e.g. `20s` or `1500ms`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("RASPUTIN_HTTP_PORT") {
            self.http.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("RASPUTIN_HTTP_PORT: {port:?}")))?;
        }
        if let Some(endpoint) = lookup("RASPUTIN_BROKER_ENDPOINT") {
            self.broker.endpoint = endpoint;
        }
        if let Some(channel) = lookup("RASPUTIN_INGRESS_CHANNEL") {
            self.broker.ingress_channel = channel;
        }
        if let Some(timeout) = lookup("RASPUTIN_REPLY_TIMEOUT") {
            self.timeouts.reply = humantime_serde::parse_duration(&timeout).map_err(|e| {
                ConfigError::InvalidTimeout(format!("RASPUTIN_REPLY_TIMEOUT {timeout:?}: {e}"))
            })?;
            if self.timeouts.request < self.timeouts.reply {
                self.timeouts.request = self.timeouts.reply;
            }
        }
        Ok(self)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 7071)
    pub port: u16,
    /// Enable HTTP server
    pub enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 7071,
            enabled: true,
        }
    }
}

/// Broker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Connection string. `memory://` selects the in-process broker.
    pub endpoint: String,
    /// Channel the router consumes from
    pub ingress_channel: String,
    /// Prefix for per-request reply channels
    pub reply_prefix: String,
    /// Stamp outgoing requests with the send time
    pub stamp_send_time: bool,
}

impl BrokerConfig {
    pub const IN_MEMORY_SCHEME: &'static str = "memory://";

    pub fn is_in_memory(&self) -> bool {
        self.endpoint.starts_with(Self::IN_MEMORY_SCHEME)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            endpoint: "memory://local".to_string(),
            ingress_channel: DEFAULT_INGRESS_CHANNEL.to_string(),
            reply_prefix: REPLY_CHANNEL_PREFIX.to_string(),
            stamp_send_time: true,
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long the bridge waits for a reply
    #[serde(with = "humantime_serde")]
    pub reply: Duration,
    /// Upper bound for a whole HTTP request, channel setup included
    #[serde(with = "humantime_serde")]
    pub request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            reply: Duration::from_secs(20),
            request: Duration::from_secs(30),
        }
    }
}

/// Destination channel of each backing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub books: String,
    pub users: String,
    pub loans: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            books: "ms-books".to_string(),
            users: "ms-users".to_string(),
            loans: "ms-loans".to_string(),
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024, // 1MB
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Invalid size limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// A channel or service name is blank
    #[error("{0} cannot be empty")]
    EmptyName(&'static str),
    /// Config file could not be read
    #[error("cannot read config: {0}")]
    Io(String),
    /// Config file is not valid JSON for this schema
    #[error("cannot parse config: {0}")]
    Parse(String),
    /// General configuration error
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
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    /// Parse `1500ms`, `20s`, `2m` or plain seconds.
    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // `ms` before `s`: "500ms" also ends in 's'
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map_err(|_| "invalid minutes")?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
