//! Domain types for the API Gateway: configuration and errors.

pub mod config;
pub mod error;

pub use config::{
    BrokerConfig, ConfigError, GatewayConfig, HttpConfig, LimitsConfig, ServicesConfig,
    TimeoutConfig,
};
pub use error::{ApiError, ApiResult, BridgeError, GatewayError};
