//! Poll Controller configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default session code length.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Default bound on code-allocation retries before reporting exhaustion.
pub const DEFAULT_CODE_MAX_ATTEMPTS: u32 = 32;

/// Default poll countdown in seconds when the creator does not set one.
pub const DEFAULT_POLL_TIMER_SECONDS: u64 = 30;

/// Default controller instance ID prefix.
pub const DEFAULT_PC_ID_PREFIX: &str = "pc";

/// Poll Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Health endpoint bind address (default: "0.0.0.0:8081").
    pub health_bind_address: String,

    /// Unique identifier for this controller instance.
    pub pc_id: String,

    /// Maximum concurrent live sessions this controller can handle.
    pub max_sessions: u32,

    /// Session code length (default: 6).
    pub code_length: usize,

    /// Bound on code-allocation retries (default: 32).
    pub code_max_attempts: u32,

    /// Default poll countdown in seconds (default: 30).
    pub default_poll_timer_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let health_bind_address = vars
            .get("PC_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let max_sessions = vars
            .get("PC_MAX_SESSIONS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        let code_length = vars
            .get("PC_CODE_LENGTH")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CODE_LENGTH);
        if code_length == 0 {
            return Err(ConfigError::InvalidValue(
                "PC_CODE_LENGTH must be at least 1".to_string(),
            ));
        }

        let code_max_attempts = vars
            .get("PC_CODE_MAX_ATTEMPTS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CODE_MAX_ATTEMPTS);
        if code_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "PC_CODE_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let default_poll_timer_seconds = vars
            .get("PC_DEFAULT_POLL_TIMER_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_TIMER_SECONDS);

        // Generate controller instance ID
        let pc_id = vars.get("PC_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_PC_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            health_bind_address,
            pc_id,
            max_sessions,
            code_length,
            code_max_attempts,
            default_poll_timer_seconds,
        })
    }
}
