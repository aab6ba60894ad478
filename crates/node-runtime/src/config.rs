//! Process configuration (§6): every variable enumerated there is a field
//! here, validated eagerly before any task spawns. Follows the same
//! nested-struct-plus-`validate`/`from_env` shape the pack's gateway
//! configuration uses, but loads from the environment rather than a file
//! since every value here is a deployment secret or endpoint, not a
//! checked-in default.

use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingRequired(&'static str),
    #[error("{0} must be a valid URL, got {1:?}")]
    InvalidUrl(&'static str, String),
    #[error("{0} must be at least {1} characters")]
    TooShort(&'static str, usize),
    #[error("{0} must be one of {1:?}, got {2:?}")]
    InvalidEnum(&'static str, &'static [&'static str], String),
    #[error("{0} must be a valid integer, got {1:?}")]
    InvalidInt(&'static str, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEnv {
    Development,
    Production,
    Test,
}

impl NodeEnv {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnum(
                "NODE_ENV",
                &["development", "production", "test"],
                other.to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(ConfigError::InvalidEnum(
                "LOG_LEVEL",
                &["error", "warn", "info", "debug"],
                other.to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// RPC/WS endpoint pair for one network (§6 `TESTNET_RPC_URL`/`_WS_URL`,
/// `MAINNET_RPC_URL`/`_WS_URL`).
#[derive(Debug, Clone)]
pub struct NetworkEndpoints {
    pub rpc_url: String,
    pub ws_url: String,
}

/// Validated process configuration; construction is the only place the
/// process touches environment variables directly, so a missing or
/// malformed value fails fast at startup rather than surfacing as a
/// runtime error deep in an ingester (§6 "fail-fast on missing/invalid").
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub node_env: NodeEnv,
    pub port: u16,
    pub database_url: String,
    /// Enables the Redis-backed multi-instance push relay when present
    /// (§6, §9 "push fan-out across instances ... otherwise a local
    /// in-process bus").
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub testnet: NetworkEndpoints,
    pub mainnet: NetworkEndpoints,
    /// Explorer-style `txlist` base URL per network (§6 "History source");
    /// not itself a named §6 variable since the history endpoint there is
    /// described generically, but a concrete deployment needs one per
    /// network to actually dial it.
    pub testnet_explorer_api_url: String,
    pub mainnet_explorer_api_url: String,
    pub explorer_api_key: Option<String>,
    pub llm_webhook_url: String,
    pub frontend_url: String,
    /// Absence disables on-chain publishing entirely (§4.5, §6); the
    /// engine still ingests and scores, it just never emits.
    pub testnet_private_key: Option<String>,
    /// Data-registry contract address the publisher submits
    /// `registerSchema`/`emitEvent` calls to. Only required when a
    /// signing key is configured.
    pub data_registry_address: Option<String>,
    pub instance_id: String,
    pub log_level: LogLevel,
}

const MIN_JWT_SECRET_LEN: usize = 32;
const DEFAULT_TESTNET_RPC: &str = "https://rpc.sepolia.org";
const DEFAULT_TESTNET_WS: &str = "wss://rpc.sepolia.org";
const DEFAULT_MAINNET_RPC: &str = "https://eth.llamarpc.com";
const DEFAULT_MAINNET_WS: &str = "wss://eth.llamarpc.com";
const DEFAULT_TESTNET_EXPLORER_API: &str = "https://api-sepolia.etherscan.io/api";
const DEFAULT_MAINNET_EXPLORER_API: &str = "https://api.etherscan.io/api";

impl AppConfig {
    /// Loads and validates configuration from the process environment.
    /// `.env`, if present, has already been merged in by the caller
    /// (`main` calls `dotenvy::dotenv()` before this).
    pub fn from_env() -> Result<Self, ConfigError> {
        let node_env = match env::var("NODE_ENV") {
            Ok(v) => NodeEnv::parse(&v)?,
            Err(_) => NodeEnv::Development,
        };

        let port = match env::var("PORT") {
            Ok(v) => v
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidInt("PORT", v))?,
            Err(_) => 3000,
        };

        let database_url = require("DATABASE_URL")?;
        let redis_url = env::var("REDIS_URL").ok();

        let jwt_secret = require("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::TooShort("JWT_SECRET", MIN_JWT_SECRET_LEN));
        }

        let testnet = NetworkEndpoints {
            rpc_url: require_url_or(
                "TESTNET_RPC_URL",
                DEFAULT_TESTNET_RPC,
            )?,
            ws_url: require_url_or("TESTNET_WS_URL", DEFAULT_TESTNET_WS)?,
        };
        let mainnet = NetworkEndpoints {
            rpc_url: require_url_or("MAINNET_RPC_URL", DEFAULT_MAINNET_RPC)?,
            ws_url: require_url_or("MAINNET_WS_URL", DEFAULT_MAINNET_WS)?,
        };

        let testnet_explorer_api_url =
            require_url_or("TESTNET_EXPLORER_API_URL", DEFAULT_TESTNET_EXPLORER_API)?;
        let mainnet_explorer_api_url =
            require_url_or("MAINNET_EXPLORER_API_URL", DEFAULT_MAINNET_EXPLORER_API)?;
        let explorer_api_key = env::var("EXPLORER_API_KEY").ok().filter(|s| !s.is_empty());

        let llm_webhook_url = require_url("LLM_WEBHOOK_URL")?;
        let frontend_url = require_url("FRONTEND_URL")?;

        let testnet_private_key = env::var("TESTNET_PRIVATE_KEY").ok().filter(|s| !s.is_empty());
        let data_registry_address = env::var("DATA_REGISTRY_ADDRESS").ok().filter(|s| !s.is_empty());

        let instance_id = env::var("INSTANCE_ID").unwrap_or_else(|_| "chainguard-0".to_string());
        let log_level = match env::var("LOG_LEVEL") {
            Ok(v) => LogLevel::parse(&v)?,
            Err(_) => LogLevel::Info,
        };

        Ok(Self {
            node_env,
            port,
            database_url,
            redis_url,
            jwt_secret,
            testnet,
            mainnet,
            testnet_explorer_api_url,
            mainnet_explorer_api_url,
            explorer_api_key,
            llm_webhook_url,
            frontend_url,
            testnet_private_key,
            data_registry_address,
            instance_id,
            log_level,
        })
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self.node_env, NodeEnv::Production)
    }

    /// Store connection-pool sizing and the transaction acquire timeout
    /// `cg-store` uses (§5 "store transactions use a 5s timeout with 3s
    /// max-wait to acquire").
    #[must_use]
    pub fn store_acquire_timeout(&self) -> Duration {
        Duration::from_secs(3)
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingRequired(name))
}

fn require_url(name: &'static str) -> Result<String, ConfigError> {
    let value = require(name)?;
    validate_url(name, &value)?;
    Ok(value)
}

fn require_url_or(name: &'static str, default: &str) -> Result<String, ConfigError> {
    let value = env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string());
    validate_url(name, &value)?;
    Ok(value)
}

fn validate_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let looks_like_url = value.starts_with("http://")
        || value.starts_with("https://")
        || value.starts_with("ws://")
        || value.starts_with("wss://");
    if looks_like_url {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl(name, value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that
    // touch them so parallel test execution doesn't race.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for key in [
            "NODE_ENV", "PORT", "DATABASE_URL", "REDIS_URL", "JWT_SECRET",
            "TESTNET_RPC_URL", "TESTNET_WS_URL", "MAINNET_RPC_URL", "MAINNET_WS_URL",
            "TESTNET_EXPLORER_API_URL", "MAINNET_EXPLORER_API_URL", "EXPLORER_API_KEY",
            "LLM_WEBHOOK_URL", "FRONTEND_URL", "TESTNET_PRIVATE_KEY",
            "DATA_REGISTRY_ADDRESS", "INSTANCE_ID", "LOG_LEVEL",
        ] {
            env::remove_var(key);
        }
    }

    fn set_required() {
        env::set_var("DATABASE_URL", "postgres://localhost/chainguard");
        env::set_var("JWT_SECRET", "a".repeat(32));
        env::set_var("LLM_WEBHOOK_URL", "https://validator.example.com/hook");
        env::set_var("FRONTEND_URL", "https://app.example.com");
    }

    #[test]
    fn missing_database_url_fails_fast() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("JWT_SECRET", "a".repeat(32));
        env::set_var("LLM_WEBHOOK_URL", "https://validator.example.com");
        env::set_var("FRONTEND_URL", "https://app.example.com");
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::MissingRequired("DATABASE_URL"))));
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required();
        env::set_var("JWT_SECRET", "too-short");
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::TooShort("JWT_SECRET", MIN_JWT_SECRET_LEN))));
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required();
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.instance_id, "chainguard-0");
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.redis_url.is_none());
        assert!(config.testnet_private_key.is_none());
        assert_eq!(config.testnet.rpc_url, DEFAULT_TESTNET_RPC);
    }

    #[test]
    fn invalid_node_env_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required();
        env::set_var("NODE_ENV", "staging");
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidEnum("NODE_ENV", _, _))));
    }

    #[test]
    fn malformed_url_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required();
        env::set_var("FRONTEND_URL", "not-a-url");
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidUrl("FRONTEND_URL", _))));
    }
}
