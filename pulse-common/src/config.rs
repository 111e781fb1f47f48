//! Configuration loading and data folder resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PULSE_*`)
//! 3. TOML config file (`pulse.toml`)
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Webhook signature enforcement policy
///
/// The reference deployment proceeds unauthenticated when either the shared
/// secret or the signature header is absent. That fallback is a deployment
/// choice here, not a hardcoded bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// Verify when both secret and header are present; warn and proceed
    /// otherwise (local/dev operation)
    Permissive,
    /// Reject any request that cannot be verified
    Require,
}

impl std::str::FromStr for SignaturePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "permissive" => Ok(SignaturePolicy::Permissive),
            "require" => Ok(SignaturePolicy::Require),
            other => Err(Error::Config(format!(
                "Invalid signature policy '{}' (expected 'permissive' or 'require')",
                other
            ))),
        }
    }
}

/// Enum validation mode for normalized status/RSVP fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMode {
    /// Unrecognized values pass through lower-cased (reference behavior)
    Permissive,
    /// Unrecognized values are rejected as validation errors
    Strict,
}

impl std::str::FromStr for EnumMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "permissive" => Ok(EnumMode::Permissive),
            "strict" => Ok(EnumMode::Strict),
            other => Err(Error::Config(format!(
                "Invalid enum mode '{}' (expected 'permissive' or 'strict')",
                other
            ))),
        }
    }
}

/// Service configuration, resolved once at startup and threaded through
/// request state (never ambient)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database file location
    pub database_path: PathBuf,
    /// Shared secret for webhook HMAC verification
    pub webhook_secret: Option<String>,
    pub signature_policy: SignaturePolicy,
    pub enum_mode: EnumMode,
    /// Bounded timeout applied to every store operation
    pub store_timeout_ms: u64,
    /// Cadence of the periodic insight job
    pub insight_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
            database_path: default_data_folder().join("pulse.db"),
            webhook_secret: None,
            signature_policy: SignaturePolicy::Permissive,
            enum_mode: EnumMode::Permissive,
            store_timeout_ms: 5000,
            insight_interval_secs: 24 * 60 * 60,
        }
    }
}

/// Subset of settings readable from pulse.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    database_path: Option<String>,
    webhook_secret: Option<String>,
    signature_policy: Option<String>,
    enum_mode: Option<String>,
    store_timeout_ms: Option<u64>,
    insight_interval_secs: Option<u64>,
}

impl ServiceConfig {
    /// Resolve configuration from config file, environment, and CLI overrides
    pub fn resolve(
        cli_config_path: Option<&str>,
        cli_port: Option<u16>,
        cli_database: Option<&str>,
    ) -> Result<Self> {
        let mut config = Self::default();

        // Tier 3: TOML config file
        if let Some(file) = load_config_file(cli_config_path)? {
            if let Some(host) = file.host {
                config.host = host;
            }
            if let Some(port) = file.port {
                config.port = port;
            }
            if let Some(path) = file.database_path {
                config.database_path = PathBuf::from(path);
            }
            if let Some(secret) = file.webhook_secret {
                config.webhook_secret = Some(secret);
            }
            if let Some(policy) = file.signature_policy {
                config.signature_policy = policy.parse()?;
            }
            if let Some(mode) = file.enum_mode {
                config.enum_mode = mode.parse()?;
            }
            if let Some(ms) = file.store_timeout_ms {
                config.store_timeout_ms = ms;
            }
            if let Some(secs) = file.insight_interval_secs {
                config.insight_interval_secs = secs;
            }
        }

        // Tier 2: Environment variables
        if let Ok(host) = std::env::var("PULSE_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PULSE_PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PULSE_PORT: {}", port)))?;
        }
        if let Ok(path) = std::env::var("PULSE_DATABASE") {
            config.database_path = PathBuf::from(path);
        }
        if let Ok(secret) = std::env::var("PULSE_WEBHOOK_SECRET") {
            config.webhook_secret = Some(secret);
        }
        if let Ok(policy) = std::env::var("PULSE_SIGNATURE_POLICY") {
            config.signature_policy = policy.parse()?;
        }
        if let Ok(mode) = std::env::var("PULSE_ENUM_MODE") {
            config.enum_mode = mode.parse()?;
        }
        if let Ok(ms) = std::env::var("PULSE_STORE_TIMEOUT_MS") {
            config.store_timeout_ms = ms
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PULSE_STORE_TIMEOUT_MS: {}", ms)))?;
        }

        // Tier 1: Command-line arguments
        if let Some(port) = cli_port {
            config.port = port;
        }
        if let Some(path) = cli_database {
            config.database_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

/// Locate and parse pulse.toml, if one exists
///
/// Search order: explicit CLI path, then the platform config directory
/// (`~/.config/pulse/pulse.toml` on Linux), then the working directory.
fn load_config_file(cli_path: Option<&str>) -> Result<Option<FileConfig>> {
    let candidates: Vec<PathBuf> = match cli_path {
        Some(path) => vec![PathBuf::from(path)],
        None => {
            let mut paths = Vec::new();
            if let Some(dir) = dirs::config_dir() {
                paths.push(dir.join("pulse").join("pulse.toml"));
            }
            paths.push(PathBuf::from("pulse.toml"));
            paths
        }
    };

    for path in candidates {
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let parsed: FileConfig = toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            return Ok(Some(parsed));
        } else if cli_path.is_some() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    }

    Ok(None)
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pulse"))
        .unwrap_or_else(|| PathBuf::from("./pulse_data"))
}
