use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::RESET_CODE_TTL_SECS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub security: SecurityConfig,

    pub lockout: LockoutConfig,

    pub reset: ResetConfig,

    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    pub log_format: LogFormat,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/gatekeeper.db".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Bcrypt,
    Argon2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Algorithm used for new password hashes.
    pub hash_algorithm: HashAlgorithm,

    /// bcrypt cost factor (4..=31).
    pub bcrypt_cost: u32,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Maximum number of hash/verify jobs running at once on the blocking pool.
    pub hash_workers: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Bcrypt,
            bcrypt_cost: 12,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            hash_workers: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockoutBackend {
    /// Per-process map, fine for single-instance deployments.
    Memory,
    /// Shared `login_attempts`/`login_locks` tables.
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    pub backend: LockoutBackend,

    /// How often the background pruner runs. 0 disables it (pruning still
    /// happens lazily on read).
    pub prune_interval_seconds: u64,

    /// Failure records older than this are dropped by the pruner. Must cover
    /// the largest `login_timeframe` of any role.
    pub attempt_retention_seconds: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            backend: LockoutBackend::Memory,
            prune_interval_seconds: 5 * 60,
            attempt_retention_seconds: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Length of the alphanumeric reset code.
    pub code_length: usize,

    /// Validity of an issued code.
    pub code_ttl_seconds: u64,

    /// When true, an unknown email is answered like a failed delivery
    /// instead of a field error on `email`.
    pub conceal_unknown_email: bool,

    /// Run the reuse-history check when redeeming a code.
    pub enforce_reuse_on_reset: bool,

    /// Append a history entry for passwords set through a reset code.
    pub record_history_on_reset: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            code_length: 12,
            code_ttl_seconds: RESET_CODE_TTL_SECS,
            conceal_unknown_email: false,
            enforce_reuse_on_reset: false,
            record_history_on_reset: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Reset codes are POSTed here as JSON. Unset means log-only delivery.
    pub webhook_url: Option<String>,

    pub timeout_seconds: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_seconds: 10,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// An explicit path must exist; otherwise fall back to [`Self::load`].
    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                info!("Loading config from: {}", path.display());
                Self::load_from_path(path)
            }
            None => Self::load(),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("gatekeeper").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".gatekeeper").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            anyhow::bail!("security.bcrypt_cost must be between 4 and 31");
        }

        if self.security.hash_workers == 0 {
            anyhow::bail!("security.hash_workers must be > 0");
        }

        if self.reset.code_length < 6 {
            anyhow::bail!("reset.code_length must be at least 6");
        }

        if self.reset.code_ttl_seconds == 0 {
            anyhow::bail!("reset.code_ttl_seconds must be > 0");
        }

        if let Some(url) = &self.notify.webhook_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            anyhow::bail!("notify.webhook_url must be an http(s) URL");
        }

        Ok(())
    }
}
