use crate::transmit::TransmitOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolve the workspace data directory path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. LOGSHIP_PATH environment variable (with tilde expansion)
/// 3. XDG data directory (recommended default)
/// 4. ~/.logship (fallback for systems without XDG)
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("LOGSHIP_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("logship"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".logship"));
    }

    Err(Error::Config(
        "Could not determine workspace path: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Default location agent session logs are written to.
pub fn default_log_root() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("projects"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Root directory scanned for .jsonl sources.
    pub log_root: PathBuf,
    /// Ingestion endpoint base URL, e.g. "https://ingest.example.com".
    pub endpoint: String,
    /// Bearer token presented on every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default = "default_max_messages")]
    pub batch_max_messages: usize,
    #[serde(default = "default_max_bytes")]
    pub batch_max_bytes: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_messages() -> usize {
    TransmitOptions::default().max_messages
}

fn default_max_bytes() -> usize {
    TransmitOptions::default().max_bytes
}

fn default_max_attempts() -> u32 {
    TransmitOptions::default().max_attempts
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            log_root: default_log_root().unwrap_or_else(|| PathBuf::from(".")),
            endpoint: "http://localhost:8080".to_string(),
            api_token: None,
            batch_max_messages: default_max_messages(),
            batch_max_bytes: default_max_bytes(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl SyncConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: SyncConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_workspace_path(None)?.join("config.toml"))
    }

    /// Where sync cursors are persisted for this workspace.
    pub fn cursor_path() -> Result<PathBuf> {
        Ok(resolve_workspace_path(None)?.join("cursors.toml"))
    }

    pub fn transmit_options(&self) -> TransmitOptions {
        TransmitOptions {
            max_messages: self.batch_max_messages,
            max_bytes: self.batch_max_bytes,
            max_attempts: self.max_attempts,
        }
    }
}
