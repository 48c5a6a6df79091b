use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Where ingested artifacts are copied before processing.
    pub data_dir: PathBuf,
    /// Where proof staging directories and archives are written.
    pub proof_dir: PathBuf,
    /// Where per-run audit JSONL files are written.
    pub log_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Remote URL fetching is opt-in; downloads fail immediately when off.
    #[serde(default)]
    pub enable_fetch: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enable_fetch: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ToolsConfig {
    /// When false, OCR and video probing are skipped entirely (the
    /// extractors see every tool as unavailable).
    #[serde(default = "default_tools_enabled")]
    pub enabled: bool,
    /// Wall-clock bound per external-process call; a timeout degrades to
    /// tool-unavailable, never pipeline failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tools_enabled(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_tools_enabled() -> bool {
    true
}

impl Config {
    /// Minimal in-tree configuration, used by tests and as a fallback.
    pub fn minimal() -> Config {
        Config {
            storage: StorageConfig {
                data_dir: PathBuf::from("./artifacts"),
                proof_dir: PathBuf::from("./proofs"),
                log_dir: PathBuf::from("./audit-logs"),
            },
            db: DbConfig {
                path: PathBuf::from("./tracecase.sqlite"),
            },
            network: NetworkConfig::default(),
            tools: ToolsConfig::default(),
        }
    }

    /// Create the storage directories if they do not exist yet.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            &self.storage.data_dir,
            &self.storage.proof_dir,
            &self.storage.log_dir,
        ] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.network.timeout_secs == 0 {
        anyhow::bail!("network.timeout_secs must be > 0");
    }
    if config.tools.timeout_secs == 0 {
        anyhow::bail!("tools.timeout_secs must be > 0");
    }

    Ok(config)
}
