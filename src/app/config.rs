use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_API_BASE_URL, HEALTH_CHECK_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS,
    MAX_DRAFT_CHARACTERS, PRESENTATION_DELAY_MS,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Chat pacing and limits
    #[serde(default)]
    pub chat: ChatConfig,

    /// UI configuration
    #[serde(default)]
    pub ui: UIConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix
    pub base_url: String,
    /// Timeout for regular requests
    pub request_timeout_secs: u64,
    /// Timeout for the health probe
    pub health_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
            health_timeout_secs: HEALTH_CHECK_TIMEOUT_SECS,
        }
    }
}

/// Chat configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Pause before a bot reply is shown
    pub presentation_delay_ms: u64,
    /// Display-side cap on the draft length
    pub max_characters: usize,
    /// Load the resource list when a session starts
    pub fetch_resources_on_start: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            presentation_delay_ms: PRESENTATION_DELAY_MS,
            max_characters: MAX_DRAFT_CHARACTERS,
            fetch_resources_on_start: true,
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UIConfig {
    /// Show the resources pane by default
    pub show_resources: bool,
    /// Show the analysis panel by default
    pub show_analysis: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            show_resources: true,
            show_analysis: false,
        }
    }
}

/// Load configuration from multiple sources
///
/// An explicit file replaces the global and local config files; the
/// environment (`SOLACE_` prefix, `__` between nested keys) always applies.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        figment = figment.merge(Toml::file(path));
    } else {
        let global_config = get_config_dir()?.join("config.toml");
        let local_config = PathBuf::from(".solace/config.toml");

        if global_config.exists() {
            figment = figment.merge(Toml::file(&global_config));
        }
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }
    }

    figment = figment.merge(Env::prefixed("SOLACE_").split("__"));

    figment
        .extract()
        .context("Failed to load configuration")
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "solace")
}

/// Fallback under `$HOME` when the platform dirs can't be resolved
fn home_fallback(sub: &str) -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(sub).join("solace"))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = match project_dirs() {
        Some(dirs) => dirs.config_dir().to_path_buf(),
        None => home_fallback(".config")?,
    };
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

/// Get the data directory (log files)
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = match project_dirs() {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => home_fallback(".local/share")?,
    };
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => get_config_dir()?.join("config.toml"),
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

const LOCAL_EXAMPLE: &str = r#"# Solace Project Configuration
# Copy to .solace/config.toml to override global settings here

[api]
base_url = "http://127.0.0.1:8001/api"
request_timeout_secs = 30

[chat]
presentation_delay_ms = 1500
max_characters = 500
"#;

/// Create a default configuration file if it doesn't exist
///
/// Returns the paths that were written.
pub fn init_config() -> Result<Vec<PathBuf>> {
    init_config_in(&get_config_dir()?, Path::new(".solace"))
}

fn init_config_in(config_dir: &Path, local_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let config_file = config_dir.join("config.toml");
    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
        written.push(config_file);
    }

    let local_example = local_dir.join("config.toml.example");
    if !local_example.exists() {
        std::fs::create_dir_all(local_dir)?;
        std::fs::write(&local_example, LOCAL_EXAMPLE)?;
        written.push(local_example);
    }

    Ok(written)
}
