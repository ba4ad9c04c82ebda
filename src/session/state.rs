use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::get_config_dir;
use crate::models::ConversationId;

/// Client state that persists between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Conversation that was active when the client last exited
    pub last_conversation_id: Option<ConversationId>,
    /// Backend that conversation lives on
    pub last_api_url: Option<String>,
}

impl SessionState {
    fn session_file() -> Result<PathBuf> {
        Ok(get_config_dir()?.join("session.toml"))
    }

    /// Load session state from disk
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::session_file()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .with_context(|| format!("Malformed session file {}", path.display()))
    }

    /// Save session state to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::session_file()?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Remember the active conversation on `api_url`
    pub fn set_conversation(&mut self, id: Option<ConversationId>, api_url: &str) {
        self.last_conversation_id = id;
        self.last_api_url = Some(api_url.to_string());
    }

    /// The conversation to continue, if it belongs to `api_url`
    pub fn conversation_for(&self, api_url: &str) -> Option<ConversationId> {
        match self.last_api_url.as_deref() {
            Some(url) if url == api_url => self.last_conversation_id,
            _ => None,
        }
    }
}
