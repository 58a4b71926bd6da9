//! Application settings.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "draftledger";

/// Settings that persist across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Base URL of the mail API.
    pub api_base_url: String,
    /// Bearer token of the API.
    pub api_token: String,
    /// Mailbox whose drafts are pushed.
    pub mailbox_uuid: String,
    /// Seconds between dispatch runs; `None` runs once and exits.
    pub dispatch_interval_secs: Option<u64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://mail.infomaniak.com".to_string(),
            api_token: String::new(),
            mailbox_uuid: String::new(),
            dispatch_interval_secs: None,
        }
    }
}

impl AppSettings {
    /// Directory holding the settings file.
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Directory holding the draft database and attachment copies.
    #[must_use]
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Load settings from the default location.
    ///
    /// On first run the defaults are written there for the user to edit.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_dir().join("settings.json");
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let settings = Self::default();
            settings.save_to(&path).await?;
            return Ok(settings);
        }
        Self::load_from(&path).await
    }

    /// Load settings from `path`, or the defaults if it does not exist.
    pub async fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Save settings to `path`, creating its directory.
    pub async fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        tracing::info!(path = %path.display(), "Settings saved");
        Ok(())
    }
}

/// Path of the draft database in `data_dir`, as the store expects it.
pub fn database_path(data_dir: &Path) -> anyhow::Result<String> {
    let path = data_dir.join("drafts.db");
    path.to_str()
        .map(ToString::to_string)
        .with_context(|| format!("Database path {} is not valid UTF-8", path.display()))
}
