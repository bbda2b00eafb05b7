//! Settings storage
//!
//! Manages persistence of the remote endpoints and sync timing.

use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_FETCH_URL: &str = "https://jsonplaceholder.typicode.com/posts";
const DEFAULT_SERVER_CATEGORY: &str = "Server";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Endpoint returning a JSON array of posts
    #[serde(default = "default_fetch_url")]
    pub fetch_url: String,
    /// Endpoint receiving the full quote list
    #[serde(default = "default_fetch_url")]
    pub push_url: String,
    /// Category assigned to quotes coming from the server
    #[serde(default = "default_server_category")]
    pub server_category: String,
    /// Maximum number of server posts turned into quotes per cycle
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    /// Seconds between periodic sync cycles
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_fetch_url() -> String {
    DEFAULT_FETCH_URL.to_string()
}

fn default_server_category() -> String {
    DEFAULT_SERVER_CATEGORY.to_string()
}

fn default_fetch_limit() -> usize {
    5
}

fn default_sync_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            fetch_url: default_fetch_url(),
            push_url: default_fetch_url(),
            server_category: default_server_category(),
            fetch_limit: default_fetch_limit(),
            sync_interval_secs: default_sync_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl AppSettings {
    /// Validate settings values
    ///
    /// Restores defaults for blank strings and keeps numbers in usable ranges.
    pub fn validate(&mut self) {
        if self.fetch_url.trim().is_empty() {
            self.fetch_url = default_fetch_url();
        }
        if self.push_url.trim().is_empty() {
            self.push_url = self.fetch_url.clone();
        }
        if self.server_category.trim().is_empty() {
            self.server_category = default_server_category();
        }

        self.fetch_limit = self.fetch_limit.clamp(1, 100);
        // Intervals below a few seconds would hammer the endpoint
        self.sync_interval_secs = self.sync_interval_secs.clamp(5, 24 * 60 * 60);
        self.request_timeout_secs = self.request_timeout_secs.clamp(1, 300);
    }
}

/// Get the settings file path
fn get_settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

/// Load settings from disk
///
/// Returns default settings if the file doesn't exist or is corrupted
pub fn load_settings(data_dir: &Path) -> AppSettings {
    match load_settings_internal(data_dir) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            AppSettings::default()
        }
    }
}

/// Internal settings loading with error propagation
fn load_settings_internal(data_dir: &Path) -> Result<AppSettings, StorageError> {
    let path = get_settings_path(data_dir);

    if !path.exists() {
        tracing::info!("Settings file not found, using defaults");
        return Ok(AppSettings::default());
    }

    let json = fs::read_to_string(&path)?;
    let mut settings: AppSettings = serde_json::from_str(&json)?;
    settings.validate();

    tracing::debug!("Loaded settings from disk");
    Ok(settings)
}

/// Save settings to disk
pub fn save_settings(data_dir: &Path, settings: &AppSettings) -> Result<(), StorageError> {
    fs::create_dir_all(data_dir)?;

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(get_settings_path(data_dir), json)?;

    tracing::debug!("Saved settings to disk");
    Ok(())
}
