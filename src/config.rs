use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/companion.json";

pub const ENDPOINT_ENV: &str = "COMPANION_CHAT_ENDPOINT";
pub const ACCESS_TOKEN_ENV: &str = "COMPANION_ACCESS_TOKEN";

const DEFAULT_ENDPOINT: &str = "http://localhost:54321/functions/v1/chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Chat function URL. It holds the model provider key, never the client.
    pub chat_endpoint: String,
    /// Bearer token for the chat function itself.
    pub access_token: Option<String>,
    pub database_path: PathBuf,
    pub uploads_dir: PathBuf,
    /// Number of previous messages sent along with each question.
    pub history_window: usize,
    /// Bounds connecting and waiting for response headers, not the stream.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat_endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            database_path: PathBuf::from("data/companion.db"),
            uploads_dir: PathBuf::from("data/uploads"),
            history_window: 6,
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Environment wins over the config file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|value| !value.trim().is_empty()) {
            self.chat_endpoint = endpoint.trim().to_string();
        }
        if let Some(token) = lookup(ACCESS_TOKEN_ENV).filter(|value| !value.trim().is_empty()) {
            self.access_token = Some(token.trim().to_string());
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}
