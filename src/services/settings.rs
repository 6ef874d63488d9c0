use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::database::Database;

const SETTINGS_KEY: &str = "app_settings";

pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant that answers questions about \
the attached PDF documents. Base your answers on their content and cite the document a fact \
comes from whenever you can.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub model: String,
    pub api_base_url: Option<String>,
    pub assistant_instructions: String,
    pub converter_program: String,
    pub converter_args: Vec<String>,
    pub converter_search_paths: Vec<String>,
    pub poll_interval_ms: u64,
    /// `None` waits on a run for as long as the remote service takes.
    pub poll_timeout_secs: Option<u64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base_url: None,
            assistant_instructions: DEFAULT_INSTRUCTIONS.to_string(),
            converter_program: "soffice".to_string(),
            converter_args: vec![
                "--headless".to_string(),
                "--convert-to".to_string(),
                "pdf".to_string(),
            ],
            converter_search_paths: vec![
                "/opt/homebrew/bin".to_string(),
                "/usr/local/bin".to_string(),
                "/Applications/LibreOffice.app/Contents/MacOS".to_string(),
            ],
            poll_interval_ms: 1000,
            poll_timeout_secs: None,
        }
    }
}

pub struct SettingsService;

impl SettingsService {
    pub async fn load(db: &Database) -> AppSettings {
        match db.get_setting(SETTINGS_KEY).await {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("Stored settings are unreadable, using defaults: {}", e);
                AppSettings::default()
            }),
            _ => AppSettings::default(),
        }
    }

    pub async fn save(db: &Database, settings: &AppSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        db.set_setting(SETTINGS_KEY, &json).await
    }
}
