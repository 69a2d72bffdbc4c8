use crate::error::BotError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "open_api_key")]
    pub openai_key: String,
    #[serde(rename = "elevenlabs_api_key")]
    pub elevenlabs_key: String,
    #[serde(rename = "eleven_voice_id")]
    #[serde(default = "default_voice_id")]
    pub eleven_voice_id: String,
    #[serde(rename = "eleven_model_id")]
    #[serde(default = "default_model_id")]
    pub eleven_model_id: String,
    /// Google client-secret source: `file://path`, `base64://blob`, or a bare path.
    #[serde(rename = "google_client_secret")]
    #[serde(default = "default_client_secret")]
    pub client_secret: String,
    #[serde(rename = "db_path")]
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(rename = "history_dir")]
    #[serde(default = "default_history_dir")]
    pub history_dir: String,
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_client_secret() -> String {
    "client_secret.json".to_string()
}

fn default_db_path() -> String {
    "bot_state.sqlite".to_string()
}

fn default_history_dir() -> String {
    "history".to_string()
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, BotError> {
        let content = fs::read_to_string(&path).await.map_err(|e| {
            BotError::Config(format!(
                "Failed to read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| BotError::Config(format!("Failed to parse config: {}", e)))?;

        if config.openai_key.is_empty() {
            return Err(BotError::Config("config.json: open_api_key missing".into()));
        }
        if config.elevenlabs_key.is_empty() {
            return Err(BotError::Config(
                "config.json: elevenlabs_api_key missing".into(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(
            &path,
            r#"{"open_api_key":"sk-x","elevenlabs_api_key":"el-x"}"#,
        )
        .await
        .unwrap();

        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.db_path, "bot_state.sqlite");
        assert_eq!(cfg.history_dir, "history");
        assert_eq!(cfg.client_secret, "client_secret.json");
        assert_eq!(cfg.eleven_model_id, "eleven_multilingual_v2");
    }

    #[tokio::test]
    async fn load_rejects_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"open_api_key":"","elevenlabs_api_key":"el"}"#)
            .await
            .unwrap();

        assert!(matches!(
            Config::load(&path).await,
            Err(BotError::Config(_))
        ));
    }
}
