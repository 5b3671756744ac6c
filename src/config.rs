use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AppError;

pub const APP_DIR_NAME: &str = "r3-playback";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DATABASE_FILE_NAME: &str = "r3-playback.db";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_PLAYLIST_SIZE: usize = 20;
pub const DEFAULT_RADIO_EXTEND_THRESHOLD: usize = 3;
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 4;
pub const DEFAULT_HISTORY_LIMIT: usize = 200;
pub const REQUEST_TIMEOUT_SECONDS: u64 = 20;

/// Values shipped in the sample env file. They mean "not filled in yet".
const PLACEHOLDERS: &[&str] = &["YOUR_YOUTUBE_API_KEY", "YOUR_GOOGLE_CLIENT_ID"];

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn get_config_file_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE_NAME)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub youtube_api_key: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub playlist_size: usize,
    pub radio_extend_threshold: usize,
    pub resolve_concurrency: usize,
    pub history_limit: usize,
    pub request_timeout_secs: u64,
    pub mpv_path: String,
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            google_client_id: None,
            google_client_secret: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            playlist_size: DEFAULT_PLAYLIST_SIZE,
            radio_extend_threshold: DEFAULT_RADIO_EXTEND_THRESHOLD,
            resolve_concurrency: DEFAULT_RESOLVE_CONCURRENCY,
            history_limit: DEFAULT_HISTORY_LIMIT,
            request_timeout_secs: REQUEST_TIMEOUT_SECONDS,
            mpv_path: "mpv".to_string(),
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Load `config.json` from the config dir (if present) and apply
    /// environment overrides on top.
    pub fn load() -> Result<Self, AppError> {
        let mut config = Self::load_from_file(&get_config_file_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("YOUTUBE_API_KEY") {
            self.youtube_api_key = Some(v);
        }
        if let Some(v) = lookup("GOOGLE_CLIENT_ID") {
            self.google_client_id = Some(v);
        }
        if let Some(v) = lookup("GOOGLE_CLIENT_SECRET") {
            self.google_client_secret = Some(v);
        }
        if let Some(v) = lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")) {
            self.gemini_api_key = Some(v);
        }
        if let Some(v) = lookup("R3_GEMINI_MODEL") {
            self.gemini_model = v;
        }
        if let Some(v) = lookup("R3_MPV_PATH") {
            self.mpv_path = v;
        }
    }

    pub fn youtube_api_key(&self) -> Option<&str> {
        configured(&self.youtube_api_key)
    }

    /// OAuth client id and secret, only when both are filled in.
    pub fn client_credentials(&self) -> Option<(&str, &str)> {
        Some((
            configured(&self.google_client_id)?,
            configured(&self.google_client_secret)?,
        ))
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        configured(&self.gemini_api_key)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(get_config_dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(DATABASE_FILE_NAME)
    }
}

fn configured(value: &Option<String>) -> Option<&str> {
    let v = value.as_deref()?.trim();
    if v.is_empty() || PLACEHOLDERS.contains(&v) {
        None
    } else {
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.playlist_size, 20);
        assert_eq!(config.radio_extend_threshold, 3);
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert!(config.youtube_api_key().is_none());
        assert!(config.client_credentials().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("YOUTUBE_API_KEY", "yt-key"),
            ("GOOGLE_CLIENT_ID", "client"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("GOOGLE_API_KEY", "gem-key"),
            ("R3_GEMINI_MODEL", "gemini-1.5-pro"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.youtube_api_key(), Some("yt-key"));
        assert_eq!(config.client_credentials(), Some(("client", "secret")));
        assert_eq!(config.gemini_api_key(), Some("gem-key"));
        assert_eq!(config.gemini_model, "gemini-1.5-pro");
    }

    #[test]
    fn test_gemini_key_prefers_specific_var() {
        let vars = env(&[("GEMINI_API_KEY", "a"), ("GOOGLE_API_KEY", "b")]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| vars.get(k).cloned());
        assert_eq!(config.gemini_api_key(), Some("a"));
    }

    #[test]
    fn test_placeholders_count_as_missing() {
        let vars = env(&[
            ("YOUTUBE_API_KEY", "YOUR_YOUTUBE_API_KEY"),
            ("GOOGLE_CLIENT_ID", "YOUR_GOOGLE_CLIENT_ID"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("GEMINI_API_KEY", "   "),
        ]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| vars.get(k).cloned());

        assert!(config.youtube_api_key().is_none());
        assert!(config.client_credentials().is_none());
        assert!(config.gemini_api_key().is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "playlist_size": 12, "mpv_path": "/usr/bin/mpv" }"#).unwrap();
        assert_eq!(config.playlist_size, 12);
        assert_eq!(config.mpv_path, "/usr/bin/mpv");
        assert_eq!(config.resolve_concurrency, DEFAULT_RESOLVE_CONCURRENCY);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config =
            AppConfig::load_from_file(Path::new("/definitely/not/here/config.json")).unwrap();
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }
}
