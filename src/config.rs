use crate::capture::CaptureTiming;
use crate::error::{Result, StudioError};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BASE_URL_ENV: &str = "GESTURE_STUDIO_BASE_URL";
const TOKEN_ENV: &str = "GESTURE_STUDIO_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub token: Option<String>,
    pub request_timeout_seconds: u64,
    pub capture_mount_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            token: None,
            request_timeout_seconds: 30,
            capture_mount_delay_ms: 0,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| StudioError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("gesture-studio").join("config.json"))
    }

    /// 現在の設定からセッションを作る（環境変数を優先）
    pub fn session(&self) -> Session {
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| self.base_url.clone());
        let session = Session::new(base_url);

        match std::env::var(TOKEN_ENV).ok().or_else(|| self.token.clone()) {
            Some(token) => session.with_token(token),
            None => session,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }

    pub fn capture_timing(&self) -> CaptureTiming {
        CaptureTiming {
            mount_delay: Duration::from_millis(self.capture_mount_delay_ms),
            ..CaptureTiming::default()
        }
    }

    pub fn set_token(&mut self, token: String) -> Result<()> {
        self.token = Some(token);
        self.save()
    }

    pub fn clear_token(&mut self) -> Result<()> {
        self.token = None;
        self.save()
    }

    pub fn set_base_url(&mut self, base_url: String) -> Result<()> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StudioError::Config(format!(
                "ベースURLは http:// または https:// で始めてください: {}",
                base_url
            )));
        }
        self.base_url = base_url;
        self.save()
    }
}
