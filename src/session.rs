//! 認証セッション
//!
//! バックエンドのベースURLとベアラートークンを保持する。
//! 各クライアントへ明示的に渡し、グローバルなトークンストアは持たない。

use crate::error::{Result, StudioError};

/// 予測用WebSocketのパス
pub const PREDICT_PATH: &str = "/ws/predict";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    base_url: String,
    token: Option<String>,
}

impl Session {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self {
            base_url,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// 保護されたAPI用。未ログインなら `Auth` エラー
    pub fn require_token(&self) -> Result<&str> {
        self.token().ok_or_else(StudioError::missing_token)
    }

    /// HTTPエンドポイントのURL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// WebSocketのURL（http→ws, https→wss）
    pub fn ws_url(&self, path: &str) -> Result<String> {
        let rest = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            return Err(StudioError::Config(format!(
                "ベースURLは http:// または https:// で始めてください: {}",
                self.base_url
            )));
        };
        Ok(format!("{}{}", rest, path))
    }
}
