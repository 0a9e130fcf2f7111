use thiserror::Error;

/// ガイド付き撮影の失敗理由
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    #[error("フレームを1枚も取得できませんでした。カメラを確認してください")]
    NoFrames,
}

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("入力エラー: {0}")]
    Validation(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("認証エラー: {0}")]
    Auth(String),

    /// サーバーの `detail` をそのまま表示する
    #[error("{0}")]
    Server(String),

    #[error("接続エラー: {0}")]
    Stream(String),

    #[error("実行中のため開始できません: {0}")]
    Conflict(String),

    #[error("HTTP通信エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] gesture_studio_common::Error),
}

impl StudioError {
    /// トークン未設定
    pub fn missing_token() -> Self {
        StudioError::Auth(
            "ログインしていません。`gesture-studio login` でログインしてください".into(),
        )
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
