//! APIの型定義
//!
//! CLIとクライアントコアで共有されるワイヤ型:
//! - HTTP: ログイン、ジェスチャー登録/一覧/削除、再学習
//! - WebSocket: 認証メッセージ、フレーム送信、予測受信

use serde::{Deserialize, Serialize};

/// 登録済みジェスチャー（ジェスチャー名で一意）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureRecord {
    #[serde(rename = "gesture")]
    pub gesture_name: String,

    #[serde(default)]
    pub action: String,
}

/// POST /login, POST /signup のリクエスト
#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// POST /login のレスポンス
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// `{message}` 形式のレスポンス（空ボディも許容）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageResponse {
    pub message: Option<String>,
}

/// POST /save_frame のリクエスト
#[derive(Debug, Serialize)]
pub struct SaveFrameRequest<'a> {
    pub gesture_name: &'a str,
    pub action: &'a str,
    pub features: &'a [String],
}

/// POST /delete_gesture のリクエスト
#[derive(Debug, Serialize)]
pub struct DeleteGestureRequest<'a> {
    pub gesture_name: &'a str,
}

/// GET /extract_map のレスポンス
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GestureMapResponse {
    #[serde(default)]
    pub map: Vec<GestureRecord>,
}

/// POST /retrain_model のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrainResponse {
    pub message: Option<String>,
    pub classes: Vec<String>,
}

/// WebSocket: 接続直後に送る認証メッセージ
#[derive(Debug, Serialize)]
pub struct AuthMessage<'a> {
    pub token: &'a str,
}

/// WebSocket: フレーム送信メッセージ
#[derive(Debug, Serialize)]
pub struct FrameMessage<'a> {
    pub frame: &'a str,
}

/// WebSocket: サーバーからのメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Prediction { prediction: String },
    Error { error: String },
}
