//! レスポンスパーサー
//!
//! - WebSocketの受信メッセージ（予測/エラー）のパース
//! - HTTPエラーレスポンスの `detail` 抽出
//! - 画像フレームのData URL変換

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};
use crate::types::ServerMessage;

/// WebSocket受信メッセージをパース
///
/// `{"prediction": "..."}` または `{"error": "..."}` のみ受け付ける。
///
/// # Examples
/// ```
/// use gesture_studio_common::{parse_server_message, ServerMessage};
///
/// let msg = parse_server_message(r#"{"prediction":"Volume Up"}"#).unwrap();
/// assert_eq!(msg, ServerMessage::Prediction { prediction: "Volume Up".into() });
/// ```
pub fn parse_server_message(text: &str) -> Result<ServerMessage> {
    serde_json::from_str(text.trim())
        .map_err(|e| Error::UnexpectedMessage(e.to_string()))
}

/// エラーレスポンスから `detail` を取り出す
///
/// FastAPIのバリデーションエラーのように `detail` が配列の場合は
/// JSON文字列のまま返す。
pub fn extract_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::String(_) | serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// 拡張子からMIMEタイプを判定
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// バイト列をData URLに変換
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================
    // parse_server_message テスト
    // =============================================

    #[test]
    fn test_parse_prediction() {
        let msg = parse_server_message(r#"{"prediction":"no_hand"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Prediction {
                prediction: "no_hand".to_string()
            }
        );
    }

    #[test]
    fn test_parse_server_error() {
        let msg = parse_server_message(r#"{"error": "Model not trained"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Error {
                error: "Model not trained".to_string()
            }
        );
    }

    #[test]
    fn test_parse_malformed_message() {
        assert!(parse_server_message("not json").is_err());
        assert!(parse_server_message(r#"{"prediction": 3}"#).is_err());
        assert!(parse_server_message(r#"{"label": "x"}"#).is_err());
    }

    // =============================================
    // extract_error_detail テスト
    // =============================================

    #[test]
    fn test_extract_error_detail_string() {
        let detail = extract_error_detail(r#"{"detail":"insufficient samples"}"#);
        assert_eq!(detail.as_deref(), Some("insufficient samples"));
    }

    #[test]
    fn test_extract_error_detail_array() {
        let detail = extract_error_detail(r#"{"detail":[{"loc":["body"],"msg":"field required"}]}"#)
            .unwrap();
        assert!(detail.contains("field required"));
    }

    #[test]
    fn test_extract_error_detail_missing() {
        assert_eq!(extract_error_detail("Internal Server Error"), None);
        assert_eq!(extract_error_detail(r#"{"message":"x"}"#), None);
        assert_eq!(extract_error_detail(r#"{"detail":""}"#), None);
    }

    // =============================================
    // Data URL テスト
    // =============================================

    #[test]
    fn test_encode_data_url() {
        let url = encode_data_url("image/png", b"abc");
        assert_eq!(url, "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_mime_type_for_extension() {
        assert_eq!(mime_type_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(mime_type_for_extension("png"), Some("image/png"));
        assert_eq!(mime_type_for_extension("gif"), None);
    }
}
