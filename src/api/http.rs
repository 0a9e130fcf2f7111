//! 共通HTTPクライアントとレスポンス処理

use crate::error::{Result, StudioError};
use gesture_studio_common::extract_error_detail;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> Result<T> {
        let mut request = self.http.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        decode_response(request.send().await?).await
    }

    pub(crate) async fn post_json<B, T>(
        &self,
        url: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        decode_response(request.send().await?).await
    }
}

/// ステータスを確認してJSONをデコード
///
/// 2xx以外はレスポンスの `detail` をそのままエラーメッセージにする。
async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        tracing::warn!("request failed with status {}", status);
        return Err(status_error(status, &text));
    }

    let body = if text.trim().is_empty() { "{}" } else { text.as_str() };
    Ok(serde_json::from_str(body)?)
}

fn status_error(status: StatusCode, body: &str) -> StudioError {
    let message = extract_error_detail(body)
        .unwrap_or_else(|| format!("リクエストに失敗しました (HTTP {})", status.as_u16()));

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        StudioError::Auth(message)
    } else {
        StudioError::Server(message)
    }
}
