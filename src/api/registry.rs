use crate::api::ApiClient;
use crate::error::Result;
use crate::session::Session;
use futures::future::BoxFuture;
use gesture_studio_common::{
    DeleteGestureRequest, GestureMapResponse, GestureRecord, MessageResponse, SaveFrameRequest,
};

/// 撮影したフレームの保存先
///
/// 成功時はサーバーのメッセージを返す。
pub trait GestureSink: Send + Sync {
    fn save_gesture<'a>(
        &'a self,
        gesture_name: &'a str,
        action: &'a str,
        frames: &'a [String],
    ) -> BoxFuture<'a, Result<String>>;
}

/// ジェスチャー登録API（状態を持たない）
///
/// 一覧はキャッシュしない。保存/削除の後は `list` で取り直す。
#[derive(Debug, Clone)]
pub struct GestureRegistryClient {
    api: ApiClient,
    session: Session,
}

impl GestureRegistryClient {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self { api, session }
    }

    pub async fn list(&self) -> Result<Vec<GestureRecord>> {
        let token = self.session.require_token()?;
        let response: GestureMapResponse = self
            .api
            .get_json(&self.session.endpoint("/extract_map"), Some(token))
            .await?;
        Ok(response.map)
    }

    pub async fn save(&self, gesture_name: &str, action: &str, frames: &[String]) -> Result<String> {
        let token = self.session.require_token()?;
        let request = SaveFrameRequest {
            gesture_name,
            action,
            features: frames,
        };

        tracing::info!("saving {} frames for gesture {}", frames.len(), gesture_name);
        let response: MessageResponse = self
            .api
            .post_json(&self.session.endpoint("/save_frame"), Some(token), Some(&request))
            .await?;

        Ok(response
            .message
            .unwrap_or_else(|| format!("{} frames saved", frames.len())))
    }

    /// 削除（呼び出し側で事前に確認を取ること）
    pub async fn delete(&self, gesture_name: &str) -> Result<()> {
        let token = self.session.require_token()?;
        let request = DeleteGestureRequest { gesture_name };

        let _: serde_json::Value = self
            .api
            .post_json(&self.session.endpoint("/delete_gesture"), Some(token), Some(&request))
            .await?;

        tracing::info!("gesture {} deleted", gesture_name);
        Ok(())
    }
}

impl GestureSink for GestureRegistryClient {
    fn save_gesture<'a>(
        &'a self,
        gesture_name: &'a str,
        action: &'a str,
        frames: &'a [String],
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.save(gesture_name, action, frames))
    }
}
