use crate::api::ApiClient;
use crate::error::Result;
use crate::session::Session;
use gesture_studio_common::RetrainResponse;

/// モデル再学習API
#[derive(Debug, Clone)]
pub struct TrainerClient {
    api: ApiClient,
    session: Session,
}

impl TrainerClient {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self { api, session }
    }

    /// 再学習を実行（完了までブロックする長い呼び出し）
    pub async fn retrain(&self) -> Result<RetrainResponse> {
        let token = self.session.require_token()?;
        self.api
            .post_json::<(), RetrainResponse>(
                &self.session.endpoint("/retrain_model"),
                Some(token),
                None,
            )
            .await
    }
}
