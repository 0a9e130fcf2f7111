use crate::api::ApiClient;
use crate::error::Result;
use crate::session::Session;
use gesture_studio_common::{Credentials, MessageResponse, TokenResponse};

/// ログイン/サインアップ（認証画面そのものは扱わない）
#[derive(Debug, Clone)]
pub struct AuthClient {
    api: ApiClient,
    session: Session,
}

impl AuthClient {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self { api, session }
    }

    /// ログインしてトークン付きのセッションを返す
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let credentials = Credentials { email, password };
        let response: TokenResponse = self
            .api
            .post_json(&self.session.endpoint("/login"), None, Some(&credentials))
            .await?;

        tracing::info!("logged in as {}", email);
        Ok(self.session.clone().with_token(response.access_token))
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<String> {
        let credentials = Credentials { email, password };
        let response: MessageResponse = self
            .api
            .post_json(&self.session.endpoint("/signup"), None, Some(&credentials))
            .await?;

        Ok(response.message.unwrap_or_else(|| "User created".into()))
    }
}
