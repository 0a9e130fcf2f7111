//! バックエンドHTTP API
//!
//! - AuthClient: ログイン/サインアップ
//! - GestureRegistryClient: ジェスチャー一覧/保存/削除
//! - TrainerClient: モデル再学習
//!
//! どの呼び出しも自動リトライはしない。

mod auth;
mod http;
mod registry;
mod trainer;

pub use auth::AuthClient;
pub use http::ApiClient;
pub use registry::{GestureRegistryClient, GestureSink};
pub use trainer::TrainerClient;
