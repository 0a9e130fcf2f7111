//! gesture-studio
//!
//! ジェスチャー収集・リアルタイム予測・モデル再学習のクライアント。

pub mod api;
pub mod camera;
pub mod capture;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod logging;
pub mod session;
pub mod stream;
pub mod training;
pub mod ui;

pub use controller::{CameraMode, CameraModeController};
pub use error::{CaptureError, Result, StudioError};
pub use session::Session;
