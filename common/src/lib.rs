//! Gesture Studio Common Library
//!
//! CLIとクライアントコアで共有される型とユーティリティ

pub mod error;
pub mod parser;
pub mod prompts;
pub mod types;

pub use error::{Error, Result};
pub use parser::{
    encode_data_url, extract_error_detail, mime_type_for_extension, parse_server_message,
};
pub use prompts::{is_known_action, step_progress, ACTIONS, CAPTURE_PROMPTS};
pub use types::{
    AuthMessage, Credentials, DeleteGestureRequest, FrameMessage, GestureMapResponse,
    GestureRecord, MessageResponse, RetrainResponse, SaveFrameRequest, ServerMessage,
    TokenResponse,
};
