//! UI向けのイベントストリーム
//!
//! 各コンポーネントは状態変化を `SessionEvent` として通知する。
//! UI側（CLI）は受信側を読んで表示を更新する。

use tokio::sync::mpsc;

use crate::stream::StreamStatus;
use crate::training::TrainingStatus;

/// カメラモード（同時に1つだけ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraMode {
    #[default]
    Idle,
    Collecting,
    Predicting,
}

impl CameraMode {
    pub fn label(&self) -> &'static str {
        match self {
            CameraMode::Idle => "Camera inactive",
            CameraMode::Collecting => "Collecting Data",
            CameraMode::Predicting => "Live Prediction",
        }
    }
}

/// 通知レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ModeChanged(CameraMode),

    /// 撮影ステップ開始（index は0始まり）
    CaptureStep {
        index: usize,
        total: usize,
        prompt: String,
        progress: u8,
    },
    FrameCaptured { index: usize, captured: usize },
    FrameSkipped { index: usize },
    /// 保存や削除でジェスチャー一覧が変わった（再取得が必要）
    RegistryChanged,

    Connecting(bool),
    StreamStatus(StreamStatus),
    StatusText(String),
    Prediction(String),

    TrainingProgress { progress: f64, message: String },
    TrainingStatus(TrainingStatus),
    TrainingActive(bool),

    Notice { level: NoticeLevel, message: String },
}

pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// イベント送信側。受信側が無い場合は黙って捨てる
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl EventSink {
    /// 受信側を持たないシンク
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(SessionEvent::Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(SessionEvent::Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        });
    }
}

pub fn channel() -> (EventSink, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx: Some(tx) }, rx)
}
