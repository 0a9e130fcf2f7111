//! リアルタイム予測ストリーム
//!
//! 1本のWebSocket接続と、それに対応するフレーム送信タイマーを管理する。
//!
//! 状態遷移:
//! - Idle → Connecting → Open
//! - Open → Errored（ソケットエラー）/ Closed（切断）
//!
//! 送信と受信は独立しており、`last_prediction` は「最後に届いた予測」であって
//! 「最後に送ったフレームの予測」ではない。

mod socket;

pub use socket::{Connector, Inbound, Outbound, SocketChannels, WsConnector};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use gesture_studio_common::{parse_server_message, AuthMessage, FrameMessage, ServerMessage};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};

use crate::camera::FrameSource;
use crate::error::{Result, StudioError};
use crate::events::{EventSink, SessionEvent};
use crate::session::{Session, PREDICT_PATH};

/// フレーム送信間隔
pub const PUSH_INTERVAL: Duration = Duration::from_millis(300);
/// クローズフレーム送信の待ち上限
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

const CONNECTING_TEXT: &str = "Connecting to prediction server…";
const OPEN_TEXT: &str = "Connected. Waiting for prediction…";
const ERRORED_TEXT: &str = "Connection error";
const CLOSED_TEXT: &str = "Prediction stopped";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Idle,
    Connecting,
    Open,
    Errored,
    Closed,
}

/// 接続状態のスナップショット
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSnapshot {
    pub status: StreamStatus,
    pub last_prediction: Option<String>,
    pub status_text: String,
    pub push_active: bool,
    pub connected: bool,
}

#[derive(Debug, Default)]
struct StreamShared {
    status: StreamStatus,
    last_prediction: Option<String>,
    status_text: String,
    push_active: bool,
    connected: bool,
    push_abort: Option<AbortHandle>,
}

impl StreamShared {
    /// 送信タイマーを止める
    fn stop_push(&mut self) {
        if let Some(handle) = self.push_abort.take() {
            handle.abort();
        }
        self.push_active = false;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ActiveStream {
    outbound: mpsc::UnboundedSender<Outbound>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    push_task: Option<JoinHandle<()>>,
    recv_task: JoinHandle<()>,
}

/// 接続中でもロックなしで状態を読めるハンドル
#[derive(Clone)]
pub struct StreamWatcher {
    shared: Arc<Mutex<StreamShared>>,
}

impl StreamWatcher {
    pub fn snapshot(&self) -> StreamSnapshot {
        let shared = lock(&self.shared);
        StreamSnapshot {
            status: shared.status,
            last_prediction: shared.last_prediction.clone(),
            status_text: shared.status_text.clone(),
            push_active: shared.push_active,
            connected: shared.connected,
        }
    }
}

/// 接続の終了待ち
///
/// サーバー側の切断やエラーで接続が終わったときに完了する。
/// `disconnect` で閉じた場合は受信タスクごと破棄されるので完了しない。
pub struct StreamEnded(oneshot::Receiver<StreamStatus>);

impl StreamEnded {
    pub async fn wait(self) -> Option<StreamStatus> {
        self.0.await.ok()
    }
}

pub struct PredictionStreamClient {
    connector: Arc<dyn Connector>,
    session: Session,
    events: EventSink,
    interval: Duration,
    shared: Arc<Mutex<StreamShared>>,
    active: Option<ActiveStream>,
}

impl PredictionStreamClient {
    pub fn new(connector: Arc<dyn Connector>, session: Session, events: EventSink) -> Self {
        Self {
            connector,
            session,
            events,
            interval: PUSH_INTERVAL,
            shared: Arc::new(Mutex::new(StreamShared::default())),
            active: None,
        }
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        self.watcher().snapshot()
    }

    pub fn watcher(&self) -> StreamWatcher {
        StreamWatcher {
            shared: self.shared.clone(),
        }
    }

    pub fn status(&self) -> StreamStatus {
        lock(&self.shared).status
    }

    /// 接続を開いて認証トークンを送る
    ///
    /// 既存の接続があれば先に閉じる。
    pub async fn connect(&mut self) -> Result<StreamEnded> {
        self.disconnect().await;

        let token = self.session.require_token()?.to_string();
        let url = self.session.ws_url(PREDICT_PATH)?;

        {
            let mut shared = lock(&self.shared);
            shared.status = StreamStatus::Connecting;
            shared.last_prediction = None;
            shared.status_text = CONNECTING_TEXT.into();
        }
        self.events.emit(SessionEvent::Connecting(true));
        self.events.emit(SessionEvent::StreamStatus(StreamStatus::Connecting));
        self.events.emit(SessionEvent::StatusText(CONNECTING_TEXT.into()));

        let channels = match self.connector.connect(&url).await {
            Ok(channels) => channels,
            Err(err) => {
                self.mark_errored(&err.to_string());
                return Err(err);
            }
        };

        let auth = serde_json::to_string(&AuthMessage { token: &token })?;
        if channels.outbound.send(Outbound::Text(auth)).is_err() {
            let err = StudioError::Stream("接続が閉じられました".into());
            self.mark_errored(&err.to_string());
            return Err(err);
        }

        {
            let mut shared = lock(&self.shared);
            shared.status = StreamStatus::Open;
            shared.status_text = OPEN_TEXT.into();
            shared.connected = true;
        }
        tracing::info!("prediction stream open: {}", url);
        self.events.emit(SessionEvent::Connecting(false));
        self.events.emit(SessionEvent::StreamStatus(StreamStatus::Open));
        self.events.emit(SessionEvent::StatusText(OPEN_TEXT.into()));

        let (ended_tx, ended_rx) = oneshot::channel();
        let recv_task = tokio::spawn(receive_loop(
            channels.inbound,
            self.shared.clone(),
            self.events.clone(),
            ended_tx,
        ));

        self.active = Some(ActiveStream {
            outbound: channels.outbound,
            writer: channels.writer,
            reader: channels.reader,
            push_task: None,
            recv_task,
        });

        Ok(StreamEnded(ended_rx))
    }

    /// フレーム送信タイマーを開始（接続が開いているときのみ）
    pub fn start_push(&mut self, camera: Arc<dyn FrameSource>) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Err(StudioError::Stream("接続されていません".into()));
        };
        if active.push_task.is_some() {
            return Ok(());
        }

        let mut shared = lock(&self.shared);
        if shared.status != StreamStatus::Open {
            return Err(StudioError::Stream("接続が開いていません".into()));
        }

        let task = tokio::spawn(push_loop(
            camera,
            active.outbound.clone(),
            self.shared.clone(),
            self.interval,
        ));
        shared.push_abort = Some(task.abort_handle());
        shared.push_active = true;
        active.push_task = Some(task);
        Ok(())
    }

    /// 送信タイマーを止めてから接続を閉じる（未接続なら何もしない）
    ///
    /// 戻った時点で送信タイマー、受信タスク、ソケットはすべて止まっている。
    /// 接続途中で中断された場合も Closed に戻す。
    pub async fn disconnect(&mut self) {
        if let Some(active) = self.active.take() {
            if let Some(push_task) = active.push_task {
                push_task.abort();
                let _ = push_task.await;
            }
            lock(&self.shared).stop_push();

            let _ = active.outbound.send(Outbound::Close);
            drop(active.outbound);

            if let Some(mut writer) = active.writer {
                // 相手が応答しなければ打ち切る
                if tokio::time::timeout(CLOSE_TIMEOUT, &mut writer).await.is_err() {
                    tracing::debug!("close handshake timed out");
                    writer.abort();
                    let _ = writer.await;
                }
            }
            if let Some(reader) = active.reader {
                reader.abort();
                let _ = reader.await;
            }

            active.recv_task.abort();
            let _ = active.recv_task.await;
        }

        let (closed, was_connecting) = {
            let mut shared = lock(&self.shared);
            shared.stop_push();
            shared.connected = false;
            let was_connecting = shared.status == StreamStatus::Connecting;
            if matches!(shared.status, StreamStatus::Open | StreamStatus::Connecting) {
                shared.status = StreamStatus::Closed;
                shared.status_text = CLOSED_TEXT.into();
                (true, was_connecting)
            } else {
                (false, false)
            }
        };
        if was_connecting {
            self.events.emit(SessionEvent::Connecting(false));
        }
        if closed {
            self.events.emit(SessionEvent::StreamStatus(StreamStatus::Closed));
            self.events.emit(SessionEvent::StatusText(CLOSED_TEXT.into()));
            tracing::debug!("prediction stream disconnected");
        }
    }

    fn mark_errored(&self, reason: &str) {
        {
            let mut shared = lock(&self.shared);
            shared.status = StreamStatus::Errored;
            shared.status_text = ERRORED_TEXT.into();
            shared.stop_push();
        }
        tracing::warn!("prediction stream error: {}", reason);
        self.events.emit(SessionEvent::Connecting(false));
        self.events.emit(SessionEvent::StreamStatus(StreamStatus::Errored));
        self.events.emit(SessionEvent::StatusText(ERRORED_TEXT.into()));
        self.events.error(format!("Connection error: {}", reason));
    }
}

async fn push_loop(
    camera: Arc<dyn FrameSource>,
    outbound: mpsc::UnboundedSender<Outbound>,
    shared: Arc<Mutex<StreamShared>>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if lock(&shared).status != StreamStatus::Open {
            break;
        }

        let Some(frame) = camera.snapshot() else {
            // カメラ未起動のティックは飛ばす
            continue;
        };

        let payload = match serde_json::to_string(&FrameMessage { frame: &frame }) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("failed to encode frame message: {}", e);
                continue;
            }
        };
        if outbound.send(Outbound::Text(payload)).is_err() {
            break;
        }
    }

    lock(&shared).push_active = false;
}

async fn receive_loop(
    mut inbound: mpsc::UnboundedReceiver<Inbound>,
    shared: Arc<Mutex<StreamShared>>,
    events: EventSink,
    ended: oneshot::Sender<StreamStatus>,
) {
    let error = loop {
        match inbound.recv().await {
            Some(Inbound::Text(text)) => handle_message(&text, &shared, &events),
            Some(Inbound::Error(reason)) => break Some(reason),
            Some(Inbound::Closed) | None => break None,
        }
    };

    let status = match error {
        Some(reason) => {
            {
                let mut shared = lock(&shared);
                shared.status = StreamStatus::Errored;
                shared.status_text = ERRORED_TEXT.into();
                shared.stop_push();
            }
            tracing::warn!("prediction stream error: {}", reason);
            events.emit(SessionEvent::Connecting(false));
            events.emit(SessionEvent::StreamStatus(StreamStatus::Errored));
            events.emit(SessionEvent::StatusText(ERRORED_TEXT.into()));
            events.error(format!("Connection error: {}", reason));
            StreamStatus::Errored
        }
        None => {
            {
                let mut shared = lock(&shared);
                shared.status = StreamStatus::Closed;
                shared.status_text = CLOSED_TEXT.into();
                shared.stop_push();
            }
            tracing::info!("prediction stream closed by server");
            events.emit(SessionEvent::StreamStatus(StreamStatus::Closed));
            events.emit(SessionEvent::StatusText(CLOSED_TEXT.into()));
            events.info("Prediction stream closed");
            StreamStatus::Closed
        }
    };

    let _ = ended.send(status);
}

fn handle_message(text: &str, shared: &Mutex<StreamShared>, events: &EventSink) {
    match parse_server_message(text) {
        Ok(ServerMessage::Prediction { prediction }) => {
            let status_text = format!("Prediction: {}", prediction);
            {
                let mut shared = lock(shared);
                shared.last_prediction = Some(prediction.clone());
                shared.status_text = status_text.clone();
            }
            events.emit(SessionEvent::Prediction(prediction));
            events.emit(SessionEvent::StatusText(status_text));
        }
        Ok(ServerMessage::Error { error }) => {
            events.error(error);
        }
        Err(e) => {
            // 不正なメッセージは無視
            tracing::debug!("ignored message: {}", e);
        }
    }
}
