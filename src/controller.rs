//! カメラモード制御
//!
//! Idle / Collecting / Predicting の状態機械。カメラの確保と解放を担当し、
//! 撮影は `GuidedCaptureSequencer`、予測は `PredictionStreamClient` に委譲する。
//!
//! `exit` が唯一の停止経路。撮影の終了やストリームの切断でも同じ経路で後片付けする。

use std::sync::Arc;

use gesture_studio_common::is_known_action;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use crate::api::GestureSink;
use crate::camera::FrameSource;
use crate::capture::{CaptureTiming, GuidedCaptureSequencer};
use crate::error::{Result, StudioError};
use crate::events::{EventSink, SessionEvent};
use crate::stream::{PredictionStreamClient, StreamSnapshot, StreamStatus, StreamWatcher};

pub use crate::events::CameraMode;

const VALIDATION_MESSAGE: &str = "Please enter gesture name and select action";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Collecting,
    /// 接続待ち（Openになるまで Predicting にしない）
    PredictPending,
    Predicting,
}

struct ControllerState {
    phase: Phase,
    /// セッションごとに増える。古いセッションの終了通知を無視するため
    generation: u64,
    /// 撮影タスク、または接続〜終了待ちのタスク
    session_task: Option<JoinHandle<()>>,
}

/// ロックの順序は必ず `state` → `stream`
struct ControllerInner {
    camera: Arc<dyn FrameSource>,
    sink: Arc<dyn GestureSink>,
    events: EventSink,
    timing: CaptureTiming,
    state: Mutex<ControllerState>,
    /// 接続処理中はセッションタスクが保持する。中断はタスクの abort で行う
    stream: Mutex<PredictionStreamClient>,
    stream_watcher: StreamWatcher,
    mode: watch::Sender<CameraMode>,
}

#[derive(Clone)]
pub struct CameraModeController {
    inner: Arc<ControllerInner>,
}

/// 収集開始の入力チェック
pub fn validate_capture_request(gesture_name: &str, action: &str) -> Result<(String, String)> {
    let gesture_name = gesture_name.trim();
    if gesture_name.is_empty() || !is_known_action(action) {
        return Err(StudioError::Validation(VALIDATION_MESSAGE.into()));
    }
    Ok((gesture_name.to_string(), action.to_string()))
}

impl CameraModeController {
    pub fn new(
        camera: Arc<dyn FrameSource>,
        sink: Arc<dyn GestureSink>,
        stream: PredictionStreamClient,
        events: EventSink,
        timing: CaptureTiming,
    ) -> Self {
        let (mode, _) = watch::channel(CameraMode::Idle);
        let stream_watcher = stream.watcher();
        Self {
            inner: Arc::new(ControllerInner {
                camera,
                sink,
                events,
                timing,
                state: Mutex::new(ControllerState {
                    phase: Phase::Idle,
                    generation: 0,
                    session_task: None,
                }),
                stream: Mutex::new(stream),
                stream_watcher,
                mode,
            }),
        }
    }

    pub fn mode(&self) -> CameraMode {
        *self.inner.mode.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CameraMode> {
        self.inner.mode.subscribe()
    }

    /// 現在のセッションが終わるまで待つ
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.mode.subscribe();
        let _ = rx.wait_for(|mode| *mode == CameraMode::Idle).await;
    }

    pub async fn stream_snapshot(&self) -> StreamSnapshot {
        self.inner.stream_watcher.snapshot()
    }

    /// ガイド付き撮影を開始
    pub async fn enter_collect(&self, gesture_name: &str, action: &str) -> Result<()> {
        let result = self.try_enter_collect(gesture_name, action).await;
        if let Err(err) = &result {
            self.inner.events.error(err.to_string());
        }
        result
    }

    /// リアルタイム予測を開始（接続が開いた時点で Predicting）
    pub async fn enter_predict(&self) -> Result<()> {
        let result = self.try_enter_predict().await;
        if let Err(err) = &result {
            // 接続エラーはストリーム側で通知済み
            if !matches!(err, StudioError::Stream(_)) {
                self.inner.events.error(err.to_string());
            }
        }
        result
    }

    /// カメラを閉じる
    ///
    /// どの状態からでも呼べる。接続待ちの場合は接続処理を中断する。
    /// 撮影タイマー、送信タイマー、ソケットを止めてから戻る。
    pub async fn exit(&self) {
        let mut state = self.inner.state.lock().await;
        self.teardown(&mut state, true).await;
    }

    async fn try_enter_collect(&self, gesture_name: &str, action: &str) -> Result<()> {
        let (gesture_name, action) = validate_capture_request(gesture_name, action)?;

        let mut state = self.inner.state.lock().await;
        ensure_idle(&state)?;
        self.inner.camera.mount()?;

        state.generation += 1;
        let generation = state.generation;
        state.phase = Phase::Collecting;
        self.set_mode(CameraMode::Collecting);
        tracing::info!("collecting gesture {} ({})", gesture_name, action);

        let sequencer = GuidedCaptureSequencer::new(
            self.inner.camera.clone(),
            self.inner.sink.clone(),
            self.inner.events.clone(),
            self.inner.timing,
        );
        let controller = self.clone();
        state.session_task = Some(tokio::spawn(async move {
            let events = controller.inner.events.clone();
            match sequencer.run(&gesture_name, &action).await {
                Ok(report) => {
                    events.info(report.message);
                    events.emit(SessionEvent::RegistryChanged);
                }
                Err(err) => {
                    tracing::warn!("capture failed: {}", err);
                    events.error(err.to_string());
                }
            }
            // 保存の成否に関わらずカメラを閉じる
            controller.finish_session(generation).await;
        }));

        Ok(())
    }

    async fn try_enter_predict(&self) -> Result<()> {
        let ready = {
            let mut state = self.inner.state.lock().await;
            ensure_idle(&state)?;
            self.inner.camera.mount()?;

            state.generation += 1;
            let generation = state.generation;
            state.phase = Phase::PredictPending;

            // 接続はロックの外で行う（exit で中断できるように）
            let (ready_tx, ready_rx) = oneshot::channel();
            let controller = self.clone();
            state.session_task = Some(tokio::spawn(async move {
                controller.run_prediction(generation, ready_tx).await;
            }));
            ready_rx
        };

        match ready.await {
            Ok(result) => result,
            Err(_) => Err(StudioError::Stream("接続前に停止しました".into())),
        }
    }

    /// 接続から切断までのセッションタスク
    async fn run_prediction(&self, generation: u64, ready: oneshot::Sender<Result<()>>) {
        let connected = self.inner.stream.lock().await.connect().await;
        let ended = match connected {
            Ok(ended) => ended,
            Err(err) => {
                // 呼び出し側に返す前にカメラを閉じておく
                self.finish_session(generation).await;
                let _ = ready.send(Err(err));
                return;
            }
        };

        {
            let mut state = self.inner.state.lock().await;
            if state.generation != generation || state.phase != Phase::PredictPending {
                return;
            }
            let started = self
                .inner
                .stream
                .lock()
                .await
                .start_push(self.inner.camera.clone());
            if let Err(err) = started {
                self.teardown(&mut state, false).await;
                let _ = ready.send(Err(err));
                return;
            }
            state.phase = Phase::Predicting;
            self.set_mode(CameraMode::Predicting);
        }
        let _ = ready.send(Ok(()));

        let status = ended.wait().await.unwrap_or(StreamStatus::Closed);
        tracing::debug!("prediction stream ended: {:?}", status);
        self.finish_session(generation).await;
    }

    /// セッション自身が終了したときの後片付け
    async fn finish_session(&self, generation: u64) {
        let mut state = self.inner.state.lock().await;
        if state.generation != generation || state.phase == Phase::Idle {
            return;
        }
        self.teardown(&mut state, false).await;
    }

    async fn teardown(&self, state: &mut ControllerState, abort_session: bool) {
        if let Some(task) = state.session_task.take() {
            if abort_session {
                task.abort();
                let _ = task.await;
            }
        }

        self.inner.stream.lock().await.disconnect().await;

        if state.phase != Phase::Idle {
            self.inner.camera.release();
            state.phase = Phase::Idle;
            self.set_mode(CameraMode::Idle);
            tracing::info!("camera closed");
        }
    }

    fn set_mode(&self, mode: CameraMode) {
        let previous = self.inner.mode.send_replace(mode);
        if previous != mode {
            self.inner.events.emit(SessionEvent::ModeChanged(mode));
        }
    }
}

fn ensure_idle(state: &ControllerState) -> Result<()> {
    match state.phase {
        Phase::Idle => Ok(()),
        Phase::Collecting => Err(StudioError::Conflict("ジェスチャー収集中です".into())),
        Phase::PredictPending | Phase::Predicting => {
            Err(StudioError::Conflict("リアルタイム予測中です".into()))
        }
    }
}
