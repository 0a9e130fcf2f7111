//! ガイド付き撮影
//!
//! 固定の8ステップを順番に表示し、各ステップの待機後に1枚ずつフレームを撮る。
//! 全ステップ終了後、1枚以上あれば登録APIへ保存する。
//!
//! ステップ i+1 は必ずステップ i の待機が終わってから始まる。

use std::sync::Arc;
use std::time::Duration;

use gesture_studio_common::{step_progress, CAPTURE_PROMPTS};

use crate::api::GestureSink;
use crate::camera::FrameSource;
use crate::error::{CaptureError, Result};
use crate::events::{EventSink, SessionEvent};

/// 1ステップあたりの待機時間
pub const STEP_DWELL: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTiming {
    pub dwell: Duration,
    /// カメラ起動待ち（最初に1回だけ）
    pub mount_delay: Duration,
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self {
            dwell: STEP_DWELL,
            mount_delay: Duration::ZERO,
        }
    }
}

impl CaptureTiming {
    /// 撮影全体の所要時間
    pub fn total(&self, steps: usize) -> Duration {
        self.mount_delay + self.dwell * steps as u32
    }
}

/// 撮影中のセッション状態
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub gesture_name: String,
    pub action: String,
    pub steps: &'static [&'static str],
    pub current_step: usize,
    pub frames: Vec<String>,
    pub progress: u8,
}

impl CaptureSession {
    pub fn new(gesture_name: &str, action: &str) -> Self {
        Self {
            gesture_name: gesture_name.to_string(),
            action: action.to_string(),
            steps: &CAPTURE_PROMPTS,
            current_step: 0,
            frames: Vec::new(),
            progress: 0,
        }
    }
}

/// 保存まで完了した撮影の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub frames: usize,
    pub message: String,
}

pub struct GuidedCaptureSequencer {
    camera: Arc<dyn FrameSource>,
    sink: Arc<dyn GestureSink>,
    events: EventSink,
    timing: CaptureTiming,
}

impl GuidedCaptureSequencer {
    pub fn new(
        camera: Arc<dyn FrameSource>,
        sink: Arc<dyn GestureSink>,
        events: EventSink,
        timing: CaptureTiming,
    ) -> Self {
        Self {
            camera,
            sink,
            events,
            timing,
        }
    }

    /// 撮影を最後まで実行して保存する
    ///
    /// フレームが0枚なら保存せずに `CaptureError::NoFrames`。
    pub async fn run(&self, gesture_name: &str, action: &str) -> Result<CaptureReport> {
        let mut session = CaptureSession::new(gesture_name, action);

        if !self.timing.mount_delay.is_zero() {
            tokio::time::sleep(self.timing.mount_delay).await;
        }

        let steps = session.steps;
        let total = steps.len();
        for (index, prompt) in steps.iter().enumerate() {
            session.current_step = index;
            session.progress = step_progress(index, total);
            self.events.emit(SessionEvent::CaptureStep {
                index,
                total,
                prompt: prompt.to_string(),
                progress: session.progress,
            });

            tokio::time::sleep(self.timing.dwell).await;

            match self.camera.snapshot() {
                Some(frame) => {
                    session.frames.push(frame);
                    self.events.emit(SessionEvent::FrameCaptured {
                        index,
                        captured: session.frames.len(),
                    });
                }
                None => {
                    // カメラ未起動のステップは飛ばす
                    tracing::debug!("no frame at step {}", index + 1);
                    self.events.emit(SessionEvent::FrameSkipped { index });
                }
            }
        }

        if session.frames.is_empty() {
            return Err(CaptureError::NoFrames.into());
        }

        let message = self
            .sink
            .save_gesture(&session.gesture_name, &session.action, &session.frames)
            .await?;

        Ok(CaptureReport {
            frames: session.frames.len(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FolderCamera;
    use crate::error::StudioError;
    use crate::events;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, String, usize)>>,
        fail_with: Option<String>,
    }

    impl GestureSink for RecordingSink {
        fn save_gesture<'a>(
            &'a self,
            gesture_name: &'a str,
            action: &'a str,
            frames: &'a [String],
        ) -> BoxFuture<'a, Result<String>> {
            self.calls.lock().unwrap().push((
                gesture_name.to_string(),
                action.to_string(),
                frames.len(),
            ));
            let result = match &self.fail_with {
                Some(detail) => Err(StudioError::Server(detail.clone())),
                None => Ok(format!("{} frames saved", frames.len() * 6)),
            };
            Box::pin(async move { result })
        }
    }

    /// 奇数回目だけフレームを返すカメラ
    struct FlakyCamera {
        calls: AtomicUsize,
    }

    impl FrameSource for FlakyCamera {
        fn mount(&self) -> Result<()> {
            Ok(())
        }

        fn release(&self) {}

        fn is_mounted(&self) -> bool {
            true
        }

        fn snapshot(&self) -> Option<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            (n % 2 == 0).then(|| format!("data:image/jpeg;base64,{}", n))
        }
    }

    fn mounted_camera(frames: Vec<String>) -> Arc<FolderCamera> {
        let camera = Arc::new(FolderCamera::from_frames(frames));
        camera.mount().unwrap();
        camera
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_steps_and_progress() {
        let camera = mounted_camera(vec!["data:image/jpeg;base64,AAAA".into()]);
        let sink = Arc::new(RecordingSink::default());
        let (events, mut rx) = events::channel();
        let sequencer =
            GuidedCaptureSequencer::new(camera, sink.clone(), events, CaptureTiming::default());

        let started = Instant::now();
        let report = sequencer.run("ThumbsUp", "Volume Up").await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_millis(9600));
        assert_eq!(report.frames, 8);
        assert_eq!(report.message, "48 frames saved");

        let mut progress = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::CaptureStep { progress: p, total, .. } = event {
                assert_eq!(total, 8);
                progress.push(p);
            }
        }
        assert_eq!(progress.len(), 8);
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(progress.last(), Some(&100));

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            ("ThumbsUp".to_string(), "Volume Up".to_string(), 8)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_snapshots_are_skipped() {
        let camera = Arc::new(FlakyCamera {
            calls: AtomicUsize::new(0),
        });
        let sink = Arc::new(RecordingSink::default());
        let (events, mut rx) = events::channel();
        let sequencer =
            GuidedCaptureSequencer::new(camera, sink.clone(), events, CaptureTiming::default());

        let report = sequencer.run("Peace", "Tab Switch").await.unwrap();
        assert_eq!(report.frames, 4);

        let mut skipped = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, SessionEvent::FrameSkipped { .. }) {
                skipped += 1;
            }
        }
        assert_eq!(skipped, 4);
        assert_eq!(sink.calls.lock().unwrap()[0].2, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_frames_never_saves() {
        // 未マウントのカメラは常に None
        let camera = Arc::new(FolderCamera::from_frames(vec!["data:x".into()]));
        let sink = Arc::new(RecordingSink::default());
        let sequencer = GuidedCaptureSequencer::new(
            camera,
            sink.clone(),
            EventSink::disabled(),
            CaptureTiming::default(),
        );

        let err = sequencer.run("Fist", "Volume Down").await.unwrap_err();
        assert!(matches!(err, StudioError::Capture(CaptureError::NoFrames)));
        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_delay_added_once() {
        let camera = mounted_camera(vec!["data:x".into()]);
        let sink = Arc::new(RecordingSink::default());
        let timing = CaptureTiming {
            mount_delay: Duration::from_millis(500),
            ..CaptureTiming::default()
        };
        let sequencer = GuidedCaptureSequencer::new(camera, sink, EventSink::disabled(), timing);

        let started = Instant::now();
        sequencer.run("Wave", "Volume Up").await.unwrap();
        assert_eq!(started.elapsed(), timing.total(8));
        assert_eq!(timing.total(8), Duration::from_millis(10100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_error_is_returned() {
        let camera = mounted_camera(vec!["data:x".into()]);
        let sink = Arc::new(RecordingSink {
            fail_with: Some("No valid hand detected".into()),
            ..RecordingSink::default()
        });
        let sequencer = GuidedCaptureSequencer::new(
            camera,
            sink.clone(),
            EventSink::disabled(),
            CaptureTiming::default(),
        );

        let err = sequencer.run("Wave", "Volume Up").await.unwrap_err();
        assert_eq!(err.to_string(), "No valid hand detected");
        assert_eq!(sink.calls.lock().unwrap().len(), 1);
    }
}
