//! 再学習の進捗表示
//!
//! 再学習APIは完了まで進捗を返さないため、ローカルで進捗値を少しずつ進める。
//! 実際の応答が届くまでは上限（90）を超えず、成功時にだけ100にする。

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use gesture_studio_common::RetrainResponse;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{Result, StudioError};
use crate::events::{EventSink, SessionEvent};

/// 開始時の進捗
pub const INITIAL_PROGRESS: f64 = 5.0;
/// 応答待ちの間の上限（この値には届かない）
pub const PROGRESS_CAP: f64 = 90.0;
/// 1回あたりの増分の上限（0以上この値未満）
pub const MAX_STEP: f64 = 5.0;
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);
/// 成功応答から完了通知までの待ち
pub const SETTLE_DELAY: Duration = Duration::from_millis(800);
/// 応答から「学習中」表示を消すまでの猶予
pub const GRACE_WINDOW: Duration = Duration::from_millis(1000);

pub const INITIALIZING_MESSAGE: &str = "Initializing…";
pub const FINALIZING_MESSAGE: &str = "Finalizing model…";
pub const SUCCESS_MESSAGE: &str = "Model retrained successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrainingStatus {
    #[default]
    Idle,
    Running,
    Finalizing,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingJob {
    pub status: TrainingStatus,
    pub displayed_progress: f64,
    pub real_response_received: bool,
    pub message: String,
    /// 「学習中」表示フラグ
    pub in_progress: bool,
}

impl Default for TrainingJob {
    fn default() -> Self {
        Self {
            status: TrainingStatus::Idle,
            displayed_progress: 0.0,
            real_response_received: false,
            message: String::new(),
            in_progress: false,
        }
    }
}

/// 進捗を1回進める
///
/// 進めると上限に届く場合は進めない。応答待ちの間は常に `PROGRESS_CAP` 未満。
pub fn advance_progress(current: f64, delta: f64) -> f64 {
    let next = current + delta.max(0.0);
    if next < PROGRESS_CAP {
        next
    } else {
        current
    }
}

/// 開始値から増分列を順に適用した進捗
pub fn simulated_progress<I>(deltas: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    deltas.into_iter().fold(INITIAL_PROGRESS, advance_progress)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// ドロップ時にタスクを止める
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// 再学習1件分の進捗表示
///
/// 同時に実行できるジョブは1つだけ。
#[derive(Clone)]
pub struct TrainingProgressSimulator {
    job: Arc<Mutex<TrainingJob>>,
    rng: Arc<Mutex<StdRng>>,
    events: EventSink,
}

impl TrainingProgressSimulator {
    pub fn new(events: EventSink) -> Self {
        Self::with_rng(events, StdRng::from_os_rng())
    }

    /// 増分を再現可能にする（テスト用）
    pub fn with_seed(events: EventSink, seed: u64) -> Self {
        Self::with_rng(events, StdRng::seed_from_u64(seed))
    }

    fn with_rng(events: EventSink, rng: StdRng) -> Self {
        Self {
            job: Arc::new(Mutex::new(TrainingJob::default())),
            rng: Arc::new(Mutex::new(rng)),
            events,
        }
    }

    pub fn job(&self) -> TrainingJob {
        lock(&self.job).clone()
    }

    /// 再学習呼び出しを進捗表示付きで実行する
    ///
    /// 成功: Finalizing/100 → 800ms後にDone。失敗: Failed（進捗はそのまま）。
    /// どちらも応答から1000ms後に `in_progress` を下ろしてから戻る。
    pub async fn run<F>(&self, call: F) -> Result<RetrainResponse>
    where
        F: Future<Output = Result<RetrainResponse>>,
    {
        if let Err(err) = self.start() {
            self.events.error(err.to_string());
            return Err(err);
        }

        let ticker = AbortOnDrop(tokio::spawn(increment_loop(
            self.job.clone(),
            self.rng.clone(),
            self.events.clone(),
        )));

        let outcome = call.await;
        drop(ticker);
        let resolved_at = Instant::now();

        let result = match outcome {
            Ok(response) => {
                self.update(|job| {
                    job.real_response_received = true;
                    job.status = TrainingStatus::Finalizing;
                    job.displayed_progress = 100.0;
                    job.message = FINALIZING_MESSAGE.into();
                });

                tokio::time::sleep_until(resolved_at + SETTLE_DELAY).await;
                self.update(|job| {
                    job.status = TrainingStatus::Done;
                    job.message = SUCCESS_MESSAGE.into();
                });
                tracing::info!("model retrained ({} classes)", response.classes.len());
                self.events.info(SUCCESS_MESSAGE);
                Ok(response)
            }
            Err(err) => {
                let message = err.to_string();
                self.update(|job| {
                    job.real_response_received = true;
                    job.status = TrainingStatus::Failed;
                    job.message = message.clone();
                });
                tracing::warn!("retrain failed: {}", message);
                self.events.error(message);
                Err(err)
            }
        };

        tokio::time::sleep_until(resolved_at + GRACE_WINDOW).await;
        lock(&self.job).in_progress = false;
        self.events.emit(SessionEvent::TrainingActive(false));

        result
    }

    fn start(&self) -> Result<()> {
        {
            let mut job = lock(&self.job);
            if job.in_progress {
                return Err(StudioError::Conflict("再学習はすでに実行中です".into()));
            }
            *job = TrainingJob {
                status: TrainingStatus::Running,
                displayed_progress: INITIAL_PROGRESS,
                real_response_received: false,
                message: INITIALIZING_MESSAGE.into(),
                in_progress: true,
            };
        }
        self.events.emit(SessionEvent::TrainingActive(true));
        self.events.emit(SessionEvent::TrainingStatus(TrainingStatus::Running));
        self.events.emit(SessionEvent::TrainingProgress {
            progress: INITIAL_PROGRESS,
            message: INITIALIZING_MESSAGE.into(),
        });
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut TrainingJob)) {
        let job = {
            let mut job = lock(&self.job);
            apply(&mut job);
            job.clone()
        };
        self.events.emit(SessionEvent::TrainingStatus(job.status));
        self.events.emit(SessionEvent::TrainingProgress {
            progress: job.displayed_progress,
            message: job.message,
        });
    }
}

async fn increment_loop(job: Arc<Mutex<TrainingJob>>, rng: Arc<Mutex<StdRng>>, events: EventSink) {
    let mut ticker = tokio::time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let delta = lock(&rng).random_range(0.0..MAX_STEP);

        let (progress, message) = {
            let mut job = lock(&job);
            if job.status != TrainingStatus::Running {
                break;
            }
            job.displayed_progress = advance_progress(job.displayed_progress, delta);
            (job.displayed_progress, job.message.clone())
        };
        events.emit(SessionEvent::TrainingProgress { progress, message });
    }
}
