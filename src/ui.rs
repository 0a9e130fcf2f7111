//! ターミナル表示
//!
//! `SessionEvent` を読んでプログレスバーと通知を表示する。

use indicatif::{ProgressBar, ProgressStyle};

use crate::events::{EventReceiver, NoticeLevel, SessionEvent};

/// 表示の集計結果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub errors: usize,
}

fn bar(template: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// 送信側がすべて閉じるまでイベントを表示する
pub async fn render_events(mut rx: EventReceiver) -> RenderSummary {
    let mut summary = RenderSummary::default();
    let mut capture_bar: Option<ProgressBar> = None;
    let mut training_bar: Option<ProgressBar> = None;
    // 同じ予測が続く間は表示しない
    let mut last_status: Option<String> = None;

    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::ModeChanged(mode) => {
                tracing::debug!("mode: {:?}", mode);
                println!("[{}]", mode.label());
            }
            SessionEvent::CaptureStep {
                index,
                total,
                prompt,
                progress,
            } => {
                let bar = capture_bar.get_or_insert_with(|| bar("{bar:40.cyan/blue} {pos:>3}% {msg}"));
                bar.set_position(progress as u64);
                bar.set_message(format!("({}/{}) {}", index + 1, total, prompt));
            }
            SessionEvent::FrameCaptured { .. } => {}
            SessionEvent::FrameSkipped { index } => {
                tracing::debug!("frame skipped at step {}", index + 1);
            }
            SessionEvent::RegistryChanged => {}
            SessionEvent::Connecting(true) => println!("接続中..."),
            SessionEvent::Connecting(false) => {}
            SessionEvent::StreamStatus(status) => {
                tracing::debug!("stream: {:?}", status);
            }
            SessionEvent::StatusText(text) => {
                if last_status.as_deref() != Some(text.as_str()) {
                    println!("{}", text);
                    last_status = Some(text);
                }
            }
            SessionEvent::Prediction(_) => {}
            SessionEvent::TrainingProgress { progress, message } => {
                let bar = training_bar
                    .get_or_insert_with(|| bar("{bar:40.green/white} {pos:>3}% {msg}"));
                bar.set_position(progress.round() as u64);
                bar.set_message(message);
            }
            SessionEvent::TrainingStatus(status) => {
                tracing::debug!("training: {:?}", status);
            }
            SessionEvent::TrainingActive(active) => {
                if !active {
                    if let Some(bar) = training_bar.take() {
                        bar.finish();
                    }
                }
            }
            SessionEvent::Notice { level, message } => {
                if let Some(bar) = capture_bar.take() {
                    bar.finish();
                }
                match level {
                    NoticeLevel::Info => println!("✔ {}", message),
                    NoticeLevel::Error => {
                        summary.errors += 1;
                        eprintln!("✖ {}", message);
                    }
                }
            }
        }
    }

    if let Some(bar) = capture_bar {
        bar.finish();
    }
    if let Some(bar) = training_bar {
        bar.finish();
    }
    summary
}
