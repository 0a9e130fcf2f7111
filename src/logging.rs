//! ログ設定
//!
//! `tracing` のグローバルサブスクライバーを標準エラー出力に設定する。
//! `RUST_LOG` があればそれに従い、`--verbose` 指定時はdebugレベルにする。

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static INITIALIZED: OnceLock<()> = OnceLock::new();

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "gesture_studio=debug,gesture_studio_common=debug,warn";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("ログ出力の初期化に失敗しました: {0}")]
    Install(String),
}

/// ログを初期化（2回目以降は何もしない）
pub fn init(verbose: bool) -> Result<(), LoggingError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;
    let _ = INITIALIZED.set(());

    tracing::debug!("logging initialized (verbose: {})", verbose);
    Ok(())
}

fn build_env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_FILTER);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
