//! カメラリソース
//!
//! 撮影モード/予測モードのどちらか一方だけがカメラを占有する。
//! `mount` で確保、`release` で解放し、未確保の間は `snapshot` が `None` を返す。

mod folder;

pub use folder::{scan_frames, FolderCamera, FrameFile};

use crate::error::Result;

pub trait FrameSource: Send + Sync {
    /// カメラを確保する
    fn mount(&self) -> Result<()>;

    /// カメラを解放する（未確保なら何もしない）
    fn release(&self);

    fn is_mounted(&self) -> bool;

    /// エンコード済みフレームを1枚取得。取得できなければ `None`
    fn snapshot(&self) -> Option<String>;
}
