use crate::camera::FrameSource;
use crate::error::{Result, StudioError};
use gesture_studio_common::{encode_data_url, mime_type_for_extension};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct FrameFile {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: &'static str,
}

pub fn scan_frames(folder: &Path) -> Result<Vec<FrameFile>> {
    if !folder.is_dir() {
        return Err(StudioError::FolderNotFound(folder.display().to_string()));
    }

    let mut frames = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1)  // 直下のみ
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let mime_type = path
            .extension()
            .and_then(|ext| mime_type_for_extension(&ext.to_string_lossy()));

        if let Some(mime_type) = mime_type {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            frames.push(FrameFile {
                path: path.to_path_buf(),
                file_name,
                mime_type,
            });
        }
    }

    // ファイル名でソート
    frames.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(frames)
}

/// フォルダ内の画像を順番に返すカメラ
///
/// 画像はData URLとして読み込み済み。最後まで進んだら先頭に戻る。
#[derive(Debug, Default)]
pub struct FolderCamera {
    frames: Vec<String>,
    cursor: AtomicUsize,
    mounted: AtomicBool,
}

impl FolderCamera {
    pub fn open(folder: &Path) -> Result<Self> {
        let mut frames = Vec::new();
        for file in scan_frames(folder)? {
            let bytes = std::fs::read(&file.path)?;
            frames.push(encode_data_url(file.mime_type, &bytes));
        }
        tracing::debug!("{} frames loaded from {}", frames.len(), folder.display());
        Ok(Self::from_frames(frames))
    }

    pub fn from_frames(frames: Vec<String>) -> Self {
        Self {
            frames,
            cursor: AtomicUsize::new(0),
            mounted: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for FolderCamera {
    fn mount(&self) -> Result<()> {
        self.mounted.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Option<String> {
        if !self.is_mounted() || self.frames.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.frames.len();
        self.frames.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_frames(Path::new("/nonexistent/folder"));
        assert!(matches!(result, Err(StudioError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_frames_filters_and_sorts() {
        let dir = tempdir().unwrap();

        File::create(dir.path().join("b.JPG")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("a.png")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("c.jpeg")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("notes.txt")).unwrap().write_all(b"text").unwrap();
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let frames = scan_frames(dir.path()).unwrap();
        let names: Vec<&str> = frames.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "c.jpeg"]);
        assert_eq!(frames[0].mime_type, "image/png");
        assert_eq!(frames[1].mime_type, "image/jpeg");
    }

    #[test]
    fn test_open_encodes_data_urls() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("frame.jpg"), b"abc").unwrap();

        let camera = FolderCamera::open(dir.path()).unwrap();
        assert_eq!(camera.len(), 1);

        camera.mount().unwrap();
        assert_eq!(camera.snapshot().as_deref(), Some("data:image/jpeg;base64,YWJj"));
    }

    #[test]
    fn test_snapshot_requires_mount() {
        let camera = FolderCamera::from_frames(vec!["data:a".into()]);
        assert_eq!(camera.snapshot(), None);

        camera.mount().unwrap();
        assert!(camera.is_mounted());
        assert_eq!(camera.snapshot().as_deref(), Some("data:a"));

        camera.release();
        camera.release();
        assert!(!camera.is_mounted());
        assert_eq!(camera.snapshot(), None);
    }

    #[test]
    fn test_snapshot_cycles() {
        let camera = FolderCamera::from_frames(vec!["data:1".into(), "data:2".into()]);
        camera.mount().unwrap();

        let shots: Vec<String> = (0..5).filter_map(|_| camera.snapshot()).collect();
        assert_eq!(shots, vec!["data:1", "data:2", "data:1", "data:2", "data:1"]);
    }

    #[test]
    fn test_empty_folder_yields_no_frames() {
        let dir = tempdir().unwrap();
        let camera = FolderCamera::open(dir.path()).unwrap();
        camera.mount().unwrap();
        assert!(camera.is_empty());
        assert_eq!(camera.snapshot(), None);
    }
}
