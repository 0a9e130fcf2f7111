//! ガイド付き撮影のプロンプトとアクション定義
//!
//! - CAPTURE_PROMPTS: 撮影ステップごとの指示文（8ステップ固定）
//! - ACTIONS: ジェスチャーに割り当て可能なデスクトップ操作

/// ガイド付き撮影の指示文（表示順）
pub const CAPTURE_PROMPTS: [&str; 8] = [
    "Show your hand to the camera",
    "Hold the gesture steady",
    "Move your hand slightly to the left",
    "Move your hand slightly to the right",
    "Bring your hand closer to the camera",
    "Move your hand a little farther away",
    "Tilt your hand slightly",
    "Hold still for the final capture",
];

/// 割り当て可能なアクション
pub const ACTIONS: &[&str] = &[
    "Volume Up",
    "Volume Down",
    "Tab Switch",
    "New File in VS Code",
    "Create HTML Template",
];

/// アクション一覧に含まれるか
pub fn is_known_action(action: &str) -> bool {
    ACTIONS.contains(&action)
}

/// ステップ進捗率（0-100）
///
/// `index` は0始まり。`round((index + 1) / total * 100)`
pub fn step_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let ratio = (index + 1).min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_progress_for_eight_steps() {
        let values: Vec<u8> = (0..CAPTURE_PROMPTS.len())
            .map(|i| step_progress(i, CAPTURE_PROMPTS.len()))
            .collect();
        assert_eq!(values, vec![13, 25, 38, 50, 63, 75, 88, 100]);
    }

    #[test]
    fn test_step_progress_empty() {
        assert_eq!(step_progress(0, 0), 100);
    }

    #[test]
    fn test_is_known_action() {
        assert!(is_known_action("Volume Up"));
        assert!(is_known_action("Create HTML Template"));
        assert!(!is_known_action(""));
        assert!(!is_known_action("volume up"));
    }
}
