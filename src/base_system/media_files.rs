//! 视频文件识别、隐藏文件判断与已有字幕检测。

use std::path::{Path, PathBuf};

/// 已有字幕的三种规范文件名后缀，按检测顺序排列。
pub const SUBTITLE_SUFFIXES: [&str; 3] = [".zh-CN.srt", ".zh-TW.srt", ".srt"];

pub fn is_video_file(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// 以 `.` 开头，或（Windows 下）带隐藏属性。
pub fn is_hidden(path: &Path) -> bool {
    let dotted = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'));
    dotted || has_hidden_attribute(path)
}

#[cfg(windows)]
fn has_hidden_attribute(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    std::fs::metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn has_hidden_attribute(_path: &Path) -> bool {
    false
}

/// 在 `folder` 中查找 `base` 对应的字幕，返回第一个已存在的文件。
///
/// 每次都直接查询文件系统：下载过程中目录可能刚被创建，不能缓存结果。
pub fn existing_subtitle(base: &str, folder: &Path) -> Option<PathBuf> {
    SUBTITLE_SUFFIXES
        .iter()
        .map(|suffix| folder.join(format!("{base}{suffix}")))
        .find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["mp4".into(), ".mkv".into(), "ts".into()]
    }

    #[test]
    fn video_extension_check_is_case_insensitive() {
        assert!(is_video_file(Path::new("a/NIMA-014.MP4"), &exts()));
        assert!(is_video_file(Path::new("x.mkv"), &exts()));
        assert!(is_video_file(Path::new("x.ts"), &exts()));
        assert!(!is_video_file(Path::new("x.srt"), &exts()));
        assert!(!is_video_file(Path::new("mp4"), &exts()));
    }

    #[test]
    fn dot_files_are_hidden() {
        assert!(is_hidden(Path::new("/v/.NIMA-014.mp4")));
        assert!(!is_hidden(Path::new("/v/NIMA-014.mp4")));
    }

    #[test]
    fn finds_any_canonical_subtitle() {
        let dir = TempDir::new().unwrap();
        assert_eq!(existing_subtitle("NIMA-014", dir.path()), None);

        fs::write(dir.path().join("NIMA-014.zh-TW.srt"), "1").unwrap();
        assert_eq!(
            existing_subtitle("NIMA-014", dir.path()),
            Some(dir.path().join("NIMA-014.zh-TW.srt"))
        );

        fs::write(dir.path().join("SSIS-001.srt"), "1").unwrap();
        assert_eq!(
            existing_subtitle("SSIS-001", dir.path()),
            Some(dir.path().join("SSIS-001.srt"))
        );
        assert_eq!(existing_subtitle("SSIS-002", dir.path()), None);
    }

    #[test]
    fn missing_folder_has_no_subtitles() {
        let dir = TempDir::new().unwrap();
        assert_eq!(existing_subtitle("NIMA-014", &dir.path().join("nope")), None);
    }
}
