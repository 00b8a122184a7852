//! 根据偏好在可用的中文字幕链接中挑选一个，并计算保存路径。

use std::path::Path;

use super::models::{ChineseDownloadInfo, DownloadTarget, Variant};

/// 有 zh-CN 选 zh-CN，否则 zh-TW，都没有返回 `None`。
///
/// 保存路径为 `output_folder/<base_name>.<tag>.srt`；这里从不重命名文件。
pub fn select_download(
    info: &ChineseDownloadInfo,
    base_name: &str,
    output_folder: &Path,
) -> Option<DownloadTarget> {
    Variant::PREFERENCE.iter().find_map(|&variant| {
        info.link(variant).map(|url| DownloadTarget {
            url: url.to_string(),
            variant,
            destination: output_folder.join(format!("{base_name}.{}.srt", variant.tag())),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn info(cn: Option<&str>, tw: Option<&str>) -> ChineseDownloadInfo {
        let mut info = ChineseDownloadInfo::default();
        if let Some(u) = cn {
            info.record(Variant::Simplified, u.to_string());
        }
        if let Some(u) = tw {
            info.record(Variant::Traditional, u.to_string());
        }
        info
    }

    #[test]
    fn prefers_simplified_when_both_exist() {
        let target = select_download(
            &info(Some("https://s/cn"), Some("https://s/tw")),
            "NIMA-014",
            Path::new("/subs"),
        )
        .unwrap();
        assert_eq!(target.url, "https://s/cn");
        assert_eq!(target.variant, Variant::Simplified);
        assert_eq!(target.label(), "Chinese Simplified (zh-CN)");
        assert_eq!(target.destination, PathBuf::from("/subs/NIMA-014.zh-CN.srt"));
    }

    #[test]
    fn falls_back_to_traditional() {
        let target =
            select_download(&info(None, Some("https://s/tw")), "NIMA-014 uncut", Path::new("."))
                .unwrap();
        assert_eq!(target.variant, Variant::Traditional);
        assert_eq!(target.label(), "Chinese Traditional (zh-TW)");
        assert_eq!(
            target.destination,
            Path::new(".").join("NIMA-014 uncut.zh-TW.srt")
        );
    }

    #[test]
    fn nothing_to_download() {
        assert!(select_download(&info(None, None), "NIMA-014", Path::new(".")).is_none());
    }
}
