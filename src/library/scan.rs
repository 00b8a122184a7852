//! 媒体库扫描：递归遍历视频目录，依据 NFO 的番号把字幕下载到统一的字幕库。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::nfo::read_nfo;
use crate::base_system::context::Config;
use crate::base_system::media_files::{existing_subtitle, is_hidden, is_video_file};
use crate::download::downloader::fetch_for_identifier;
use crate::download::models::ItemOutcome;
use crate::network_parser::network::SubtitleSource;
use crate::third_party::webhook::{Notification, NotifyLevel, WebhookNotifier};

/// 文件名带这个标记的视频已经内嵌中文字幕。
const EMBEDDED_CHINESE_MARK: &str = "-C";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LibraryReport {
    pub scanned: usize,
    pub skipped: usize,
    pub downloaded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SkipReason {
    Trailer,
    EmbeddedChinese,
    NoNfoIdentifier,
    NfoMarkedChinese,
    SubtitleExists(PathBuf),
}

impl SkipReason {
    fn describe(&self) -> String {
        match self {
            SkipReason::Trailer => "预告片".to_string(),
            SkipReason::EmbeddedChinese => "文件名标记已有中文字幕".to_string(),
            SkipReason::NoNfoIdentifier => "NFO 中没有番号".to_string(),
            SkipReason::NfoMarkedChinese => "NFO 标记已有中文字幕".to_string(),
            SkipReason::SubtitleExists(p) => format!("字幕已存在 {}", p.display()),
        }
    }
}

/// 配置缺少 `library_src_path` 或 `library_save_path` 时返回 `None`。
pub fn run_library<S: SubtitleSource + ?Sized>(
    source: &S,
    config: &Config,
    notifier: &WebhookNotifier,
) -> Option<LibraryReport> {
    let Some((src, save)) = config.library_paths() else {
        error!("library_src_path 或 library_save_path 未配置");
        return None;
    };
    info!("开始扫描媒体库: {} -> {}", src.display(), save.display());

    let mut report = LibraryReport::default();
    let walker = WalkDir::new(&src)
        .sort_by_file_name()
        .into_iter()
        // 隐藏目录整棵跳过；根目录本身不参与判断
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!("遍历目录出错: {}", err);
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_video_file(path, &config.video_extensions) {
            continue;
        }
        report.scanned += 1;

        let identifier = match check_video(path, &save) {
            Ok(id) => id,
            Err(reason) => {
                debug!("跳过 {}: {}", path.display(), reason.describe());
                report.skipped += 1;
                continue;
            }
        };

        info!("尝试获取 {} 的字幕 ({})", identifier, path.display());
        match fetch_for_identifier(source, &identifier, &identifier, &save) {
            ItemOutcome::Downloaded(saved) => {
                let final_path = if config.rename_simplified_to_plain {
                    rename_to_plain(&saved)
                } else {
                    saved
                };
                info!("最终保存字幕文件: {}", final_path.display());
                report.downloaded += 1;
                notifier.send(&Notification {
                    title: "字幕下载完成".to_string(),
                    detail: format!("{} → {}", identifier, final_path.display()),
                    tag: "subtitle".to_string(),
                    level: NotifyLevel::Info,
                    adult: true,
                });
            }
            outcome => {
                warn!("处理失败 {}: {:?}", identifier, outcome);
                report.failed += 1;
            }
        }
    }

    info!(
        "媒体库扫描完成：视频 {} 个，跳过 {} 个，下载 {} 个，失败 {} 个",
        report.scanned, report.skipped, report.downloaded, report.failed
    );
    if report.downloaded > 0 || report.failed > 0 {
        notifier.send(&Notification {
            title: "字幕扫描完成".to_string(),
            detail: format!(
                "下载 {} 个，失败 {} 个，跳过 {} 个",
                report.downloaded, report.failed, report.skipped
            ),
            tag: "subtitle".to_string(),
            level: match (report.downloaded, report.failed) {
                (_, 0) => NotifyLevel::Info,
                (0, _) => NotifyLevel::Error,
                _ => NotifyLevel::Warning,
            },
            adult: true,
        });
    }
    Some(report)
}

/// 决定是否需要为该视频下载字幕，需要时返回 NFO 中的番号。
fn check_video(path: &Path, save: &Path) -> Result<String, SkipReason> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if name.to_lowercase().contains("trailer") {
        return Err(SkipReason::Trailer);
    }
    if name.contains(EMBEDDED_CHINESE_MARK) {
        return Err(SkipReason::EmbeddedChinese);
    }

    let nfo = read_nfo(&path.with_extension("nfo"));
    let Some(identifier) = nfo.identifier else {
        warn!("无法从 NFO 中提取番号: {}", name);
        return Err(SkipReason::NoNfoIdentifier);
    };
    if nfo.has_chinese_subtitle {
        return Err(SkipReason::NfoMarkedChinese);
    }
    if let Some(existing) = existing_subtitle(&identifier, save) {
        return Err(SkipReason::SubtitleExists(existing));
    }
    Ok(identifier)
}

/// `X.zh-CN.srt` → `X.srt`；其他文件名原样返回。改名失败时保留原文件。
fn rename_to_plain(saved: &Path) -> PathBuf {
    let Some(name) = saved.file_name().and_then(|n| n.to_str()) else {
        return saved.to_path_buf();
    };
    let Some(stem) = name.strip_suffix(".zh-CN.srt") else {
        return saved.to_path_buf();
    };
    let plain = saved.with_file_name(format!("{stem}.srt"));
    match fs::rename(saved, &plain) {
        Ok(()) => plain,
        Err(err) => {
            error!("重命名字幕失败 {}: {}", saved.display(), err);
            saved.to_path_buf()
        }
    }
}
