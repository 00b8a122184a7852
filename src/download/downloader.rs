//! 单个条目的下载流程：搜索 → 详情页 → 选择变体 → 保存字幕。

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::models::{DetailOutcome, DownloadTarget, ItemOutcome};
use super::selector::select_download;
use crate::base_system::identifier::{base_name, extract_identifier};
use crate::base_system::media_files::existing_subtitle;
use crate::network_parser::network::{ClientError, SubtitleSource};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("无法创建保存目录 {path}: {source}")]
    CreateFolder { path: PathBuf, source: io::Error },
    #[error("下载字幕失败: {0}")]
    Network(#[from] ClientError),
    #[error("保存字幕失败 {path}: {source}")]
    Save { path: PathBuf, source: io::Error },
}

/// 下载字幕文件并写到目标路径。
///
/// 先写入同目录下的隐藏临时文件，完成后再改名到正式文件名；
/// 进程中途被杀掉时只会留下 `.*.part`，不会被当成已有字幕。
pub fn save_subtitle<S: SubtitleSource + ?Sized>(
    source: &S,
    target: &DownloadTarget,
) -> Result<PathBuf, FetchError> {
    let folder = match target.destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !folder.exists() {
        fs::create_dir_all(&folder).map_err(|source| FetchError::CreateFolder {
            path: folder.clone(),
            source,
        })?;
        info!("已创建保存目录: {}", folder.display());
    }

    sweep_stale_parts(&folder);

    let body = source.fetch_file(&target.url)?;
    write_atomically(&folder, &target.destination, &body).map_err(|source| FetchError::Save {
        path: target.destination.clone(),
        source,
    })?;
    Ok(target.destination.clone())
}

const PART_PREFIX: &str = ".subtitle-";
const PART_SUFFIX: &str = ".part";

/// 清理上次被 Ctrl-C 打断时留下的临时文件（`process::exit` 不会触发临时文件的删除）。
fn sweep_stale_parts(folder: &Path) {
    let Ok(entries) = fs::read_dir(folder) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with(PART_PREFIX) && name.ends_with(PART_SUFFIX)) {
            continue;
        }
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => debug!("已清理残留临时文件: {}", entry.path().display()),
            Err(err) => warn!("清理临时文件失败 {}: {}", entry.path().display(), err),
        }
    }
}

fn write_atomically(folder: &Path, dest: &Path, body: &[u8]) -> io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(PART_PREFIX)
        .suffix(PART_SUFFIX)
        .tempfile_in(folder)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// 用番号搜索并下载第一个可用的中文字幕，保存为 `output_folder/<srt_base>.<tag>.srt`。
///
/// 按搜索结果的文档顺序逐个尝试，某一条失败就继续下一条，成功一次即停止。
/// 所有详情页都没取到时返回 [`ItemOutcome::DetailFailed`]，与"确实没有中文字幕"区分开。
pub fn fetch_for_identifier<S: SubtitleSource + ?Sized>(
    source: &S,
    identifier: &str,
    srt_base: &str,
    output_folder: &Path,
) -> ItemOutcome {
    info!("搜索番号: {}", identifier);
    let Some(outcome) = source.search(identifier) else {
        error!("获取搜索结果失败: {}", identifier);
        return ItemOutcome::SearchFailed;
    };

    info!(
        "搜索页: {} | 状态码: {} | {}",
        outcome.page_title, outcome.status_code, outcome.url
    );
    info!("共找到 {} 条结果", outcome.results.len());
    if outcome.results.is_empty() {
        return ItemOutcome::NoResults;
    }

    let mut last_failure: Option<String> = None;
    let mut detail_error: Option<String> = None;
    let mut page_seen = false;
    for (idx, item) in outcome.results.iter().enumerate() {
        info!("{}. {} [{}] {}", idx + 1, item.title, item.language, item.url);

        let page = match source.fetch_detail(&item.url) {
            DetailOutcome::Page(page) => page,
            DetailOutcome::Error(msg) => {
                warn!("获取结果页失败: {}", msg);
                detail_error = Some(msg);
                continue;
            }
        };
        page_seen = true;
        debug!(
            "结果页: {} ({}), 正文 {} 字",
            page.page_title,
            page.url,
            page.content.chars().count()
        );
        info!(
            "简体中文: {} | 繁体中文: {}",
            page.chinese.simplified_available, page.chinese.traditional_available
        );

        let Some(target) = select_download(&page.chinese, srt_base, output_folder) else {
            info!("该结果没有可下载的中文字幕");
            continue;
        };
        info!("下载 {} 字幕: {}", target.label(), target.url);

        match save_subtitle(source, &target) {
            Ok(path) => {
                info!("字幕已保存: {}", path.display());
                return ItemOutcome::Downloaded(path);
            }
            // 网络错误换下一条结果；本地文件系统错误对后续结果同样成立，直接结束该条目
            Err(err @ FetchError::Network(_)) => {
                error!("{}", err);
                last_failure = Some(err.to_string());
            }
            Err(err) => {
                error!("{}", err);
                return ItemOutcome::Failed(err.to_string());
            }
        }
    }

    match (last_failure, detail_error) {
        (Some(msg), _) => ItemOutcome::Failed(msg),
        (None, Some(msg)) if !page_seen => ItemOutcome::DetailFailed(msg),
        _ => ItemOutcome::NoChineseSubtitle,
    }
}

/// 视频文件的字幕以文件名（不含扩展名）命名。
///
/// 已有字幕按番号和文件名两种命名都检查一遍，命中任意一个就不发任何请求。
pub fn process_video_file<S: SubtitleSource + ?Sized>(
    source: &S,
    video_path: &Path,
    output_folder: &Path,
) -> ItemOutcome {
    info!("处理视频文件: {}", video_path.display());
    let path_str = video_path.to_string_lossy();

    let Some(identifier) = extract_identifier(&path_str) else {
        warn!("无法从文件名提取番号: {}", video_path.display());
        return ItemOutcome::NoIdentifier;
    };
    let srt_base = base_name(&path_str).to_string();

    let existing = existing_subtitle(&identifier, output_folder).or_else(|| {
        (srt_base != identifier)
            .then(|| existing_subtitle(&srt_base, output_folder))
            .flatten()
    });
    if let Some(path) = existing {
        info!("字幕已存在，跳过: {}", path.display());
        return ItemOutcome::AlreadyPresent(path);
    }

    fetch_for_identifier(source, &identifier, &srt_base, output_folder)
}

/// 关键字模式：不做文件系统检查，字幕以原始输入命名。
pub fn process_keyword<S: SubtitleSource + ?Sized>(
    source: &S,
    keyword: &str,
    output_folder: &Path,
) -> ItemOutcome {
    let Some(identifier) = extract_identifier(keyword) else {
        warn!("无法从输入中提取番号: {}", keyword);
        return ItemOutcome::NoIdentifier;
    };
    fetch_for_identifier(source, &identifier, keyword, output_folder)
}

#[cfg(test)]
pub(crate) mod fake {
    //! 记录调用次数的假站点，供各模块测试共用。

    use std::cell::RefCell;
    use std::collections::HashMap;

    use crate::download::models::{
        ChineseDownloadInfo, DetailOutcome, DetailPage, SearchOutcome, SearchResult,
    };
    use crate::network_parser::network::{ClientError, SubtitleSource};

    #[derive(Default)]
    pub struct FakeSite {
        /// 番号 → 搜索结果；不在表里的番号返回 `None`
        pub searches: HashMap<String, Vec<SearchResult>>,
        pub details: HashMap<String, ChineseDownloadInfo>,
        pub files: HashMap<String, Vec<u8>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeSite {
        /// 每个番号一条结果，详情页只有简体字幕。
        pub fn with_simplified(ids: &[&str]) -> Self {
            let mut site = FakeSite::default();
            for id in ids {
                site.add(id, Some(format!("{id} simplified").as_bytes()), None);
            }
            site
        }

        pub fn add(&mut self, id: &str, cn: Option<&[u8]>, tw: Option<&[u8]>) {
            let detail_url = format!("https://site/subs/{id}");
            self.searches.insert(
                id.to_string(),
                vec![SearchResult {
                    title: id.to_string(),
                    url: detail_url.clone(),
                    language: "Japanese".to_string(),
                }],
            );
            let mut info = ChineseDownloadInfo::default();
            if let Some(body) = cn {
                let url = format!("https://site/dl/{id}/zh-CN.srt");
                info.record(crate::download::models::Variant::Simplified, url.clone());
                self.files.insert(url, body.to_vec());
            }
            if let Some(body) = tw {
                let url = format!("https://site/dl/{id}/zh-TW.srt");
                info.record(crate::download::models::Variant::Traditional, url.clone());
                self.files.insert(url, body.to_vec());
            }
            self.details.insert(detail_url, info);
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl SubtitleSource for FakeSite {
        fn search(&self, identifier: &str) -> Option<SearchOutcome> {
            self.calls.borrow_mut().push(format!("search {identifier}"));
            let results = self.searches.get(identifier)?.clone();
            Some(SearchOutcome {
                page_title: format!("Search {identifier}"),
                url: format!("https://site/index.php?search={identifier}"),
                status_code: 200,
                results,
            })
        }

        fn fetch_detail(&self, url: &str) -> DetailOutcome {
            self.calls.borrow_mut().push(format!("detail {url}"));
            match self.details.get(url) {
                Some(info) => DetailOutcome::Page(DetailPage {
                    url: url.to_string(),
                    page_title: "detail".to_string(),
                    content: String::new(),
                    chinese: info.clone(),
                }),
                None => DetailOutcome::Error(format!("HTTP 404 Not Found: {url}")),
            }
        }

        fn fetch_file(&self, url: &str) -> Result<Vec<u8>, ClientError> {
            self.calls.borrow_mut().push(format!("file {url}"));
            self.files.get(url).cloned().ok_or_else(|| ClientError::Status {
                url: url.to_string(),
                status: 404,
                reason: "Not Found".to_string(),
            })
        }
    }
}
