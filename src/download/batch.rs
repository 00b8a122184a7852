//! 批处理入口：按输入是目录、文件还是关键字分派。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::downloader::{process_keyword, process_video_file};
use super::models::ItemOutcome;
use crate::base_system::context::Config;
use crate::base_system::media_files::{is_hidden, is_video_file};
use crate::network_parser::network::SubtitleSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Folder(PathBuf),
    File(PathBuf),
    Keyword(String),
}

impl InputKind {
    pub fn detect(input: &str) -> Self {
        let path = Path::new(input);
        if path.is_dir() {
            InputKind::Folder(path.to_path_buf())
        } else if path.is_file() {
            InputKind::File(path.to_path_buf())
        } else {
            InputKind::Keyword(input.to_string())
        }
    }

    /// 未指定输出目录时：目录 → 自身，文件 → 所在目录，关键字 → 配置的保存路径。
    pub fn default_output(&self, config: &Config) -> PathBuf {
        match self {
            InputKind::Folder(dir) => dir.clone(),
            InputKind::File(file) => match file.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            },
            InputKind::Keyword(_) => config.default_save_dir(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// 目录模式下找到的视频文件数
    pub videos_found: usize,
    pub items: Vec<(String, ItemOutcome)>,
}

impl BatchReport {
    fn push(&mut self, name: impl Into<String>, outcome: ItemOutcome) {
        self.items.push((name.into(), outcome));
    }

    pub fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Downloaded(_)))
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::AlreadyPresent(_)))
    }

    pub fn with_identifier(&self) -> usize {
        self.count(|o| !matches!(o, ItemOutcome::NoIdentifier))
    }
}

pub fn run<S: SubtitleSource + ?Sized>(
    source: &S,
    config: &Config,
    input: &str,
    output_dir: Option<&Path>,
) -> BatchReport {
    let kind = InputKind::detect(input);
    let output = match output_dir {
        Some(dir) => {
            info!("使用指定的输出目录: {}", dir.display());
            dir.to_path_buf()
        }
        None => {
            let dir = kind.default_output(config);
            info!("使用默认输出目录: {}", dir.display());
            dir
        }
    };

    let mut report = BatchReport::default();
    match kind {
        InputKind::Folder(dir) => {
            info!("输入为目录: {}", dir.display());
            run_folder(source, config, &dir, &output, &mut report);
        }
        InputKind::File(file) => {
            let outcome = process_video_file(source, &file, &output);
            report.push(file.display().to_string(), outcome);
        }
        InputKind::Keyword(keyword) => {
            let outcome = process_keyword(source, &keyword, &output);
            report.push(keyword, outcome);
        }
    }
    report
}

/// 只扫描一层，按文件名排序后逐个处理；单个文件失败不影响其他文件。
fn run_folder<S: SubtitleSource + ?Sized>(
    source: &S,
    config: &Config,
    dir: &Path,
    output: &Path,
    report: &mut BatchReport,
) {
    let entries = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(err) => {
            error!("读取目录失败 {}: {}", dir.display(), err);
            return;
        }
    };
    let mut files: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    files.sort();

    for path in files {
        if is_hidden(&path) || !path.is_file() || !is_video_file(&path, &config.video_extensions)
        {
            continue;
        }
        report.videos_found += 1;

        let outcome = process_video_file(source, &path, output);
        if matches!(outcome, ItemOutcome::NoIdentifier) {
            warn!("未找到有效番号，跳过: {}", path.display());
        }
        report.push(path.display().to_string(), outcome);
        info!("{}", "-".repeat(50));
    }

    if report.videos_found == 0 {
        info!("目录中没有视频文件");
    } else {
        info!(
            "共找到 {} 个视频文件，其中 {} 个可提取番号；新下载 {} 个，已存在 {} 个",
            report.videos_found,
            report.with_identifier(),
            report.downloaded(),
            report.already_present()
        );
    }
}
