//! 搜索、详情页与下载目标的数据模型。

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// 搜索结果页中的一行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// 行内第二个单元格的文字，可能为空
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub page_title: String,
    /// 实际请求的搜索地址
    pub url: String,
    pub status_code: u16,
    pub results: Vec<SearchResult>,
}

/// 中文字幕变体。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
    Simplified,
    Traditional,
}

impl Variant {
    /// 下载偏好顺序：简体优先。
    pub const PREFERENCE: [Variant; 2] = [Variant::Simplified, Variant::Traditional];

    pub fn tag(self) -> &'static str {
        match self {
            Variant::Simplified => "zh-CN",
            Variant::Traditional => "zh-TW",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variant::Simplified => "Chinese Simplified (zh-CN)",
            Variant::Traditional => "Chinese Traditional (zh-TW)",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChineseDownloadInfo {
    pub simplified_available: bool,
    pub traditional_available: bool,
    pub links: BTreeMap<Variant, String>,
}

impl ChineseDownloadInfo {
    pub fn record(&mut self, variant: Variant, url: String) {
        match variant {
            Variant::Simplified => self.simplified_available = true,
            Variant::Traditional => self.traditional_available = true,
        }
        self.links.insert(variant, url);
    }

    pub fn link(&self, variant: Variant) -> Option<&str> {
        self.links.get(&variant).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct DetailPage {
    pub url: String,
    pub page_title: String,
    pub content: String,
    pub chinese: ChineseDownloadInfo,
}

/// 详情页抓取结果；失败时携带可读的错误信息而不是向上抛出。
#[derive(Debug, Clone)]
pub enum DetailOutcome {
    Page(DetailPage),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub url: String,
    pub variant: Variant,
    pub destination: PathBuf,
}

impl DownloadTarget {
    pub fn label(&self) -> &'static str {
        self.variant.label()
    }
}

/// 单个条目（文件或关键字）的处理结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    NoIdentifier,
    AlreadyPresent(PathBuf),
    SearchFailed,
    NoResults,
    /// 所有结果的详情页都获取失败（网络错误），附最后一条错误信息
    DetailFailed(String),
    NoChineseSubtitle,
    Downloaded(PathBuf),
    Failed(String),
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Downloaded(_) | ItemOutcome::AlreadyPresent(_))
    }
}
