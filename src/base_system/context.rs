//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 站点配置
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // 网络配置
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    // 保存配置
    #[serde(default)]
    pub save_path: String,
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    // 媒体库扫描
    #[serde(default)]
    pub library_src_path: String,
    #[serde(default)]
    pub library_save_path: String,
    #[serde(default = "default_true")]
    pub rename_simplified_to_plain: bool,

    // 通知
    #[serde(default)]
    pub webhook_enabled: bool,
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,
    #[serde(default)]
    pub webhook_headers: BTreeMap<String, String>,
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout: u64,
    #[serde(default = "default_webhook_source")]
    pub webhook_source: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_path: default_search_path(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            save_path: String::new(),
            video_extensions: default_video_extensions(),
            library_src_path: String::new(),
            library_save_path: String::new(),
            rename_simplified_to_plain: default_true(),
            webhook_enabled: false,
            webhook_url: default_webhook_url(),
            webhook_headers: BTreeMap::new(),
            webhook_timeout: default_webhook_timeout(),
            webhook_source: default_webhook_source(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 15] = [
            FieldMeta {
                name: "base_url",
                description: "字幕站点地址（协议 + 主机），相对链接也以此补全",
            },
            FieldMeta {
                name: "search_path",
                description: "搜索页路径，番号作为 search 参数附加在后面",
            },
            FieldMeta {
                name: "user_agent",
                description: "请求使用的 User-Agent",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒），0 表示不限制",
            },
            FieldMeta {
                name: "connect_timeout",
                description: "连接超时时间（秒），0 表示不限制",
            },
            FieldMeta {
                name: "save_path",
                description: "关键字模式下的默认保存路径（留空为当前目录）",
            },
            FieldMeta {
                name: "video_extensions",
                description: "视为视频文件的扩展名（不区分大小写）",
            },
            FieldMeta {
                name: "library_src_path",
                description: "媒体库扫描：视频所在根目录（递归扫描）",
            },
            FieldMeta {
                name: "library_save_path",
                description: "媒体库扫描：字幕库保存目录",
            },
            FieldMeta {
                name: "rename_simplified_to_plain",
                description: "媒体库扫描：下载完成后把 *.zh-CN.srt 重命名为 *.srt",
            },
            FieldMeta {
                name: "webhook_enabled",
                description: "是否发送 webhook 通知",
            },
            FieldMeta {
                name: "webhook_url",
                description: "webhook 地址",
            },
            FieldMeta {
                name: "webhook_headers",
                description: "webhook 附加请求头（如 Authorization）",
            },
            FieldMeta {
                name: "webhook_timeout",
                description: "webhook 请求超时时间（秒）",
            },
            FieldMeta {
                name: "webhook_source",
                description: "通知中的来源标识",
            },
        ];
        &FIELDS
    }
}

impl Config {
    /// 关键字模式的默认保存目录。
    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.save_path)
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        secs_or_none(self.request_timeout)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        secs_or_none(self.connect_timeout)
    }

    pub fn search_base(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let path = self.search_path.trim();
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub fn library_paths(&self) -> Option<(PathBuf, PathBuf)> {
        let src = self.library_src_path.trim();
        let save = self.library_save_path.trim();
        if src.is_empty() || save.is_empty() {
            return None;
        }
        Some((PathBuf::from(src), PathBuf::from(save)))
    }
}

fn secs_or_none(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://www.subtitlecat.com".to_string()
}

fn default_search_path() -> String {
    "/index.php".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "ts"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_webhook_url() -> String {
    "http://127.0.0.1/webhook/common".to_string()
}

fn default_webhook_timeout() -> u64 {
    10
}

fn default_webhook_source() -> String {
    "subtitlecat-downloader".to_string()
}
