//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`     — 数据模型（SearchResult / ChineseDownloadInfo / DownloadTarget 等）
//! - `selector`   — 按偏好挑选中文字幕变体
//! - `downloader` — 单个条目的搜索、下载与保存
//! - `batch`      — 目录 / 文件 / 关键字三种输入的批处理

pub mod batch;
pub mod downloader;
pub mod models;
pub mod selector;
