//! 字幕站点访问与页面解析。

pub mod html;
pub mod network;
