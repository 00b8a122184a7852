//! 媒体库扫描（配合刮削器生成的 NFO 使用）。

pub mod nfo;
pub mod scan;
