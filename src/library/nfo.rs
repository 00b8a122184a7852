//! 读取刮削器生成的 NFO（XML）元数据。

use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

/// 表示已内嵌中文字幕的标签/类型值。
pub const CHINESE_SUBTITLE_MARKER: &str = "中文字幕";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfoInfo {
    /// 根元素下 `<num>` 的内容
    pub identifier: Option<String>,
    /// 任意 `<tag>` 或 `<genre>` 的文字恰好等于 [`CHINESE_SUBTITLE_MARKER`]
    pub has_chinese_subtitle: bool,
}

/// 文件不存在或 XML 有误时记录警告并返回空信息。
pub fn read_nfo(path: &Path) -> NfoInfo {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) => {
            warn!("读取 NFO 失败 {}: {}", path.display(), err);
            return NfoInfo::default();
        }
    };
    match parse_nfo(&raw) {
        Ok(info) => info,
        Err(err) => {
            warn!("解析 NFO 失败 {}: {}", path.display(), err);
            NfoInfo::default()
        }
    }
}

pub fn parse_nfo(xml: &str) -> Result<NfoInfo, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut info = NfoInfo::default();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(e.name().as_ref().to_vec());
                text.clear();
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                match name.as_slice() {
                    // 只认根元素的直接子元素 `<num>`
                    b"num" if stack.len() == 1 && info.identifier.is_none() => {
                        let num = text.trim();
                        if !num.is_empty() {
                            info.identifier = Some(num.to_string());
                        }
                    }
                    b"tag" | b"genre" if text == CHINESE_SUBTITLE_MARKER => {
                        info.has_chinese_subtitle = true;
                    }
                    _ => {}
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<movie>
  <title>NIMA-014 sample</title>
  <num>NIMA-014</num>
  <actor><name>someone</name><num>999</num></actor>
  <tag>高清</tag>
  <genre>中文字幕</genre>
</movie>"#;

    #[test]
    fn reads_num_and_marker_from_genre() {
        let info = parse_nfo(SAMPLE).unwrap();
        assert_eq!(info.identifier.as_deref(), Some("NIMA-014"));
        assert!(info.has_chinese_subtitle);
    }

    #[test]
    fn marker_must_match_exactly() {
        let xml = "<movie><num> SSIS-001 </num><tag>中文字幕 (机翻)</tag><genre>剧情</genre></movie>";
        let info = parse_nfo(xml).unwrap();
        assert_eq!(info.identifier.as_deref(), Some("SSIS-001"));
        assert!(!info.has_chinese_subtitle);
    }

    #[test]
    fn nested_num_is_ignored() {
        let xml = "<movie><actor><num>1</num></actor><tag>中文字幕</tag></movie>";
        let info = parse_nfo(xml).unwrap();
        assert_eq!(info.identifier, None);
        assert!(info.has_chinese_subtitle);
    }

    #[test]
    fn broken_or_missing_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_nfo(&dir.path().join("missing.nfo")), NfoInfo::default());

        let broken = dir.path().join("broken.nfo");
        fs::write(&broken, "<movie><num>ABC-1</nm></movie>").unwrap();
        assert_eq!(read_nfo(&broken), NfoInfo::default());

        let good = dir.path().join("good.nfo");
        fs::write(&good, SAMPLE).unwrap();
        assert_eq!(read_nfo(&good).identifier.as_deref(), Some("NIMA-014"));
    }
}
