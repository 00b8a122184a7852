//! 番号（识别码）提取。
//!
//! 番号形如 `NIMA-014`：字母 + 连字符 + 数字，只在字符串开头匹配，
//! 大小写原样保留（搜索关键字与输出文件名都直接使用它）。

use regex::Regex;
use std::sync::OnceLock;

fn re_identifier() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^([A-Za-z]+-\d+)").expect("compile identifier regex"))
}

/// 先对原始输入匹配，失败后再对去掉目录和扩展名的文件名匹配。
pub fn extract_identifier(input: &str) -> Option<String> {
    match_prefix(input).or_else(|| match_prefix(base_name(input)))
}

fn match_prefix(text: &str) -> Option<String> {
    re_identifier()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 取路径最后一段并去掉扩展名；同时认 `/` 与 `\`，NAS 上的 Windows 路径在 Linux 下也能拆开。
pub fn base_name(input: &str) -> &str {
    let name = input
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(input);
    match name.rfind('.') {
        // 以点开头的名字（如 `.hidden`）没有扩展名
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
