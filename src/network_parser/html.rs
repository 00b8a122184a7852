//! 站点页面解析。
//!
//! 页面先用宽松的 HTML 解析器读成有序的元素序列（标签名、属性、可见文字），
//! 匹配规则只作用在这些纯数据上，便于直接用 HTML 片段测试。

use std::collections::BTreeMap;
use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};

use crate::download::models::{ChineseDownloadInfo, SearchResult, Variant};

/// 搜索结果行里链接目标的特征片段。
const RESULT_MARKERS: [&str; 2] = ["/view.php?", "/subs/"];
/// 详情页下载按钮的 class。
const DOWNLOAD_BUTTON_CLASS: &str = "green-link";
const NO_TITLE: &str = "No title found";

fn selector(cell: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("valid static selector"))
}

fn sel_title() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector(&S, "title")
}

fn sel_row() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector(&S, "tr")
}

fn sel_cell() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector(&S, "td")
}

fn sel_link() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector(&S, "a[href]")
}

fn sel_download_button() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector(&S, &format!("a.{DOWNLOAD_BUTTON_CLASS}"))
}

/// 与解析库无关的元素快照。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageElement {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    /// 去掉首尾空白的可见文字
    pub text: String,
}

impl PageElement {
    fn from_ref(el: ElementRef<'_>) -> Self {
        Self {
            tag: el.value().name().to_string(),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: el.text().collect::<String>().trim().to_string(),
        }
    }

    pub fn attr(&self, name: &str) -> &str {
        self.attrs.get(name).map(String::as_str).unwrap_or("")
    }
}

/// 表格行：行内所有带 href 的链接（文档顺序）与所有单元格文字。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub links: Vec<PageElement>,
    pub cells: Vec<String>,
}

/// 一次解析得到的页面。
pub struct ParsedPage {
    doc: Html,
}

impl ParsedPage {
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }

    pub fn title(&self) -> String {
        self.doc
            .select(sel_title())
            .next()
            .map(|t| t.text().collect::<String>())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| NO_TITLE.to_string())
    }

    /// 全部可见文字，逐段去空白后直接拼接。
    pub fn text(&self) -> String {
        self.doc
            .root_element()
            .text()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn table_rows(&self) -> Vec<TableRow> {
        self.doc
            .select(sel_row())
            .map(|row| TableRow {
                links: row.select(sel_link()).map(PageElement::from_ref).collect(),
                cells: row
                    .select(sel_cell())
                    .map(|c| c.text().collect::<String>().trim().to_string())
                    .collect(),
            })
            .collect()
    }

    pub fn download_buttons(&self) -> Vec<PageElement> {
        self.doc
            .select(sel_download_button())
            .map(PageElement::from_ref)
            .collect()
    }
}

/// 把站内链接补全为绝对地址。
///
/// `/x` 接在站点根后；已带协议的原样返回；其余视为相对根目录的路径。
pub fn resolve_url(base_url: &str, href: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{base}{href}")
    } else if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{base}/{href}")
    }
}

/// 链接文字包含番号（不区分大小写），或链接目标带有结果页特征。
pub fn is_relevant_link(link: &PageElement, identifier_lower: &str) -> bool {
    let href = link.attr("href");
    link.text.to_lowercase().contains(identifier_lower)
        || RESULT_MARKERS.iter().any(|m| href.contains(m))
}

/// 每行最多产出一条结果：取第一个相关链接，语言取第二个单元格。
pub fn classify_row(row: &TableRow, identifier: &str, base_url: &str) -> Option<SearchResult> {
    let identifier_lower = identifier.to_lowercase();
    let link = row
        .links
        .iter()
        .find(|l| is_relevant_link(l, &identifier_lower))?;
    Some(SearchResult {
        title: link.text.clone(),
        url: resolve_url(base_url, link.attr("href")),
        language: row.cells.get(1).cloned().unwrap_or_default(),
    })
}

pub fn parse_results(html: &str, identifier: &str, base_url: &str) -> Vec<SearchResult> {
    results_from_page(&ParsedPage::parse(html), identifier, base_url)
}

pub fn results_from_page(page: &ParsedPage, identifier: &str, base_url: &str) -> Vec<SearchResult> {
    page.table_rows()
        .iter()
        .filter_map(|row| classify_row(row, identifier, base_url))
        .collect()
}

/// 只有带链接的 `<a>` 才能下载；`<button>` 等元素即使 id 里有 download 也不算。
fn is_download_button(button: &PageElement) -> bool {
    button.tag == "a"
        && (button.attr("id").to_lowercase().contains("download")
            || button.text.to_lowercase().contains("download"))
}

/// 下载按钮对应的变体；id 或链接里带有变体标记即算命中，同一按钮可同时命中两个。
pub fn button_variants(button: &PageElement) -> Vec<Variant> {
    if !is_download_button(button) {
        return Vec::new();
    }
    let id = button.attr("id");
    let href = button.attr("href");
    Variant::PREFERENCE
        .into_iter()
        .filter(|v| id.contains(v.tag()) || href.contains(v.tag()))
        .collect()
}

/// 按文档顺序处理，同一变体以最后一个按钮为准。找不到任何按钮不算错误。
///
/// 输入可以是任意元素快照，非下载链接的元素会被忽略。
pub fn chinese_downloads(buttons: &[PageElement], base_url: &str) -> ChineseDownloadInfo {
    let mut info = ChineseDownloadInfo::default();
    for button in buttons {
        for variant in button_variants(button) {
            info.record(variant, resolve_url(base_url, button.attr("href")));
        }
    }
    info
}

pub fn parse_chinese_downloads(html: &str, base_url: &str) -> ChineseDownloadInfo {
    chinese_downloads(&ParsedPage::parse(html).download_buttons(), base_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.subtitlecat.com";

    fn link(text: &str, href: &str) -> PageElement {
        PageElement {
            tag: "a".into(),
            attrs: BTreeMap::from([("href".to_string(), href.to_string())]),
            text: text.into(),
        }
    }

    #[test]
    fn resolves_relative_and_absolute_urls() {
        assert_eq!(
            resolve_url(BASE, "/subs/x.srt"),
            "https://www.subtitlecat.com/subs/x.srt"
        );
        assert_eq!(
            resolve_url(BASE, "subs/x.srt"),
            "https://www.subtitlecat.com/subs/x.srt"
        );
        assert_eq!(
            resolve_url(BASE, "https://other.example/y"),
            "https://other.example/y"
        );
        assert_eq!(resolve_url("https://h.example/", "/a"), "https://h.example/a");
    }

    #[test]
    fn single_matching_row() {
        let html = r#"<html><head><title>Search</title></head><body>
            <table><tr><td><a href="/subs/abc">NIMA-014 (Chinese)</a></td></tr></table>
            </body></html>"#;
        let results = parse_results(html, "NIMA-014", BASE);
        assert_eq!(
            results,
            vec![SearchResult {
                title: "NIMA-014 (Chinese)".into(),
                url: "https://www.subtitlecat.com/subs/abc".into(),
                language: String::new(),
            }]
        );
    }

    #[test]
    fn first_relevant_link_per_row_with_language_cell() {
        let html = r#"<table>
            <tr><th>Title</th><th>Lang</th></tr>
            <tr>
              <td><a href="/user/1">uploader</a> <a href="/subs/1/x.html"><b>nima-014</b> full</a>
                  <a href="/subs/1/y.html">second</a></td>
              <td> Japanese </td>
              <td>12 downloads</td>
            </tr>
            <tr><td><a href="/about">About</a></td><td>none</td></tr>
            <tr><td><a href="view.php?id=7">unrelated text</a></td></tr>
            <tr><td><a href="https://cdn.example/view.php?id=9">Other</a></td><td>English</td></tr>
            </table>"#;
        let results = parse_results(html, "NIMA-014", BASE);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "nima-014 full");
        assert_eq!(results[0].url, "https://www.subtitlecat.com/subs/1/x.html");
        assert_eq!(results[0].language, "Japanese");
        // 相对路径 `view.php?` 不带斜杠，不算特征；绝对地址里的 `/view.php?` 算
        assert_eq!(results[1].url, "https://cdn.example/view.php?id=9");
        assert_eq!(results[1].language, "English");
    }

    #[test]
    fn tolerates_broken_markup() {
        let html = r#"<table><tr><td><a href="/subs/9">NIMA-014<span>x</td>
            <tr><td>NIMA-014 no link<td>zh"#;
        let results = parse_results(html, "NIMA-014", BASE);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://www.subtitlecat.com/subs/9");
    }

    #[test]
    fn no_rows_no_results() {
        assert!(parse_results("<p>nothing here</p>", "NIMA-014", BASE).is_empty());
        assert!(parse_results("", "NIMA-014", BASE).is_empty());
    }

    #[test]
    fn relevance_is_case_insensitive_substring_or_marker() {
        assert!(is_relevant_link(&link("xx Nima-014 yy", "/a"), "nima-014"));
        assert!(is_relevant_link(&link("zzz", "/subs/q"), "nima-014"));
        assert!(!is_relevant_link(&link("NIMA-01", "/a"), "nima-014"));
    }

    #[test]
    fn detects_both_chinese_variants() {
        let html = r#"<html><body>
            <a class="green-link" id="download_zh-CN" href="/dl/a">Download</a>
            <a class="green-link" id="download_zh-TW" href="/dl/b">Download</a>
            </body></html>"#;
        let info = parse_chinese_downloads(html, BASE);
        assert!(info.simplified_available);
        assert!(info.traditional_available);
        assert_eq!(
            info.link(Variant::Simplified),
            Some("https://www.subtitlecat.com/dl/a")
        );
        assert_eq!(
            info.link(Variant::Traditional),
            Some("https://www.subtitlecat.com/dl/b")
        );
    }

    #[test]
    fn only_styled_download_buttons_count() {
        let html = r#"
            <a id="download_zh-CN" href="/dl/plain">Download</a>
            <a class="btn green-link" id="translate_zh-CN" href="/tr/zh-CN">Translate</a>
            <a class="green-link" href="/subs/1/x-zh-TW.srt">download traditional</a>
            <a class="green-link" id="download_zh-TW" href="/dl/last">Download</a>
        "#;
        let info = parse_chinese_downloads(html, BASE);
        assert!(!info.simplified_available);
        assert!(info.traditional_available);
        // 同一变体以最后一个为准
        assert_eq!(
            info.link(Variant::Traditional),
            Some("https://www.subtitlecat.com/dl/last")
        );
    }

    #[test]
    fn non_anchor_elements_are_ignored() {
        let button = PageElement {
            tag: "button".into(),
            attrs: BTreeMap::from([
                ("id".to_string(), "download_zh-CN".to_string()),
                ("href".to_string(), "/subs/a.zh-CN.srt".to_string()),
            ]),
            text: "Download".into(),
        };
        let anchor = PageElement {
            tag: "a".into(),
            ..button.clone()
        };
        assert!(button_variants(&button).is_empty());
        assert!(!chinese_downloads(&[button], BASE).simplified_available);
        assert_eq!(button_variants(&anchor), vec![Variant::Simplified]);
    }

    #[test]
    fn page_without_buttons_is_not_an_error() {
        let info = parse_chinese_downloads("<html><body><p>x</p></body></html>", BASE);
        assert_eq!(info, ChineseDownloadInfo::default());
    }

    #[test]
    fn title_and_text_extraction() {
        let page = ParsedPage::parse(
            "<html><head><title>NIMA-014 subs</title></head><body><p> a </p><p>b</p></body></html>",
        );
        assert_eq!(page.title(), "NIMA-014 subs");
        assert_eq!(page.text(), "NIMA-014 subsab");
        assert_eq!(ParsedPage::parse("<p>x</p>").title(), "No title found");
    }
}
