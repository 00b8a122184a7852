//! 字幕站点的网络请求：搜索、详情页、字幕文件。

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::html::{self, ParsedPage};
use crate::base_system::context::Config;
use crate::download::models::{DetailOutcome, DetailPage, SearchOutcome};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("初始化 HTTP 客户端失败: {0}")]
    Build(#[source] reqwest::Error),
    #[error("请求失败 {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} {reason}: {url}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },
    #[error("User-Agent 无效: {0}")]
    UserAgent(String),
}

/// 字幕站点的三种请求。批处理只依赖这个接口。
pub trait SubtitleSource {
    /// 任何失败都记录日志并返回 `None`。
    fn search(&self, identifier: &str) -> Option<SearchOutcome>;
    /// 失败时返回 `DetailOutcome::Error`，不会向上抛错。
    fn fetch_detail(&self, url: &str) -> DetailOutcome;
    fn fetch_file(&self, url: &str) -> Result<Vec<u8>, ClientError>;
}

pub struct SubtitleCatClient {
    client: Client,
    base_url: String,
    search_base: String,
}

impl SubtitleCatClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|_| ClientError::UserAgent(config.user_agent.clone()))?,
        );

        let mut builder = Client::builder().default_headers(headers);
        // 0 表示不设超时，和 reqwest blocking 默认的 30s 区分开
        builder = builder.timeout(config.request_timeout());
        if let Some(t) = config.connect_timeout() {
            builder = builder.connect_timeout(t);
        }
        let client = builder.build().map_err(ClientError::Build)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search_base: config.search_base(),
        })
    }

    pub fn search_url(&self, identifier: &str) -> String {
        format!(
            "{}?search={}",
            self.search_base,
            urlencoding::encode(identifier)
        )
    }

    fn get(&self, url: &str) -> Result<Response, ClientError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|source| ClientError::Request {
                url: url.to_string(),
                source,
            })?;
        check_status(url, resp.status())?;
        Ok(resp)
    }

    fn get_text(&self, url: &str) -> Result<(u16, String), ClientError> {
        let resp = self.get(url)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|source| ClientError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok((status, body))
    }
}

/// 2xx/3xx 视为成功（重定向由 reqwest 自动跟随）。
fn check_status(url: &str, status: StatusCode) -> Result<(), ClientError> {
    if status.is_success() || status.is_redirection() {
        return Ok(());
    }
    Err(ClientError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
    })
}

impl SubtitleSource for SubtitleCatClient {
    fn search(&self, identifier: &str) -> Option<SearchOutcome> {
        if identifier.trim().is_empty() {
            warn!("搜索关键字为空，跳过");
            return None;
        }
        let url = self.search_url(identifier);
        debug!("搜索: {}", url);

        let (status_code, body) = match self.get_text(&url) {
            Ok(v) => v,
            Err(err) => {
                error!("获取搜索页失败: {}", err);
                return None;
            }
        };

        let page = ParsedPage::parse(&body);
        Some(SearchOutcome {
            page_title: page.title(),
            results: html::results_from_page(&page, identifier, &self.base_url),
            url,
            status_code,
        })
    }

    fn fetch_detail(&self, url: &str) -> DetailOutcome {
        if url.trim().is_empty() {
            return DetailOutcome::Error("Invalid URL provided".to_string());
        }
        let url = html::resolve_url(&self.base_url, url);
        debug!("获取详情页: {}", url);

        match self.get_text(&url) {
            Ok((_, body)) => {
                let page = ParsedPage::parse(&body);
                DetailOutcome::Page(DetailPage {
                    page_title: page.title(),
                    content: page.text(),
                    chinese: html::chinese_downloads(&page.download_buttons(), &self.base_url),
                    url,
                })
            }
            Err(err) => DetailOutcome::Error(err.to_string()),
        }
    }

    fn fetch_file(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let resp = self.get(url)?;
        let bytes = resp.bytes().map_err(|source| ClientError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}
