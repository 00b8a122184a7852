//! 自定义 webhook 通知。发送失败只记日志，不影响主流程。

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::base_system::context::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub detail: String,
    pub tag: String,
    pub level: NotifyLevel,
    pub adult: bool,
}

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    msg_type: &'static str,
    content: WebhookContent<'a>,
}

#[derive(Debug, Serialize)]
struct WebhookContent<'a> {
    title: &'a str,
    detail: &'a str,
    from: &'a str,
    tag: &'a str,
    level: NotifyLevel,
    adult: bool,
}

pub struct WebhookNotifier {
    client: Option<Client>,
    url: String,
    source: String,
}

impl WebhookNotifier {
    /// 未启用、地址为空或客户端构建失败时返回一个静默的通知器。
    pub fn from_config(config: &Config) -> Self {
        let url = config.webhook_url.trim().to_string();
        let client = if config.webhook_enabled && !url.is_empty() {
            build_client(config)
        } else {
            None
        };
        Self {
            client,
            url,
            source: config.webhook_source.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn body_json(&self, n: &Notification) -> serde_json::Value {
        let body = WebhookBody {
            msg_type: "markdown",
            content: WebhookContent {
                title: &n.title,
                detail: &n.detail,
                from: &self.source,
                tag: &n.tag,
                level: n.level,
                adult: n.adult,
            },
        };
        serde_json::to_value(body).unwrap_or_default()
    }

    /// 发送成功（2xx）返回 `true`。
    pub fn send(&self, n: &Notification) -> bool {
        let Some(client) = &self.client else {
            return false;
        };
        if n.title.trim().is_empty() && n.detail.trim().is_empty() {
            error!("webhook 消息标题和详情不能同时为空");
            return false;
        }

        info!("发送 webhook 通知: {}", self.url);
        match client.post(&self.url).json(&self.body_json(n)).send() {
            Ok(resp) if resp.status().is_success() => {
                info!("webhook 通知发送成功");
                true
            }
            Ok(resp) => {
                let status = resp.status().as_u16();
                let text = resp.text().unwrap_or_default();
                error!("webhook 通知发送失败, 状态码: {}, 响应: {}", status, text);
                false
            }
            Err(err) => {
                error!("webhook 通知发送异常: {}", err);
                false
            }
        }
    }
}

fn build_client(config: &Config) -> Option<Client> {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.webhook_headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(k), Ok(v)) => {
                headers.insert(k, v);
            }
            _ => warn!("忽略无效的 webhook 请求头: {}", key),
        }
    }
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    let mut builder = Client::builder().default_headers(headers);
    if config.webhook_timeout > 0 {
        builder = builder.timeout(Duration::from_secs(config.webhook_timeout));
    }
    match builder.build() {
        Ok(c) => Some(c),
        Err(err) => {
            error!("初始化 webhook 客户端失败: {}", err);
            None
        }
    }
}
