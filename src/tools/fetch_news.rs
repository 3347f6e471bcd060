//! fetch_news 动作：抓取配置的新闻源并提取可读文本
//!
//! GET 请求带超时与 User-Agent；HTML 响应用 html2text 提取正文，
//! 超过 max_result_chars 时截断并追加 ...[truncated]。

use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::config::NewsSection;
use crate::core::{ActionError, EngineError};
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::{build_http_client, Action};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// 无参数
#[derive(Deserialize, JsonSchema)]
struct FetchNewsArgs {}

pub struct FetchNewsAction {
    client: Client,
    source_url: Option<String>,
    max_result_chars: usize,
}

impl FetchNewsAction {
    pub fn new(cfg: &NewsSection) -> Result<Self, EngineError> {
        let client = build_http_client(Duration::from_secs(cfg.timeout_secs), Some(USER_AGENT))?;
        Ok(Self {
            client,
            source_url: cfg.source_url.clone(),
            max_result_chars: cfg.max_result_chars,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, ActionError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ActionError::not_found(format!("{url} returned 404")));
        }
        if !status.is_success() {
            return Err(ActionError::remote_api(format!("{url} returned HTTP {status}")));
        }
        let body = resp.text().await?;
        let body = body.strip_prefix('\u{FEFF}').unwrap_or(&body);

        let text = if looks_like_html(body) {
            html_to_text(body)
        } else {
            body.to_string()
        };
        if text.trim().is_empty() {
            return Err(ActionError::remote_api(format!("{url} returned no readable content")));
        }
        Ok(truncate_chars(&text, self.max_result_chars))
    }
}

/// 判断内容是否像 HTML
fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.to_ascii_lowercase().starts_with("<html")
        || (s.contains('<') && (s.contains("</") || s.contains("<head") || s.contains("<meta")))
}

fn html_to_text(html: &str) -> String {
    match from_read(html.as_bytes(), 120) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => strip_html_tags(html),
    }
}

/// html2text 失败时的回退
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        text.chars().take(max).collect::<String>() + "\n...[truncated]"
    } else {
        text.to_string()
    }
}

#[async_trait]
impl Action for FetchNewsAction {
    fn name(&self) -> &str {
        "fetch_news"
    }

    fn description(&self) -> &str {
        "Fetch the latest news from the configured news source and return its readable text."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<FetchNewsArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ActionError> {
        let _: FetchNewsArgs = parse_args(args)?;
        let url = self
            .source_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ActionError::config_missing("news source_url is not configured"))?;
        tracing::info!(url = %url, "fetch_news");
        self.fetch(url).await.map(Value::String)
    }
}
