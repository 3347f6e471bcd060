//! publish_post 动作：通过 Instagram Graph API 发布图片帖子
//!
//! 两步：先以 image_url 创建媒体容器（media），再用 creation_id 发布（media_publish）。
//! 任一步响应缺少 id 视为 RemoteApiError。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::config::PublishSection;
use crate::core::{ActionError, EngineError};
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::{build_http_client, Action};

#[derive(Deserialize, JsonSchema)]
struct PublishPostArgs {
    /// upload_image 返回的公开图片 URL
    image_url: String,
}

pub struct PublishPostAction {
    client: Client,
    cfg: PublishSection,
}

impl PublishPostAction {
    pub fn new(cfg: &PublishSection) -> Result<Self, EngineError> {
        let client = build_http_client(Duration::from_secs(cfg.timeout_secs), None)?;
        Ok(Self {
            client,
            cfg: cfg.clone(),
        })
    }

    fn credentials(&self) -> Result<(&str, &str), ActionError> {
        let id = self
            .cfg
            .account_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ActionError::config_missing("publish account_id is not configured"))?;
        let token = self
            .cfg
            .access_token
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ActionError::config_missing("publish access_token is not configured"))?;
        Ok((id, token))
    }

    async fn post_for_id(&self, url: &str, query: &[(&str, &str)], step: &str) -> Result<String, ActionError> {
        let resp = self.client.post(url).query(query).send().await?;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        match extract_id(&body) {
            Some(id) if status.is_success() => Ok(id),
            _ => Err(ActionError::remote_api(format!(
                "{step} failed: HTTP {status}: {body}"
            ))),
        }
    }
}

/// 取响应中的 "id"（字符串或数字）
fn extract_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Action for PublishPostAction {
    fn name(&self) -> &str {
        "publish_post"
    }

    fn description(&self) -> &str {
        "Publish an image post using the public image URL. Returns the id of the published post."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<PublishPostArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ActionError> {
        let args: PublishPostArgs = parse_args(args)?;
        let image_url = args.image_url.trim();
        if !image_url.starts_with("http://") && !image_url.starts_with("https://") {
            return Err(ActionError::invalid_input(format!(
                "image_url must be an http(s) URL, got: {image_url}"
            )));
        }
        let (account_id, token) = self.credentials()?;
        let base = self.cfg.api_base.trim_end_matches('/');

        let creation_id = self
            .post_for_id(
                &format!("{base}/{account_id}/media"),
                &[
                    ("image_url", image_url),
                    ("is_carousel_item", "FALSE"),
                    ("caption", self.cfg.caption.as_str()),
                    ("access_token", token),
                ],
                "create media container",
            )
            .await?;
        tracing::info!(creation_id = %creation_id, "media container created");

        let post_id = self
            .post_for_id(
                &format!("{base}/{account_id}/media_publish"),
                &[("creation_id", creation_id.as_str()), ("access_token", token)],
                "publish media",
            )
            .await?;
        tracing::info!(post_id = %post_id, "post published");
        Ok(Value::String(post_id))
    }
}
