//! upload_image 动作：把本地 PNG 上传到 Supabase Storage 存储桶并返回公开 URL
//!
//! 以 upsert 方式写入固定对象名；上传成功后按配置删除本地文件（删除失败只记 warn）。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::config::StorageSection;
use crate::core::{ActionError, EngineError};
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::{build_http_client, Action};

#[derive(Deserialize, JsonSchema)]
struct UploadImageArgs {
    /// make_post_image 返回的本地图片路径
    image_path: String,
}

pub struct UploadImageAction {
    client: Client,
    cfg: StorageSection,
}

impl UploadImageAction {
    pub fn new(cfg: &StorageSection) -> Result<Self, EngineError> {
        let client = build_http_client(Duration::from_secs(cfg.timeout_secs), None)?;
        Ok(Self {
            client,
            cfg: cfg.clone(),
        })
    }

    fn credentials(&self) -> Result<(&str, &str), ActionError> {
        let url = self
            .cfg
            .url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ActionError::config_missing("storage url is not configured"))?;
        let key = self
            .cfg
            .api_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ActionError::config_missing("storage api_key is not configured"))?;
        Ok((url, key))
    }
}

fn object_url(base: &str, bucket: &str, object: &str) -> String {
    format!(
        "{}/storage/v1/object/{}/{}",
        base.trim_end_matches('/'),
        bucket,
        object
    )
}

fn public_url(base: &str, bucket: &str, object: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{}/{}",
        base.trim_end_matches('/'),
        bucket,
        object
    )
}

#[async_trait]
impl Action for UploadImageAction {
    fn name(&self) -> &str {
        "upload_image"
    }

    fn description(&self) -> &str {
        "Upload a local image to the storage bucket. Returns the public URL of the uploaded image."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<UploadImageArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ActionError> {
        let args: UploadImageArgs = parse_args(args)?;
        let (base, key) = self.credentials()?;

        let path = Path::new(args.image_path.trim());
        if !path.exists() {
            return Err(ActionError::not_found(format!(
                "image file not found at path: {}",
                path.display()
            )));
        }
        let data = tokio::fs::read(path).await?;

        let url = object_url(base, &self.cfg.bucket, &self.cfg.object_name);
        tracing::info!(bucket = %self.cfg.bucket, bytes = data.len(), "upload_image");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(key)
            .header("apikey", key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(data)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ActionError::remote_api(format!(
                "storage upload failed: HTTP {status}: {body}"
            )));
        }

        if self.cfg.remove_local {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::info!(path = %path.display(), "local image removed"),
                Err(e) => tracing::warn!(path = %path.display(), "could not remove local image: {}", e),
            }
        }

        let public = public_url(base, &self.cfg.bucket, &self.cfg.object_name);
        Ok(Value::String(public.trim_end_matches('?').to_string()))
    }
}
