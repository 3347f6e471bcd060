//! 动作与决策服务共用的 reqwest 客户端构造

use std::time::Duration;

use reqwest::Client;

use crate::core::EngineError;

/// 构造带整体超时的客户端；TLS 后端初始化失败或 User-Agent 非法时返回 ConfigError
pub fn build_http_client(timeout: Duration, user_agent: Option<&str>) -> Result<Client, EngineError> {
    let mut builder = Client::builder().timeout(timeout);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    builder
        .build()
        .map_err(|e| EngineError::ConfigError(format!("failed to build HTTP client: {e}")))
}
