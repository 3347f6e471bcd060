//! Groq 决策服务（OpenAI 兼容格式）
//!
//! - Base URL: https://api.groq.com/openai/v1
//! - 默认模型: meta-llama/llama-4-maverick-17b-128e-instruct（支持 function calling）

use std::time::Duration;

use crate::core::EngineError;
use crate::llm::OpenAiDecisionService;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const LLAMA_4_MAVERICK: &str = "meta-llama/llama-4-maverick-17b-128e-instruct";

/// 创建 Groq 决策服务；model 为 None 时使用 LLAMA_4_MAVERICK
pub fn create_groq_service(
    api_key: &str,
    model: Option<&str>,
    timeout: Duration,
) -> Result<OpenAiDecisionService, EngineError> {
    OpenAiDecisionService::new(
        GROQ_BASE_URL,
        model.unwrap_or(LLAMA_4_MAVERICK),
        api_key,
        timeout,
    )
}
