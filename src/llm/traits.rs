//! 决策服务抽象
//!
//! 所有后端（OpenAI 兼容 / Groq / Mock）实现 DecisionService：给定系统指令、完整历史与可用动作，
//! 返回一条新的 agent Turn（最终回复，或携带要执行的动作）。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Turn;
use crate::tools::ActionSchema;

/// 决策服务错误：不可达、服务端拒绝或响应无法解析
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    #[error("decision service unreachable: {0}")]
    Unreachable(String),

    #[error("decision service rejected the request: {0}")]
    Api(String),

    #[error("malformed decision: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait DecisionService: Send + Sync {
    async fn decide(
        &self,
        directive: &str,
        history: &[Turn],
        actions: &[ActionSchema],
    ) -> Result<Turn, DecisionError>;

    /// 模型标识（用于日志）
    fn model_id(&self) -> &str {
        "unknown"
    }
}
