//! Decision Node：调用决策服务，得到下一条 agent Turn 并追加到 History
//!
//! 决策服务只看到 directive + 完整历史 + 已注册动作的 schema；
//! 返回非 agent Turn 或空动作名视为决策服务故障（致命）。

use std::sync::Arc;

use crate::core::EngineError;
use crate::llm::DecisionService;
use crate::memory::{History, Turn};
use crate::tools::ActionSchema;

/// 默认系统指令：新闻发布流水线，一次只请求一个动作
pub const DEFAULT_DIRECTIVE: &str = "\
You are a journalist who posts news on Instagram. Call the available actions one at a time, in this order:
1. Call fetch_news to get the latest news.
2. Analyze the news and write an 8 point plain text summary.
3. Call make_post_image with the actual summary text.
4. Call upload_image with the actual image path returned by make_post_image.
5. Call publish_post with the actual public URL returned by upload_image.

Never request more than one action at once. Wait for each result before the next step.
Always pass the real values returned by earlier actions, never placeholder text.
If an action returns an error, decide whether to retry with different input or stop and explain.
When every step is complete, reply with a short confirmation and no action request.";

pub struct DecisionNode {
    service: Arc<dyn DecisionService>,
    directive: String,
}

impl DecisionNode {
    pub fn new(service: Arc<dyn DecisionService>, directive: impl Into<String>) -> Self {
        Self {
            service,
            directive: directive.into(),
        }
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }

    /// 请求一次决策；成功时返回的 Turn 已追加到 history
    pub async fn decide(
        &self,
        history: &mut History,
        actions: &[ActionSchema],
    ) -> Result<Turn, EngineError> {
        if history.is_empty() {
            return Err(EngineError::EmptyHistory);
        }

        let turn = self
            .service
            .decide(&self.directive, history.all(), actions)
            .await
            .map_err(|e| EngineError::DecisionService(e.to_string()))?;

        if !matches!(turn, Turn::Agent { .. }) {
            return Err(EngineError::DecisionService(format!(
                "malformed decision: expected an agent turn, got {:?}",
                turn.role()
            )));
        }
        if turn.requested_actions().iter().any(|r| r.name.trim().is_empty()) {
            return Err(EngineError::DecisionService(
                "malformed decision: action request without a name".to_string(),
            ));
        }

        tracing::debug!(
            model = self.service.model_id(),
            requested = ?turn.requested_actions().iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "decision"
        );
        history.append(turn.clone());
        Ok(turn)
    }
}
