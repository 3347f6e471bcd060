//! Action Node：执行最新 agent Turn 中请求的动作
//!
//! 先解析整批请求：任一名称未注册即致命，且不执行任何处理器。
//! 之后按请求顺序逐个执行，每个请求对应追加一条 action-result Turn（失败也追加，带错误分类）。

use std::time::Instant;

use crate::core::EngineError;
use crate::memory::{ActionRequest, ActionResult, History, Turn};
use crate::react::{EventSink, RunEvent};
use crate::tools::ActionExecutor;

pub struct ActionNode {
    executor: ActionExecutor,
}

impl ActionNode {
    pub fn new(executor: ActionExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// 执行 history 最新 Turn 的所有动作请求，返回执行的动作数
    ///
    /// 批次内不检查取消：一旦开始，每个请求都会得到对应的 action-result。
    pub async fn execute(
        &self,
        history: &mut History,
        events: &EventSink,
    ) -> Result<usize, EngineError> {
        let requests: Vec<ActionRequest> = history
            .latest()
            .map(|t| t.requested_actions().to_vec())
            .unwrap_or_default();

        let mut resolved = Vec::with_capacity(requests.len());
        for request in requests {
            let action = self.executor.resolve(&request.name)?;
            resolved.push((action, request));
        }

        let mut executed = 0;
        for (action, request) in resolved {
            events.send(RunEvent::ActionStarted {
                name: request.name.clone(),
                call_id: request.id.clone(),
            });
            let start = Instant::now();
            let outcome = self.executor.invoke(&action, &request).await;
            if let Err(e) = &outcome {
                tracing::warn!(action = %request.name, error = %e, "action failed");
            }
            events.send(RunEvent::ActionFinished {
                name: request.name.clone(),
                call_id: request.id.clone(),
                ok: outcome.is_ok(),
                duration_ms: start.elapsed().as_millis() as u64,
            });
            history.append(Turn::action_result(ActionResult::from_outcome(request, outcome)));
            executed += 1;
        }
        Ok(executed)
    }
}
