//! 动作执行器
//!
//! 持有只读 ActionRegistry 与单动作超时：resolve 查找处理器（找不到即致命），
//! invoke 在超时内调用处理器，超时转为 ActionErrorKind::Timeout；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::core::{ActionError, EngineError};
use crate::memory::ActionRequest;
use crate::tools::{Action, ActionRegistry};

pub struct ActionExecutor {
    registry: Arc<ActionRegistry>,
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(registry: Arc<ActionRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Action>, EngineError> {
        self.registry.resolve(name)
    }

    /// 执行已解析的动作；处理器失败或超时都返回 ActionError，不终止运行
    pub async fn invoke(
        &self,
        action: &Arc<dyn Action>,
        request: &ActionRequest,
    ) -> Result<Value, ActionError> {
        let start = Instant::now();
        let args = request.arguments_value();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, action.invoke(args)).await;

        let outcome = match &result {
            Ok(Ok(_)) => "ok",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        let audit = serde_json::json!({
            "event": "action_audit",
            "ts": chrono::Utc::now().to_rfc3339(),
            "action": request.name,
            "call_id": request.id,
            "ok": outcome == "ok",
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "action");

        match result {
            Ok(r) => r,
            Err(_) => Err(ActionError::timeout(format!(
                "{} did not finish within {:?}",
                request.name, self.timeout
            ))),
        }
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
