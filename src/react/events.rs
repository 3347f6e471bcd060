//! 运行过程事件：用于向外部（日志、前端、调度器）推送状态转换、决策与动作执行情况

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::RunState;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted { run_id: String },
    /// 状态机转换
    StateChanged { from: RunState, to: RunState },
    /// 决策返回（请求的动作名，空表示最终回复）
    Decision { requested: Vec<String> },
    ActionStarted { name: String, call_id: String },
    ActionFinished {
        name: String,
        call_id: String,
        ok: bool,
        duration_ms: u64,
    },
    RunFinished {
        run_id: String,
        state: RunState,
        round_trips: usize,
    },
}

/// 可选事件通道；接收端已关闭时静默丢弃
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<UnboundedSender<RunEvent>>);

impl EventSink {
    pub fn new(tx: UnboundedSender<RunEvent>) -> Self {
        Self(Some(tx))
    }

    pub fn send(&self, ev: RunEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(ev);
        }
    }
}
