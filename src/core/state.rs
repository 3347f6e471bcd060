//! 运行状态机位置与运行结果
//!
//! RunState 只在单次运行内存在，由引擎持有；运行结束后以 RunSuccess / RunFailure 交给调用方，
//! 两者都带完整（或部分）History，供外部记录。

use serde::Serialize;
use thiserror::Error;

use crate::core::{EngineError, RunErrorKind};
use crate::memory::{History, Turn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    AwaitingDecision,
    AwaitingActions,
    Done,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed | RunState::Cancelled)
    }

    /// 致命错误对应的终态：取消为 Cancelled，其余为 Failed
    pub fn for_error(error: &EngineError) -> Self {
        match error {
            EngineError::Cancelled => RunState::Cancelled,
            _ => RunState::Failed,
        }
    }
}

/// 成功：最终 agent Turn + 完整历史
#[derive(Debug, Clone)]
pub struct RunSuccess {
    pub run_id: String,
    pub final_turn: Turn,
    pub history: History,
    pub round_trips: usize,
}

/// 失败或取消：错误 + 截至失败时的部分历史
#[derive(Debug, Error)]
#[error("run {run_id} ended in {state:?}: {error}")]
pub struct RunFailure {
    pub run_id: String,
    pub state: RunState,
    pub error: EngineError,
    pub partial_history: History,
    pub round_trips: usize,
}

impl RunFailure {
    pub fn new(run_id: String, error: EngineError, partial_history: History, round_trips: usize) -> Self {
        Self {
            run_id,
            state: RunState::for_error(&error),
            error,
            partial_history,
            round_trips,
        }
    }

    pub fn kind(&self) -> RunErrorKind {
        self.error.kind()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == RunState::Cancelled
    }
}

pub type RunResult = Result<RunSuccess, RunFailure>;
