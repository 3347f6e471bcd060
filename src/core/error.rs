//! 引擎错误类型与动作错误
//!
//! 两类错误：EngineError 会终止整次运行；ActionError 只属于单个动作，
//! 由 Action Node 转成 History 中的 action-result Turn，交给决策服务自行处理。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 动作失败的分类（写入 History，供决策服务判断是否换动作或终止）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    NotFound,
    RemoteApiError,
    InvalidInput,
    ConfigMissing,
    /// 单个动作超过 action_timeout
    Timeout,
    Io,
}

impl std::fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionErrorKind::NotFound => "NotFound",
            ActionErrorKind::RemoteApiError => "RemoteAPIError",
            ActionErrorKind::InvalidInput => "InvalidInput",
            ActionErrorKind::ConfigMissing => "ConfigMissing",
            ActionErrorKind::Timeout => "Timeout",
            ActionErrorKind::Io => "Io",
        };
        f.write_str(s)
    }
}

/// 动作级错误：不致命，进入 History
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ActionError {
    pub kind: ActionErrorKind,
    pub message: String,
}

impl ActionError {
    pub fn new(kind: ActionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::NotFound, message)
    }

    pub fn remote_api(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::RemoteApiError, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::InvalidInput, message)
    }

    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::ConfigMissing, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::Timeout, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::Io, message)
    }
}

impl From<reqwest::Error> for ActionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ActionError::timeout(e.to_string())
        } else {
            ActionError::remote_api(e.to_string())
        }
    }
}

impl From<std::io::Error> for ActionError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => ActionError::not_found(e.to_string()),
            _ => ActionError::io(e.to_string()),
        }
    }
}

/// 运行级错误：任何一种都会让本次运行进入 FAILED（Cancelled 例外，进入 CANCELLED）
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Decision service error: {0}")]
    DecisionService(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Duplicate action: {0}")]
    DuplicateAction(String),

    #[error("Step budget exceeded after {0} round-trips")]
    StepBudgetExceeded(usize),

    #[error("Run timed out after {0:?}")]
    RunTimeout(Duration),

    #[error("Run cancelled")]
    Cancelled,

    #[error("History is empty, a seed turn is required")]
    EmptyHistory,

    #[error("Config error: {0}")]
    ConfigError(String),
}

/// 结构化失败报告中的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunErrorKind {
    DecisionServiceError,
    UnknownActionError,
    DuplicateActionError,
    StepBudgetExceeded,
    RunTimeout,
    CancelledError,
    EmptyHistory,
    ConfigError,
}

impl EngineError {
    pub fn kind(&self) -> RunErrorKind {
        match self {
            EngineError::DecisionService(_) => RunErrorKind::DecisionServiceError,
            EngineError::UnknownAction(_) => RunErrorKind::UnknownActionError,
            EngineError::DuplicateAction(_) => RunErrorKind::DuplicateActionError,
            EngineError::StepBudgetExceeded(_) => RunErrorKind::StepBudgetExceeded,
            EngineError::RunTimeout(_) => RunErrorKind::RunTimeout,
            EngineError::Cancelled => RunErrorKind::CancelledError,
            EngineError::EmptyHistory => RunErrorKind::EmptyHistory,
            EngineError::ConfigError(_) => RunErrorKind::ConfigError,
        }
    }
}
