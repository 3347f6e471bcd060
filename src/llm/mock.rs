//! Mock 决策服务（用于测试与未配置 API Key 时，无需网络）
//!
//! - MockDecisionService：无状态。最新 Turn 是 user 时请求 echo 回显该输入；否则以上一个动作结果作最终回复。
//! - ScriptedDecisionService：按脚本依次返回预设 Turn，并记录每次看到的历史，便于断言。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{DecisionError, DecisionService};
use crate::memory::{ActionRequest, Turn};
use crate::tools::ActionSchema;

#[derive(Debug, Default)]
pub struct MockDecisionService;

#[async_trait]
impl DecisionService for MockDecisionService {
    async fn decide(
        &self,
        _directive: &str,
        history: &[Turn],
        actions: &[ActionSchema],
    ) -> Result<Turn, DecisionError> {
        match history.last() {
            Some(Turn::User { content }) if actions.iter().any(|a| a.name == "echo") => {
                Ok(Turn::agent_requesting(
                    "",
                    vec![ActionRequest::new(
                        "echo",
                        serde_json::json!({ "text": format!("Echo from Mock: {content}") }),
                    )],
                ))
            }
            Some(Turn::ActionResult(result)) => Ok(Turn::agent(result.to_content())),
            Some(turn) => Ok(Turn::agent(turn.content())),
            None => Err(DecisionError::Malformed("empty history".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

/// 一次调用的记录
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub directive: String,
    pub history: Vec<Turn>,
    pub action_names: Vec<String>,
}

/// 脚本化决策服务：脚本耗尽后返回 Malformed
#[derive(Debug, Default)]
pub struct ScriptedDecisionService {
    script: Mutex<VecDeque<Result<Turn, DecisionError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedDecisionService {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self::with_results(turns.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<Turn, DecisionError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DecisionService for ScriptedDecisionService {
    async fn decide(
        &self,
        directive: &str,
        history: &[Turn],
        actions: &[ActionSchema],
    ) -> Result<Turn, DecisionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                directive: directive.to_string(),
                history: history.to_vec(),
                action_names: actions.iter().map(|a| a.name.clone()).collect(),
            });
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| Err(DecisionError::Malformed("script exhausted".to_string())))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}
