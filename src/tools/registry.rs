//! 动作注册表
//!
//! 所有动作实现 Action trait（name / description / parameters_schema / invoke），
//! 由 ActionRegistry 在进程启动时一次性注册；之后以 Arc 只读共享给各次运行，不允许运行中注册。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::{ActionError, EngineError};

/// 动作 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON 对象）
#[async_trait]
pub trait Action: Send + Sync {
    /// 动作名（决策服务请求时使用）
    fn name(&self) -> &str;

    /// 动作描述
    fn description(&self) -> &str;

    /// 参数 JSON Schema，默认无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, ActionError>;
}

/// 暴露给决策服务的动作描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 动作注册表：按名称存储 Arc<dyn Action>，保留注册顺序以保证 list_schemas 输出稳定
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
    order: Vec<String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册动作；同名重复注册返回 DuplicateAction
    pub fn register(&mut self, action: impl Action + 'static) -> Result<(), EngineError> {
        self.register_arc(Arc::new(action))
    }

    pub fn register_arc(&mut self, action: Arc<dyn Action>) -> Result<(), EngineError> {
        let name = action.name().to_string();
        if self.actions.contains_key(&name) {
            return Err(EngineError::DuplicateAction(name));
        }
        self.order.push(name.clone());
        self.actions.insert(name, action);
        Ok(())
    }

    /// 按名查找；不存在返回 UnknownAction
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Action>, EngineError> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownAction(name.to_string()))
    }

    pub fn action_names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn list_schemas(&self) -> Vec<ActionSchema> {
        self.order
            .iter()
            .filter_map(|name| self.actions.get(name))
            .map(|action| ActionSchema {
                name: action.name().to_string(),
                description: action.description().to_string(),
                parameters: action.parameters_schema(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
