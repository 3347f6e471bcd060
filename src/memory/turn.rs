//! Turn：History 中的一条记录
//!
//! 三种角色各自携带不同字段（user 文本 / agent 决策 / action-result），用带标签的 enum 表达，
//! 避免「哪些字段存在」的歧义。Turn 一经 append 即不可变。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{ActionError, ActionErrorKind};

/// Turn 的角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    ActionResult,
}

/// 决策服务请求执行的一个动作：{"name": "...", "arguments": {...}}
///
/// `id` 用于把结果与请求一一配对（OpenAI 兼容协议中的 tool_call_id）。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ActionRequest {
    /// 生成随机 call id；arguments 若不是 JSON 对象则包成 {"value": ...}
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self::with_id(
            format!("call_{}", uuid::Uuid::new_v4().simple()),
            name,
            arguments,
        )
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// 以 JSON 对象形式取参数（传给 Action::invoke）
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}

/// 动作执行结果：成功输出或带分类的错误
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Output { output: Value },
    Error { kind: ActionErrorKind, message: String },
}

/// 与 ActionRequest 一一配对的结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub request: ActionRequest,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

impl ActionResult {
    pub fn from_outcome(request: ActionRequest, outcome: Result<Value, ActionError>) -> Self {
        let outcome = match outcome {
            Ok(output) => ActionOutcome::Output { output },
            Err(e) => ActionOutcome::Error {
                kind: e.kind,
                message: e.message,
            },
        };
        Self { request, outcome }
    }

    pub fn output(&self) -> Option<&Value> {
        match &self.outcome {
            ActionOutcome::Output { output } => Some(output),
            ActionOutcome::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ActionErrorKind> {
        match &self.outcome {
            ActionOutcome::Error { kind, .. } => Some(*kind),
            ActionOutcome::Output { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Error { .. })
    }

    /// 给决策服务看的文本：字符串输出原样返回，其余 JSON 序列化；错误带上分类
    pub fn to_content(&self) -> String {
        match &self.outcome {
            ActionOutcome::Output { output: Value::String(s) } => s.clone(),
            ActionOutcome::Output { output } => output.to_string(),
            ActionOutcome::Error { kind, message } => format!("Error ({kind}): {message}"),
        }
    }
}

/// History 中的一条记录
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User {
        content: String,
    },
    Agent {
        content: String,
        /// None 与 Some(空) 语义相同：都是终止信号
        #[serde(default, skip_serializing_if = "Option::is_none")]
        requested_actions: Option<Vec<ActionRequest>>,
    },
    ActionResult(ActionResult),
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    /// 最终回复（无动作请求）
    pub fn agent(content: impl Into<String>) -> Self {
        Turn::Agent {
            content: content.into(),
            requested_actions: None,
        }
    }

    pub fn agent_requesting(content: impl Into<String>, actions: Vec<ActionRequest>) -> Self {
        Turn::Agent {
            content: content.into(),
            requested_actions: Some(actions),
        }
    }

    pub fn action_result(result: ActionResult) -> Self {
        Turn::ActionResult(result)
    }

    pub fn role(&self) -> Role {
        match self {
            Turn::User { .. } => Role::User,
            Turn::Agent { .. } => Role::Agent,
            Turn::ActionResult(_) => Role::ActionResult,
        }
    }

    /// 请求的动作（非 agent 或无请求时为空 slice）
    pub fn requested_actions(&self) -> &[ActionRequest] {
        match self {
            Turn::Agent {
                requested_actions: Some(actions),
                ..
            } => actions,
            _ => &[],
        }
    }

    pub fn content(&self) -> String {
        match self {
            Turn::User { content } | Turn::Agent { content, .. } => content.clone(),
            Turn::ActionResult(r) => r.to_content(),
        }
    }

    pub fn as_action_result(&self) -> Option<&ActionResult> {
        match self {
            Turn::ActionResult(r) => Some(r),
            _ => None,
        }
    }
}
