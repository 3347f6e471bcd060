//! Echo 动作（测试与 Mock 决策服务用）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::ActionError;
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::Action;

#[derive(Deserialize, JsonSchema)]
struct EchoArgs {
    /// 原样返回的文本
    text: String,
}

/// Echo 动作：回显文本
pub struct EchoAction;

#[async_trait]
impl Action for EchoAction {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo text back unchanged (for testing)."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<EchoArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ActionError> {
        let args: EchoArgs = parse_args(args)?;
        Ok(Value::String(args.text))
    }
}
