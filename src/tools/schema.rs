//! 动作参数 Schema 与参数解析（schemars 自动生成）
//!
//! 每个动作用一个 `#[derive(Deserialize, JsonSchema)]` 的参数结构体描述输入，
//! 同一个类型既生成给决策服务看的 JSON Schema，也负责把传入的 JSON 解析成强类型参数。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::ActionError;

/// 生成参数结构体的 JSON Schema（去掉 `$schema` 元字段，部分 OpenAI 兼容端点不接受）
pub fn args_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| {
        serde_json::json!({ "type": "object", "properties": {} })
    });
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
    }
    value
}

/// 解析动作参数；格式不符返回 InvalidInput
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ActionError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ActionError::invalid_input(format!("Invalid arguments: {e}")))
}
