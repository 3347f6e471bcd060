//! OpenAI 兼容 Chat Completions 决策服务
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url，Groq / OpenAI / 自建代理等），
//! 使用 function calling：History 中 user → user 消息，agent → assistant（带 tool_calls），
//! action-result → tool 消息（tool_call_id 与请求配对）。请求中固定 parallel_tool_calls = false。
//! 客户端内置的限流重试被关闭，失败直接交给引擎。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
    ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionTools,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::{Map, Value};

use crate::core::EngineError;
use crate::llm::{DecisionError, DecisionService};
use crate::memory::{ActionRequest, Turn};
use crate::tools::{build_http_client, ActionSchema};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
    }

    /// (prompt, completion, total)
    pub fn get(&self) -> (u64, u64, u64) {
        let p = self.prompt_tokens.load(Ordering::Relaxed);
        let c = self.completion_tokens.load(Ordering::Relaxed);
        (p, c, p + c)
    }
}

pub struct OpenAiDecisionService {
    client: Client<OpenAIConfig>,
    model: String,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiDecisionService {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let config = OpenAIConfig::new()
            .with_api_base(base_url.trim_end_matches('/'))
            .with_api_key(api_key);
        let http = build_http_client(timeout, None)?;
        Ok(Self {
            client: Client::with_config(config)
                .with_http_client(http)
                .with_backoff(no_retry()),
            model: model.to_string(),
            usage: TokenUsage::default(),
        })
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    fn build_request(
        &self,
        directive: &str,
        history: &[Turn],
        actions: &[ActionSchema],
    ) -> Result<CreateChatCompletionRequest, DecisionError> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestSystemMessage::from(directive).into()];
        messages.extend(history.iter().map(to_chat_message));

        let tools: Vec<ChatCompletionTools> = actions
            .iter()
            .map(|a| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObject {
                        name: a.name.clone(),
                        description: Some(a.description.clone()),
                        parameters: Some(a.parameters.clone()),
                        ..Default::default()
                    },
                })
            })
            .collect();

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if !tools.is_empty() {
            args.tools(tools).parallel_tool_calls(false);
        }
        args.build().map_err(map_openai_error)
    }
}

/// 关闭 async_openai 对 429 / 5xx 的指数退避重试
fn no_retry() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

fn map_openai_error(e: OpenAIError) -> DecisionError {
    match e {
        OpenAIError::Reqwest(e) => DecisionError::Unreachable(e.to_string()),
        OpenAIError::ApiError(api) => DecisionError::Api(api.to_string()),
        OpenAIError::JSONDeserialize(e, body) => {
            DecisionError::Malformed(format!("{e}: {body}"))
        }
        OpenAIError::InvalidArgument(msg) => {
            DecisionError::Malformed(format!("invalid request: {msg}"))
        }
        other => DecisionError::Unreachable(other.to_string()),
    }
}

/// History Turn → Chat 消息
fn to_chat_message(turn: &Turn) -> ChatCompletionRequestMessage {
    match turn {
        Turn::User { content } => ChatCompletionRequestUserMessage::from(content.as_str()).into(),
        Turn::Agent { content, .. } => {
            let calls: Vec<ChatCompletionMessageToolCalls> = turn
                .requested_actions()
                .iter()
                .map(|r| {
                    ChatCompletionMessageToolCalls::Function(ChatCompletionMessageToolCall {
                        id: r.id.clone(),
                        function: FunctionCall {
                            name: r.name.clone(),
                            arguments: Value::Object(r.arguments.clone()).to_string(),
                        },
                    })
                })
                .collect();
            ChatCompletionRequestAssistantMessage {
                content: (!content.is_empty() || calls.is_empty()).then(|| content.as_str().into()),
                tool_calls: (!calls.is_empty()).then_some(calls),
                ..Default::default()
            }
            .into()
        }
        Turn::ActionResult(result) => ChatCompletionRequestToolMessage {
            content: result.to_content().into(),
            tool_call_id: result.request.id.clone(),
        }
        .into(),
    }
}

/// 响应 → agent Turn；tool_calls 的 arguments 不是 JSON 对象视为 Malformed
fn parse_response(resp: CreateChatCompletionResponse) -> Result<Turn, DecisionError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| DecisionError::Malformed("no choices in response".to_string()))?;
    let content = choice.message.content.unwrap_or_default();
    let calls = choice.message.tool_calls.unwrap_or_default();
    if calls.is_empty() {
        return Ok(Turn::agent(content));
    }

    let mut requests = Vec::with_capacity(calls.len());
    for call in calls {
        let call = match call {
            ChatCompletionMessageToolCalls::Function(call) => call,
            ChatCompletionMessageToolCalls::Custom(custom) => {
                return Err(DecisionError::Malformed(format!(
                    "custom tool call {} is not supported",
                    custom.id
                )))
            }
        };
        if call.function.name.trim().is_empty() {
            return Err(DecisionError::Malformed("tool call without a name".to_string()));
        }
        let raw = call.function.arguments.trim();
        let arguments: Map<String, Value> = if raw.is_empty() || raw == "null" {
            Map::new()
        } else {
            serde_json::from_str(raw).map_err(|e| {
                DecisionError::Malformed(format!(
                    "arguments of {} are not a JSON object: {e}: {raw}",
                    call.function.name
                ))
            })?
        };
        requests.push(ActionRequest::with_id(
            call.id,
            call.function.name,
            Value::Object(arguments),
        ));
    }
    Ok(Turn::agent_requesting(content, requests))
}

#[async_trait]
impl DecisionService for OpenAiDecisionService {
    async fn decide(
        &self,
        directive: &str,
        history: &[Turn],
        actions: &[ActionSchema],
    ) -> Result<Turn, DecisionError> {
        let request = self.build_request(directive, history, actions)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }
        let turn = parse_response(response)?;
        tracing::info!(
            model = %self.model,
            requested = ?turn.requested_actions().iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "decision received"
        );
        Ok(turn)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
