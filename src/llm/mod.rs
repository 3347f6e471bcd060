//! 决策服务层：抽象与实现（OpenAI 兼容 / Groq / Mock）

pub mod groq;
pub mod mock;
pub mod openai;
pub mod traits;

pub use groq::{create_groq_service, GROQ_BASE_URL, LLAMA_4_MAVERICK};
pub use mock::{MockDecisionService, RecordedCall, ScriptedDecisionService};
pub use openai::{OpenAiDecisionService, TokenUsage};
pub use traits::{DecisionError, DecisionService};
