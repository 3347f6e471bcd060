//! 核心层：错误分类、运行状态与结果、取消信号、流水线构建

pub mod builder;
pub mod cancel;
pub mod error;
pub mod state;

pub use builder::PipelineBuilder;
pub use cancel::{CancelReason, CancelSource};
pub use error::{ActionError, ActionErrorKind, EngineError, RunErrorKind};
pub use state::{RunFailure, RunResult, RunState, RunSuccess};
