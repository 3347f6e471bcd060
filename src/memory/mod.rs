//! 状态存储：Turn 定义与只追加的运行历史

pub mod history;
pub mod turn;

pub use history::History;
pub use turn::{ActionOutcome, ActionRequest, ActionResult, Role, Turn};
