//! Router：根据最新 Turn 决定走向
//!
//! 纯函数：最新 Turn 是携带至少一个动作请求的 agent Turn → Continue（去 Action Node）；
//! 其余情况（含 requested_actions 为 None 或空）→ Stop。

use crate::memory::{History, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Continue,
    Stop,
}

pub fn route(latest: Option<&Turn>) -> Route {
    match latest {
        Some(turn @ Turn::Agent { .. }) if !turn.requested_actions().is_empty() => Route::Continue,
        _ => Route::Stop,
    }
}

pub fn route_history(history: &History) -> Route {
    route(history.latest())
}
