//! 可观测性：日志初始化与运行报告

use serde_json::{json, Value};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::core::RunResult;

/// 日志：默认 info，可通过 RUST_LOG 覆盖；输出到 stderr，stdout 留给运行报告
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// 把运行结果整理成 JSON 报告（终态、错误分类、往返次数、完整历史）
pub fn run_report(result: &RunResult) -> Value {
    match result {
        Ok(ok) => json!({
            "run_id": ok.run_id,
            "state": "DONE",
            "round_trips": ok.round_trips,
            "final": ok.final_turn.content(),
            "finished_at": chrono::Utc::now().to_rfc3339(),
            "history": ok.history,
        }),
        Err(failure) => json!({
            "run_id": failure.run_id,
            "state": failure.state,
            "round_trips": failure.round_trips,
            "finished_at": chrono::Utc::now().to_rfc3339(),
            "error": {
                "kind": failure.kind(),
                "message": failure.message(),
            },
            "history": failure.partial_history,
        }),
    }
}
