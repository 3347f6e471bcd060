//! Herald - 新闻发布流水线
//!
//! 入口：初始化日志、加载配置、构建 Engine，以配置中的 seed_prompt 运行一次，
//! 向 stdout 打印 JSON 报告。退出码：0 成功，1 失败，130 被取消。

use std::path::PathBuf;

use anyhow::Context;
use herald::config::load_config;
use herald::core::{CancelSource, PipelineBuilder};
use herald::memory::Turn;
use herald::observability::{self, run_report};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let seed = cfg.app.seed_prompt.clone();

    let engine = PipelineBuilder::new(cfg)
        .build_engine()
        .context("Failed to build engine")?;

    let cancel = CancelSource::new();
    cancel.install_signal_handlers();

    let result = engine.run_once(Turn::user(seed), cancel.token()).await;
    let report = run_report(&result);
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );

    let code = match &result {
        Ok(_) => 0,
        Err(f) if f.is_cancelled() => {
            tracing::info!(reason = ?cancel.reason(), "run cancelled");
            130
        }
        Err(_) => 1,
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
