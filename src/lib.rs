//! Herald - LLM 驱动的新闻发布流水线
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、运行状态、取消信号、流水线构建
//! - **llm**: 决策服务抽象与实现（OpenAI 兼容 / Groq / Mock）
//! - **memory**: Turn 与只追加的 History
//! - **observability**: 日志初始化与运行报告
//! - **react**: Decision Node、Action Node、Router 与执行器
//! - **tools**: 动作注册表、执行器与领域动作（抓新闻、出图、上传、发布）

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;
