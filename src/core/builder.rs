//! 流水线构建器：从 AppConfig 组装动作注册表、决策服务与系统指令，得到 Engine

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::EngineError;
use crate::llm::{create_groq_service, DecisionService, MockDecisionService, OpenAiDecisionService};
use crate::react::{Engine, EngineLimits, DEFAULT_DIRECTIVE};
use crate::tools::{
    ActionRegistry, EchoAction, FetchNewsAction, MakePostImageAction, PublishPostAction,
    UploadImageAction,
};

pub struct PipelineBuilder {
    config: AppConfig,
    directive: Option<String>,
    service: Option<Arc<dyn DecisionService>>,
}

impl PipelineBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            directive: None,
            service: None,
        }
    }

    /// 覆盖系统指令（不再读文件）
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    /// 注入决策服务（测试用）
    pub fn with_decision_service(mut self, service: Arc<dyn DecisionService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 注册全部领域动作；凭据缺失不在此报错，由动作执行时返回 ConfigMissing。
    /// echo 只在使用 Mock 决策服务时注册
    pub fn build_registry(&self) -> Result<ActionRegistry, EngineError> {
        let actions = &self.config.actions;
        let mut registry = ActionRegistry::new();
        registry.register(FetchNewsAction::new(&actions.news)?)?;
        registry.register(MakePostImageAction::new(&actions.render))?;
        registry.register(UploadImageAction::new(&actions.storage)?)?;
        registry.register(PublishPostAction::new(&actions.publish)?)?;
        if self.uses_mock() {
            registry.register(EchoAction)?;
        }
        Ok(registry)
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .llm
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    /// 未注入服务，且 provider 为 mock 或缺少 API Key
    fn uses_mock(&self) -> bool {
        self.service.is_none()
            && (self.config.llm.provider.eq_ignore_ascii_case("mock") || self.api_key().is_none())
    }

    /// 按 [llm] 选择决策服务；provider 为 mock 或缺少 API Key 时退回 Mock
    pub fn build_decision_service(&self) -> Result<Arc<dyn DecisionService>, EngineError> {
        if let Some(service) = &self.service {
            return Ok(Arc::clone(service));
        }

        let llm = &self.config.llm;
        let provider = llm.provider.to_lowercase();
        let timeout = Duration::from_secs(llm.request_timeout_secs);

        let service: Arc<dyn DecisionService> = match (provider.as_str(), self.api_key()) {
            ("mock", _) => Arc::new(MockDecisionService),
            (_, None) => {
                tracing::warn!(provider = %provider, "No API key configured, using mock decision service");
                Arc::new(MockDecisionService)
            }
            ("groq", Some(key)) => Arc::new(create_groq_service(key, llm.model.as_deref(), timeout)?),
            ("openai", Some(key)) => {
                let base_url = llm.base_url.as_deref().unwrap_or("https://api.openai.com/v1");
                let model = llm.model.as_deref().unwrap_or("gpt-4o-mini");
                Arc::new(OpenAiDecisionService::new(base_url, model, key, timeout)?)
            }
            (other, Some(key)) => {
                // 其他 OpenAI 兼容服务必须给出 base_url 与 model
                let base_url = llm.base_url.as_deref().ok_or_else(|| {
                    EngineError::ConfigError(format!("llm.base_url is required for provider '{other}'"))
                })?;
                let model = llm.model.as_deref().ok_or_else(|| {
                    EngineError::ConfigError(format!("llm.model is required for provider '{other}'"))
                })?;
                Arc::new(OpenAiDecisionService::new(base_url, model, key, timeout)?)
            }
        };
        tracing::info!(provider = %provider, model = service.model_id(), "decision service ready");
        Ok(service)
    }

    /// 系统指令：with_directive > engine.directive_path > config/prompts/journalist.md > 内置默认
    pub fn load_directive(&self) -> Result<String, EngineError> {
        if let Some(d) = &self.directive {
            return Ok(d.clone());
        }
        if let Some(path) = &self.config.engine.directive_path {
            return std::fs::read_to_string(path).map_err(|e| {
                EngineError::ConfigError(format!("cannot read directive {}: {}", path.display(), e))
            });
        }
        let found = [
            "config/prompts/journalist.md",
            "../config/prompts/journalist.md",
        ]
        .into_iter()
        .map(PathBuf::from)
        .find_map(|p| std::fs::read_to_string(p).ok())
        .filter(|s| !s.trim().is_empty());
        Ok(found.unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string()))
    }

    pub fn build_engine(&self) -> Result<Engine, EngineError> {
        let service = self.build_decision_service()?;
        let registry = Arc::new(self.build_registry()?);
        let directive = self.load_directive()?;
        let limits = EngineLimits::from_config(&self.config.engine);
        Ok(Engine::new(service, registry, directive, limits))
    }
}
