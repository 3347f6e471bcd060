//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HERALD__*` 覆盖（双下划线表示嵌套，如 `HERALD__ENGINE__MAX_ROUND_TRIPS=8`）。
//! 最后用常见的旧环境变量（GROQ_API_KEY、SUPABASE_URL 等）补齐仍为空的凭据。
//! 凭据只在这里读取，动作处理器在构造时拿到各自的配置段，运行中不再读取进程环境。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub engine: EngineSection,
    pub actions: ActionsSection,
}

/// [app] 段：应用名与默认种子指令
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 每次运行的种子 user Turn
    pub seed_prompt: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            seed_prompt: "Summarize the latest news from the internet into an 8 point plain text summary. \
                Create an image with the summary generated. \
                Upload that image to storage. \
                Use the public url of the uploaded image to publish the post. \
                Use all the relevant actions available to you. Follow the steps one by one."
                .to_string(),
        }
    }
}

/// [llm] 段：决策服务后端
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// groq / openai / mock
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}

/// [engine] 段：步数预算、超时、指令文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Decision↔Action 往返上限
    pub max_round_trips: usize,
    /// 单个动作超时（秒）
    pub action_timeout_secs: u64,
    /// 整次运行的墙钟超时（秒）
    pub run_timeout_secs: u64,
    /// 覆盖默认系统指令的文件
    pub directive_path: Option<PathBuf>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_round_trips: 12,
            action_timeout_secs: 120,
            run_timeout_secs: 600,
            directive_path: None,
        }
    }
}

/// [actions] 段：各领域动作的配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActionsSection {
    pub news: NewsSection,
    pub render: RenderSection,
    pub storage: StorageSection,
    pub publish: PublishSection,
}

/// [actions.news]：新闻来源与抓取限制
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsSection {
    pub source_url: Option<String>,
    pub timeout_secs: u64,
    pub max_result_chars: usize,
}

impl Default for NewsSection {
    fn default() -> Self {
        Self {
            source_url: None,
            timeout_secs: 15,
            max_result_chars: 12000,
        }
    }
}

/// [actions.render]：帖子图片尺寸、字体、配色
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub output_dir: PathBuf,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    /// 候选字体（随机选一个可用的）
    pub font_paths: Vec<PathBuf>,
    pub font_size: f32,
    pub padding: u32,
    pub line_spacing: f32,
    pub max_text_width: u32,
    pub text_color: String,
    pub background_colors: Vec<String>,
    pub header: String,
    pub footer: String,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            file_name: "insta_text_post.png".to_string(),
            width: 1080,
            height: 1350,
            font_paths: vec![
                "fonts/Lexend.ttf".into(),
                "fonts/Federo.ttf".into(),
                "fonts/IBMPlexMono.ttf".into(),
                "fonts/Montserrat.ttf".into(),
                "fonts/RobotoSlab.ttf".into(),
                "fonts/SourceSans3.ttf".into(),
            ],
            font_size: 30.0,
            padding: 60,
            line_spacing: 1.5,
            max_text_width: 1020,
            text_color: "#000000".to_string(),
            background_colors: default_background_colors(),
            header: "Headlines: ".to_string(),
            footer: "-thenewsguybot".to_string(),
        }
    }
}

fn default_background_colors() -> Vec<String> {
    [
        "#F04A00", "#F6DE16", "#5E5CB2", "#94D2BD", "#E9D8A6", "#BDB76B", "#8FBC8B", "#FFF8DC",
        "#FFFFFF", "#FFFAFA", "#F0FFF0", "#F5FFFA", "#F0FFFF", "#F0F8FF", "#F8F8FF", "#F5F5F5",
        "#FFF0F5", "#FFE4E1", "#E1AFD1", "#A7D7C5", "#ADA2FF", "#8E9775", "#FFE1FF",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// [actions.storage]：对象存储（Supabase Storage）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub bucket: String,
    pub object_name: String,
    pub timeout_secs: u64,
    /// 上传成功后删除本地文件
    pub remove_local: bool,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            bucket: "instagram-posts".to_string(),
            object_name: "image.png".to_string(),
            timeout_secs: 60,
            remove_local: true,
        }
    }
}

/// [actions.publish]：社交平台发布（Instagram Graph API）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishSection {
    pub api_base: String,
    pub account_id: Option<String>,
    pub access_token: Option<String>,
    pub caption: String,
    pub timeout_secs: u64,
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            api_base: "https://graph.instagram.com/v23.0".to_string(),
            account_id: None,
            access_token: None,
            caption: "Headlines #news #indiannews".to_string(),
            timeout_secs: 60,
        }
    }
}

/// 从 config 目录加载配置，环境变量 HERALD__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 HERALD__*（双下划线表示嵌套键）
/// 4. 用旧环境变量补齐空凭据
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HERALD")
            .separator("__")
            .try_parsing(true),
    );

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_fallbacks(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// 用旧变量名补齐仍为空的凭据；lookup 便于测试注入
pub fn apply_env_fallbacks(cfg: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    fn fill(slot: &mut Option<String>, value: Option<String>) {
        if slot.is_none() {
            *slot = value.filter(|v| !v.trim().is_empty());
        }
    }

    let llm_key = match cfg.llm.provider.to_lowercase().as_str() {
        "openai" => lookup("OPENAI_API_KEY"),
        _ => lookup("GROQ_API_KEY").or_else(|| lookup("OPENAI_API_KEY")),
    };
    fill(&mut cfg.llm.api_key, llm_key);
    fill(&mut cfg.actions.news.source_url, lookup("NEWS_SOURCE"));
    fill(&mut cfg.actions.storage.url, lookup("SUPABASE_URL"));
    fill(&mut cfg.actions.storage.api_key, lookup("SUPABASE_ANON_KEY"));
    fill(&mut cfg.actions.publish.account_id, lookup("INSTAGRAM_ID"));
    fill(
        &mut cfg.actions.publish.access_token,
        lookup("INSTAGRAM_ACCESS_TOKEN"),
    );
}
