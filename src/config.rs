//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FORAGER__*` 覆盖（双下划线表示嵌套，如 `FORAGER__ENGINE__MAX_RETRIES=3`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub summary: SummarySection,
    #[serde(default)]
    pub llm: LlmSection,
}

/// [app] 段：应用名、能力沙箱根目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// load_json 等文件能力的根目录，未设置时用 ./workspace
    pub workspace_root: Option<PathBuf>,
}

/// [engine] 段：重试上限、Oracle 可见的最近尝试窗口、失败后是否仍生成最终回答
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// 每步最多重试次数 R（共 R+1 次尝试）
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// 传给 decide / judge 的最近尝试条数
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    /// 运行中止（重试耗尽或致命错误）后是否仍基于部分上下文生成最终回答
    #[serde(default = "default_answer_on_failure")]
    pub answer_on_failure: bool,
    /// 最终上下文中表格输出的预览行数
    #[serde(default = "default_final_preview_rows")]
    pub final_preview_rows: usize,
}

fn default_max_retries() -> usize {
    5
}

fn default_recent_window() -> usize {
    3
}

fn default_answer_on_failure() -> bool {
    true
}

fn default_final_preview_rows() -> usize {
    10
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            recent_window: default_recent_window(),
            answer_on_failure: default_answer_on_failure(),
            final_preview_rows: default_final_preview_rows(),
        }
    }
}

/// [summary] 段：Summarizer 渲染参数
#[derive(Debug, Clone, Deserialize)]
pub struct SummarySection {
    /// 序列 / 映射的采样条数
    #[serde(default = "default_preview_items")]
    pub preview_items: usize,
    /// 不透明值与单条采样的字符上限
    #[serde(default = "default_opaque_char_cap")]
    pub opaque_char_cap: usize,
    /// 表格摘要最多列出的列数
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,
    /// 表格摘要附带的预览行数（0 表示不预览）
    #[serde(default)]
    pub table_preview_rows: usize,
    /// 任意摘要的总字符上限
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_preview_items() -> usize {
    3
}

fn default_opaque_char_cap() -> usize {
    200
}

fn default_max_columns() -> usize {
    24
}

fn default_max_chars() -> usize {
    1200
}

impl Default for SummarySection {
    fn default() -> Self {
        Self {
            preview_items: default_preview_items(),
            opaque_char_cap: default_opaque_char_cap(),
            max_columns: default_max_columns(),
            table_preview_rows: 0,
            max_chars: default_max_chars(),
        }
    }
}

/// [llm] 段：后端选择与模型
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；实际选择由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4.1".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 FORAGER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 FORAGER__*（双下划线表示嵌套键）
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
        config::Environment::with_prefix("FORAGER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
