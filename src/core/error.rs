//! 计划执行错误类型
//!
//! 与 PlanRunner 配合：致命错误（配置、变量引用、工具执行、重试耗尽）立即中止剩余步骤，
//! Oracle 决策解析失败则在 StepExecutor 内部降级为 reflect，不打断重试循环。

use thiserror::Error;

/// 计划运行过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// 决策缺少 output_var、调用未注册工具、能力表声明不合法等
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// ArgumentResolver 找不到被引用的 Scratchpad 变量
    #[error("Scratchpad variable '{name}' not found for argument '{argument}'")]
    Reference { name: String, argument: String },

    /// 能力调用失败，原样透出
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// 步骤在 R 次重试内未被判定完成
    #[error("Step '{step}' not completed after {attempts} attempts")]
    RetryExhausted { step: String, attempts: usize },

    /// Oracle 决策不可解析（非致命）
    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl AgentError {
    /// 是否致命：致命错误中止整个运行，Oracle 错误在步骤内吸收
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AgentError::Oracle(_))
    }
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Json(e.to_string())
    }
}
