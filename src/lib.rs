//! Forager - 计划驱动的 ReAct 执行引擎
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **eval**: LLM 评审计划与回答质量
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、LlmOracle
//! - **memory**: Scratchpad 变量表与 ContextHistory 步骤日志
//! - **react**: Plan、Oracle 接口、StepExecutor 重试状态机、PlanRunner
//! - **summary**: 值的有界文本摘要
//! - **tools**: 能力注册表、参数解析、执行器与内置能力
//! - **value**: Scratchpad 中的值模型（表格 / 列表 / 映射 / 标量 / 不透明值）

pub mod config;
pub mod core;
pub mod eval;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod summary;
pub mod tools;
pub mod value;

pub use crate::core::AgentError;
pub use react::{Plan, PlanRunner, RunOutcome, RunReport};
