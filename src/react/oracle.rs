//! Oracle：外部决策方（通常是 LLM）
//!
//! decide 产生下一步思考与可选的能力调用，judge 判断步骤是否完成；
//! AnswerGenerator 基于最终上下文生成面向用户的回答。
//! 返回 `AgentError::Oracle` 表示决策不可解析（由 StepExecutor 降级），其它错误视为致命。

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::memory::Attempt;
use crate::tools::{ToolCall, REFLECT_TOOL};

/// 决策解析失败时代替的思考文本
pub const ORACLE_ERROR_THOUGHT: &str = "There was an error!";

/// 一次 decide 所需的全部输入
#[derive(Debug, Clone, Copy)]
pub struct DecideRequest<'a> {
    pub goal: &'a str,
    pub step: &'a str,
    /// Scratchpad 摘要（名称 → 摘要）
    pub scratchpad: &'a BTreeMap<String, String>,
    /// 当前步骤最近的若干次尝试
    pub recent_attempts: &'a [Attempt],
    /// 可用能力名称
    pub tools: &'a [String],
}

/// Oracle 的一次决策
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub thought: String,
    pub action: Option<ToolCall>,
}

impl Decision {
    /// 只思考、不调用能力
    pub fn reflect(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            action: None,
        }
    }

    pub fn call(thought: impl Into<String>, call: ToolCall) -> Self {
        Self {
            thought: thought.into(),
            action: Some(call),
        }
    }

    /// 需要执行的能力调用；名为 reflect 的调用等同于无动作
    pub fn tool_call(&self) -> Option<&ToolCall> {
        self.action.as_ref().filter(|c| c.tool != REFLECT_TOOL)
    }

    pub fn into_tool_call(self) -> Option<ToolCall> {
        self.action.filter(|c| c.tool != REFLECT_TOOL)
    }
}

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn decide(&self, request: DecideRequest<'_>) -> Result<Decision, AgentError>;

    /// 给定步骤描述与最近尝试，判断步骤是否已完成
    async fn judge(&self, step: &str, recent_attempts: &[Attempt]) -> Result<bool, AgentError>;
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, context: &str) -> Result<String, AgentError>;
}
