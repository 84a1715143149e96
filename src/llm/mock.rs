//! Mock LLM 客户端（离线、确定性，无需 API）
//!
//! 优先返回预置的回复队列；队列为空时按提示类型回复：
//! 规划提示返回两步计划，判定提示回复 yes，评估提示给固定分数，决策提示回显为 echo 工具调用，其它（最终回答）复述问题。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    scripted: Mutex<VecDeque<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定回复，用尽后回到默认行为
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scripted: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }
}

/// 取 `label '...'` 形式中引号内的文本
fn quoted_after<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let rest = &text[text.find(label)? + label.len()..];
    let rest = rest.trim_start().strip_prefix('\'')?;
    rest.find('\'').map(|end| &rest[..end])
}

fn default_reply(messages: &[Message]) -> String {
    let last_user = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("(no input)");
    let system = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .unwrap_or("");

    if last_user.contains("## Final Plan") {
        "Mock plan.\n\n## Final Plan\n1. Note down the question\n2. Present the note".to_string()
    } else if last_user.contains("Has the step been completed") {
        "yes (mock judge)".to_string()
    } else if last_user.contains("Evaluate the plan") {
        r#"{"conciseness": 4, "feasibility": 4, "effectiveness": 4, "rationale": "mock plan score"}"#.to_string()
    } else if last_user.contains("Evaluate the response") {
        r#"{"helpfulness": 4, "rationale": "mock response score"}"#.to_string()
    } else if system.contains("Reply with a single JSON object") {
        let step = quoted_after(last_user, "Current step:").unwrap_or("(unknown step)");
        serde_json::json!({
            "thought": format!("Mock decision for step: {}", step),
            "tool": "echo",
            "args": { "text": format!("Echo from Mock: {}", step), "output_var": "note" }
        })
        .to_string()
    } else {
        let question = last_user
            .rsplit("answer the following:")
            .next()
            .unwrap_or(last_user)
            .trim();
        format!("Mock answer for: {}", question)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let scripted = self
            .scripted
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front();
        Ok(scripted.unwrap_or_else(|| default_reply(messages)))
    }
}
