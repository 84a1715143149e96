//! ContextHistory：已完成步骤的只追加日志
//!
//! 每个步骤结束后追加一条 StepRecord（步骤描述 + 有序 Attempt），之后不再修改；
//! recent(n) 只取最后 n 条，控制 Oracle prompt 规模。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tools::ToolCall;

/// 一次尝试中采取的动作
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttemptAction {
    /// 仅思考（reflect 或未选工具）
    None,
    Tool(ToolCall),
}

impl fmt::Display for AttemptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptAction::None => f.write_str("None"),
            AttemptAction::Tool(call) => write!(f, "{}", call),
        }
    }
}

/// 一次 ReAct 迭代：thought / action / observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub thought: String,
    pub action: AttemptAction,
    /// 能力结果的有界摘要，未调用能力时为 thought 本身
    pub observation: String,
}

impl Attempt {
    /// 未调用能力的尝试：observation 即 thought
    pub fn reflect(thought: impl Into<String>) -> Self {
        let thought = thought.into();
        Self {
            observation: thought.clone(),
            thought,
            action: AttemptAction::None,
        }
    }

    /// prompt 中的三行格式
    pub fn to_prompt_text(&self) -> String {
        format!(
            "Thought: {}\nAction: {}\nObservation: {}",
            self.thought, self.action, self.observation
        )
    }

    /// 最终上下文格式：只输出非空的 Thought / Action / Observation 行
    pub fn to_context_text(&self) -> String {
        let mut lines = Vec::with_capacity(3);
        if !self.thought.trim().is_empty() {
            lines.push(format!("Thought: {}", self.thought));
        }
        if let AttemptAction::Tool(call) = &self.action {
            lines.push(format!("Action: {}", call));
        }
        if !self.observation.trim().is_empty() {
            lines.push(format!("Observation: {}", self.observation));
        }
        lines.join("\n")
    }
}

/// 步骤最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Done,
    /// 重试耗尽
    Failed,
    /// 能力 / 引用 / 配置错误中止
    Aborted,
}

/// 单个步骤的记录
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: String,
    pub status: StepStatus,
    pub attempts: Vec<Attempt>,
    pub finished_at: DateTime<Utc>,
}

/// 只追加的步骤日志
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ContextHistory {
    entries: Vec<StepRecord>,
}

impl ContextHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条步骤记录
    pub fn log(&mut self, step: impl Into<String>, status: StepStatus, attempts: Vec<Attempt>) {
        self.entries.push(StepRecord {
            step: step.into(),
            status,
            attempts,
            finished_at: Utc::now(),
        });
    }

    /// 最后 n 条记录（不足 n 条时全部返回）
    pub fn recent(&self, n: usize) -> &[StepRecord] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn entries(&self) -> &[StepRecord] {
        &self.entries
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_order_and_recent_window() {
        let mut history = ContextHistory::new();
        for i in 0..5 {
            history.log(format!("step {i}"), StepStatus::Done, vec![Attempt::reflect("ok")]);
        }
        assert_eq!(history.len(), 5);
        let steps: Vec<_> = history.recent(3).iter().map(|r| r.step.as_str()).collect();
        assert_eq!(steps, vec!["step 2", "step 3", "step 4"]);
        assert_eq!(history.recent(10).len(), 5);
        assert!(history.recent(0).is_empty());
        assert_eq!(history.entries()[0].step, "step 0");
    }

    #[test]
    fn test_reflect_attempt_observation_is_thought() {
        let a = Attempt::reflect("need more data");
        assert_eq!(a.observation, "need more data");
        assert_eq!(
            a.to_prompt_text(),
            "Thought: need more data\nAction: None\nObservation: need more data"
        );
    }

    #[test]
    fn test_context_text_skips_empty_fields() {
        let a = Attempt {
            thought: String::new(),
            action: AttemptAction::Tool(ToolCall::new("echo").output_var("o")),
            observation: "hi".into(),
        };
        assert_eq!(a.to_context_text(), "Action: echo(output_var=o)\nObservation: hi");
        assert_eq!(Attempt::reflect("ok").to_context_text(), "Thought: ok\nObservation: ok");
    }

    #[test]
    fn test_history_serializes_as_list() {
        let mut history = ContextHistory::new();
        history.log("s", StepStatus::Failed, vec![]);
        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["status"], "failed");
    }
}
