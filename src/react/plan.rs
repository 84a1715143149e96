//! Plan：有序、只读的自然语言步骤列表
//!
//! 计划由外部（LLM Planner 或文件）产生；parse_markdown 从 `## Final Plan` 标题后的编号列表提取步骤。

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn final_plan_heading() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^\s*##\s*final plan\s*$").ok())
        .as_ref()
}

fn numbered_step() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\d+[.)]\s*(.+?)\s*$").ok())
        .as_ref()
}

/// 去掉行首的 "1." / "1)" 编号
fn strip_numbering(line: &str) -> &str {
    numbered_step()
        .and_then(|re| re.captures(line))
        .and_then(|c| c.get(1))
        .map_or(line, |m| m.as_str())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<String>,
}

impl Plan {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }

    /// 提取 `## Final Plan` 之后的编号步骤；没有该标题时返回空计划
    pub fn parse_markdown(text: &str) -> Self {
        let (Some(heading), Some(step)) = (final_plan_heading(), numbered_step()) else {
            return Self::default();
        };
        let Some(found) = heading.find(text) else {
            return Self::default();
        };
        Self::new(
            step.captures_iter(&text[found.end()..])
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
        )
    }

    /// 纯文本计划：每个非空行一步，去掉可选的 "1." 编号
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(strip_numbering),
        )
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_final_plan_section() {
        let text = "Let me think.\n1. not part of the plan\n\n## Final Plan\n1. Fetch orders into `orders`\n2) Compute late-delivery rate\n   3. Present the result as a table\n";
        let plan = Plan::parse_markdown(text);
        assert_eq!(
            plan.steps(),
            &[
                "Fetch orders into `orders`".to_string(),
                "Compute late-delivery rate".to_string(),
                "Present the result as a table".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_heading_gives_empty_plan() {
        assert!(Plan::parse_markdown("1. a\n2. b").is_empty());
    }

    #[test]
    fn test_heading_is_case_insensitive() {
        assert_eq!(Plan::parse_markdown("## FINAL PLAN\n1. only").len(), 1);
    }

    #[test]
    fn test_from_lines() {
        let plan = Plan::from_lines("1. fetch data into d\n\n  compute summary of d into s  \n");
        assert_eq!(
            plan.steps(),
            &["fetch data into d".to_string(), "compute summary of d into s".to_string()]
        );
    }
}
