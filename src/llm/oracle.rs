//! LlmOracle：由 LLM 驱动的 Oracle / AnswerGenerator / 计划生成
//!
//! decide 要求模型输出 `{"thought", "tool", "args"}` JSON（schema 由 schemars 生成并注入 system prompt），
//! 从 ```json 代码块或首尾花括号之间提取；没有 JSON 的回复视为纯思考，JSON 不合法则返回 Oracle 错误。
//! judge 只看回复前 10 个字符是否含 "yes"。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;

use crate::core::AgentError;
use crate::llm::{prompts, LlmClient, Message};
use crate::memory::Attempt;
use crate::react::{AnswerGenerator, DecideRequest, Decision, Oracle, Plan};
use crate::tools::{CapabilitySpec, ToolCall, REFLECT_TOOL};

/// judge 回复中查找 "yes" 的前缀长度
const AFFIRMATIVE_PREFIX_CHARS: usize = 10;

/// 决策输出格式（同时用于解析与 Schema 生成）
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DecisionPayload {
    /// 对下一步动作的推理
    pub thought: String,
    /// 要调用的工具名；省略或为 "reflect" 表示只思考
    #[serde(default)]
    pub tool: Option<String>,
    /// 工具参数：必须包含 output_var；`<name>_var` 引用 Scratchpad 变量
    #[serde(default)]
    pub args: Option<serde_json::Map<String, serde_json::Value>>,
}

/// 决策格式的 JSON Schema 字符串，拼入 system prompt
pub fn decision_schema_json() -> String {
    let schema = schema_for!(DecisionPayload);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 从回复中截取 JSON 片段：```json 代码块优先，其次首个 '{' 到最后一个 '}'
pub fn extract_json(reply: &str) -> Option<&str> {
    if let Some(start) = reply.find("```json") {
        let rest = &reply[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// 把模型回复解析为 Decision；`_var` 参数不合法时返回致命错误，由 StepExecutor 中止步骤
pub fn parse_decision(reply: &str) -> Result<Decision, AgentError> {
    let trimmed = reply.trim();
    let Some(json) = extract_json(trimmed) else {
        return Ok(Decision::reflect(trimmed));
    };
    let payload: DecisionPayload = serde_json::from_str(json)
        .map_err(|e| AgentError::Oracle(format!("{}: {}", e, json)))?;

    match payload.tool.as_deref().map(str::trim) {
        None | Some("") => Ok(Decision::reflect(payload.thought)),
        Some(tool) if tool == REFLECT_TOOL => Ok(Decision::reflect(payload.thought)),
        Some(tool) => {
            let args = payload.args.unwrap_or_default();
            Ok(Decision::call(payload.thought, ToolCall::from_raw_args(tool, &args)?))
        }
    }
}

/// 回复前 10 个字符（小写）中含 "yes" 即视为完成
pub fn is_affirmative(reply: &str) -> bool {
    let head: String = reply
        .trim_start()
        .chars()
        .take(AFFIRMATIVE_PREFIX_CHARS)
        .collect();
    head.to_lowercase().contains("yes")
}

pub struct LlmOracle {
    llm: Arc<dyn LlmClient>,
    catalog: Vec<CapabilitySpec>,
    schema: String,
}

impl LlmOracle {
    /// catalog 为可用能力目录（CapabilityExecutor::catalog）
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Vec<CapabilitySpec>) -> Self {
        Self {
            llm,
            catalog,
            schema: decision_schema_json(),
        }
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    async fn ask(&self, messages: Vec<Message>) -> Result<String, AgentError> {
        self.llm.complete(&messages).await.map_err(AgentError::Llm)
    }

    /// 让模型为 goal 生成计划；回复中没有 `## Final Plan` 列表时返回 Oracle 错误
    pub async fn create_plan(&self, goal: &str, extra_context: Option<&str>) -> Result<Plan, AgentError> {
        let reply = self
            .ask(prompts::plan_messages(goal, &self.catalog, extra_context))
            .await?;
        let plan = Plan::parse_markdown(&reply);
        if plan.is_empty() {
            return Err(AgentError::Oracle(format!(
                "no '## Final Plan' list in planner reply: {}",
                crate::summary::truncate_chars(&reply, 200)
            )));
        }
        tracing::info!(steps = plan.len(), "plan created");
        Ok(plan)
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn decide(&self, request: DecideRequest<'_>) -> Result<Decision, AgentError> {
        let reply = self
            .ask(prompts::decide_messages(&request, &self.catalog, &self.schema))
            .await?;
        let decision = parse_decision(&reply)?;
        tracing::debug!(
            tool = decision.tool_call().map(|c| c.tool.as_str()).unwrap_or(REFLECT_TOOL),
            "oracle decision"
        );
        Ok(decision)
    }

    async fn judge(&self, step: &str, recent_attempts: &[Attempt]) -> Result<bool, AgentError> {
        let reply = self.ask(prompts::judge_messages(step, recent_attempts)).await?;
        Ok(is_affirmative(&reply))
    }
}

#[async_trait]
impl AnswerGenerator for LlmOracle {
    async fn generate(&self, context: &str) -> Result<String, AgentError> {
        self.ask(prompts::answer_messages(context)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Argument;

    #[test]
    fn test_parse_fenced_tool_decision() {
        let reply = "Let me load it.\n```json\n{\"thought\": \"load orders\", \"tool\": \"load_json\", \"args\": {\"path\": \"orders.json\", \"output_var\": \"orders\"}}\n```";
        let d = parse_decision(reply).unwrap();
        assert_eq!(d.thought, "load orders");
        let call = d.tool_call().unwrap();
        assert_eq!(call.tool, "load_json");
        assert_eq!(call.output_var.as_deref(), Some("orders"));
        assert!(matches!(call.arguments.get("path"), Some(Argument::Literal(_))));
    }

    #[test]
    fn test_parse_reference_suffix() {
        let reply = r#"{"thought": "stats", "tool": "column_stats", "args": {"table_var": "orders", "column": "price", "output_var": "s"}}"#;
        let call = parse_decision(reply).unwrap().into_tool_call().unwrap();
        assert_eq!(
            call.arguments.get("table"),
            Some(&Argument::Reference("orders".into()))
        );
    }

    #[test]
    fn test_plain_text_and_reflect_are_thoughts() {
        let d = parse_decision("I need to think about the data first.").unwrap();
        assert_eq!(d, Decision::reflect("I need to think about the data first."));

        let d = parse_decision(r#"{"thought": "hmm", "tool": "reflect"}"#).unwrap();
        assert!(d.tool_call().is_none());
    }

    #[test]
    fn test_malformed_json_is_oracle_error() {
        let err = parse_decision(r#"{"thought": oops}"#).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_malformed_reference_args_are_fatal() {
        let reply = r#"{"thought": "t", "tool": "echo", "args": {"text_var": null, "output_var": "o"}}"#;
        assert!(parse_decision(reply).unwrap_err().is_fatal());
    }

    #[test]
    fn test_affirmative_prefix() {
        assert!(is_affirmative("Yes, the data was loaded."));
        assert!(is_affirmative("  **yes**"));
        assert!(!is_affirmative("No. Although yes would be nice"));
        assert!(!is_affirmative("The answer is yes"));
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = decision_schema_json();
        assert!(schema.contains("thought"));
        assert!(schema.contains("args"));
    }
}
