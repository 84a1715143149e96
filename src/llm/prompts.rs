//! LLM 提示词：决策（decide）、完成判定（judge）、规划（plan）、最终回答（answer）、评估（eval）

use crate::llm::Message;
use crate::memory::Attempt;
use crate::react::{DecideRequest, Plan};
use crate::tools::{CapabilitySpec, OUTPUT_VAR_ARG, REFLECT_TOOL};

const SYSTEM_ROLE: &str = "You are a meticulous data analyst executing a step-by-step plan to answer a user's question.";

/// 能力目录渲染为 markdown：名称、描述、参数（类型 / 是否必需 / 描述）
pub fn format_catalog(catalog: &[CapabilitySpec]) -> String {
    catalog
        .iter()
        .map(|spec| {
            let mut lines = vec![
                format!("### Tool: `{}`", spec.name),
                format!("**Description**: {}", spec.description),
                "**Parameters:**".to_string(),
            ];
            let required: Vec<&str> = spec
                .parameters
                .get("required")
                .and_then(|r| r.as_array())
                .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            match spec.parameters.get("properties").and_then(|p| p.as_object()) {
                Some(props) if !props.is_empty() => {
                    for (name, info) in props {
                        let ty = info.get("type").and_then(|t| t.as_str()).unwrap_or("unknown");
                        let desc = info
                            .get("description")
                            .and_then(|d| d.as_str())
                            .unwrap_or("No description.");
                        let flag = if required.contains(&name.as_str()) { " (required)" } else { "" };
                        lines.push(format!("- `{}`: `{}`{}: {}", name, ty, flag, desc));
                    }
                }
                _ => lines.push("*(No parameters)*".to_string()),
            }
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_attempts(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "(none yet)".to_string();
    }
    attempts
        .iter()
        .map(Attempt::to_prompt_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// decide 提示：目标、当前步骤、最近尝试、可引用变量、能力目录、输出 JSON 格式
pub fn decide_messages(
    request: &DecideRequest<'_>,
    catalog: &[CapabilitySpec],
    decision_schema: &str,
) -> Vec<Message> {
    let scratchpad = if request.scratchpad.is_empty() {
        "(empty)".to_string()
    } else {
        request
            .scratchpad
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let system = format!(
        "{}\n\n% Tools:\n{}\n\n% Output Format:\nReply with a single JSON object matching this schema:\n{}\n\
         Always store a tool's result by passing `{}` in `args`. To reference a scratchpad variable, \
         name the argument `<name>_var` and give the variable name (or a comma-separated list of names). \
         If no tool is appropriate, set `tool` to `{}` (or omit it) and explain your reasoning in `thought`.",
        SYSTEM_ROLE,
        format_catalog(catalog),
        decision_schema,
        OUTPUT_VAR_ARG,
        REFLECT_TOOL
    );
    let user = format!(
        "Question: {}\nCurrent step: '{}'\n\nRecent trace of actions & observations:\n{}\n\n\
         Scratchpad of variables we can reference in memory:\n{}\n\n\
         What should you do next? First reason about what you have observed, then decide which tool to call. \
         Do not make up variables or data columns that do not exist.",
        request.goal,
        request.step,
        format_attempts(request.recent_attempts),
        scratchpad
    );
    vec![Message::system(system), Message::user(user)]
}

/// judge 提示：要求以 yes / no 开头作答
pub fn judge_messages(step: &str, recent_attempts: &[Attempt]) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_ROLE),
        Message::user(format!(
            "Current step:\n'{}'\n\nRecent trace:\n{}\n\n\
             Question: Has the step been completed successfully?\n\
             Answer 'yes' or 'no' and briefly justify.",
            step,
            format_attempts(recent_attempts)
        )),
    ]
}

/// 规划提示：输出 `## Final Plan` 下的编号列表，每步一行
pub fn plan_messages(goal: &str, catalog: &[CapabilitySpec], extra_context: Option<&str>) -> Vec<Message> {
    let mut prompt = format!(
        "Help the user answer the following question: {}\n\n\
         % Task:\nGenerate a step-by-step plan of the data and tools to use. Each step, if executed correctly, \
         should produce information needed to answer the question. Do not add superfluous steps, and ground \
         every step in the tools below.\n\n% Tools:\n{}\n\n\
         % Output Format:\nThink step by step, then write a numbered list under a `## Final Plan` header, \
         one step per line. End with a step that puts the final output variable in a presentable format.",
        goal,
        format_catalog(catalog)
    );
    if let Some(ctx) = extra_context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("\n\nAdditional Context:\n{}", ctx));
    }
    vec![Message::system(SYSTEM_ROLE), Message::user(prompt)]
}

pub fn answer_messages(context: &str) -> Vec<Message> {
    vec![Message::system(SYSTEM_ROLE), Message::user(context)]
}

const EVALUATOR_ROLE: &str = "You are a critical-thinking research assistant evaluating an AI agent's work on a data question.";

/// 计划评估提示：1-5 分的 conciseness / feasibility / effectiveness
pub fn plan_eval_messages(question: &str, plan: &Plan, score_schema: &str) -> Vec<Message> {
    let steps = plan
        .steps()
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        Message::system(EVALUATOR_ROLE),
        Message::user(format!(
            "**Question:**\n{}\n\n**Plan Steps:**\n{}\n\n\
             Evaluate the plan on a scale from 1 to 5 for:\n\
             1. **Conciseness**: are there unnecessary or redundant steps?\n\
             2. **Feasibility**: are the tools and data used realistic and available?\n\
             3. **Effectiveness**: will these steps retrieve the right information to answer the question?\n\n\
             Include a brief rationale. Reply with a single JSON object matching this schema:\n{}",
            question, steps, score_schema
        )),
    ]
}

/// 回答评估提示：1-5 分的 helpfulness
pub fn response_eval_messages(question: &str, response: &str, score_schema: &str) -> Vec<Message> {
    vec![
        Message::system(EVALUATOR_ROLE),
        Message::user(format!(
            "**Question:**\n{}\n\n**Response:**\n{}\n\n\
             Evaluate the response on a scale from 1 to 5 for:\n\
             1. **Helpfulness**: does the response directly and completely answer the question?\n\n\
             Include a brief rationale. Reply with a single JSON object matching this schema:\n{}",
            question, response, score_schema
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_marks_required_params() {
        let spec = CapabilitySpec {
            name: "load_json".into(),
            description: "Load a file".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path"},
                    "limit": {"type": "integer"}
                },
                "required": ["path"]
            }),
        };
        let text = format_catalog(&[spec]);
        assert!(text.contains("### Tool: `load_json`"));
        assert!(text.contains("- `path`: `string` (required): File path"));
        assert!(text.contains("- `limit`: `integer`: No description."));
    }

    #[test]
    fn test_judge_prompt_lists_recent_trace() {
        let msgs = judge_messages("load data", &[Attempt::reflect("checking")]);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[1].content.contains("Thought: checking\nAction: None"));
    }

    #[test]
    fn test_plan_eval_prompt_numbers_steps() {
        let msgs = plan_eval_messages("q?", &Plan::new(["load", "count"]), "{}");
        assert!(msgs[1].content.contains("**Plan Steps:**\n1. load\n2. count"));
        assert!(msgs[1].content.contains("Evaluate the plan"));
    }
}
