//! 运行质量评估：由 LLM 给计划与最终回答打分（1-5 分）
//!
//! 计划看 conciseness / feasibility / effectiveness，回答看 helpfulness；
//! 回复格式与决策 JSON 相同（schemars 生成 Schema，取 fenced 或裸 JSON）。

use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::{extract_json, prompts, LlmClient};
use crate::react::{Plan, RunReport};

/// 合法分数区间
pub const SCORE_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// 计划评分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanScore {
    /// 是否有多余或重复的步骤
    #[serde(alias = "conciceness")]
    pub conciseness: u8,
    /// 用到的工具与数据是否真实可用
    pub feasibility: u8,
    /// 这些步骤能否取得回答问题所需的信息
    pub effectiveness: u8,
    pub rationale: String,
}

/// 回答评分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseScore {
    /// 回答是否直接、完整地解决了问题
    pub helpfulness: u8,
    pub rationale: String,
}

/// 单次运行的评估；没有回答时 response 为 None
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEvaluation {
    pub plan: PlanScore,
    pub response: Option<ResponseScore>,
}

/// 多次运行的平均分
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalAverages {
    pub runs: usize,
    pub conciseness: f64,
    pub feasibility: f64,
    pub effectiveness: f64,
    /// 只统计有回答的运行
    pub helpfulness: Option<f64>,
}

impl EvalAverages {
    pub fn from_evaluations(evals: &[RunEvaluation]) -> Self {
        if evals.is_empty() {
            return Self::default();
        }
        let n = evals.len() as f64;
        let mean = |f: fn(&PlanScore) -> u8| evals.iter().map(|e| f(&e.plan) as f64).sum::<f64>() / n;
        let helpful: Vec<f64> = evals
            .iter()
            .filter_map(|e| e.response.as_ref())
            .map(|r| r.helpfulness as f64)
            .collect();
        Self {
            runs: evals.len(),
            conciseness: mean(|p| p.conciseness),
            feasibility: mean(|p| p.feasibility),
            effectiveness: mean(|p| p.effectiveness),
            helpfulness: (!helpful.is_empty()).then(|| helpful.iter().sum::<f64>() / helpful.len() as f64),
        }
    }
}

fn schema_json<T: JsonSchema>() -> String {
    serde_json::to_string_pretty(&schema_for!(T)).unwrap_or_default()
}

fn check_score(field: &str, score: u8) -> Result<(), AgentError> {
    if SCORE_RANGE.contains(&score) {
        Ok(())
    } else {
        Err(AgentError::Oracle(format!("{} score {} is outside 1-5", field, score)))
    }
}

fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T, AgentError> {
    let json = extract_json(reply.trim())
        .ok_or_else(|| AgentError::Oracle(format!("no JSON in evaluation reply: {}", reply.trim())))?;
    serde_json::from_str(json).map_err(|e| AgentError::Oracle(format!("{}: {}", e, json)))
}

pub fn parse_plan_score(reply: &str) -> Result<PlanScore, AgentError> {
    let score: PlanScore = parse_reply(reply)?;
    check_score("conciseness", score.conciseness)?;
    check_score("feasibility", score.feasibility)?;
    check_score("effectiveness", score.effectiveness)?;
    Ok(score)
}

pub fn parse_response_score(reply: &str) -> Result<ResponseScore, AgentError> {
    let score: ResponseScore = parse_reply(reply)?;
    check_score("helpfulness", score.helpfulness)?;
    Ok(score)
}

/// LLM 评审
pub struct Evaluator {
    llm: Arc<dyn LlmClient>,
}

impl Evaluator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn eval_plan(&self, question: &str, plan: &Plan) -> Result<PlanScore, AgentError> {
        let messages = prompts::plan_eval_messages(question, plan, &schema_json::<PlanScore>());
        let reply = self.llm.complete(&messages).await.map_err(AgentError::Llm)?;
        parse_plan_score(&reply)
    }

    pub async fn eval_response(&self, question: &str, response: &str) -> Result<ResponseScore, AgentError> {
        let messages = prompts::response_eval_messages(question, response, &schema_json::<ResponseScore>());
        let reply = self.llm.complete(&messages).await.map_err(AgentError::Llm)?;
        parse_response_score(&reply)
    }

    /// 评估一次运行的计划与回答
    pub async fn evaluate(&self, report: &RunReport) -> Result<RunEvaluation, AgentError> {
        let plan = self.eval_plan(&report.goal, &report.plan).await?;
        let response = match &report.answer {
            Some(answer) => Some(self.eval_response(&report.goal, answer).await?),
            None => None,
        };
        tracing::info!(
            conciseness = plan.conciseness,
            feasibility = plan.feasibility,
            effectiveness = plan.effectiveness,
            helpfulness = response.as_ref().map(|r| r.helpfulness),
            "run evaluated"
        );
        Ok(RunEvaluation { plan, response })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[test]
    fn test_parse_plan_score_accepts_legacy_spelling() {
        let reply = "```json\n{\"conciceness\": 4, \"feasibility\": 5, \"effectiveness\": 3, \"rationale\": \"ok\"}\n```";
        let score = parse_plan_score(reply).unwrap();
        assert_eq!(score.conciseness, 4);
        assert_eq!(score.effectiveness, 3);
    }

    #[test]
    fn test_out_of_range_and_missing_json() {
        let err = parse_response_score(r#"{"helpfulness": 9, "rationale": "x"}"#).unwrap_err();
        assert!(matches!(err, AgentError::Oracle(ref m) if m.contains("helpfulness")));
        assert!(parse_response_score("great answer").is_err());
    }

    #[test]
    fn test_averages() {
        let plan = |c| PlanScore {
            conciseness: c,
            feasibility: 4,
            effectiveness: 2,
            rationale: String::new(),
        };
        let evals = [
            RunEvaluation {
                plan: plan(5),
                response: Some(ResponseScore {
                    helpfulness: 3,
                    rationale: String::new(),
                }),
            },
            RunEvaluation {
                plan: plan(2),
                response: None,
            },
        ];
        let avg = EvalAverages::from_evaluations(&evals);
        assert_eq!(avg.runs, 2);
        assert_eq!(avg.conciseness, 3.5);
        assert_eq!(avg.feasibility, 4.0);
        assert_eq!(avg.helpfulness, Some(3.0));
        assert_eq!(EvalAverages::from_evaluations(&[]), EvalAverages::default());
    }

    #[tokio::test]
    async fn test_evaluator_with_scripted_llm() {
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"conciseness": 5, "feasibility": 4, "effectiveness": 4, "rationale": "tight"}"#,
        ]));
        let evaluator = Evaluator::new(llm);
        let score = evaluator
            .eval_plan("q?", &Plan::new(["load", "count"]))
            .await
            .unwrap();
        assert_eq!(score.rationale, "tight");
        let response = evaluator.eval_response("q?", "42").await.unwrap();
        assert!(SCORE_RANGE.contains(&response.helpfulness));
    }
}
