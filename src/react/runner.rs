//! PlanRunner：按顺序执行计划的每个步骤，并基于执行历史生成最终回答
//!
//! 每次运行拥有独立的 Scratchpad 与 ContextHistory（不跨运行保留）。
//! 某步骤重试耗尽或出现致命错误时立即中止剩余步骤，已完成的历史与该步骤的部分尝试都会保留；
//! 之后按 answer_on_failure 决定是否仍基于部分上下文调用 AnswerGenerator。
//! AnswerGenerator 失败不丢弃报告，错误写入 RunReport::answer_error。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::EngineSection;
use crate::core::AgentError;
use crate::memory::{ContextHistory, Scratchpad, StepStatus};
use crate::react::events::{send_event, RunEvent};
use crate::react::oracle::{AnswerGenerator, Oracle};
use crate::react::plan::Plan;
use crate::react::step::{StepExecutor, StepOutcome};
use crate::summary::{render_table_markdown, Summarizer};
use crate::tools::CapabilityExecutor;
use crate::value::Value;

/// 运行结局
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// 在 step_index（从 0 计）处中止
    Halted {
        step_index: usize,
        #[serde(serialize_with = "serialize_error")]
        error: AgentError,
    },
}

fn serialize_error<S: serde::Serializer>(e: &AgentError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&e.to_string())
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// 一次运行的完整结果
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub goal: String,
    pub outcome: RunOutcome,
    pub history: ContextHistory,
    pub scratchpad: Scratchpad,
    /// 执行的计划
    pub plan: Plan,
    /// 交给 AnswerGenerator 的最终上下文
    pub context: String,
    /// 运行中止且 answer_on_failure 关闭，或生成失败时为 None
    pub answer: Option<String>,
    /// AnswerGenerator 的错误；历史与 Scratchpad 仍然保留
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_error: Option<String>,
}

pub struct PlanRunner {
    oracle: Arc<dyn Oracle>,
    answerer: Arc<dyn AnswerGenerator>,
    executor: Arc<CapabilityExecutor>,
    engine: EngineSection,
    summarizer: Summarizer,
    event_tx: Option<UnboundedSender<RunEvent>>,
}

impl PlanRunner {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        answerer: Arc<dyn AnswerGenerator>,
        executor: Arc<CapabilityExecutor>,
    ) -> Self {
        Self {
            oracle,
            answerer,
            executor,
            engine: EngineSection::default(),
            summarizer: Summarizer::default(),
            event_tx: None,
        }
    }

    pub fn with_engine_config(mut self, engine: EngineSection) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_event_tx(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 总是返回报告：步骤失败记录在 outcome，回答生成失败记录在 answer_error
    pub async fn run(&self, goal: &str, plan: &Plan) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("plan_run", %run_id, steps = plan.len());
        self.run_inner(run_id, goal, plan).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, goal: &str, plan: &Plan) -> RunReport {
        tracing::info!(goal = %goal, "plan run started");
        let mut scratchpad = Scratchpad::new().with_summarizer(self.summarizer.clone());
        let mut history = ContextHistory::new();
        let mut outcome = RunOutcome::Completed;
        let total = plan.len();

        for (index, step) in plan.steps().iter().enumerate() {
            send_event(
                self.event_tx.as_ref(),
                RunEvent::StepStarted {
                    index: index + 1,
                    total,
                    step: step.clone(),
                },
            );
            tracing::info!(step_index = index + 1, step = %step, "step started");

            let step_outcome = StepExecutor::new(self.oracle.as_ref(), &self.executor, &self.summarizer)
                .with_engine_config(&self.engine)
                .with_event_tx(self.event_tx.as_ref())
                .execute(goal, step, &mut scratchpad)
                .await;
            let status = step_outcome.status();
            send_event(
                self.event_tx.as_ref(),
                RunEvent::StepFinished {
                    index: index + 1,
                    status: status_label(status).to_string(),
                    attempts: step_outcome.attempts().len(),
                },
            );

            let halt = match step_outcome {
                StepOutcome::Done(attempts) => {
                    history.log(step.clone(), StepStatus::Done, attempts);
                    None
                }
                StepOutcome::Exhausted(attempts) => {
                    history.log(step.clone(), StepStatus::Failed, attempts);
                    Some(AgentError::RetryExhausted {
                        step: step.clone(),
                        attempts: self.engine.max_retries + 1,
                    })
                }
                StepOutcome::Aborted { attempts, error } => {
                    history.log(step.clone(), StepStatus::Aborted, attempts);
                    Some(error)
                }
            };

            if let Some(error) = halt {
                tracing::error!(step_index = index + 1, error = %error, "plan run halted");
                send_event(
                    self.event_tx.as_ref(),
                    RunEvent::RunHalted {
                        index: index + 1,
                        reason: error.to_string(),
                    },
                );
                outcome = RunOutcome::Halted {
                    step_index: index,
                    error,
                };
                break;
            }
        }

        let context = self.render_context(goal, &history, &scratchpad, &outcome);
        send_event(
            self.event_tx.as_ref(),
            RunEvent::FinalContext {
                chars: context.chars().count(),
            },
        );

        let (answer, answer_error) = if outcome.is_completed() || self.engine.answer_on_failure {
            match self.answerer.generate(&context).await {
                Ok(answer) => (Some(answer), None),
                Err(e) => {
                    tracing::error!(error = %e, "answer generation failed");
                    (None, Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };
        tracing::info!(completed = outcome.is_completed(), steps_logged = history.len(), "plan run finished");

        RunReport {
            run_id,
            goal: goal.to_string(),
            outcome,
            history,
            scratchpad,
            plan: plan.clone(),
            context,
            answer,
            answer_error,
        }
    }

    /// 最终上下文：逐步骤的 Thought / Action / Observation，最后一次能力输出的预览，以及原始目标
    pub fn render_context(
        &self,
        goal: &str,
        history: &ContextHistory,
        scratchpad: &Scratchpad,
        outcome: &RunOutcome,
    ) -> String {
        let mut out = String::from("You have completed the following steps:\n\n");
        for (i, record) in history.entries().iter().enumerate() {
            out.push_str(&format!("Step {}: {}\n", i + 1, record.step));
            for attempt in &record.attempts {
                let text = attempt.to_context_text();
                if !text.is_empty() {
                    out.push_str(&text);
                    out.push('\n');
                }
            }
            out.push('\n');
        }

        if let RunOutcome::Halted { step_index, error } = outcome {
            out.push_str(&format!(
                "Execution halted at step {}: {}\n\n",
                step_index + 1,
                error
            ));
        }

        if let Some((name, value)) = scratchpad.last_output_value() {
            if let Value::Table(table) = value {
                out.push_str(&format!(
                    "Here is the final result from `{}` (first {} of {} rows):\n\n",
                    name,
                    self.engine.final_preview_rows.min(table.n_rows()),
                    table.n_rows()
                ));
                out.push_str(&render_table_markdown(table, self.engine.final_preview_rows));
            } else if let Some(text) = value.as_str() {
                out.push_str(&format!("Here is the final string result from `{}`:\n\n", name));
                out.push_str(text);
            } else {
                out.push_str(&format!("Here is the final result from `{}`:\n\n", name));
                out.push_str(&self.summarizer.summarize(value));
            }
            out.push_str("\n\n");
        }

        out.push_str(&format!("Based on the above, answer the following: {}", goal));
        out
    }
}

fn status_label(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Done => "done",
        StepStatus::Failed => "failed",
        StepStatus::Aborted => "aborted",
    }
}
