//! StepExecutor：单个计划步骤的 THINK → ACT → OBSERVE → DECIDE 重试循环
//!
//! 每轮尝试：
//! - THINK：把目标、步骤、Scratchpad 摘要与最近尝试交给 Oracle.decide；不可解析的决策降级为 reflect
//! - ACT：若有能力调用，先校验能力已注册且带 output_var，再解析引用、调用能力，结果写入 Scratchpad
//! - OBSERVE：能力结果的有界摘要；未调用能力时 observation 即 thought
//! - DECIDE：Oracle.judge 判定完成则结束，否则进入下一轮
//!
//! 最多 R+1 轮；耗尽后追加一条哨兵尝试并返回 Exhausted。ACT 阶段的错误立即中止本步骤。

use tokio::sync::mpsc::UnboundedSender;

use crate::config::EngineSection;
use crate::core::AgentError;
use crate::memory::{Attempt, AttemptAction, Scratchpad, StepStatus, LAST_OUTPUT_KEY};
use crate::react::events::{send_event, RunEvent};
use crate::react::oracle::{DecideRequest, Decision, Oracle, ORACLE_ERROR_THOUGHT};
use crate::summary::{truncate_chars, Summarizer};
use crate::tools::{ArgumentResolver, CapabilityExecutor, ToolCall};

const EXHAUSTED_THOUGHT: &str = "Exceeded max retries.";
const EXHAUSTED_OBSERVATION: &str = "Step aborted after max attempts.";
/// 事件中 observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 单步执行结果，三种情况都带上已发生的全部尝试
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// judge 判定完成
    Done(Vec<Attempt>),
    /// R+1 轮都未完成，最后一条为哨兵尝试
    Exhausted(Vec<Attempt>),
    /// ACT 或 Oracle 致命错误
    Aborted {
        attempts: Vec<Attempt>,
        error: AgentError,
    },
}

impl StepOutcome {
    pub fn status(&self) -> StepStatus {
        match self {
            StepOutcome::Done(_) => StepStatus::Done,
            StepOutcome::Exhausted(_) => StepStatus::Failed,
            StepOutcome::Aborted { .. } => StepStatus::Aborted,
        }
    }

    pub fn attempts(&self) -> &[Attempt] {
        match self {
            StepOutcome::Done(a) | StepOutcome::Exhausted(a) => a,
            StepOutcome::Aborted { attempts, .. } => attempts,
        }
    }
}

pub struct StepExecutor<'a> {
    oracle: &'a dyn Oracle,
    executor: &'a CapabilityExecutor,
    summarizer: &'a Summarizer,
    max_retries: usize,
    recent_window: usize,
    event_tx: Option<&'a UnboundedSender<RunEvent>>,
}

impl<'a> StepExecutor<'a> {
    pub fn new(
        oracle: &'a dyn Oracle,
        executor: &'a CapabilityExecutor,
        summarizer: &'a Summarizer,
    ) -> Self {
        let engine = EngineSection::default();
        Self {
            oracle,
            executor,
            summarizer,
            max_retries: engine.max_retries,
            recent_window: engine.recent_window,
            event_tx: None,
        }
    }

    /// 使用 [engine] 段的 max_retries / recent_window
    pub fn with_engine_config(mut self, engine: &EngineSection) -> Self {
        self.max_retries = engine.max_retries;
        self.recent_window = engine.recent_window;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_event_tx(mut self, tx: Option<&'a UnboundedSender<RunEvent>>) -> Self {
        self.event_tx = tx;
        self
    }

    pub async fn execute(&self, goal: &str, step: &str, scratchpad: &mut Scratchpad) -> StepOutcome {
        let tools = self.executor.tool_names();
        let mut attempts: Vec<Attempt> = Vec::new();

        for attempt_no in 1..=self.max_retries + 1 {
            tracing::debug!(step = %step, attempt = attempt_no, "step attempt");

            let decision = match self.think(goal, step, scratchpad, &attempts, &tools).await {
                Ok(d) => d,
                Err(error) => return StepOutcome::Aborted { attempts, error },
            };
            send_event(
                self.event_tx,
                RunEvent::Thought {
                    attempt: attempt_no,
                    text: decision.thought.clone(),
                },
            );

            let call = decision.tool_call().cloned();
            let Decision { thought, .. } = decision;
            let attempt = match call {
                None => Attempt::reflect(thought),
                Some(call) => match self.act(&call, scratchpad).await {
                    Ok(observation) => Attempt {
                        thought,
                        action: AttemptAction::Tool(call),
                        observation,
                    },
                    Err(error) => {
                        tracing::warn!(step = %step, tool = %call.tool, error = %error, "step aborted");
                        attempts.push(Attempt {
                            thought,
                            observation: format!("Error: {}", error),
                            action: AttemptAction::Tool(call),
                        });
                        return StepOutcome::Aborted { attempts, error };
                    }
                },
            };
            attempts.push(attempt);

            match self.judge(step, &attempts).await {
                Ok(done) => {
                    send_event(self.event_tx, RunEvent::Judged { attempt: attempt_no, done });
                    if done {
                        return StepOutcome::Done(attempts);
                    }
                }
                Err(error) => return StepOutcome::Aborted { attempts, error },
            }
        }

        tracing::warn!(step = %step, max_retries = self.max_retries, "step not completed, giving up");
        attempts.push(Attempt {
            thought: EXHAUSTED_THOUGHT.to_string(),
            action: AttemptAction::None,
            observation: EXHAUSTED_OBSERVATION.to_string(),
        });
        StepOutcome::Exhausted(attempts)
    }

    fn recent<'b>(&self, attempts: &'b [Attempt]) -> &'b [Attempt] {
        &attempts[attempts.len().saturating_sub(self.recent_window)..]
    }

    async fn think(
        &self,
        goal: &str,
        step: &str,
        scratchpad: &Scratchpad,
        attempts: &[Attempt],
        tools: &[String],
    ) -> Result<Decision, AgentError> {
        let described = scratchpad.describe();
        let request = DecideRequest {
            goal,
            step,
            scratchpad: &described,
            recent_attempts: self.recent(attempts),
            tools,
        };
        match self.oracle.decide(request).await {
            Ok(decision) => Ok(decision),
            Err(e) if !e.is_fatal() => {
                tracing::warn!(error = %e, "unusable oracle decision, reflecting instead");
                Ok(Decision::reflect(ORACLE_ERROR_THOUGHT))
            }
            Err(e) => Err(e),
        }
    }

    /// 执行能力调用并返回 observation；Scratchpad 只在调用成功后写入
    async fn act(&self, call: &ToolCall, scratchpad: &mut Scratchpad) -> Result<String, AgentError> {
        if !self.executor.contains(&call.tool) {
            return Err(AgentError::Configuration(format!(
                "Unknown tool: {}",
                call.tool
            )));
        }
        let output_var = call
            .output_var
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AgentError::Configuration(format!(
                    "Tool '{}' must specify 'output_var' to store results.",
                    call.tool
                ))
            })?;
        if output_var == LAST_OUTPUT_KEY {
            return Err(AgentError::Configuration(format!(
                "'{}' is reserved and cannot be used as output_var",
                LAST_OUTPUT_KEY
            )));
        }

        send_event(
            self.event_tx,
            RunEvent::ToolCall {
                tool: call.tool.clone(),
                call: call.to_string(),
            },
        );
        let args = ArgumentResolver::new(scratchpad).resolve(&call.arguments)?;
        let value = self.executor.invoke(&call.tool, args).await?;
        let observation = self.summarizer.summarize(&value);
        scratchpad.set_output(output_var, value);

        send_event(
            self.event_tx,
            RunEvent::Observation {
                tool: call.tool.clone(),
                preview: truncate_chars(&observation, OBSERVATION_PREVIEW_CHARS),
            },
        );
        Ok(observation)
    }

    /// 决策类 Oracle 错误按「未完成」处理
    async fn judge(&self, step: &str, attempts: &[Attempt]) -> Result<bool, AgentError> {
        match self.oracle.judge(step, self.recent(attempts)).await {
            Ok(done) => Ok(done),
            Err(e) if !e.is_fatal() => {
                tracing::warn!(error = %e, "judge failed, treating step as not complete");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
