//! 计划运行集成测试：脚本化 Oracle 驱动 PlanRunner 端到端执行

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use forager::config::EngineSection;
use forager::core::AgentError;
use forager::eval::Evaluator;
use forager::llm::{LlmOracle, MockLlmClient};
use forager::memory::{Attempt, AttemptAction, StepStatus};
use forager::react::{AnswerGenerator, DecideRequest, Decision, Oracle, Plan, PlanRunner, RunOutcome};
use forager::tools::{
    builtin_registry, Capability, CapabilityExecutor, CapabilityRegistry, EchoCapability,
    LoadJsonCapability, ResolvedArgs, ToolCall, OUTPUT_VAR_ARG,
};
use forager::value::Value;

/// 按步骤描述给出固定决策；judge 在最后一次尝试调用了能力时判定完成
#[derive(Default)]
struct ScriptedOracle {
    decisions: HashMap<String, Decision>,
    never_done: bool,
    decide_calls: AtomicUsize,
}

impl ScriptedOracle {
    fn with(mut self, step: &str, decision: Decision) -> Self {
        self.decisions.insert(step.to_string(), decision);
        self
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn decide(&self, request: DecideRequest<'_>) -> Result<Decision, AgentError> {
        self.decide_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .decisions
            .get(request.step)
            .cloned()
            .unwrap_or_else(|| Decision::reflect("nothing to do")))
    }

    async fn judge(&self, _step: &str, recent: &[Attempt]) -> Result<bool, AgentError> {
        if self.never_done {
            return Ok(false);
        }
        Ok(matches!(
            recent.last().map(|a| &a.action),
            Some(AttemptAction::Tool(_))
        ))
    }
}

/// 记录收到的最终上下文
#[derive(Default)]
struct RecordingAnswerer {
    contexts: Mutex<Vec<String>>,
}

#[async_trait]
impl AnswerGenerator for RecordingAnswerer {
    async fn generate(&self, context: &str) -> Result<String, AgentError> {
        self.contexts.lock().unwrap().push(context.to_string());
        Ok("final answer".to_string())
    }
}

/// row_count：返回被引用表格的行数
struct RowCount;

#[async_trait]
impl Capability for RowCount {
    fn name(&self) -> &str {
        "row_count"
    }

    fn description(&self) -> &str {
        "Count rows of a table variable"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "data_var": {"type": "string"},
                OUTPUT_VAR_ARG: {"type": "string"}
            },
            "required": ["data_var", OUTPUT_VAR_ARG]
        })
    }

    async fn invoke(&self, args: ResolvedArgs) -> Result<Value, String> {
        let table = args
            .require("data")?
            .as_table()
            .ok_or_else(|| "data must be a table".to_string())?;
        Ok(Value::integer(table.n_rows() as i64))
    }
}

fn echo_step(text: &str, var: &str) -> Decision {
    Decision::call(
        format!("store {}", text),
        ToolCall::new("echo").literal("text", text).output_var(var),
    )
}

fn echo_executor() -> Arc<CapabilityExecutor> {
    let mut registry = CapabilityRegistry::new();
    registry.register(EchoCapability);
    Arc::new(CapabilityExecutor::new(registry).unwrap())
}

#[tokio::test]
async fn test_fetch_then_summarize_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("orders.json"),
        r#"[{"order_id": "a", "price": 10.5}, {"order_id": "b", "price": 3}, {"order_id": "c", "price": null}]"#,
    )
    .unwrap();

    let mut registry = CapabilityRegistry::new();
    registry.register(LoadJsonCapability::new(dir.path()));
    registry.register(RowCount);
    let executor = Arc::new(CapabilityExecutor::new(registry).unwrap());

    let step1 = "fetch data into variable d";
    let step2 = "compute summary of d into variable s";
    let raw_args = serde_json::json!({"data_var": "d", "output_var": "s"});
    let oracle = Arc::new(
        ScriptedOracle::default()
            .with(
                step1,
                Decision::call(
                    "load the orders",
                    ToolCall::new("load_json").literal("path", "orders.json").output_var("d"),
                ),
            )
            .with(
                step2,
                Decision::call(
                    "count the rows",
                    ToolCall::from_raw_args("row_count", raw_args.as_object().unwrap()).unwrap(),
                ),
            ),
    );
    let answerer = Arc::new(RecordingAnswerer::default());

    let report = PlanRunner::new(oracle, answerer.clone(), executor)
        .run("How many orders are there?", &Plan::new([step1, step2]))
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.answer.as_deref(), Some("final answer"));
    assert!(report.answer_error.is_none());
    assert_eq!(report.plan.steps(), &[step1.to_string(), step2.to_string()]);

    let entries = report.history.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].step, step1);
    assert_eq!(entries[1].step, step2);
    assert!(entries.iter().all(|e| e.status == StepStatus::Done));
    assert!(entries[0].attempts[0].observation.starts_with("<Table: 3 rows × 2 cols>"));

    assert!(report.scratchpad.get("d").and_then(Value::as_table).is_some());
    assert_eq!(report.scratchpad.get("s"), Some(&Value::integer(3)));
    assert_eq!(report.scratchpad.last_output(), Some("s"));

    let context = &answerer.contexts.lock().unwrap()[0];
    assert_eq!(context, &report.context);
    assert!(context.contains(&format!("Step 1: {}", step1)));
    assert!(context.contains(&format!("Step 2: {}", step2)));
    assert!(context.contains("Thought: load the orders"));
    assert!(context.contains("Action: row_count(data=$d, output_var=s)"));
    assert!(context.contains("Here is the final result from `s`:\n\n3"));
    assert!(context.ends_with("answer the following: How many orders are there?"));
}

#[tokio::test]
async fn test_history_follows_plan_order() {
    let steps = ["first", "second", "third", "fourth"];
    let oracle = steps.iter().enumerate().fold(ScriptedOracle::default(), |o, (i, s)| {
        o.with(s, echo_step(s, &format!("v{}", i)))
    });

    let report = PlanRunner::new(
        Arc::new(oracle),
        Arc::new(RecordingAnswerer::default()),
        echo_executor(),
    )
    .run("goal", &Plan::new(steps))
    .await;

    let logged: Vec<&str> = report.history.entries().iter().map(|e| e.step.as_str()).collect();
    assert_eq!(logged, steps);
    assert!(report.history.entries().iter().all(|e| e.attempts.len() == 1));
    assert_eq!(report.scratchpad.last_output(), Some("v3"));
}

#[tokio::test]
async fn test_exhausted_step_halts_remaining_steps() {
    let oracle = Arc::new(ScriptedOracle {
        never_done: true,
        ..Default::default()
    });
    let engine = EngineSection {
        max_retries: 1,
        ..Default::default()
    };

    let report = PlanRunner::new(
        oracle.clone(),
        Arc::new(RecordingAnswerer::default()),
        echo_executor(),
    )
    .with_engine_config(engine)
    .run("goal", &Plan::new(["stuck step", "never reached"]))
    .await;

    assert_eq!(
        report.outcome,
        RunOutcome::Halted {
            step_index: 0,
            error: AgentError::RetryExhausted {
                step: "stuck step".into(),
                attempts: 2
            }
        }
    );
    assert_eq!(oracle.decide_calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.history.len(), 1);
    let record = &report.history.entries()[0];
    assert_eq!(record.status, StepStatus::Failed);
    assert_eq!(record.attempts.len(), 3);
    assert_eq!(record.attempts[2].thought, "Exceeded max retries.");
    assert!(report.answer.is_some());
    assert!(report.context.contains("Execution halted at step 1"));
}

#[tokio::test]
async fn test_no_answer_on_failure_when_disabled() {
    let oracle = Arc::new(ScriptedOracle {
        never_done: true,
        ..Default::default()
    });
    let answerer = Arc::new(RecordingAnswerer::default());
    let engine = EngineSection {
        max_retries: 0,
        answer_on_failure: false,
        ..Default::default()
    };

    let report = PlanRunner::new(oracle, answerer.clone(), echo_executor())
        .with_engine_config(engine)
        .run("goal", &Plan::new(["stuck"]))
        .await;

    assert!(!report.outcome.is_completed());
    assert!(report.answer.is_none());
    assert!(answerer.contexts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_reference_error_keeps_partial_history() {
    let oracle = ScriptedOracle::default()
        .with("load", echo_step("hello", "greeting"))
        .with(
            "use missing",
            Decision::call(
                "use it",
                ToolCall::new("echo").reference("text", "nope").output_var("out"),
            ),
        );

    let report = PlanRunner::new(
        Arc::new(oracle),
        Arc::new(RecordingAnswerer::default()),
        echo_executor(),
    )
    .run("goal", &Plan::new(["load", "use missing", "after"]))
    .await;

    let RunOutcome::Halted { step_index, error } = &report.outcome else {
        panic!("expected halt");
    };
    assert_eq!(*step_index, 1);
    assert!(matches!(error, AgentError::Reference { name, .. } if name == "nope"));
    assert_eq!(report.history.len(), 2);
    assert_eq!(report.history.entries()[1].status, StepStatus::Aborted);
    assert!(!report.scratchpad.contains("out"));
    assert_eq!(report.scratchpad.last_output(), Some("greeting"));
}

/// 回答生成总是失败
struct FailingAnswerer;

#[async_trait]
impl AnswerGenerator for FailingAnswerer {
    async fn generate(&self, _context: &str) -> Result<String, AgentError> {
        Err(AgentError::Llm("timeout".into()))
    }
}

#[tokio::test]
async fn test_answer_failure_keeps_report() {
    let oracle = ScriptedOracle::default()
        .with("one", echo_step("a", "x"))
        .with("two", echo_step("b", "y"));

    let report = PlanRunner::new(Arc::new(oracle), Arc::new(FailingAnswerer), echo_executor())
        .run("goal", &Plan::new(["one", "two"]))
        .await;

    assert!(report.outcome.is_completed());
    assert!(report.answer.is_none());
    assert_eq!(report.answer_error.as_deref(), Some("LLM error: timeout"));
    assert_eq!(report.history.len(), 2);
    assert_eq!(report.scratchpad.get("y"), Some(&Value::text("b")));
    assert!(report.context.contains("Step 2: two"));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["answer_error"], "LLM error: timeout");
    assert_eq!(json["plan"]["steps"][1], "two");
}

#[tokio::test]
async fn test_mock_llm_plans_and_runs_offline() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(CapabilityExecutor::new(builtin_registry(dir.path())).unwrap());
    let llm = Arc::new(MockLlmClient::new());
    let oracle = Arc::new(LlmOracle::new(llm.clone(), executor.catalog()));

    let plan = oracle.create_plan("Which region sells most?", None).await.unwrap();
    assert_eq!(plan.len(), 2);

    let report = PlanRunner::new(oracle.clone(), oracle, executor)
        .run("Which region sells most?", &plan)
        .await;

    assert!(report.outcome.is_completed());
    assert_eq!(report.scratchpad.last_output(), Some("note"));
    assert_eq!(
        report.answer.as_deref(),
        Some("Mock answer for: Which region sells most?")
    );

    let evaluation = Evaluator::new(llm).evaluate(&report).await.unwrap();
    assert_eq!(evaluation.plan.feasibility, 4);
    assert_eq!(evaluation.response.map(|r| r.helpfulness), Some(4));
}
