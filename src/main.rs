//! Forager 命令行入口
//!
//! 用法：`forager [--config FILE] [--plan FILE] [--json] [--eval] <goal...>`
//! 未给出 --plan 时由 LLM 生成计划；进度事件输出到 stderr，回答（或 --json 时的完整报告）输出到 stdout。
//! --eval 在运行结束后由 LLM 为计划与回答打分。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use forager::config::load_config;
use forager::eval::Evaluator;
use forager::llm::{create_llm_from_config, LlmOracle};
use forager::react::{Plan, PlanRunner, RunEvent};
use forager::summary::Summarizer;
use forager::tools::{builtin_registry, CapabilityExecutor};
use tokio::sync::mpsc;

const USAGE: &str = "usage: forager [--config FILE] [--plan FILE] [--json] [--eval] <goal...>";

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    plan: Option<PathBuf>,
    json: bool,
    eval: bool,
    goal: String,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut goal_words = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => cli.config = Some(args.next().context(USAGE)?.into()),
            "--plan" => cli.plan = Some(args.next().context(USAGE)?.into()),
            "--json" => cli.json = true,
            "--eval" => cli.eval = true,
            "-h" | "--help" => bail!(USAGE),
            _ => goal_words.push(arg),
        }
    }
    cli.goal = goal_words.join(" ");
    if cli.goal.trim().is_empty() {
        bail!(USAGE);
    }
    Ok(cli)
}

/// 计划文件：优先解析 `## Final Plan`，否则每个非空行一步
async fn read_plan(path: &PathBuf) -> anyhow::Result<Plan> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    let plan = Plan::parse_markdown(&text);
    Ok(if plan.is_empty() { Plan::from_lines(&text) } else { plan })
}

fn print_event(ev: &RunEvent) {
    match ev {
        RunEvent::StepStarted { index, total, step } => eprintln!("[{}/{}] {}", index, total, step),
        RunEvent::Thought { attempt, text } => eprintln!("  #{} thought: {}", attempt, text),
        RunEvent::ToolCall { call, .. } => eprintln!("  action: {}", call),
        RunEvent::Observation { preview, .. } => eprintln!("  observation: {}", preview),
        RunEvent::Judged { done, .. } => eprintln!("  done: {}", done),
        RunEvent::StepFinished { status, attempts, .. } => {
            eprintln!("  -> {} after {} attempt(s)", status, attempts)
        }
        RunEvent::RunHalted { index, reason } => eprintln!("halted at step {}: {}", index, reason),
        RunEvent::FinalContext { chars } => eprintln!("final context: {} chars", chars),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    forager::observability::init();

    let args = parse_args(std::env::args().skip(1))?;
    let cfg = load_config(args.config.clone()).context("Failed to load config")?;

    let workspace = cfg
        .app
        .workspace_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("workspace"));
    let _ = std::fs::create_dir_all(&workspace);

    let executor = Arc::new(
        CapabilityExecutor::new(builtin_registry(&workspace)).context("Invalid capability registry")?,
    );
    let llm = create_llm_from_config(&cfg.llm);
    let oracle = Arc::new(LlmOracle::new(llm.clone(), executor.catalog()));

    let plan = match &args.plan {
        Some(path) => read_plan(path).await?,
        None => oracle
            .create_plan(&args.goal, None)
            .await
            .context("Failed to create plan")?,
    };
    if plan.is_empty() {
        bail!("Plan has no steps");
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            print_event(&ev);
        }
    });

    let runner = PlanRunner::new(oracle.clone(), oracle.clone(), executor)
        .with_engine_config(cfg.engine.clone())
        .with_summarizer(Summarizer::from_config(&cfg.summary))
        .with_event_tx(event_tx);
    let report = runner.run(&args.goal, &plan).await;
    drop(runner);
    let _ = printer.await;

    let (prompt_tokens, completion_tokens, _) = oracle.token_usage();
    tracing::info!(prompt_tokens, completion_tokens, "token usage");

    let evaluation = if args.eval {
        Some(Evaluator::new(llm).evaluate(&report).await.context("Failed to evaluate the run")?)
    } else {
        None
    };

    if args.json {
        let mut out = serde_json::to_value(&report)?;
        if let Some(evaluation) = &evaluation {
            out["evaluation"] = serde_json::to_value(evaluation)?;
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", report.answer.as_deref().unwrap_or("(no answer)"));
        if let Some(e) = &evaluation {
            eprintln!(
                "plan: conciseness {} feasibility {} effectiveness {} ({})",
                e.plan.conciseness, e.plan.feasibility, e.plan.effectiveness, e.plan.rationale
            );
            if let Some(r) = &e.response {
                eprintln!("answer: helpfulness {} ({})", r.helpfulness, r.rationale);
            }
        }
    }
    if let Some(error) = &report.answer_error {
        eprintln!("answer generation failed: {}", error);
    }

    if !report.outcome.is_completed() || report.answer_error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}
