//! 计划执行过程事件：用于 CLI / 前端实时展示步骤进度、思考、工具调用与观察

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// 开始执行第 index 步（从 1 计）
    StepStarted { index: usize, total: usize, step: String },
    /// Oracle 给出的思考
    Thought { attempt: usize, text: String },
    /// 调用能力
    ToolCall { tool: String, call: String },
    /// 能力结果摘要
    Observation { tool: String, preview: String },
    /// 完成判定
    Judged { attempt: usize, done: bool },
    /// 步骤结束（done / failed / aborted）
    StepFinished { index: usize, status: String, attempts: usize },
    /// 运行中止
    RunHalted { index: usize, reason: String },
    /// 最终上下文已生成
    FinalContext { chars: usize },
}

pub(crate) fn send_event(tx: Option<&UnboundedSender<RunEvent>>, ev: RunEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}
