//! 运行期记忆：Scratchpad（变量表）与 ContextHistory（步骤日志）
//!
//! 两者都在一次计划运行开始时创建，随运行结束交还调用方检查，不做持久化。

pub mod history;
pub mod scratchpad;

pub use history::{Attempt, AttemptAction, ContextHistory, StepRecord, StepStatus};
pub use scratchpad::{Scratchpad, LAST_OUTPUT_KEY};
