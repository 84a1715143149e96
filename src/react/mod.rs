//! 执行层：Plan、Oracle 接口、单步重试状态机（StepExecutor）与计划运行器（PlanRunner）

pub mod events;
pub mod oracle;
pub mod plan;
pub mod runner;
pub mod step;

pub use events::RunEvent;
pub use oracle::{AnswerGenerator, DecideRequest, Decision, Oracle, ORACLE_ERROR_THOUGHT};
pub use plan::Plan;
pub use runner::{PlanRunner, RunOutcome, RunReport};
pub use step::{StepExecutor, StepOutcome};
