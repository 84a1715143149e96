//! 能力层：参数模型与解析、能力注册表、执行器、内置能力

pub mod arguments;
pub mod echo;
pub mod executor;
pub mod filesystem;
pub mod registry;
pub mod stats;

pub use arguments::{Argument, ArgumentResolver, ResolvedArgs, ToolCall, OUTPUT_VAR_ARG};
pub use echo::EchoCapability;
pub use executor::CapabilityExecutor;
pub use filesystem::{LoadJsonCapability, SafeFs};
pub use registry::{Capability, CapabilityRegistry, CapabilitySpec, REFLECT_TOOL};
pub use stats::ColumnStatsCapability;

use std::path::Path;

/// 注册全部内置能力（文件能力以 workspace 为根）
pub fn builtin_registry(workspace: impl AsRef<Path>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(EchoCapability);
    registry.register(LoadJsonCapability::new(workspace));
    registry.register(ColumnStatsCapability);
    registry
}
