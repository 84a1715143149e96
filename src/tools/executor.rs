//! 能力执行器
//!
//! 持有已校验的 CapabilityRegistry，invoke(call, args) 查表调用；
//! 未注册工具转为 Configuration，能力返回 Err 原样转为 ToolExecution；每次调用输出结构化审计日志（JSON）。
//! 超时由各能力自身负责，执行器不做取消。

use std::time::Instant;

use crate::core::AgentError;
use crate::tools::{CapabilityRegistry, CapabilitySpec, ResolvedArgs};
use crate::value::Value;

/// 审计日志中参数预览的最大字符数
const ARGS_PREVIEW_CHARS: usize = 200;

pub struct CapabilityExecutor {
    registry: CapabilityRegistry,
}

impl CapabilityExecutor {
    /// 校验注册表后构造；任何声明问题都在这里以 Configuration 失败
    pub fn new(registry: CapabilityRegistry) -> Result<Self, AgentError> {
        registry.validate()?;
        Ok(Self { registry })
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.registry.contains(tool)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn catalog(&self) -> Vec<CapabilitySpec> {
        self.registry.catalog()
    }

    pub async fn invoke(&self, tool: &str, args: ResolvedArgs) -> Result<Value, AgentError> {
        let capability = self.registry.get(tool).ok_or_else(|| {
            AgentError::Configuration(format!("Unknown tool: {}", tool))
        })?;
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = capability.invoke(args).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool,
            "ok": result.is_ok(),
            "shape": result.as_ref().map(Value::shape).unwrap_or("error"),
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result.map_err(|message| AgentError::ToolExecution {
            tool: tool.to_string(),
            message,
        })
    }
}

fn args_preview(args: &ResolvedArgs) -> String {
    let mut s = String::new();
    for (i, (k, v)) in args.iter().enumerate() {
        if s.len() >= ARGS_PREVIEW_CHARS {
            break;
        }
        if i > 0 {
            s.push_str(", ");
        }
        s.push_str(k);
        s.push('=');
        v.write_repr(&mut s, ARGS_PREVIEW_CHARS);
    }
    crate::summary::truncate_chars(&s, ARGS_PREVIEW_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Capability, EchoCapability};
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl Capability for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        async fn invoke(&self, _args: ResolvedArgs) -> Result<Value, String> {
            Err("warehouse unreachable".to_string())
        }
    }

    fn executor() -> CapabilityExecutor {
        let mut reg = CapabilityRegistry::new();
        reg.register(EchoCapability);
        reg.register(Failing);
        CapabilityExecutor::new(reg).unwrap()
    }

    #[tokio::test]
    async fn test_invoke_ok() {
        let args: ResolvedArgs =
            std::collections::BTreeMap::from([("text".to_string(), Value::text("hi"))]).into();
        let out = executor().invoke("echo", args).await.unwrap();
        assert_eq!(out, Value::text("hi"));
    }

    #[tokio::test]
    async fn test_failure_surfaces_verbatim() {
        let err = executor()
            .invoke("failing", ResolvedArgs::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AgentError::ToolExecution {
                tool: "failing".into(),
                message: "warehouse unreachable".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_configuration_error() {
        let err = executor()
            .invoke("nope", ResolvedArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }
}
