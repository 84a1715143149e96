//! 能力注册表
//!
//! 所有能力实现 Capability trait（name / description / parameters_schema / invoke），
//! 由 CapabilityRegistry 按名注册；validate() 在启动时校验整张表，
//! 未注册的工具名在决策阶段即失败，而不是拖到调用时。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::core::AgentError;
use crate::tools::{ResolvedArgs, OUTPUT_VAR_ARG};
use crate::value::Value;

/// 不执行任何能力的伪工具名
pub const REFLECT_TOOL: &str = "reflect";

/// 能力 trait：名称、描述（供 Oracle 理解）、参数 schema、异步调用
#[async_trait]
pub trait Capability: Send + Sync {
    /// 能力名称（决策中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 能力描述
    fn description(&self) -> &str;

    /// 参数 JSON Schema；required 中必须包含 output_var
    fn parameters_schema(&self) -> Json {
        serde_json::json!({
            "type": "object",
            "properties": {
                OUTPUT_VAR_ARG: {
                    "type": "string",
                    "description": "Name of the variable to store the result"
                }
            },
            "required": [OUTPUT_VAR_ARG]
        })
    }

    /// 调用能力（参数已解析）
    async fn invoke(&self, args: ResolvedArgs) -> Result<Value, String>;
}

/// 能力目录条目：(name, description, schema)，供 Oracle prompt 使用
#[derive(Debug, Clone)]
pub struct CapabilitySpec {
    pub name: String,
    pub description: String,
    pub parameters: Json,
}

/// 能力注册表：按名称存储 Arc<dyn Capability>
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
    /// 重复注册的名称，validate 时报错
    duplicates: Vec<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: impl Capability + 'static) {
        let name = capability.name().to_string();
        if self.capabilities.contains_key(&name) {
            self.duplicates.push(name.clone());
        }
        self.capabilities.insert(name, Arc::new(capability));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// 已注册名称（排序，保证 prompt 稳定）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    /// 启动时校验：重复名、保留名 reflect、schema 未声明必需的 output_var
    pub fn validate(&self) -> Result<(), AgentError> {
        if let Some(dup) = self.duplicates.first() {
            return Err(AgentError::Configuration(format!(
                "capability '{}' registered more than once",
                dup
            )));
        }
        for name in self.names() {
            if name == REFLECT_TOOL {
                return Err(AgentError::Configuration(format!(
                    "'{}' is reserved for the no-op pseudo-tool",
                    REFLECT_TOOL
                )));
            }
            let schema = self.capabilities[&name].parameters_schema();
            let declares_output = schema
                .get("required")
                .and_then(Json::as_array)
                .map(|req| req.iter().any(|r| r.as_str() == Some(OUTPUT_VAR_ARG)))
                .unwrap_or(false);
            if !declares_output {
                return Err(AgentError::Configuration(format!(
                    "capability '{}' does not declare required '{}'",
                    name, OUTPUT_VAR_ARG
                )));
            }
        }
        Ok(())
    }

    /// 能力目录（按名称排序）
    pub fn catalog(&self) -> Vec<CapabilitySpec> {
        self.names()
            .into_iter()
            .map(|name| {
                let cap = &self.capabilities[&name];
                CapabilitySpec {
                    description: cap.description().to_string(),
                    parameters: cap.parameters_schema(),
                    name,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoCapability;

    struct NoOutput;

    #[async_trait]
    impl Capability for NoOutput {
        fn name(&self) -> &str {
            "no_output"
        }
        fn description(&self) -> &str {
            "forgets to declare output_var"
        }
        fn parameters_schema(&self) -> Json {
            serde_json::json!({"type": "object", "properties": {}, "required": []})
        }
        async fn invoke(&self, _args: ResolvedArgs) -> Result<Value, String> {
            Ok(Value::null())
        }
    }

    struct Named(&'static str);

    #[async_trait]
    impl Capability for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "named"
        }
        async fn invoke(&self, _args: ResolvedArgs) -> Result<Value, String> {
            Ok(Value::null())
        }
    }

    #[test]
    fn test_valid_registry() {
        let mut reg = CapabilityRegistry::new();
        reg.register(EchoCapability);
        reg.register(Named("b_tool"));
        assert!(reg.validate().is_ok());
        let names: Vec<_> = reg.catalog().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["b_tool".to_string(), "echo".to_string()]);
    }

    #[test]
    fn test_schema_without_output_var_rejected() {
        let mut reg = CapabilityRegistry::new();
        reg.register(NoOutput);
        assert!(matches!(reg.validate(), Err(AgentError::Configuration(_))));
    }

    #[test]
    fn test_reserved_and_duplicate_names_rejected() {
        let mut reg = CapabilityRegistry::new();
        reg.register(Named(REFLECT_TOOL));
        assert!(matches!(reg.validate(), Err(AgentError::Configuration(_))));

        let mut reg = CapabilityRegistry::new();
        reg.register(Named("x"));
        reg.register(Named("x"));
        let err = reg.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
