//! 参数模型与 ArgumentResolver
//!
//! 每个参数显式标注为 Literal / Reference / ReferenceList；解析时把引用替换成 Scratchpad 中的值，
//! 让后续步骤只凭变量名消费前面步骤的输出，而不必把大数据经 Oracle 重新序列化。
//!
//! LLM 输出的 `<key>_var` 后缀约定只在 [`ToolCall::from_raw_args`] 中转换为标注模型。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::memory::Scratchpad;
use crate::value::Value;

/// 声明输出变量名的参数键
pub const OUTPUT_VAR_ARG: &str = "output_var";
/// 原始参数中表示「变量引用」的键后缀
const REFERENCE_SUFFIX: &str = "_var";

/// 单个参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Argument {
    /// 字面量，原样传入能力
    Literal(Value),
    /// 引用一个 Scratchpad 变量
    Reference(String),
    /// 引用多个 Scratchpad 变量，解析为 name → value 子映射
    ReferenceList(Vec<String>),
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Literal(v) => f.write_str(&v.repr(120)),
            Argument::Reference(name) => write!(f, "${}", name),
            Argument::ReferenceList(names) => {
                let refs: Vec<String> = names.iter().map(|n| format!("${}", n)).collect();
                write!(f, "[{}]", refs.join(", "))
            }
        }
    }
}

/// Oracle 决定调用的能力：工具名、标注后的参数、声明的输出变量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub arguments: BTreeMap<String, Argument>,
    pub output_var: Option<String>,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            arguments: BTreeMap::new(),
            output_var: None,
        }
    }

    pub fn literal(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), Argument::Literal(value.into()));
        self
    }

    pub fn reference(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), Argument::Reference(name.into()));
        self
    }

    pub fn reference_list<I, S>(mut self, key: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.arguments.insert(key.into(), Argument::ReferenceList(names));
        self
    }

    pub fn output_var(mut self, name: impl Into<String>) -> Self {
        self.output_var = Some(name.into());
        self
    }

    /// 从 LLM 的原始 JSON 参数构造：
    /// - `output_var` → 输出变量名
    /// - `<key>_var: "a"` → `<key>` 引用 a
    /// - `<key>_var: "a,b"` 或 `["a", "b"]` → `<key>` 引用列表
    /// - 其它 → 字面量
    ///
    /// `_var` 键的值不是字符串 / 字符串数组时返回 Configuration，拆分后出现空变量名时返回 Reference；
    /// `x` 与 `x_var` 同时出现视为冲突（Configuration）。
    pub fn from_raw_args(
        tool: impl Into<String>,
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, AgentError> {
        let mut call = ToolCall::new(tool);
        for (key, value) in raw {
            if key == OUTPUT_VAR_ARG {
                call.output_var = value
                    .as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from);
                continue;
            }
            let (target, argument) = match key.strip_suffix(REFERENCE_SUFFIX).filter(|t| !t.is_empty()) {
                Some(target) => (target, reference_argument(&call.tool, key, target, value)?),
                None => (key.as_str(), Argument::Literal(Value::from(value.clone()))),
            };
            if call.arguments.contains_key(target) {
                return Err(AgentError::Configuration(format!(
                    "Tool '{}' got argument '{}' both as a literal and as a reference",
                    call.tool, target
                )));
            }
            call.arguments.insert(target.to_string(), argument);
        }
        Ok(call)
    }
}

/// `<target>_var` 的值：单个变量名、逗号分隔的名字或名字数组
fn reference_argument(
    tool: &str,
    key: &str,
    target: &str,
    value: &serde_json::Value,
) -> Result<Argument, AgentError> {
    let names: Vec<&str> = match value {
        serde_json::Value::String(s) if s.contains(',') => s.split(',').map(str::trim).collect(),
        serde_json::Value::String(s) => {
            let name = s.trim();
            check_name(target, name)?;
            return Ok(Argument::Reference(name.to_string()));
        }
        serde_json::Value::Array(items) => items
            .iter()
            .map(|i| i.as_str().map(str::trim))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| non_reference(tool, key, value))?,
        _ => return Err(non_reference(tool, key, value)),
    };
    if names.is_empty() {
        check_name(target, "")?;
    }
    for name in &names {
        check_name(target, name)?;
    }
    Ok(Argument::ReferenceList(names.into_iter().map(String::from).collect()))
}

fn check_name(target: &str, name: &str) -> Result<(), AgentError> {
    if name.is_empty() {
        return Err(AgentError::Reference {
            name: String::new(),
            argument: target.to_string(),
        });
    }
    Ok(())
}

fn non_reference(tool: &str, key: &str, value: &serde_json::Value) -> AgentError {
    AgentError::Configuration(format!(
        "Tool '{}' argument '{}' must name scratchpad variables, got {}",
        tool, key, value
    ))
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .arguments
            .iter()
            .map(|(k, a)| format!("{}={}", k, a))
            .collect();
        if let Some(out) = &self.output_var {
            parts.push(format!("{}={}", OUTPUT_VAR_ARG, out));
        }
        write!(f, "{}({})", self.tool, parts.join(", "))
    }
}

/// 解析完成、可直接交给能力的参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedArgs(BTreeMap<String, Value>);

impl ResolvedArgs {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// 必需参数，缺失时返回给能力调用方的错误文本
    pub fn require(&self, key: &str) -> Result<&Value, String> {
        self.0
            .get(key)
            .ok_or_else(|| format!("missing required argument '{}'", key))
    }

    pub fn require_str(&self, key: &str) -> Result<&str, String> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| format!("argument '{}' must be text", key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for ResolvedArgs {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

/// 按 Scratchpad 解析参数；只读，任何引用缺失都整体失败
pub struct ArgumentResolver<'a> {
    scratchpad: &'a Scratchpad,
}

impl<'a> ArgumentResolver<'a> {
    pub fn new(scratchpad: &'a Scratchpad) -> Self {
        Self { scratchpad }
    }

    pub fn resolve(
        &self,
        arguments: &BTreeMap<String, Argument>,
    ) -> Result<ResolvedArgs, AgentError> {
        let mut resolved = BTreeMap::new();
        for (key, argument) in arguments {
            let value = match argument {
                Argument::Literal(v) => v.clone(),
                Argument::Reference(name) => self.lookup(key, name)?.clone(),
                Argument::ReferenceList(names) => {
                    let mut sub = BTreeMap::new();
                    for name in names {
                        sub.insert(name.clone(), self.lookup(key, name)?.clone());
                    }
                    Value::Map(sub)
                }
            };
            resolved.insert(key.clone(), value);
        }
        Ok(ResolvedArgs(resolved))
    }

    fn lookup(&self, argument: &str, name: &str) -> Result<&'a Value, AgentError> {
        self.scratchpad.get(name).ok_or_else(|| AgentError::Reference {
            name: name.to_string(),
            argument: argument.to_string(),
        })
    }
}
