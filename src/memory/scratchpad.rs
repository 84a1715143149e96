//! Scratchpad：步骤之间共享的变量表
//!
//! 名称 → 值，后写覆盖（无版本）；保留键 `_last_output_var` 记录最近一次能力输出的变量名，
//! 供最终上下文渲染。只有当前执行的步骤会写入，顺序执行保证单写者，无需加锁。

use std::collections::BTreeMap;

use serde::Serialize;

use crate::summary::Summarizer;
use crate::value::Value;

/// 保留键：最近一次能力输出的变量名
pub const LAST_OUTPUT_KEY: &str = "_last_output_var";

#[derive(Debug, Clone, Default, Serialize)]
pub struct Scratchpad {
    vars: BTreeMap<String, Value>,
    #[serde(skip)]
    summarizer: Summarizer,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// 写入变量（覆盖同名旧值）
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(old) = self.vars.get(&name) {
            tracing::debug!(var = %name, old_shape = old.shape(), "overwriting scratchpad variable");
        }
        self.vars.insert(name, value);
    }

    /// 写入能力输出，并把保留键指向该变量
    pub fn set_output(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.set(name.clone(), value);
        self.vars.insert(LAST_OUTPUT_KEY.to_string(), Value::text(name));
    }

    /// 不存在时返回 None
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// 最近一次能力输出的变量名
    pub fn last_output(&self) -> Option<&str> {
        self.vars.get(LAST_OUTPUT_KEY).and_then(Value::as_str)
    }

    /// 最近一次能力输出的变量名与值
    pub fn last_output_value(&self) -> Option<(&str, &Value)> {
        let name = self.last_output()?;
        self.vars.get(name).map(|v| (name, v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// 每个变量的有界摘要（按名称排序，确定且无副作用）
    pub fn describe(&self) -> BTreeMap<String, String> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), self.summarizer.summarize(v)))
            .collect()
    }

    /// describe() 拼成 prompt 段落：每行 "name: summary"
    pub fn describe_text(&self) -> String {
        self.describe()
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Opaque, Scalar, Table};

    #[test]
    fn test_set_get_overwrite() {
        let mut pad = Scratchpad::new();
        assert!(pad.get("a").is_none());
        pad.set("a", Value::integer(1));
        pad.set("a", Value::integer(2));
        assert_eq!(pad.get("a"), Some(&Value::integer(2)));
        assert!(pad.contains("a"));
        assert!(!pad.contains("b"));
        assert_eq!(pad.last_output(), None);
    }

    #[test]
    fn test_set_output_tracks_last_output() {
        let mut pad = Scratchpad::new();
        pad.set_output("d", Value::integer(1));
        pad.set_output("s", Value::text("done"));
        assert_eq!(pad.last_output(), Some("s"));
        let (name, value) = pad.last_output_value().unwrap();
        assert_eq!(name, "s");
        assert_eq!(value.as_str(), Some("done"));
        assert!(pad.contains("d"));
    }

    #[test]
    fn test_describe_is_deterministic_for_all_shapes() {
        let mut pad = Scratchpad::new();
        pad.set(
            "t",
            Value::Table(Table::new(vec!["x".into()], vec![vec![Scalar::Integer(1)]]).unwrap()),
        );
        pad.set("l", Value::List(vec![Value::integer(1)]));
        pad.set("m", Value::Map(Default::default()));
        pad.set("s", Value::float(2.5));
        pad.set("o", Value::Opaque(Opaque::new("Model", "GradientBoosting")));

        let first = pad.describe();
        let second = pad.describe();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        assert_eq!(first["s"], "2.5");
        assert_eq!(first["o"], "<Model>: GradientBoosting");
        assert_eq!(
            pad.describe_text().lines().next(),
            Some("l: <list with 1 items>")
        );
    }
}
