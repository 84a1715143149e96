//! Scratchpad 中的值：五种形态（表格 / 序列 / 映射 / 标量 / 不透明）
//!
//! 能力返回任意形态的值，Summarizer 按形态渲染有界摘要；
//! 从 serde_json::Value 转换时，元素全为对象的数组会被识别为表格。

pub mod table;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use table::{Column, ColumnType, Table};

/// 标量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 表格单元格的裸文本（不加引号）
    pub fn to_cell_string(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// 字面量表示：文本加单引号，空值为 None
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("None"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{:?}", x),
            Scalar::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// 不透明值：只知道类型名与字符串形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opaque {
    pub type_name: String,
    pub repr: String,
}

impl Opaque {
    pub fn new(type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            repr: repr.into(),
        }
    }
}

/// Scratchpad 变量值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "value", rename_all = "snake_case")]
pub enum Value {
    Table(Table),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Scalar(Scalar),
    Opaque(Opaque),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Scalar(Scalar::Text(s.into()))
    }

    pub fn integer(i: i64) -> Self {
        Value::Scalar(Scalar::Integer(i))
    }

    pub fn float(f: f64) -> Self {
        Value::Scalar(Scalar::Float(f))
    }

    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    /// 形态名（用于日志与事件）
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Table(_) => "table",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Scalar(_) => "scalar",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => s.as_str(),
            _ => None,
        }
    }

    /// 紧凑字面量表示，写满 budget 个字节后停止（避免对超大值做全量格式化）
    pub fn write_repr(&self, out: &mut String, budget: usize) {
        if out.len() >= budget {
            return;
        }
        match self {
            Value::Scalar(s) => out.push_str(&s.to_string()),
            Value::Opaque(o) => {
                out.push('<');
                out.push_str(&o.type_name);
                out.push('>');
            }
            Value::Table(t) => {
                out.push_str(&format!("<table {}x{}>", t.n_rows(), t.n_cols()));
            }
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if out.len() >= budget {
                        out.push_str("...");
                        break;
                    }
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, budget);
                }
                out.push(']');
            }
            Value::Map(map) => {
                out.push('{');
                for (i, (k, v)) in map.iter().enumerate() {
                    if out.len() >= budget {
                        out.push_str("...");
                        break;
                    }
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&format!("'{}': ", k));
                    v.write_repr(out, budget);
                }
                out.push('}');
            }
        }
    }

    pub fn repr(&self, budget: usize) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, budget);
        out
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Array(items) => {
                let is_records =
                    !items.is_empty() && items.iter().all(|item| item.is_object());
                if is_records {
                    if let Some(table) = records_to_table(&items) {
                        return Value::Table(table);
                    }
                }
                Value::List(items.into_iter().map(Value::from).collect())
            }
            Json::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            other => Value::Scalar(json_scalar(&other)),
        }
    }
}

fn json_scalar(json: &serde_json::Value) -> Scalar {
    use serde_json::Value as Json;
    match json {
        Json::Null => Scalar::Null,
        Json::Bool(b) => Scalar::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Scalar::Integer(i),
            None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Scalar::Text(s.clone()),
        // 嵌套结构进表格单元格时退化为 JSON 文本
        nested => Scalar::Text(nested.to_string()),
    }
}

/// 对象数组 → 表格；列按首次出现顺序排列，缺失字段记为 Null
fn records_to_table(records: &[serde_json::Value]) -> Option<Table> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for key in record.as_object()?.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }
    let columns = names
        .into_iter()
        .map(|name| {
            let cells = records
                .iter()
                .map(|r| r.get(&name).map(json_scalar).unwrap_or(Scalar::Null))
                .collect();
            (name, cells)
        })
        .collect();
    Table::from_columns(columns).ok()
}
