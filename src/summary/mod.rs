//! Summarizer：按值形态渲染有界文本摘要
//!
//! 用于 Oracle prompt 中的 Scratchpad 描述、步骤 Observation 以及最终上下文。
//! 每种形态有固定规则，输出长度与输入规模无关（统一受 max_chars 截断）。

use crate::config::SummarySection;
use crate::value::{Opaque, Table, Value};

/// 超出上限时的截断标记
const ELLIPSIS: &str = "...";

/// 按字符截断（保证 UTF-8 边界），超出时追加 "..."
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &s[..idx], ELLIPSIS),
        None => s.to_string(),
    }
}

/// 值摘要器：持有形态渲染参数
#[derive(Debug, Clone)]
pub struct Summarizer {
    preview_items: usize,
    opaque_char_cap: usize,
    max_columns: usize,
    table_preview_rows: usize,
    max_chars: usize,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::from_config(&SummarySection::default())
    }
}

impl Summarizer {
    pub fn from_config(cfg: &SummarySection) -> Self {
        Self {
            preview_items: cfg.preview_items,
            opaque_char_cap: cfg.opaque_char_cap,
            max_columns: cfg.max_columns,
            table_preview_rows: cfg.table_preview_rows,
            max_chars: cfg.max_chars.max(ELLIPSIS.len() + 1),
        }
    }

    /// 设置表格摘要附带的预览行数（默认 0，不预览）
    pub fn with_table_preview_rows(mut self, rows: usize) -> Self {
        self.table_preview_rows = rows;
        self
    }

    /// 摘要字符上限
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn summarize(&self, value: &Value) -> String {
        let raw = match value {
            Value::Table(t) => self.summarize_table(t),
            Value::List(items) => self.summarize_list(items),
            Value::Map(map) => self.summarize_map(map),
            Value::Scalar(s) => truncate_chars(&s.to_string(), self.opaque_char_cap),
            Value::Opaque(o) => self.summarize_opaque(o),
        };
        truncate_chars(&raw, self.max_chars - ELLIPSIS.len())
    }

    fn summarize_table(&self, table: &Table) -> String {
        let mut summary = format!(
            "<Table: {} rows × {} cols>\nColumns: ",
            table.n_rows(),
            table.n_cols()
        );
        let listed: Vec<String> = table
            .columns()
            .iter()
            .take(self.max_columns)
            .map(|c| format!("{}({})", c.name, c.dtype))
            .collect();
        summary.push_str(&listed.join(", "));
        if table.n_cols() > self.max_columns {
            summary.push_str(&format!(", ... (+{} more)", table.n_cols() - self.max_columns));
        }
        if self.table_preview_rows > 0 && table.n_rows() > 0 {
            summary.push_str("\nPreview:\n");
            summary.push_str(&render_table_markdown(table, self.table_preview_rows));
        }
        let missing = table.columns_with_missing();
        if !missing.is_empty() {
            summary.push_str(&format!("\nNote: Missing values in {}", missing.join(", ")));
        }
        summary
    }

    fn summarize_list(&self, items: &[Value]) -> String {
        let mut summary = format!("<list with {} items>", items.len());
        if !items.is_empty() {
            summary.push_str("\nSample:");
            for item in items.iter().take(self.preview_items) {
                summary.push_str(&format!("\n- {}", self.sample_repr(item)));
            }
        }
        summary
    }

    fn summarize_map(&self, map: &std::collections::BTreeMap<String, Value>) -> String {
        let mut summary = format!("<dict with {} keys>", map.len());
        if !map.is_empty() {
            summary.push_str("\nSample:");
            for (k, v) in map.iter().take(self.preview_items) {
                summary.push_str(&format!("\n- {}: {}", k, self.sample_repr(v)));
            }
        }
        summary
    }

    fn summarize_opaque(&self, o: &Opaque) -> String {
        format!(
            "<{}>: {}",
            o.type_name,
            truncate_chars(&o.repr, self.opaque_char_cap)
        )
    }

    fn sample_repr(&self, value: &Value) -> String {
        truncate_chars(&value.repr(self.opaque_char_cap * 4), self.opaque_char_cap)
    }
}

/// 表格前 rows 行的 Markdown 预览（最终上下文使用）
pub fn render_table_markdown(table: &Table, rows: usize) -> String {
    let header: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    let mut out = format!("| {} |\n", header.join(" | "));
    out.push_str(&format!("|{}\n", "---|".repeat(header.len().max(1))));
    for row in table.head(rows) {
        let cells: Vec<String> = row
            .iter()
            .map(|c| c.to_cell_string().replace('|', "\\|"))
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out.trim_end().to_string()
}
