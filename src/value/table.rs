//! 表格值：列式存储，列名 + 推断的列类型 + 单元格（Scalar）

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::value::Scalar;

/// 列类型（由非空单元格推断）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Bool,
    Text,
    /// 多种类型混合
    Mixed,
    /// 全部为空
    Null,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "int",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Text => "text",
            ColumnType::Mixed => "mixed",
            ColumnType::Null => "null",
        }
    }

    fn of(cell: &Scalar) -> Self {
        match cell {
            Scalar::Null => ColumnType::Null,
            Scalar::Bool(_) => ColumnType::Bool,
            Scalar::Integer(_) => ColumnType::Integer,
            Scalar::Float(_) => ColumnType::Float,
            Scalar::Text(_) => ColumnType::Text,
        }
    }

    fn merge(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (Null, t) | (t, Null) => t,
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Mixed,
        }
    }

    fn infer(cells: &[Scalar]) -> ColumnType {
        cells
            .iter()
            .fold(ColumnType::Null, |acc, c| acc.merge(ColumnType::of(c)))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单列：名称、类型与全部单元格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    cells: Vec<Scalar>,
}

impl Column {
    pub fn cells(&self) -> &[Scalar] {
        &self.cells
    }
}

/// 列式表格；构造时校验列长度一致并推断列类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// 按列构造
    pub fn from_columns(columns: Vec<(String, Vec<Scalar>)>) -> Result<Self, AgentError> {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if let Some((name, cells)) = columns.iter().find(|(_, c)| c.len() != n_rows) {
            return Err(AgentError::Configuration(format!(
                "column '{}' has {} cells, expected {}",
                name,
                cells.len(),
                n_rows
            )));
        }
        let columns = columns
            .into_iter()
            .map(|(name, cells)| Column {
                dtype: ColumnType::infer(&cells),
                name,
                cells,
            })
            .collect();
        Ok(Self { columns, n_rows })
    }

    /// 按行构造（行宽必须等于列数）
    pub fn new(names: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Self, AgentError> {
        let width = names.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(AgentError::Configuration(format!(
                "table row {} has {} cells, expected {}",
                idx,
                row.len(),
                width
            )));
        }
        let n_rows = rows.len();
        let mut data: Vec<Vec<Scalar>> = (0..width).map(|_| Vec::with_capacity(n_rows)).collect();
        for row in rows {
            for (col, cell) in data.iter_mut().zip(row) {
                col.push(cell);
            }
        }
        let mut table = Self::from_columns(names.into_iter().zip(data).collect())?;
        table.n_rows = n_rows;
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// 第 idx 行的单元格
    pub fn row(&self, idx: usize) -> Option<Vec<&Scalar>> {
        if idx >= self.n_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.cells[idx]).collect())
    }

    /// 前 n 行
    pub fn head(&self, n: usize) -> Vec<Vec<&Scalar>> {
        (0..n.min(self.n_rows)).filter_map(|i| self.row(i)).collect()
    }

    /// 含空值的列名（按列顺序）
    pub fn columns_with_missing(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.cells.iter().any(Scalar::is_null))
            .map(|c| c.name.as_str())
            .collect()
    }
}
