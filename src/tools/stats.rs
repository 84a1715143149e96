//! column_stats 能力：对表格某一数值列求 count / min / max / mean

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::tools::{Capability, ResolvedArgs, OUTPUT_VAR_ARG};
use crate::value::Value;

pub struct ColumnStatsCapability;

#[async_trait]
impl Capability for ColumnStatsCapability {
    fn name(&self) -> &str {
        "column_stats"
    }

    fn description(&self) -> &str {
        "Compute count/min/max/mean of a numeric column of a table variable."
    }

    fn parameters_schema(&self) -> Json {
        serde_json::json!({
            "type": "object",
            "properties": {
                "table_var": { "type": "string", "description": "Name of the scratchpad variable holding the table" },
                "column": { "type": "string", "description": "Numeric column name" },
                OUTPUT_VAR_ARG: { "type": "string", "description": "Name of the variable to store the statistics" }
            },
            "required": ["table_var", "column", OUTPUT_VAR_ARG]
        })
    }

    async fn invoke(&self, args: ResolvedArgs) -> Result<Value, String> {
        let table = args
            .require("table")?
            .as_table()
            .ok_or_else(|| "argument 'table' must reference a table".to_string())?;
        let column = args.require_str("column")?;
        let cells = table
            .column(column)
            .ok_or_else(|| format!("column '{}' not found", column))?
            .cells();

        let nums: Vec<f64> = cells.iter().filter_map(|c| c.as_f64()).collect();
        let mut stats = BTreeMap::new();
        stats.insert("count".to_string(), Value::integer(nums.len() as i64));
        if nums.is_empty() {
            return Ok(Value::Map(stats));
        }
        let min = nums.iter().copied().fold(f64::INFINITY, f64::min);
        let max = nums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = nums.iter().sum::<f64>() / nums.len() as f64;
        stats.insert("min".to_string(), Value::float(min));
        stats.insert("max".to_string(), Value::float(max));
        stats.insert("mean".to_string(), Value::float(mean));
        Ok(Value::Map(stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Scalar, Table};

    fn args(table: Value, column: &str) -> ResolvedArgs {
        BTreeMap::from([
            ("table".to_string(), table),
            ("column".to_string(), Value::text(column)),
        ])
        .into()
    }

    #[tokio::test]
    async fn test_stats_skip_nulls() {
        let table = Table::from_columns(vec![(
            "price".into(),
            vec![Scalar::Integer(2), Scalar::Null, Scalar::Float(4.0)],
        )])
        .unwrap();
        let out = ColumnStatsCapability
            .invoke(args(Value::Table(table), "price"))
            .await
            .unwrap();
        let Value::Map(stats) = out else {
            panic!("expected map");
        };
        assert_eq!(stats["count"], Value::integer(2));
        assert_eq!(stats["mean"], Value::float(3.0));
        assert_eq!(stats["min"], Value::float(2.0));
    }

    #[tokio::test]
    async fn test_non_table_reference_fails() {
        let err = ColumnStatsCapability
            .invoke(args(Value::integer(1), "price"))
            .await
            .unwrap_err();
        assert!(err.contains("table"));
    }
}
