//! Long form: one record per data point, as charts expect.

use crate::pivot::PivotTable;
use crate::table::Value;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Name of the numeric field of pivot records.
pub const VALUE_FIELD: &str = "Valeur";

/// Separator used when a column combination has several levels.
pub const LEVEL_SEPARATOR: &str = " / ";

/// Appended to the column field when its name is taken by another field.
pub const COLUMN_SUFFIX: &str = " (colonne)";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LongRecord {
    /// Values of the row dimensions.
    pub rows: Vec<Value>,
    /// Label of the column combination.
    pub column: Value,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LongForm {
    pub row_dims: Vec<String>,
    pub column_field: String,
    pub value_field: String,
    pub records: Vec<LongRecord>,
}

impl LongForm {
    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.value).sum()
    }

    /// Records as flat JSON objects keyed by field name.
    pub fn to_json_records(&self) -> Vec<serde_json::Value> {
        self.records
            .iter()
            .map(|r| {
                let mut obj = serde_json::Map::new();
                for (dim, v) in self.row_dims.iter().zip(&r.rows) {
                    obj.insert(dim.clone(), json_scalar(v));
                }
                obj.insert(self.column_field.clone(), json_scalar(&r.column));
                obj.insert(self.value_field.clone(), json_number(r.value));
                serde_json::Value::Object(obj)
            })
            .collect_vec()
    }
}

pub fn json_scalar(v: &Value) -> serde_json::Value {
    serde_json::to_value(v).unwrap_or(serde_json::Value::Null)
}

/// Integral values are written as integers.
pub fn json_number(x: f64) -> serde_json::Value {
    match Value::number(x) {
        Value::Int(i) => serde_json::json!(i),
        _ => serde_json::json!(x),
    }
}

/// Label of a column combination.
pub fn column_label(key: &[Value]) -> Value {
    match key {
        [] => Value::Empty,
        [v] => v.clone(),
        _ => Value::Text(key.iter().join(LEVEL_SEPARATOR)),
    }
}

/// Un-pivot: every cell becomes one record.
///
/// Without column dimensions the column field stands in for the last row
/// dimension, so that there is still something to put on the x axis.
pub fn to_long(pivot: &PivotTable) -> LongForm {
    let column_field = if pivot.col_dims.is_empty() {
        pivot.row_dims.last().cloned().unwrap_or_default()
    } else {
        let mut field = pivot.col_dims.join(LEVEL_SEPARATOR);
        while field == VALUE_FIELD || pivot.row_dims.contains(&field) {
            field.push_str(COLUMN_SUFFIX);
        }
        field
    };
    let mut records = vec![];
    for (rk, row) in pivot.row_keys.iter().zip(&pivot.cells) {
        for (ck, &cell) in pivot.col_keys.iter().zip(row) {
            let column = if pivot.col_dims.is_empty() {
                rk.last().cloned().unwrap_or(Value::Empty)
            } else {
                column_label(ck)
            };
            records.push(LongRecord {
                rows: rk.clone(),
                column,
                value: cell as f64,
            });
        }
    }
    LongForm {
        row_dims: pivot.row_dims.clone(),
        column_field,
        value_field: VALUE_FIELD.to_owned(),
        records,
    }
}
