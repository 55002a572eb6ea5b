//! Long form of an already aggregated wide table.
//!
//! The input has one row per commune and one column per type of
//! organization, possibly followed by a `TOTAL` column. Only the selected
//! communes are kept.

use crate::errors::{self, Result};
use crate::reshape::{LongForm, LongRecord};
use crate::table::{Table, Value};
use itertools::Itertools;
use log::{debug, info};

pub const COMMUNE_COLUMN: &str = "Libellé de la commune de l'établissement";
pub const TOTAL_COLUMN: &str = "TOTAL";
pub const VAR_NAME: &str = "Type d'organisation";
pub const VALUE_NAME: &str = "Nombre";

/// How many communes are selected when the user does not choose.
pub const DEFAULT_SELECTION: usize = 5;

pub struct MeltArgs<'a> {
    pub id_column: &'a str,
    /// Selected id values; `None` selects the first few in table order.
    pub selected: Option<&'a [String]>,
    pub var_name: &'a str,
    pub value_name: &'a str,
}

impl Default for MeltArgs<'_> {
    fn default() -> Self {
        MeltArgs {
            id_column: COMMUNE_COLUMN,
            selected: None,
            var_name: VAR_NAME,
            value_name: VALUE_NAME,
        }
    }
}

/// Columns that are melted: all but the id column and `TOTAL`.
pub fn value_columns(table: &Table, id_column: &str) -> Vec<usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.as_str() != id_column && c.as_str() != TOTAL_COLUMN)
        .map(|(i, _)| i)
        .collect_vec()
}

/// Every distinct id value, in order of first appearance.
pub fn choices(table: &Table, id_column: &str) -> Result<Vec<Value>> {
    let idx = table.column_index(id_column)?;
    Ok(table.distinct(idx).into_iter().cloned().collect_vec())
}

fn selection(table: &Table, idx: usize, selected: Option<&[String]>) -> Result<Vec<Value>> {
    let available = table.distinct(idx);
    match selected {
        None => Ok(available
            .into_iter()
            .take(DEFAULT_SELECTION)
            .cloned()
            .collect_vec()),
        Some(names) => names
            .iter()
            .map(|name| {
                available
                    .iter()
                    .find(|v| v.to_string() == *name)
                    .map(|&v| v.clone())
                    .ok_or_else(|| {
                        errors::configuration_error(format!(
                            "'{name}' does not appear in column '{}'",
                            table.columns()[idx]
                        ))
                    })
            })
            .collect(),
    }
}

fn cell_number(table: &Table, row: usize, col: usize) -> Result<f64> {
    let v = &table.records()[row][col];
    match v {
        Value::Empty => Ok(0.0),
        _ => v.as_f64().ok_or_else(|| {
            errors::configuration_error(format!(
                "column '{}' is not numeric: '{v}' in record {}",
                table.columns()[col],
                row + 1
            ))
        }),
    }
}

pub fn melt(table: &Table, args: &MeltArgs) -> Result<LongForm> {
    let idx = table.column_index(args.id_column)?;
    let keep = selection(table, idx, args.selected)?;
    info!(
        "selected: {}",
        keep.iter().map(|v| format!("'{v}'")).join(", ")
    );
    let columns = value_columns(table, args.id_column);
    debug!("melting {} columns", columns.len());
    let mut records = vec![];
    for (row, record) in table.records().iter().enumerate() {
        if !keep.contains(&record[idx]) {
            continue;
        }
        for &col in &columns {
            records.push(LongRecord {
                rows: vec![record[idx].clone()],
                column: Value::Text(table.columns()[col].clone()),
                value: cell_number(table, row, col)?,
            });
        }
    }
    Ok(LongForm {
        row_dims: vec![args.id_column.to_owned()],
        column_field: args.var_name.to_owned(),
        value_field: args.value_name.to_owned(),
        records,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn s(x: &str) -> String {
        x.to_owned()
    }

    fn synthese() -> Table {
        let communes = ["Strasbourg", "Colmar", "Mulhouse", "Haguenau", "Sélestat", "Saverne"];
        let records = communes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let a = (i + 1) as i64;
                vec![Value::text(c), Value::Int(a), Value::Int(2 * a), Value::Int(3 * a)]
            })
            .collect_vec();
        Table::new(
            vec![s(COMMUNE_COLUMN), s("Association"), s("Coopérative"), s(TOTAL_COLUMN)],
            records,
        )
        .unwrap()
    }

    #[test]
    fn total_is_excluded() {
        let table = synthese();
        assert_eq!(value_columns(&table, COMMUNE_COLUMN), [1, 2]);
        let long = melt(&table, &MeltArgs::default()).unwrap();
        assert!(long.records.iter().all(|r| r.column != Value::text(TOTAL_COLUMN)));
        assert_eq!(long.column_field, VAR_NAME);
        assert_eq!(long.value_field, VALUE_NAME);
    }

    #[test]
    fn default_selects_first_five() {
        let long = melt(&synthese(), &MeltArgs::default()).unwrap();
        assert_eq!(long.records.len(), DEFAULT_SELECTION * 2);
        assert!(long.records.iter().all(|r| r.rows[0] != Value::text("Saverne")));
        assert_eq!(long.total(), (1 + 2 + 3 + 4 + 5) as f64 * 3.0);
    }

    #[test]
    fn explicit_selection() {
        let selected = [s("Saverne"), s("Colmar")];
        let args = MeltArgs {
            selected: Some(&selected),
            ..MeltArgs::default()
        };
        let long = melt(&synthese(), &args).unwrap();
        assert_eq!(long.records.len(), 4);
        assert_eq!(long.total(), (6 + 2) as f64 * 3.0);
    }

    #[test]
    fn unknown_commune() {
        let selected = [s("Paris")];
        let args = MeltArgs {
            selected: Some(&selected),
            ..MeltArgs::default()
        };
        let e = melt(&synthese(), &args).unwrap_err();
        assert!(errors::is_configuration_error(&*e));
    }

    #[test]
    fn missing_id_column() {
        let table = Table::new(vec![s("Commune"), s("Association")], vec![]).unwrap();
        let e = melt(&table, &MeltArgs::default()).unwrap_err();
        assert!(errors::is_configuration_error(&*e));
    }

    #[test]
    fn text_cells_are_rejected() {
        let table = Table::new(
            vec![s(COMMUNE_COLUMN), s("Association")],
            vec![vec![Value::text("Colmar"), Value::text("beaucoup")]],
        )
        .unwrap();
        let e = melt(&table, &MeltArgs::default()).unwrap_err();
        assert!(errors::is_configuration_error(&*e));
    }
}
