//! Cross-tabulation of a table by row and column dimensions.

use crate::errors::{self, Result};
use crate::table::{Table, Value};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// How the measure column is reduced within each group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
pub enum AggFn {
    /// Number of records with a measure value.
    #[serde(rename = "count")]
    #[value(name = "count")]
    Count,
    /// Number of distinct measure values.
    #[serde(rename = "nunique")]
    #[value(name = "nunique")]
    CountDistinct,
}

impl fmt::Display for AggFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AggFn::Count => write!(f, "count"),
            AggFn::CountDistinct => write!(f, "nunique"),
        }
    }
}

/// A column that has been checked against the table header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dim {
    pub name: String,
    pub idx: usize,
}

impl Dim {
    pub fn resolve(table: &Table, name: &str) -> Result<Dim> {
        Ok(Dim {
            name: name.to_owned(),
            idx: table.column_index(name)?,
        })
    }
}

/// Row dimensions, column dimensions, and measure, validated against a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub rows: Vec<Dim>,
    pub cols: Vec<Dim>,
    pub measure: Dim,
}

impl Selection {
    pub fn new(table: &Table, rows: &[String], cols: &[String], measure: &str) -> Result<Selection> {
        if rows.is_empty() {
            return Err(errors::configuration_error_ref(
                "at least one row dimension is required",
            ));
        }
        let resolve = |names: &[String]| -> Result<Vec<Dim>> {
            names.iter().map(|n| Dim::resolve(table, n)).collect()
        };
        Ok(Selection {
            rows: resolve(rows)?,
            cols: resolve(cols)?,
            measure: Dim::resolve(table, measure)?,
        })
    }

    pub fn row_names(&self) -> Vec<String> {
        self.rows.iter().map(|d| d.name.clone()).collect_vec()
    }

    pub fn col_names(&self) -> Vec<String> {
        self.cols.iter().map(|d| d.name.clone()).collect_vec()
    }
}

/// The aggregated table.
///
/// `cells[i][j]` is the aggregate for `row_keys[i]` and `col_keys[j]`.
/// Without column dimensions there is exactly one column, keyed by the
/// empty combination.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PivotTable {
    pub row_dims: Vec<String>,
    pub col_dims: Vec<String>,
    pub measure: String,
    pub agg: AggFn,
    pub row_keys: Vec<Vec<Value>>,
    pub col_keys: Vec<Vec<Value>>,
    pub cells: Vec<Vec<u64>>,
}

impl PivotTable {
    pub fn get(&self, row: &[Value], col: &[Value]) -> Option<u64> {
        let i = self.row_keys.iter().position(|k| k == row)?;
        let j = self.col_keys.iter().position(|k| k == col)?;
        Some(self.cells[i][j])
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }
}

#[derive(Default)]
struct Group<'a> {
    count: u64,
    distinct: HashSet<&'a Value>,
}

type GroupKey<'a> = (Vec<&'a Value>, Vec<&'a Value>);

fn key_of<'a>(record: &'a [Value], dims: &[Dim]) -> Option<Vec<&'a Value>> {
    let key = dims.iter().map(|d| &record[d.idx]).collect_vec();
    if key.iter().any(|v| v.is_empty()) {
        None
    } else {
        Some(key)
    }
}

fn owned(key: &[&Value]) -> Vec<Value> {
    key.iter().map(|&v| v.clone()).collect_vec()
}

/// Validate the dimension names and build the pivot table.
pub fn pivot(
    table: &Table,
    rows: &[String],
    cols: &[String],
    measure: &str,
    agg: AggFn,
) -> Result<PivotTable> {
    let selection = Selection::new(table, rows, cols, measure)?;
    Ok(pivot_selection(table, &selection, agg))
}

/// Build the pivot table for an already validated selection.
///
/// Records with an empty value in any dimension are left out, and empty
/// measure values are not counted.
pub fn pivot_selection(table: &Table, selection: &Selection, agg: AggFn) -> PivotTable {
    let mut groups: BTreeMap<GroupKey, Group> = BTreeMap::new();
    for record in table.records() {
        let (Some(rk), Some(ck)) = (
            key_of(record, &selection.rows),
            key_of(record, &selection.cols),
        ) else {
            continue;
        };
        let group = groups.entry((rk, ck)).or_default();
        let v = &record[selection.measure.idx];
        if !v.is_empty() {
            group.count += 1;
            group.distinct.insert(v);
        }
    }

    let row_keys: BTreeSet<&Vec<&Value>> = groups.keys().map(|(r, _)| r).collect();
    let col_keys: BTreeSet<&Vec<&Value>> = groups.keys().map(|(_, c)| c).collect();
    let row_index: BTreeMap<&Vec<&Value>, usize> =
        row_keys.iter().enumerate().map(|(i, &k)| (k, i)).collect();
    let col_index: BTreeMap<&Vec<&Value>, usize> =
        col_keys.iter().enumerate().map(|(j, &k)| (k, j)).collect();

    let mut cells = vec![vec![0; col_keys.len()]; row_keys.len()];
    for ((rk, ck), group) in &groups {
        cells[row_index[&rk]][col_index[&ck]] = match agg {
            AggFn::Count => group.count,
            AggFn::CountDistinct => group.distinct.len() as u64,
        };
    }
    debug!(
        "pivot: {} groups, {} rows × {} columns",
        groups.len(),
        row_keys.len(),
        col_keys.len()
    );

    let mut col_keys = col_keys.into_iter().map(|k| owned(k)).collect_vec();
    if selection.cols.is_empty() && col_keys.is_empty() {
        col_keys.push(vec![]);
    }
    PivotTable {
        row_dims: selection.row_names(),
        col_dims: selection.col_names(),
        measure: selection.measure.name.clone(),
        agg,
        row_keys: row_keys.into_iter().map(|k| owned(k)).collect_vec(),
        col_keys,
        cells,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn s(x: &str) -> String {
        x.to_owned()
    }

    fn t(x: &str) -> Value {
        Value::text(x)
    }

    fn regions() -> Table {
        Table::new(
            vec![s("Région"), s("N°SIREN")],
            vec![
                vec![t("Alsace"), Value::Int(1)],
                vec![t("Alsace"), Value::Int(1)],
                vec![t("Lorraine"), Value::Int(2)],
                vec![t("Alsace"), Value::Int(3)],
            ],
        )
        .unwrap()
    }

    fn organizations() -> Table {
        Table::new(
            vec![s("Département"), s("Famille"), s("Forme"), s("N°SIREN")],
            vec![
                vec![t("67"), t("Association"), t("Loi 1901"), Value::Int(10)],
                vec![t("67"), t("Association"), t("Loi 1901"), Value::Int(10)],
                vec![t("67"), t("Coopérative"), t("SCOP"), Value::Int(11)],
                vec![t("68"), t("Association"), t("Loi 1908"), Value::Int(12)],
                vec![t("68"), t("Mutuelle"), t("Mutuelle"), Value::Int(13)],
                vec![t("68"), t("Mutuelle"), t("Mutuelle"), Value::Empty],
                vec![Value::Empty, t("Fondation"), t("FRUP"), Value::Int(14)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn count_by_region() {
        let p = pivot(&regions(), &[s("Région")], &[], "N°SIREN", AggFn::Count).unwrap();
        assert_eq!(p.row_keys, [vec![t("Alsace")], vec![t("Lorraine")]]);
        assert_eq!(p.col_keys, [Vec::<Value>::new()]);
        assert_eq!(p.cells, [[3], [1]]);
    }

    #[test]
    fn nunique_by_region() {
        let p = pivot(
            &regions(),
            &[s("Région")],
            &[],
            "N°SIREN",
            AggFn::CountDistinct,
        )
        .unwrap();
        assert_eq!(p.get(&[t("Alsace")], &[]), Some(2));
        assert_eq!(p.get(&[t("Lorraine")], &[]), Some(1));
    }

    #[test]
    fn missing_combinations_are_zero() {
        let p = pivot(
            &organizations(),
            &[s("Département")],
            &[s("Famille")],
            "N°SIREN",
            AggFn::Count,
        )
        .unwrap();
        assert_eq!(p.row_keys, [vec![t("67")], vec![t("68")]]);
        assert_eq!(
            p.col_keys,
            [vec![t("Association")], vec![t("Coopérative")], vec![t("Mutuelle")]]
        );
        assert_eq!(p.cells, [[2, 1, 0], [1, 0, 1]]);
    }

    #[test]
    fn multi_level_columns() {
        let p = pivot(
            &organizations(),
            &[s("Département")],
            &[s("Famille"), s("Forme")],
            "N°SIREN",
            AggFn::CountDistinct,
        )
        .unwrap();
        assert_eq!(p.col_keys.len(), 4);
        assert_eq!(p.get(&[t("67")], &[t("Association"), t("Loi 1901")]), Some(1));
        assert_eq!(p.get(&[t("68")], &[t("Association"), t("Loi 1901")]), Some(0));
        assert_eq!(p.get(&[t("68")], &[t("Association"), t("Loi 1908")]), Some(1));
        assert_eq!(p.get(&[t("68")], &[t("Mutuelle"), t("Mutuelle")]), Some(1));
    }

    #[test]
    fn distinct_never_exceeds_count() {
        let table = organizations();
        let rows = [s("Département"), s("Famille")];
        let cols = [s("Forme")];
        let count = pivot(&table, &rows, &cols, "N°SIREN", AggFn::Count).unwrap();
        let distinct = pivot(&table, &rows, &cols, "N°SIREN", AggFn::CountDistinct).unwrap();
        assert_eq!(count.row_keys, distinct.row_keys);
        assert_eq!(count.col_keys, distinct.col_keys);
        for (a, b) in count.cells.iter().flatten().zip(distinct.cells.iter().flatten()) {
            assert!(b <= a);
        }
        assert!(distinct.total() < count.total());
    }

    #[test]
    fn same_dimension_on_both_axes() {
        let p = pivot(
            &regions(),
            &[s("Région")],
            &[s("Région")],
            "N°SIREN",
            AggFn::Count,
        )
        .unwrap();
        assert_eq!(p.cells, [[3, 0], [0, 1]]);
    }

    #[test]
    fn invalid_selections() {
        let table = regions();
        let e = pivot(&table, &[], &[], "N°SIREN", AggFn::Count).unwrap_err();
        assert!(errors::is_configuration_error(&*e));
        let e = pivot(&table, &[s("Commune")], &[], "N°SIREN", AggFn::Count).unwrap_err();
        assert!(errors::is_configuration_error(&*e));
        let e = pivot(&table, &[s("Région")], &[s("Commune")], "N°SIREN", AggFn::Count)
            .unwrap_err();
        assert!(errors::is_configuration_error(&*e));
        let e = pivot(&table, &[s("Région")], &[], "SIRET", AggFn::Count).unwrap_err();
        assert!(errors::is_configuration_error(&*e));
    }

    #[test]
    fn empty_table() {
        let table = Table::new(vec![s("Région"), s("N°SIREN")], vec![]).unwrap();
        let p = pivot(&table, &[s("Région")], &[], "N°SIREN", AggFn::Count).unwrap();
        assert!(p.row_keys.is_empty());
        assert_eq!(p.total(), 0);
    }
}
