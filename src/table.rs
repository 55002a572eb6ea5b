//! In-memory representation of a loaded spreadsheet.

use crate::errors::{self, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// One cell of a table.
///
/// Values are totally ordered: empty cells first, then booleans, then
/// numbers (integers and floats compared numerically), then text.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Value {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// A number; integral values are stored as integers.
    pub fn number(x: f64) -> Value {
        if x.is_finite() && x.fract() == 0.0 && x.abs() < 9.0e15 {
            Value::Int(x as i64)
        } else {
            Value::Float(x)
        }
    }

    pub fn text(s: &str) -> Value {
        Value::Text(s.to_owned())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Empty => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Empty, Value::Empty) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Empty => 0u8.hash(state),
            Value::Bool(b) => (1u8, b).hash(state),
            Value::Int(i) => (2u8, i).hash(state),
            Value::Float(x) => (3u8, x.to_bits()).hash(state),
            Value::Text(s) => (4u8, s).hash(state),
        }
    }
}

/// A table with named columns; every record has one value per column.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, records: Vec<Vec<Value>>) -> Result<Table> {
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c) {
                return Err(errors::load_error(format!("duplicate column '{c}'")));
            }
        }
        for (i, r) in records.iter().enumerate() {
            if r.len() != columns.len() {
                return Err(errors::load_error(format!(
                    "record {} has {} values, expected {}",
                    i + 1,
                    r.len(),
                    columns.len()
                )));
            }
        }
        Ok(Table { columns, records })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Vec<Value>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve a column name against the header.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns.iter().position(|c| c == name).ok_or_else(|| {
            errors::configuration_error(format!(
                "unknown column '{}' (available: {})",
                name,
                self.columns.iter().map(|c| format!("'{c}'")).join(", ")
            ))
        })
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.records.iter().map(move |r| &r[idx])
    }

    /// The first `n` records.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            records: self.records.iter().take(n).cloned().collect_vec(),
        }
    }

    /// Distinct non-empty values of a column, in order of first appearance.
    pub fn distinct(&self, idx: usize) -> Vec<&Value> {
        let mut seen = HashSet::new();
        self.column(idx)
            .filter(|v| !v.is_empty() && seen.insert(*v))
            .collect_vec()
    }

    /// Occurrences of each non-empty value of a column, most frequent first.
    pub fn value_counts(&self, idx: usize) -> Vec<(Value, u64)> {
        let mut counts: HashMap<&Value, u64> = HashMap::new();
        for v in self.column(idx).filter(|v| !v.is_empty()) {
            *counts.entry(v).or_default() += 1;
        }
        counts
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
            .map(|(v, c)| (v.clone(), c))
            .collect_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn regions() -> Table {
        Table::new(
            vec!["Région".to_owned(), "N°SIREN".to_owned()],
            vec![
                vec![Value::text("Alsace"), Value::Int(1)],
                vec![Value::text("Alsace"), Value::Int(1)],
                vec![Value::text("Lorraine"), Value::Int(2)],
                vec![Value::text("Alsace"), Value::Int(3)],
                vec![Value::Empty, Value::Int(4)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn number_normalization() {
        assert_eq!(Value::number(3.0), Value::Int(3));
        assert!(matches!(Value::number(3.0), Value::Int(3)));
        assert!(matches!(Value::number(2.5), Value::Float(_)));
        assert_eq!(format!("{}", Value::number(775672272.0)), "775672272");
    }

    #[test]
    fn value_order() {
        let mut v = vec![
            Value::text("b"),
            Value::Float(1.5),
            Value::Int(2),
            Value::Empty,
            Value::Bool(true),
            Value::Int(1),
            Value::text("a"),
        ];
        v.sort();
        assert_eq!(
            v,
            [
                Value::Empty,
                Value::Bool(true),
                Value::Int(1),
                Value::Float(1.5),
                Value::Int(2),
                Value::text("a"),
                Value::text("b"),
            ]
        );
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn new_rejects_ragged_records() {
        let r = Table::new(vec!["a".to_owned()], vec![vec![Value::Int(1), Value::Int(2)]]);
        assert!(errors::is_load_error(&*r.unwrap_err()));
        let r = Table::new(vec!["a".to_owned(), "a".to_owned()], vec![]);
        assert!(errors::is_load_error(&*r.unwrap_err()));
    }

    #[test]
    fn column_index_unknown() {
        let t = regions();
        assert_eq!(t.column_index("N°SIREN").unwrap(), 1);
        let e = t.column_index("Département").unwrap_err();
        assert!(errors::is_configuration_error(&*e));
    }

    #[test]
    fn distinct_and_counts() {
        let t = regions();
        assert_eq!(
            t.distinct(0),
            [&Value::text("Alsace"), &Value::text("Lorraine")]
        );
        assert_eq!(
            t.value_counts(0),
            [(Value::text("Alsace"), 3), (Value::text("Lorraine"), 1)]
        );
        assert_eq!(t.head(2).len(), 2);
    }
}
