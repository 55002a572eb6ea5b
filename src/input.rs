//! Reading spreadsheets into [Table]s.

use crate::errors::{self, Result};
use crate::table::{Table, Value};
use calamine::{Data, Reader, Xlsx};
use itertools::Itertools;
use log::debug;
use std::io::Cursor;

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.trim().is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(x) => Value::number(*x),
        Data::Int(i) => Value::Int(*i),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::number(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) => Value::Empty,
    }
}

fn header_name(idx: usize, cell: &Data) -> String {
    match cell_value(cell) {
        Value::Empty => format!("Unnamed: {idx}"),
        v => v.to_string(),
    }
}

/// Parse the first worksheet of an XLSX file; its first row is the header.
pub fn parse_xlsx(bytes: Vec<u8>) -> Result<Table> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| errors::load_error(format!("not a spreadsheet: {e}")))?;
    let range = match workbook.worksheet_range_at(0) {
        None => return Err(errors::load_error_ref("workbook contains no sheets")),
        Some(range) => {
            range.map_err(|e| errors::load_error(format!("cannot read first sheet: {e}")))?
        }
    };
    let mut rows = range.rows();
    let header = match rows.next() {
        None => return Err(errors::load_error_ref("first sheet is empty")),
        Some(header) => header,
    };
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, c)| header_name(i, c))
        .collect_vec();
    let records = rows
        .map(|row| row.iter().map(cell_value).collect_vec())
        .collect_vec();
    debug!(
        "parsed sheet: {} columns, {} records",
        columns.len(),
        records.len()
    );
    Table::new(columns, records)
}
