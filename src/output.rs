//! Presenting results: text tables, spreadsheets, JSON, and HTML pages.

use crate::chart::ChartSpec;
use crate::errors::Result;
use crate::pivot::PivotTable;
use crate::reshape::{self, LEVEL_SEPARATOR};
use crate::table::{Table, Value};
use itertools::Itertools;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use std::path::Path;
use std::{fs, io};
use textwrap::core::display_width;

/// How many records the preview shows.
pub const PREVIEW_RECORDS: usize = 5;

#[derive(Serialize)]
pub struct OError {
    pub error: String,
}

/// Align cells in columns; numbers are right-aligned.
pub fn pretty_table(header: &[String], rows: &[Vec<Value>]) -> String {
    let cells = rows
        .iter()
        .map(|r| r.iter().map(|v| v.to_string()).collect_vec())
        .collect_vec();
    let widths = (0..header.len())
        .map(|j| {
            cells
                .iter()
                .map(|r| display_width(&r[j]))
                .chain([display_width(&header[j])])
                .max()
                .unwrap_or(0)
        })
        .collect_vec();
    let pad = |s: &str, w: usize, right: bool| {
        let fill = " ".repeat(w - display_width(s));
        if right {
            format!("{fill}{s}")
        } else {
            format!("{s}{fill}")
        }
    };
    let mut lines = vec![];
    lines.push(
        header
            .iter()
            .zip(&widths)
            .map(|(h, &w)| pad(h, w, false))
            .join("  "),
    );
    lines.push(widths.iter().map(|&w| "-".repeat(w)).join("  "));
    for (r, row) in cells.iter().zip(rows) {
        lines.push(
            r.iter()
                .zip(row)
                .zip(&widths)
                .map(|((s, v), &w)| pad(s, w, v.as_f64().is_some()))
                .join("  "),
        );
    }
    lines.iter().map(|l| l.trim_end()).join("\n")
}

/// The first records of a table.
pub fn pretty_preview(table: &Table) -> String {
    let head = table.head(PREVIEW_RECORDS);
    pretty_table(head.columns(), head.records())
}

fn pivot_header(pivot: &PivotTable) -> Vec<String> {
    let columns = if pivot.col_dims.is_empty() {
        vec![pivot.measure.clone()]
    } else {
        pivot
            .col_keys
            .iter()
            .map(|k| reshape::column_label(k).to_string())
            .collect_vec()
    };
    pivot.row_dims.iter().cloned().chain(columns).collect_vec()
}

/// The pivot table with one text column per column combination.
pub fn pretty_pivot(pivot: &PivotTable) -> String {
    let rows = pivot
        .row_keys
        .iter()
        .zip(&pivot.cells)
        .map(|(k, cells)| {
            k.iter()
                .cloned()
                .chain(cells.iter().map(|&c| Value::Int(c as i64)))
                .collect_vec()
        })
        .collect_vec();
    let mut s = String::new();
    if !pivot.col_dims.is_empty() {
        s.push_str(&format!("columns: {}\n", pivot.col_dims.join(LEVEL_SEPARATOR)));
    }
    s.push_str(&pretty_table(&pivot_header(pivot), &rows));
    s
}

fn write_value(sheet: &mut Worksheet, row: u32, col: u16, v: &Value) -> Result<()> {
    match v {
        Value::Empty => (),
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Value::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Value::Float(x) => {
            sheet.write_number(row, col, *x)?;
        }
        Value::Text(s) => {
            sheet.write_string(row, col, s)?;
        }
    }
    Ok(())
}

/// The pivot table as an XLSX workbook.
///
/// One header row per column dimension, then a header row with the row
/// dimension names, then one row per row combination.
pub fn pivot_workbook(pivot: &PivotTable) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let nrd = pivot.row_dims.len() as u16;
    let mut row = 0;
    for (level, dim) in pivot.col_dims.iter().enumerate() {
        sheet.write_string(row, nrd - 1, dim)?;
        for (j, key) in pivot.col_keys.iter().enumerate() {
            write_value(sheet, row, nrd + j as u16, &key[level])?;
        }
        row += 1;
    }
    for (j, dim) in pivot.row_dims.iter().enumerate() {
        sheet.write_string(row, j as u16, dim)?;
    }
    if pivot.col_dims.is_empty() {
        sheet.write_string(row, nrd, &pivot.measure)?;
    }
    row += 1;
    for (key, cells) in pivot.row_keys.iter().zip(&pivot.cells) {
        for (j, v) in key.iter().enumerate() {
            write_value(sheet, row, j as u16, v)?;
        }
        for (j, &c) in cells.iter().enumerate() {
            sheet.write_number(row, nrd + j as u16, c as f64)?;
        }
        row += 1;
    }
    Ok(workbook)
}

pub fn write_pivot_xlsx(pivot: &PivotTable, path: &Path) -> Result<()> {
    let mut workbook = pivot_workbook(pivot)?;
    workbook.save(path)?;
    Ok(())
}

pub fn write_json<T: Serialize>(value: &T, path: &Path, compact: bool) -> Result<()> {
    let file = fs::File::create(path)?;
    let writer = io::BufWriter::new(file);
    if compact {
        serde_json::to_writer(writer, value)?;
    } else {
        serde_json::to_writer_pretty(writer, value)?;
    }
    Ok(())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A standalone page that draws the chart with vega-embed.
pub fn chart_html(title: &str, spec: &ChartSpec) -> Result<String> {
    let json = serde_json::to_string(spec)?.replace("</", "<\\/");
    let title = escape_html(title);
    Ok(format!(
        r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
<script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
<script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
</head>
<body>
<h1>{title}</h1>
<div id="chart"></div>
<script>vegaEmbed("#chart", {json});</script>
</body>
</html>
"##
    ))
}
