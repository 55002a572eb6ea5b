//! Mapping long-form records onto Vega-Lite chart specifications.

use crate::errors::Result;
use crate::reshape::{self, LongForm};
use crate::table::Table;
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

pub const BAR_SIZE: (u32, u32) = (800, 400);
pub const PIE_SIZE: (u32, u32) = (500, 500);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChartKind::Bar => write!(f, "bar"),
            ChartKind::Pie => write!(f, "pie"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Nominal,
    Quantitative,
}

/// One encoding channel.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Channel {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
}

impl Channel {
    pub fn nominal(field: &str) -> Channel {
        Channel {
            field: field.to_owned(),
            field_type: FieldType::Nominal,
            title: None,
        }
    }

    pub fn quantitative(field: &str) -> Channel {
        Channel {
            field: field.to_owned(),
            field_type: FieldType::Quantitative,
            title: None,
        }
    }

    pub fn titled(self, title: &str) -> Channel {
        Channel {
            title: Some(title.to_owned()),
            ..self
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Encoding {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub x: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub y: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub theta: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<Channel>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tooltip: Vec<Channel>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct InlineData {
    pub values: Vec<serde_json::Value>,
}

/// A Vega-Lite specification with inline data.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub data: InlineData,
    pub mark: String,
    pub encoding: Encoding,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub params: Vec<serde_json::Value>,
}

impl ChartSpec {
    fn new(mark: &str, values: Vec<serde_json::Value>, encoding: Encoding, size: (u32, u32)) -> Self {
        ChartSpec {
            schema: VEGA_LITE_SCHEMA.to_owned(),
            data: InlineData { values },
            mark: mark.to_owned(),
            encoding,
            width: size.0,
            height: size.1,
            params: vec![],
        }
    }

    /// Let the user pan and zoom.
    pub fn interactive(self) -> Self {
        ChartSpec {
            params: vec![serde_json::json!({
                "name": "zoom",
                "select": "interval",
                "bind": "scales",
            })],
            ..self
        }
    }
}

/// A pie chart was asked for but the selection does not allow one.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChartPreconditionWarning(pub String);

impl fmt::Display for ChartPreconditionWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "chart not drawn: {}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartOutcome {
    Rendered(ChartSpec),
    Withheld(ChartPreconditionWarning),
}

impl ChartOutcome {
    pub fn spec(&self) -> Option<&ChartSpec> {
        match self {
            ChartOutcome::Rendered(spec) => Some(spec),
            ChartOutcome::Withheld(_) => None,
        }
    }
}

/// Bar chart: column label on the x axis, value on the y axis.
pub fn bar_chart(long: &LongForm, color: Option<Channel>, y_title: Option<&str>) -> ChartSpec {
    let x = Channel::nominal(&long.column_field).titled(&long.column_field);
    let mut y = Channel::quantitative(&long.value_field);
    if let Some(title) = y_title {
        y = y.titled(title);
    }
    let tooltip = long
        .row_dims
        .iter()
        .map(|d| Channel::nominal(d))
        .chain([Channel::nominal(&long.column_field), Channel::quantitative(&long.value_field)])
        .unique_by(|c| c.field.clone())
        .collect_vec();
    let encoding = Encoding {
        x: Some(x),
        y: Some(y),
        color,
        tooltip,
        ..Encoding::default()
    };
    ChartSpec::new("bar", long.to_json_records(), encoding, BAR_SIZE)
}

/// Pie chart of how often each value of `dim` occurs in the table.
pub fn pie_chart(table: &Table, dim: &str) -> Result<ChartSpec> {
    let idx = table.column_index(dim)?;
    let values = table
        .value_counts(idx)
        .iter()
        .map(|(v, count)| {
            let mut obj = serde_json::Map::new();
            obj.insert(dim.to_owned(), reshape::json_scalar(v));
            obj.insert(reshape::VALUE_FIELD.to_owned(), serde_json::json!(count));
            serde_json::Value::Object(obj)
        })
        .collect_vec();
    let encoding = Encoding {
        theta: Some(Channel::quantitative(reshape::VALUE_FIELD)),
        color: Some(Channel::nominal(dim)),
        tooltip: vec![
            Channel::nominal(dim),
            Channel::quantitative(reshape::VALUE_FIELD),
        ],
        ..Encoding::default()
    };
    Ok(ChartSpec::new("arc", values, encoding, PIE_SIZE))
}

/// Pick and build the chart for a pivot.
///
/// Bars are split by color on the first row dimension when there are
/// several. A pie is only drawn for a single row dimension with no other
/// column dimension; it counts raw occurrences in `table`.
pub fn to_chart(
    long: &LongForm,
    col_dims: &[String],
    table: &Table,
    kind: ChartKind,
) -> Result<ChartOutcome> {
    match kind {
        ChartKind::Bar => {
            let color = match long.row_dims.as_slice() {
                [first, _, ..] => Some(Channel::nominal(first)),
                _ => None,
            };
            Ok(ChartOutcome::Rendered(bar_chart(long, color, None)))
        }
        ChartKind::Pie => match long.row_dims.as_slice() {
            [dim] if col_dims.is_empty() || col_dims == long.row_dims.as_slice() => {
                Ok(ChartOutcome::Rendered(pie_chart(table, dim)?))
            }
            _ => {
                let w = ChartPreconditionWarning(format!(
                    "a pie chart needs exactly one row dimension and no other column dimension, got {} row and {} column dimensions",
                    long.row_dims.len(),
                    col_dims.len()
                ));
                warn!("{w}");
                Ok(ChartOutcome::Withheld(w))
            }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pivot::{self, AggFn};
    use crate::table::Value;

    fn s(x: &str) -> String {
        x.to_owned()
    }

    fn regions() -> Table {
        let t = Value::text;
        Table::new(
            vec![s("Région"), s("Famille"), s("N°SIREN")],
            vec![
                vec![t("Alsace"), t("Association"), Value::Int(1)],
                vec![t("Alsace"), t("Association"), Value::Int(1)],
                vec![t("Lorraine"), t("Mutuelle"), Value::Int(2)],
                vec![t("Alsace"), t("Mutuelle"), Value::Int(3)],
            ],
        )
        .unwrap()
    }

    fn chart(rows: &[String], cols: &[String], agg: AggFn, kind: ChartKind) -> ChartOutcome {
        let table = regions();
        let p = pivot::pivot(&table, rows, cols, "N°SIREN", agg).unwrap();
        let long = reshape::to_long(&p);
        to_chart(&long, cols, &table, kind).unwrap()
    }

    #[test]
    fn bar_single_dimension() {
        let outcome = chart(&[s("Région")], &[s("Famille")], AggFn::Count, ChartKind::Bar);
        let spec = outcome.spec().unwrap();
        assert_eq!(spec.mark, "bar");
        assert_eq!(spec.encoding.x.as_ref().unwrap().field, "Famille");
        assert_eq!(spec.encoding.y.as_ref().unwrap().field, reshape::VALUE_FIELD);
        assert_eq!(spec.encoding.color, None);
        assert_eq!(
            spec.encoding.tooltip.iter().map(|c| c.field.as_str()).collect_vec(),
            ["Région", "Famille", reshape::VALUE_FIELD]
        );
        assert_eq!((spec.width, spec.height), BAR_SIZE);
        assert_eq!(spec.data.values.len(), 4);
    }

    #[test]
    fn bar_colored_by_first_dimension() {
        let outcome = chart(&[s("Région"), s("Famille")], &[], AggFn::Count, ChartKind::Bar);
        let spec = outcome.spec().unwrap();
        assert_eq!(spec.encoding.color, Some(Channel::nominal("Région")));
        assert_eq!(spec.encoding.x.as_ref().unwrap().field, "Famille");
        assert_eq!(spec.encoding.tooltip.len(), 3);
    }

    #[test]
    fn pie_with_two_dimensions_is_withheld() {
        let outcome = chart(&[s("Région"), s("Famille")], &[], AggFn::Count, ChartKind::Pie);
        assert!(matches!(outcome, ChartOutcome::Withheld(_)));
        assert!(outcome.spec().is_none());
        let outcome = chart(&[s("Région")], &[s("Famille")], AggFn::Count, ChartKind::Pie);
        assert!(matches!(outcome, ChartOutcome::Withheld(_)));
    }

    #[test]
    fn pie_counts_raw_occurrences() {
        for cols in [vec![], vec![s("Région")]] {
            let outcome = chart(&[s("Région")], &cols, AggFn::CountDistinct, ChartKind::Pie);
            let spec = outcome.spec().unwrap();
            assert_eq!(spec.mark, "arc");
            assert_eq!((spec.width, spec.height), PIE_SIZE);
            assert_eq!(
                spec.data.values,
                [
                    serde_json::json!({"Région": "Alsace", "Valeur": 3}),
                    serde_json::json!({"Région": "Lorraine", "Valeur": 1}),
                ]
            );
        }
    }

    #[test]
    fn serialized_shape() {
        let outcome = chart(&[s("Région")], &[], AggFn::Count, ChartKind::Bar);
        let spec = outcome.spec().unwrap().clone().interactive();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["$schema"], VEGA_LITE_SCHEMA);
        assert_eq!(json["encoding"]["x"]["type"], "nominal");
        assert_eq!(json["encoding"]["y"]["type"], "quantitative");
        assert!(json["encoding"].get("theta").is_none());
        assert_eq!(json["params"][0]["bind"], "scales");
    }
}
