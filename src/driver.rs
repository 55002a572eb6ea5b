//! Main entry point for running the pipeline on a loaded table.

use crate::chart::{self, Channel, ChartKind, ChartOutcome, ChartSpec};
use crate::errors::Result;
use crate::information;
use crate::melt::{self, MeltArgs};
use crate::pivot::{self, AggFn, PivotTable, Selection};
use crate::reshape::{self, LongForm};
use crate::table::Table;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// The register of organizations that is explored by default.
pub const DEFAULT_URL: &str =
    "https://raw.githubusercontent.com/b33n-tech/grand-est-ess/main/base-alsace.xlsx";

/// The organization identifier.
pub const DEFAULT_MEASURE: &str = "N°SIREN";

/// Used by the commune view when nothing is uploaded.
pub const DEFAULT_FALLBACK: &str = "synthese_communes.xlsx";

/// What to calculate?
pub struct DriverArgs<'a> {
    /// Row dimensions; at least one.
    pub rows: &'a [String],

    /// Column dimensions; may be empty.
    pub cols: &'a [String],

    /// Column whose values are counted.
    pub measure: &'a str,

    /// Count records or distinct measure values.
    pub agg: AggFn,

    /// Which chart to draw.
    /// A pie chart is only drawn if there is a single row dimension.
    pub chart: ChartKind,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct Output {
    pub records: usize,
    pub pivot: PivotTable,
    pub long: LongForm,
    pub chart: ChartOutcome,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct MeltOutput {
    pub long: LongForm,
    pub chart: ChartSpec,
}

/// Calculate everything.
///
/// Fails if the selection does not fit the table; a chart that cannot be
/// drawn is not an error but a withheld [ChartOutcome].
pub fn calc(args: &DriverArgs, table: &Table) -> Result<Output> {
    information::statistics(table);
    let selection = Selection::new(table, args.rows, args.cols, args.measure)?;
    let pivot = pivot::pivot_selection(table, &selection, args.agg);
    info!(
        "pivot: {} × {}, {} {} in total",
        pivot.row_keys.len(),
        pivot.col_keys.len(),
        pivot.total(),
        args.agg
    );
    let long = reshape::to_long(&pivot);
    debug!("long form: {} records", long.records.len());
    let chart = chart::to_chart(&long, &pivot.col_dims, table, args.chart)?;
    Ok(Output {
        records: table.len(),
        pivot,
        long,
        chart,
    })
}

/// Melt a wide per-commune table and chart it.
pub fn calc_melt(args: &MeltArgs, table: &Table) -> Result<MeltOutput> {
    information::statistics(table);
    let long = melt::melt(table, args)?;
    info!("long form: {} records", long.records.len());
    let color = Channel::nominal(args.id_column).titled("Commune");
    let chart = chart::bar_chart(&long, Some(color), Some("Nombre d'organisations")).interactive();
    Ok(MeltOutput { long, chart })
}
