use crate::table::Table;
use itertools::Itertools;
use log::{debug, info};

/// Log what the loaded table looks like.
pub fn statistics(table: &Table) {
    info!("records: {}", table.len());
    info!(
        "columns: {}",
        table.columns().iter().map(|c| format!("'{c}'")).join(", ")
    );
    for (i, c) in table.columns().iter().enumerate() {
        let empty = table.column(i).filter(|v| v.is_empty()).count();
        debug!(
            "'{}': {} distinct values, {} empty",
            c,
            table.distinct(i).len(),
            empty
        );
    }
}
