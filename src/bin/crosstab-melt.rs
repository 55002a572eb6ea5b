use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use crosstab::driver::{self, DEFAULT_FALLBACK};
use crosstab::errors::Result;
use crosstab::loader::{Loader, SourceMode};
use crosstab::melt::{self, MeltArgs};
use crosstab::output;
use itertools::Itertools;
use log::{error, info};
use std::path::PathBuf;
use std::{fs, process};

/// Chart organizations per commune from a synthesis spreadsheet
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Synthesis spreadsheet (XLSX); the default file is used if omitted
    infile: Option<PathBuf>,
    /// Default synthesis spreadsheet
    #[arg(long, default_value = DEFAULT_FALLBACK)]
    fallback: PathBuf,
    /// Commune to show (repeat for several; default: the first five)
    #[arg(short, long = "commune")]
    communes: Vec<String>,
    /// Column that names the commune
    #[arg(long, default_value = melt::COMMUNE_COLUMN)]
    id_column: String,
    /// List the communes and exit
    #[arg(long)]
    list: bool,
    /// Write the chart as a Vega-Lite specification (JSON)
    #[arg(long)]
    chart_file: Option<PathBuf>,
    /// Write the chart as a standalone HTML page
    #[arg(long)]
    html_file: Option<PathBuf>,
    /// Produce compact JSON files
    #[arg(long)]
    compact: bool,
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn process(args: &Args) -> Result<()> {
    let mode = SourceMode::Upload {
        file: args.infile.clone(),
        fallback: Some(args.fallback.clone()),
    };
    let source = mode.resolve()?;
    let mut loader = Loader::with_http()?;
    let table = loader.load(&source)?;
    println!("{}\n", output::pretty_preview(&table));

    if args.list {
        for commune in melt::choices(&table, &args.id_column)? {
            println!("{commune}");
        }
        return Ok(());
    }

    let melt_args = MeltArgs {
        id_column: &args.id_column,
        selected: if args.communes.is_empty() {
            None
        } else {
            Some(args.communes.as_slice())
        },
        ..MeltArgs::default()
    };
    let result = driver::calc_melt(&melt_args, &table)?;
    let communes = result
        .long
        .records
        .iter()
        .map(|r| r.rows[0].to_string())
        .unique()
        .join(", ");
    println!(
        "{} records for {}, {} organizations",
        result.long.records.len(),
        communes,
        result.long.total()
    );
    if let Some(path) = &args.chart_file {
        info!("write: {}", path.display());
        output::write_json(&result.chart, path, args.compact)?;
    }
    if let Some(path) = &args.html_file {
        info!("write: {}", path.display());
        let html = output::chart_html("Visualisation synthèse ESS par commune", &result.chart)?;
        fs::write(path, html)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    pretty_env_logger::formatted_timed_builder()
        .filter_level(args.verbose.log_level_filter())
        .init();
    if let Err(e) = process(&args) {
        error!("{e}");
        process::exit(1);
    }
}
