use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use crosstab::chart::{ChartKind, ChartOutcome};
use crosstab::driver::{self, DriverArgs, DEFAULT_MEASURE, DEFAULT_URL};
use crosstab::errors::Result;
use crosstab::loader::{Loader, SourceMode};
use crosstab::output::{self, OError};
use crosstab::pivot::AggFn;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::{error, fs, process};

/// Cross-tabulate a register of organizations and chart the result
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Remote spreadsheet (default: the Alsace register)
    #[arg(long, conflicts_with_all = ["upload", "local"])]
    url: Option<String>,
    /// Spreadsheet handed over by the user
    #[arg(long, conflicts_with = "local")]
    upload: Option<PathBuf>,
    /// Spreadsheet used when nothing is uploaded
    #[arg(long, conflicts_with_all = ["url", "local"])]
    fallback: Option<PathBuf>,
    /// Local spreadsheet
    #[arg(long)]
    local: Option<PathBuf>,
    /// Row dimension (repeat for several)
    #[arg(short, long = "row", required = true)]
    rows: Vec<String>,
    /// Column dimension (repeat for several)
    #[arg(short, long = "col")]
    cols: Vec<String>,
    /// Column whose values are counted
    #[arg(long, default_value = DEFAULT_MEASURE)]
    measure: String,
    /// Aggregation
    #[arg(long, value_enum, default_value_t = AggFn::Count)]
    agg: AggFn,
    /// Chart type
    #[arg(long, value_enum, default_value_t = ChartKind::Bar)]
    chart: ChartKind,
    /// Write the chart as a Vega-Lite specification (JSON)
    #[arg(long)]
    chart_file: Option<PathBuf>,
    /// Write the chart as a standalone HTML page
    #[arg(long)]
    html_file: Option<PathBuf>,
    /// Write the pivot table as a spreadsheet
    #[arg(long)]
    xlsx_file: Option<PathBuf>,
    /// Write all results (JSON)
    #[arg(long)]
    outfile: Option<PathBuf>,
    /// Report errors as a JSON file
    #[arg(long)]
    error_file: Option<PathBuf>,
    /// Produce compact JSON files
    #[arg(long)]
    compact: bool,
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn source_mode(args: &Args) -> SourceMode {
    match (&args.url, &args.upload, &args.local, &args.fallback) {
        (_, Some(_), _, _) | (None, None, None, Some(_)) => SourceMode::Upload {
            file: args.upload.clone(),
            fallback: args.fallback.clone(),
        },
        (_, None, Some(path), _) => SourceMode::Local(path.clone()),
        (Some(url), None, None, _) => SourceMode::Remote(url.clone()),
        (None, None, None, None) => SourceMode::Remote(DEFAULT_URL.to_owned()),
    }
}

fn process(args: &Args) -> Result<()> {
    let source = source_mode(args).resolve()?;
    let mut loader = Loader::with_http()?;
    let table = loader.load(&source)?;
    println!("{}\n", output::pretty_preview(&table));

    let driver_args = DriverArgs {
        rows: &args.rows,
        cols: &args.cols,
        measure: &args.measure,
        agg: args.agg,
        chart: args.chart,
    };
    let result = driver::calc(&driver_args, &table)?;
    println!("{}", output::pretty_pivot(&result.pivot));

    match &result.chart {
        ChartOutcome::Rendered(spec) => {
            if let Some(path) = &args.chart_file {
                info!("write: {}", path.display());
                output::write_json(spec, path, args.compact)?;
            }
            if let Some(path) = &args.html_file {
                info!("write: {}", path.display());
                let title = format!("{} by {}", args.measure, args.rows.join(", "));
                fs::write(path, output::chart_html(&title, spec)?)?;
            }
        }
        ChartOutcome::Withheld(w) => println!("\n{w}"),
    }
    if let Some(path) = &args.xlsx_file {
        info!("write: {}", path.display());
        output::write_pivot_xlsx(&result.pivot, path)?;
    }
    if let Some(path) = &args.outfile {
        info!("write: {}", path.display());
        output::write_json(&result, path, args.compact)?;
    }
    Ok(())
}

fn store_error(error_file: &Path, e: &dyn error::Error) -> Result<()> {
    let error = OError {
        error: format!("{e}"),
    };
    output::write_json(&error, error_file, true)
}

fn main() {
    let args = Args::parse();
    pretty_env_logger::formatted_timed_builder()
        .filter_level(args.verbose.log_level_filter())
        .init();
    match process(&args) {
        Ok(()) => (),
        Err(e) => {
            match &args.error_file {
                Some(filename) => match store_error(filename, &*e) {
                    Ok(()) => {
                        info!("error reported: {e}");
                    }
                    Err(e2) => {
                        error!("{e}");
                        error!("{e2}");
                    }
                },
                None => error!("{e}"),
            }
            process::exit(1);
        }
    }
}
