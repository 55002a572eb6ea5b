use anyhow::{anyhow, Result};
use clap::Parser;
use cliclack::log;
use crosstab::chart::{ChartKind, ChartOutcome};
use crosstab::driver::{self, DriverArgs, Output, DEFAULT_FALLBACK, DEFAULT_MEASURE, DEFAULT_URL};
use crosstab::loader::{HttpFetch, Loader, SourceKey, SourceMode};
use crosstab::output;
use crosstab::pivot::AggFn;
use crosstab::table::Table;
use itertools::Itertools;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

/// Explore a register of organizations interactively
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Remote spreadsheet to start with
    #[arg(long, default_value = DEFAULT_URL)]
    url: String,
    /// Column whose values are counted
    #[arg(long, default_value = DEFAULT_MEASURE)]
    measure: String,
}

#[derive(Clone, PartialEq, Eq)]
enum Mode {
    Remote,
    Upload,
    Local,
}

#[derive(Clone, PartialEq, Eq)]
enum Action {
    Rows,
    Cols,
    Agg,
    Chart,
    Source,
    Save,
    Quit,
}

struct State {
    mode: SourceMode,
    rows: Vec<String>,
    cols: Vec<String>,
    measure: String,
    agg: AggFn,
    chart: ChartKind,
}

fn ask_source() -> Result<SourceMode> {
    let mode = cliclack::select("Where is the spreadsheet?")
        .items(&[
            (Mode::Remote, "Remote file", ""),
            (Mode::Upload, "Upload a file", "falls back to the default file"),
            (Mode::Local, "Local file", ""),
        ])
        .interact()?;
    Ok(match mode {
        Mode::Remote => {
            let url: String = cliclack::input("URL")
                .default_input(DEFAULT_URL)
                .interact()?;
            SourceMode::Remote(url)
        }
        Mode::Upload => {
            let file: String = cliclack::input("File to upload (empty for the default file)")
                .required(false)
                .interact()?;
            SourceMode::Upload {
                file: if file.trim().is_empty() {
                    None
                } else {
                    Some(PathBuf::from(file.trim()))
                },
                fallback: Some(PathBuf::from(DEFAULT_FALLBACK)),
            }
        }
        Mode::Local => {
            let path: String = cliclack::input("Path")
                .default_input(DEFAULT_FALLBACK)
                .interact()?;
            SourceMode::Local(PathBuf::from(path))
        }
    })
}

fn load(loader: &mut Loader<HttpFetch>, mode: &SourceMode) -> Result<Option<(SourceKey, Rc<Table>)>> {
    let source = match mode.resolve() {
        Ok(source) => source,
        Err(e) => {
            log::error(format!("{e}"))?;
            return Ok(None);
        }
    };
    let key = source.key();
    let cached = loader.cache().contains(&key);
    let mut spinner = cliclack::spinner();
    if !cached {
        spinner.start(format!("Loading {}...", source.pretty()));
    }
    match loader.load(&source) {
        Ok(table) => {
            if !cached {
                spinner.stop(format!("Loaded {} records", table.len()));
            }
            Ok(Some((key, table)))
        }
        Err(e) => {
            if !cached {
                spinner.error("Loading failed");
            }
            log::error(format!("{e}"))?;
            Ok(None)
        }
    }
}

fn ask_columns(prompt: &str, columns: &[String], required: bool) -> Result<Vec<String>> {
    let items = columns
        .iter()
        .map(|c| (c.clone(), c.clone(), ""))
        .collect_vec();
    let chosen = cliclack::multiselect(prompt)
        .items(&items)
        .required(required)
        .interact()?;
    Ok(chosen)
}

fn summarize(state: &State) -> String {
    let options = textwrap::Options::new(70).subsequent_indent(" ");
    let cols = if state.cols.is_empty() {
        "no column dimension".to_owned()
    } else {
        state.cols.iter().map(|c| format!("'{c}'")).join(" × ")
    };
    let line = format!(
        "{} of '{}' by {} against {}, {} chart",
        state.agg,
        state.measure,
        state.rows.iter().map(|c| format!("'{c}'")).join(" × "),
        cols,
        state.chart,
    );
    textwrap::fill(&line, &options)
}

fn run(table: &Table, state: &State) -> Result<Option<Output>> {
    cliclack::note("Selection", summarize(state))?;
    let args = DriverArgs {
        rows: &state.rows,
        cols: &state.cols,
        measure: &state.measure,
        agg: state.agg,
        chart: state.chart,
    };
    match driver::calc(&args, table) {
        Ok(result) => {
            cliclack::note("Pivot", output::pretty_pivot(&result.pivot))?;
            if let ChartOutcome::Withheld(w) = &result.chart {
                log::warning(format!("{w}"))?;
            }
            Ok(Some(result))
        }
        Err(e) => {
            log::error(format!("{e}"))?;
            Ok(None)
        }
    }
}

fn save(result: &Output, state: &State) -> Result<()> {
    let Some(spec) = result.chart.spec() else {
        log::warning("There is no chart to save")?;
        return Ok(());
    };
    let filename: String = cliclack::input("file name")
        .default_input("chart.html")
        .interact()?;
    let title = format!("{} by {}", state.measure, state.rows.join(", "));
    let html = output::chart_html(&title, spec).map_err(|e| anyhow!("{e}"))?;
    fs::write(&filename, html)?;
    log::info(format!("Wrote to {filename}"))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    cliclack::intro("crosstab-explore")?;
    let mut loader = Loader::with_http().map_err(|e| anyhow!("{e}"))?;
    let mut state = State {
        mode: SourceMode::Remote(args.url.clone()),
        rows: vec![],
        cols: vec![],
        measure: args.measure.clone(),
        agg: AggFn::Count,
        chart: ChartKind::Bar,
    };
    let mut current: Option<SourceKey> = None;
    loop {
        let Some((key, table)) = load(&mut loader, &state.mode)? else {
            state.mode = ask_source()?;
            continue;
        };
        if current.as_ref() != Some(&key) {
            cliclack::note("Preview", output::pretty_preview(&table))?;
            let columns = table.columns();
            state.rows = columns.iter().skip(1).take(1).cloned().collect_vec();
            state.cols = columns.iter().skip(3).take(1).cloned().collect_vec();
            current = Some(key);
        }
        let result = run(&table, &state)?;

        let mut items = vec![
            (Action::Rows, "Choose row dimensions", ""),
            (Action::Cols, "Choose column dimensions", ""),
            (Action::Agg, "Choose aggregation", ""),
            (Action::Chart, "Choose chart type", ""),
            (Action::Source, "Load another spreadsheet", ""),
        ];
        if result.as_ref().is_some_and(|r| r.chart.spec().is_some()) {
            items.push((Action::Save, "Save the chart as an HTML page", ""));
        }
        items.push((Action::Quit, "Quit", ""));
        let choice = cliclack::select("Action?").items(&items).interact()?;
        match choice {
            Action::Quit => break,
            Action::Rows => {
                state.rows = ask_columns("Row dimensions?", table.columns(), true)?;
            }
            Action::Cols => {
                state.cols = ask_columns("Column dimensions (or none)?", table.columns(), false)?;
            }
            Action::Agg => {
                state.agg = cliclack::select("Aggregation?")
                    .items(&[
                        (AggFn::Count, "count", "records"),
                        (AggFn::CountDistinct, "nunique", "distinct identifiers"),
                    ])
                    .interact()?;
            }
            Action::Chart => {
                state.chart = cliclack::select("Chart type?")
                    .items(&[
                        (ChartKind::Bar, "Bars", ""),
                        (ChartKind::Pie, "Pie", "single row dimension only"),
                    ])
                    .interact()?;
            }
            Action::Source => {
                state.mode = ask_source()?;
            }
            Action::Save => {
                if let Some(result) = &result {
                    save(result, &state)?;
                }
            }
        }
    }
    cliclack::outro("Bye!")?;
    Ok(())
}
