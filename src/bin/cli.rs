use clap::Parser;
use provider_dashboard::config::init_logging;
use provider_dashboard::country::IsoCountryRegistry;
use provider_dashboard::downloader::to_csv;
use provider_dashboard::graph::{GraphOptions, save_chart};
use provider_dashboard::loader::load_workbook;
use provider_dashboard::pipeline::{PipelineContext, run, sheet_options};
use provider_dashboard::presentation::{LabeledTable, build_payload};
use provider_dashboard::{FilterSpec, PipelineKind};
use std::path::PathBuf;

/// Offline version of the dashboard: prints summary tables and writes charts
#[derive(Parser, Debug)]
#[command(name = "dashboard-cli", version)]
struct Args {
    /// Spreadsheet to read
    file: PathBuf,

    /// Sheet to visualise; lists the sheets when omitted
    #[arg(long)]
    sheet: Option<String>,

    /// Which dashboard to build
    #[arg(long, default_value = "monthly")]
    pipeline: PipelineKind,

    /// Provider to filter on; lists candidates when omitted
    #[arg(long)]
    provider: Option<String>,

    /// Year to filter on; lists candidates when omitted
    #[arg(long)]
    year: Option<i32>,

    /// Directory to write chart SVGs and table CSVs into
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let workbook = load_workbook(&args.file)?;
    let registry = IsoCountryRegistry;

    let Some(sheet) = args.sheet.as_deref() else {
        println!("Sheets:");
        for name in workbook.sheet_names() {
            println!("  {}", name);
        }
        return Ok(());
    };

    let table = workbook
        .table(sheet)
        .ok_or_else(|| format!("sheet '{}' not found", sheet))?;

    let (provider, year) = match (args.provider, args.year) {
        (Some(provider), Some(year)) => (provider, year),
        _ => {
            let options = sheet_options(table, args.pipeline, &registry)?;
            println!("Providers: {}", options.providers.join(", "));
            let years: Vec<String> = options.years.iter().map(|y| y.to_string()).collect();
            println!("Years: {}", years.join(", "));
            if !options.rejected.is_empty() {
                println!("{} row(s) could not be read", options.rejected.len());
            }
            return Ok(());
        }
    };

    let ctx = PipelineContext::new(table, FilterSpec::new(provider, year), &registry);
    let report = run(args.pipeline, &ctx)?;
    let payload = build_payload(&report);

    for table in &payload.tables {
        print_table(table);
    }
    for rejected in &payload.rejected {
        eprintln!(
            "skipped row {}: {} '{}' ({})",
            rejected.row, rejected.column, rejected.value, rejected.reason
        );
    }

    if let Some(dir) = args.out {
        std::fs::create_dir_all(&dir)?;
        let options = GraphOptions {
            width: args.width,
            height: args.height,
        };

        for (idx, chart) in payload.charts.iter().enumerate() {
            let path = dir.join(format!("chart_{}.svg", idx + 1));
            save_chart(chart, &options, &path)?;
            println!("Created chart '{}' at {}", chart.title, path.display());
        }
        for (idx, table) in payload.tables.iter().enumerate() {
            let path = dir.join(format!("table_{}.csv", idx + 1));
            std::fs::write(&path, to_csv(table)?)?;
            println!("Created table '{}' at {}", table.title, path.display());
        }
    }

    Ok(())
}

fn print_table(table: &LabeledTable) {
    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.len()).collect();
    for row in &table.rows {
        for (idx, value) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(value.len());
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("\n{}", table.title);
    println!("{}", line(&table.columns));
    println!("{}", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    if table.rows.is_empty() {
        println!("(no rows)");
    }
    for row in &table.rows {
        println!("{}", line(row));
    }
}
