//! CLI entry point for the Scorecard underemployment analyzer.
//!
//! Provides subcommands for running the full analysis, writing the causal
//! export on its own and inspecting how a table's columns resolve.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use scorecard_analyzer::analyzers::analyzer::Analyzer;
use scorecard_analyzer::analyzers::resolver::SemanticField;
use scorecard_analyzer::config::AnalysisConfig;
use scorecard_analyzer::loader::load_table;
use scorecard_analyzer::output::{print_pretty, write_export, write_json, write_records, write_text};
use scorecard_analyzer::report::build_report;
use scorecard_analyzer::table::RawTable;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "scorecard_analyzer")]
#[command(about = "Underemployment analysis of College Scorecard institution data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis and write the report and detailed results
    Analyze {
        /// Path or URL of the Scorecard CSV (defaults to $SCORECARD_DATA_PATH)
        #[arg(long, value_name = "FILE_OR_URL")]
        data_path: Option<String>,

        /// Directory to write reports into
        #[arg(short, long, default_value = "reports")]
        output_dir: PathBuf,

        /// JSON file overriding thresholds, aliases and the field catalog
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also write the row-preserving dataset for causal analysis
        #[arg(long, default_value_t = false)]
        export_causal: bool,

        /// Gzip compress the causal export
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Number of fields listed in the report's risk ranking
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Write only the dataset for causal analysis
    Export {
        /// Path or URL of the Scorecard CSV (defaults to $SCORECARD_DATA_PATH)
        #[arg(long, value_name = "FILE_OR_URL")]
        data_path: Option<String>,

        /// CSV file to write
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Rename columns to snake_case semantic names
        #[arg(long, default_value_t = false)]
        rename: bool,

        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Show which columns the table provides for each analysis input
    Inspect {
        #[arg(long, value_name = "FILE_OR_URL")]
        data_path: Option<String>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/scorecard_analyzer.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("scorecard_analyzer.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            data_path,
            output_dir,
            config,
            export_causal,
            gzip,
            top,
        } => run_analyze(data_path, &output_dir, config, export_causal, gzip, top),
        Commands::Export {
            data_path,
            output,
            config,
            rename,
            gzip,
        } => run_export(data_path, &output, config, rename, gzip),
        Commands::Inspect { data_path, config } => run_inspect(data_path, config),
    };

    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "Run failed");
    }
    result
}

/// Resolves the data source from the flag or the environment.
fn data_source(flag: Option<String>) -> Result<String> {
    flag.or_else(|| std::env::var("SCORECARD_DATA_PATH").ok())
        .context("no data source: pass --data-path or set SCORECARD_DATA_PATH")
}

/// Loads configuration first so a bad config fails before any data is read.
fn prepare(data_path: Option<String>, config: Option<PathBuf>) -> Result<(String, AnalysisConfig, RawTable)> {
    let config = AnalysisConfig::load_or_default(config.as_deref())?;
    let source = data_source(data_path)?;
    let table = match load_table(&source) {
        Ok(table) => table,
        Err(e) => {
            error!(kind = e.kind(), source = %source, "Failed to load table");
            return Err(anyhow::Error::new(e).context(format!("loading {source}")));
        }
    };
    info!(source = %source, rows = table.len(), columns = table.headers().len(), "Table loaded");
    Ok((source, config, table))
}

#[tracing::instrument(skip_all, fields(output_dir = %output_dir.display()))]
fn run_analyze(
    data_path: Option<String>,
    output_dir: &Path,
    config: Option<PathBuf>,
    export_causal: bool,
    gzip: bool,
    top: usize,
) -> Result<()> {
    let (source, config, table) = prepare(data_path, config)?;
    let analyzer = Analyzer::new(&table, &config);
    let bundle = analyzer.run().with_source(&source);
    print_pretty(&bundle);

    for note in &bundle.annotations {
        warn!(%note, "Analysis note");
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let results_dir = output_dir.join("detailed_results");

    let report = build_report(&bundle, top);
    println!("{report}");
    let report_path = output_dir.join(format!("underemployment_analysis_{ts}.txt"));
    write_text(&report_path, &report)?;

    write_records(
        &results_dir.join(format!("field_risk_{ts}.csv")),
        &bundle.field_risk.rows,
    )?;
    write_records(
        &results_dir.join(format!("completion_gradient_{ts}.csv")),
        &bundle.completion_gradient,
    )?;
    write_records(
        &results_dir.join(format!("institution_effects_{ts}.csv")),
        &bundle.institution_types,
    )?;
    write_records(
        &results_dir.join(format!("socioeconomic_patterns_{ts}.csv")),
        &bundle.socioeconomic.bands,
    )?;
    if !bundle.socioeconomic.by_control.is_empty() {
        write_records(
            &results_dir.join(format!("socioeconomic_by_control_{ts}.csv")),
            &bundle.socioeconomic.by_control,
        )?;
    }
    write_json(&results_dir.join(format!("summary_{ts}.json")), &bundle)?;

    if export_causal {
        let (export, notes) = analyzer.causal_export();
        for note in &notes {
            warn!(%note, "Export note");
        }
        let name = if gzip {
            format!("causal_analysis_data_{ts}.csv.gz")
        } else {
            format!("causal_analysis_data_{ts}.csv")
        };
        write_export(&output_dir.join(name), &export, gzip)?;
    }

    info!(report = %report_path.display(), results = %results_dir.display(), "Analysis outputs written");
    Ok(())
}

#[tracing::instrument(skip_all, fields(output = %output.display()))]
fn run_export(
    data_path: Option<String>,
    output: &Path,
    config: Option<PathBuf>,
    rename: bool,
    gzip: bool,
) -> Result<()> {
    let (_, mut config, table) = prepare(data_path, config)?;
    config.export.rename |= rename;

    let analyzer = Analyzer::new(&table, &config);
    let (export, notes) = analyzer.causal_export();
    for note in &notes {
        warn!(%note, "Export note");
    }

    write_export(output, &export, gzip)
}

fn run_inspect(data_path: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let (source, config, table) = prepare(data_path, config)?;
    let analyzer = Analyzer::new(&table, &config);
    let resolution = analyzer.resolution();

    println!("Source: {source}");
    println!("Rows: {}  Columns: {}", table.len(), table.headers().len());
    println!();
    for field in SemanticField::ALL {
        match resolution.get(field) {
            Some(resolved) => println!(
                "  {:<20} {:<8} {}",
                field.as_str(),
                resolved.kind.as_str(),
                resolved.column
            ),
            None => println!("  {:<20} {:<8} (unavailable)", field.as_str(), ""),
        }
    }
    println!();
    println!(
        "Field-of-study columns: {} of {}",
        resolution.field_shares.len(),
        config.field_catalog.len()
    );

    let notes = resolution.annotations(&config);
    if !notes.is_empty() {
        println!();
        for note in &notes {
            println!("- {note}");
        }
    }
    Ok(())
}
