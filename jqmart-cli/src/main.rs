//! jqmart CLI — extract raw J-Quants snapshots and build the dimensional marts.
//!
//! Commands:
//! - `extract` — fetch the listed-company master and daily bars into `raw`
//! - `build` — run the transformation pipeline and materialize `marts`
//! - `run` — extract then build
//! - `status` — report warehouse tables, row counts, fingerprints
//! - `export` — dump a mart table to CSV

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use jqmart_core::pipeline::{materialize_marts, run_pipeline, RawInputs};
use jqmart_core::source::synthetic::synthetic_snapshot;
use jqmart_core::source::{
    extract_listed_info, extract_stock_prices, ExtractionConfig, JQuantsClient, StdoutProgress,
};
use jqmart_core::store::{SchemaName, Warehouse};
use polars::prelude::{CsvWriter, SerWriter};

#[derive(Parser)]
#[command(name = "jqmart", about = "J-Quants dimensional mart pipeline")]
struct Cli {
    /// Warehouse directory.
    #[arg(long, global = true, default_value = "data/warehouse")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ExtractArgs {
    /// Number of days of prices to fetch. Defaults to 7.
    #[arg(long)]
    days: Option<i64>,

    /// How many weeks back the window ends (the free plan needs >= 12).
    #[arg(long)]
    weeks_ago: Option<i64>,

    /// Fetch only the listed-company master.
    #[arg(long, default_value_t = false)]
    listed_only: bool,

    /// Fetch only daily prices.
    #[arg(long, default_value_t = false)]
    prices_only: bool,

    /// Land a deterministic synthetic snapshot instead of calling the API.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Optional TOML config file; CLI flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch raw snapshots from J-Quants into the `raw` schema.
    Extract {
        #[command(flatten)]
        args: ExtractArgs,
    },
    /// Run the transformation pipeline over `raw` and materialize the marts.
    Build,
    /// Extract then build.
    Run {
        #[command(flatten)]
        args: ExtractArgs,
    },
    /// Report warehouse tables, row counts, and fingerprints.
    Status,
    /// Export a mart table to CSV.
    Export {
        /// Table name: dim_date, dim_company, or fct_stock_prices.
        table: String,

        /// Output file. Defaults to `{table}.csv`.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    // A missing .env is fine; the key can come from the environment proper.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let warehouse = Warehouse::new(&cli.data_dir);

    match cli.command {
        Commands::Extract { args } => run_extract(&warehouse, &args),
        Commands::Build => run_build(&warehouse),
        Commands::Run { args } => {
            run_extract(&warehouse, &args)?;
            run_build(&warehouse)
        }
        Commands::Status => run_status(&warehouse),
        Commands::Export { table, out } => run_export(&warehouse, &table, out),
    }
}

/// Resolve the extraction window: file config first, then flag overrides.
fn resolve_config(args: &ExtractArgs) -> Result<ExtractionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            ExtractionConfig::from_toml(&content)?
        }
        None => ExtractionConfig::default(),
    };

    if let Some(days) = args.days {
        config.days = days;
    }
    if let Some(weeks_ago) = args.weeks_ago {
        config.weeks_ago = weeks_ago;
    }

    if config.days < 1 {
        bail!("--days must be at least 1");
    }
    Ok(config)
}

fn run_extract(warehouse: &Warehouse, args: &ExtractArgs) -> Result<()> {
    if args.listed_only && args.prices_only {
        bail!("--listed-only and --prices-only are mutually exclusive");
    }

    let config = resolve_config(args)?;
    let today = Local::now().date_naive();
    let start = config.start_date(today);
    let end = config.end_date(today);

    if args.synthetic {
        return run_extract_synthetic(warehouse, args, start, end);
    }

    let client = JQuantsClient::from_env()?;
    let progress = StdoutProgress;

    if !args.prices_only {
        println!("Fetching listed info...");
        let listed = extract_listed_info(&client, &progress)?;
        let meta = warehouse.write_table(SchemaName::Raw, "listed_info", &listed)?;
        println!("raw.listed_info: {} rows saved", meta.row_count);
    }

    if !args.listed_only {
        println!("Fetching stock prices ({start} to {end})...");
        let prices = extract_stock_prices(&client, start, end, &progress)?;
        if prices.height() == 0 {
            eprintln!("WARNING: no stock price data retrieved, skipping save");
        } else {
            let meta = warehouse.write_table(SchemaName::Raw, "stock_prices", &prices)?;
            println!("raw.stock_prices: {} rows saved", meta.row_count);
        }
    }

    Ok(())
}

fn run_extract_synthetic(
    warehouse: &Warehouse,
    args: &ExtractArgs,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> Result<()> {
    println!("Generating synthetic snapshot ({start} to {end})...");
    let (listed, prices) =
        synthetic_snapshot(100, start, end).context("synthetic snapshot generation")?;

    if !args.prices_only {
        let meta = warehouse.write_table(SchemaName::Raw, "listed_info", &listed)?;
        println!("raw.listed_info: {} rows saved (synthetic)", meta.row_count);
    }
    if !args.listed_only {
        let meta = warehouse.write_table(SchemaName::Raw, "stock_prices", &prices)?;
        println!("raw.stock_prices: {} rows saved (synthetic)", meta.row_count);
    }

    Ok(())
}

fn run_build(warehouse: &Warehouse) -> Result<()> {
    let listed_info = warehouse
        .read_table(SchemaName::Raw, "listed_info")
        .context("loading raw.listed_info — run `jqmart extract` first")?;
    let stock_prices = warehouse
        .read_table(SchemaName::Raw, "stock_prices")
        .context("loading raw.stock_prices — run `jqmart extract` first")?;

    let marts = run_pipeline(&RawInputs {
        listed_info,
        stock_prices,
    })?;

    // Nothing is written until every stage has succeeded.
    let metas = materialize_marts(warehouse, &marts)?;

    for stage in &marts.report.stages {
        println!(
            "{:<18} {:>9} rows in {:>9} rows out",
            stage.stage.output_name(),
            stage.rows_in,
            stage.rows_out,
        );
    }
    for meta in &metas {
        println!(
            "marts.{}: {} rows ({})",
            meta.table,
            meta.row_count,
            &meta.fingerprint[..12]
        );
    }
    if marts.report.duplicate_company_codes > 0 {
        println!(
            "note: collapsed {} duplicate company codes",
            marts.report.duplicate_company_codes
        );
    }
    if marts.report.dropped_fact_rows > 0 {
        println!(
            "note: dropped {} price rows with no company dimension row",
            marts.report.dropped_fact_rows
        );
    }

    Ok(())
}

fn run_status(warehouse: &Warehouse) -> Result<()> {
    let metas = warehouse.status();
    if metas.is_empty() {
        println!(
            "warehouse {} is empty — run `jqmart run` to populate it",
            warehouse.root().display()
        );
        return Ok(());
    }

    println!("{:<30} {:>10}  {:<14} written at", "table", "rows", "fingerprint");
    for meta in metas {
        println!(
            "{:<30} {:>10}  {:<14} {}",
            format!("{}.{}", meta.schema, meta.table),
            meta.row_count,
            &meta.fingerprint[..12],
            meta.written_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

fn run_export(warehouse: &Warehouse, table: &str, out: Option<PathBuf>) -> Result<()> {
    const MART_TABLES: &[&str] = &["dim_date", "dim_company", "fct_stock_prices"];
    if !MART_TABLES.contains(&table) {
        bail!(
            "unknown mart table '{table}' — expected one of: {}",
            MART_TABLES.join(", ")
        );
    }

    let mut df = warehouse.read_table(SchemaName::Marts, table)?;
    let out = out.unwrap_or_else(|| PathBuf::from(format!("{table}.csv")));

    let file = std::fs::File::create(&out)
        .with_context(|| format!("create {}", out.display()))?;
    CsvWriter::new(file)
        .finish(&mut df)
        .with_context(|| format!("write CSV {}", out.display()))?;

    println!("exported marts.{table} ({} rows) to {}", df.height(), out.display());
    Ok(())
}
