//! TariffScope CLI: fetch trade data, analyse it, and manage the cache.
//!
//! Commands:
//! - `fetch`: download (or generate) Colombia-USA/China records and write them as CSV
//! - `analyze`: analyse a CSV file and write the report into an output directory
//! - `run`: fetch + analyze in one step, driven by a TOML config
//! - `cache status`: report what is cached per partner

mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use tariffscope_core::data::{
    write_records_csv, CircuitBreaker, ComtradeProvider, LogProgress, ParquetCache, TradeProvider,
};
use tariffscope_core::Partner;
use tariffscope_runner::reporting::{export_run_with_report, key_findings, ReportOptions};
use tariffscope_runner::{
    load_records, run_analysis, AnalysisConfig, AnalysisResult, ArtifactPaths, LoadOptions,
    SourceKind,
};

use crate::logging::{init_logging, LogFormat};

const DEFAULT_CONFIG: &str = "analysis.toml";

#[derive(Parser)]
#[command(
    name = "tariffscope",
    about = "TariffScope: Colombia trade with the USA and China across US tariff periods"
)]
struct Cli {
    /// Base log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FetchSource {
    Synthetic,
    Comtrade,
}

#[derive(Subcommand)]
enum Commands {
    /// Download trade data from UN Comtrade (or generate it) and write a CSV file.
    Fetch {
        #[arg(long, value_enum, default_value_t = FetchSource::Comtrade)]
        source: FetchSource,

        /// Output CSV path.
        #[arg(long, default_value = "data/trade_data.csv")]
        output: PathBuf,

        /// Config file. Defaults to ./analysis.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Analyse a trade CSV and write tables, charts and reports.
    Analyze {
        /// Input CSV (long or wide layout).
        #[arg(long, default_value = "data/trade_data.csv")]
        input: PathBuf,

        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Config file. Defaults to ./analysis.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip SVG chart rendering.
        #[arg(long, default_value_t = false)]
        no_charts: bool,
    },
    /// Fetch and analyse in one step.
    Run {
        /// Config file. Defaults to ./analysis.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Offline mode: cache and synthetic data only.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic data only.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory (overrides the config).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Open the HTML report when done.
        #[arg(long, default_value_t = false)]
        open: bool,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached partners, date ranges and sizes.
    Status {
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Fetch {
            source,
            output,
            config,
            force,
        } => run_fetch(source, &output, config.as_deref(), force),
        Commands::Analyze {
            input,
            output_dir,
            config,
            no_charts,
        } => run_analyze(input, &output_dir, config.as_deref(), no_charts),
        Commands::Run {
            config,
            offline,
            synthetic,
            output_dir,
            open,
        } => run_full(config.as_deref(), offline, synthetic, output_dir, open),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

/// Explicit path, else `./analysis.toml` if it exists, else defaults.
fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.exists()),
    };
    match path {
        Some(p) => {
            info!(path = %p.display(), "loading config");
            AnalysisConfig::from_file(&p)
                .with_context(|| format!("failed to load config {}", p.display()))
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn build_provider(config: &AnalysisConfig) -> Result<ComtradeProvider> {
    let breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = ComtradeProvider::new(breaker).context("failed to build HTTP client")?;
    Ok(match &config.data.comtrade_url {
        Some(url) => provider.with_base_url(url.clone()),
        None => provider,
    })
}

fn run_fetch(source: FetchSource, output: &Path, config: Option<&Path>, force: bool) -> Result<()> {
    let mut config = load_config(config)?;
    config.data.source = match source {
        FetchSource::Synthetic => SourceKind::Synthetic,
        FetchSource::Comtrade => SourceKind::Comtrade,
    };
    config.data.force_download |= force;

    let opts = LoadOptions::from_config(&config)?;
    let cache = ParquetCache::new(&config.data.cache_dir);
    let provider = match config.data.source {
        SourceKind::Comtrade if !config.data.offline => Some(build_provider(&config)?),
        _ => None,
    };
    let provider_ref = provider.as_ref().map(|p| p as &dyn TradeProvider);

    let loaded = load_records(&Partner::ALL, &cache, provider_ref, Some(&LogProgress), &opts)?;
    write_records_csv(output, &loaded.records)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {} records to {}", loaded.records.len(), output.display());
    for (partner, source) in &loaded.sources {
        println!("  {:<6} {source}", partner.to_string());
    }
    if loaded.has_synthetic {
        println!("WARNING: output contains SYNTHETIC data");
    }
    Ok(())
}

fn report_options(config: &AnalysisConfig) -> ReportOptions {
    ReportOptions {
        charts: config.report.charts,
        ..ReportOptions::default()
    }
}

fn run_analyze(input: PathBuf, output_dir: &Path, config: Option<&Path>, no_charts: bool) -> Result<()> {
    let mut config = load_config(config)?;
    config.data.source = SourceKind::Csv;
    config.data.csv_path = Some(input);
    if no_charts {
        config.report.charts = false;
    }

    let cache = ParquetCache::new(&config.data.cache_dir);
    let result = run_analysis(&config, &cache, None, None)?;
    let paths = export_run_with_report(output_dir, &result, &report_options(&config))?;

    print_findings(&result);
    print_paths(&paths);
    Ok(())
}

fn run_full(
    config: Option<&Path>,
    offline: bool,
    synthetic: bool,
    output_dir: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let mut config = load_config(config)?;
    config.data.offline |= offline;
    if synthetic {
        config.data.source = SourceKind::Synthetic;
    }
    if let Some(dir) = output_dir {
        config.report.output_dir = dir;
    }

    let cache = ParquetCache::new(&config.data.cache_dir);
    let provider = match config.data.source {
        SourceKind::Comtrade if !config.data.offline => Some(build_provider(&config)?),
        _ => None,
    };
    let provider_ref = provider.as_ref().map(|p| p as &dyn TradeProvider);

    let result = run_analysis(&config, &cache, provider_ref, Some(&LogProgress))?;
    let paths = export_run_with_report(&config.report.output_dir, &result, &report_options(&config))?;

    print_findings(&result);
    print_paths(&paths);

    if open {
        if let Some(report) = &paths.report_html {
            open_in_browser(report);
        }
    }
    Ok(())
}

fn open_in_browser(path: &Path) {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };
    if let Err(e) = command.arg(path).spawn() {
        warn!(path = %path.display(), error = %e, "could not open report");
    }
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::new(cache_dir);
    let statuses = cache.status(&Partner::ALL);
    if statuses.iter().all(|s| !s.cached) {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let mut total_size = 0u64;
    println!("Cache: {}", cache_dir.display());
    println!();
    println!(
        "{:<8} {:<26} {:>8} {:<12} {:>10}",
        "Partner", "Date Range", "Records", "Source", "Size"
    );
    println!("{}", "-".repeat(68));
    for s in &statuses {
        let size = dir_size(&cache_dir.join(format!("partner={}", s.partner.slug())));
        total_size += size;
        let range = match (s.start_date, s.end_date) {
            (Some(a), Some(b)) => format!("{a} to {b}"),
            _ => "(not cached)".to_string(),
        };
        let records = s.record_count.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
        let source = s.source.map(|src| src.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:<8} {:<26} {:>8} {:<12} {:>10}",
            s.partner.to_string(),
            range,
            records,
            source,
            format_size(size)
        );
    }
    println!();
    println!("Total size: {}", format_size(total_size));
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                size += meta.len();
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn print_findings(result: &AnalysisResult) {
    println!();
    println!("=== {} ===", result.title);
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        println!("Data:      {start} to {end}");
    }
    println!("Records:   {}", result.record_count());
    let periods: Vec<&str> = result
        .aggregation
        .periods()
        .iter()
        .map(|p| p.slug())
        .collect();
    println!("Periods:   {}", periods.join(", "));
    println!("Dataset:   {}", result.dataset_hash);

    let findings = key_findings(&result.aggregation, &result.boundaries);
    if !findings.is_empty() {
        println!();
        println!("Key Findings:");
        for finding in &findings {
            println!();
            println!("{}:", finding.heading);
            for s in &finding.statements {
                println!("- {s}");
            }
        }
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_paths(paths: &ArtifactPaths) {
    println!("Artifacts saved to: {}", paths.output_dir.display());
    if let Some(report) = &paths.report_html {
        println!("Report:             {}", report.display());
    }
}
