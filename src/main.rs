use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::io::BufReader;
use tokio::sync::Notify;
use tracing::{info, warn};

use catalog_pager::external_sort::SortManifest;
use catalog_pager::service::{CatalogService, Response};
use catalog_pager::utils::{format_bytes, format_elapsed, setup_logging};
use catalog_pager::{CatalogSorter, Config, PageRequest, PaginatedReader};

#[derive(Parser)]
#[command(name = "catalog-pager")]
#[command(about = "Pre-sorts a product catalog by id, name and price and serves paginated views")]
#[command(version)]
struct Args {
    #[arg(short, long, default_value = "catalog_config.json", help = "Configuration file")]
    config: PathBuf,

    #[arg(short, long, help = "Raw source file (overrides config)")]
    source: Option<PathBuf>,

    #[arg(short, long, help = "Directory holding the sorted files (overrides config)")]
    data_dir: Option<PathBuf>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sort the raw source into the three derivative files
    Sort {
        #[arg(short, long, help = "Records per batch (overrides config)")]
        batch_size: Option<usize>,
    },
    /// Print one page as JSON
    Page {
        #[arg(long, default_value = "id")]
        sort_by: String,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        page_number: i64,
        #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
        page_size: i64,
    },
    /// Show the manifest of the last sort run
    Status,
    /// Sort once, then answer JSON requests read line by line from stdin
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_create(&args.config).await?;
    if let Some(source) = args.source {
        config.source_file = source;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_directory = data_dir;
    }

    let verbosity = if args.verbose { "verbose" } else { config.logging.verbosity.as_str() };
    setup_logging(verbosity)?;

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_flag_clone = shutdown_flag.clone();
    let shutdown_notify_clone = shutdown_notify.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received, stopping");
            shutdown_flag_clone.store(true, Ordering::Relaxed);
            shutdown_notify_clone.notify_one();
        }
    });

    match args.command {
        Command::Sort { batch_size } => {
            if let Some(batch_size) = batch_size {
                config.sorter.batch_size = batch_size;
            }
            run_sort(&config, shutdown_flag).await
        }
        Command::Page { sort_by, page_number, page_size } => {
            let reader = PaginatedReader::new(&config.data_directory)
                .with_shutdown_signal(shutdown_flag);
            let request = PageRequest::new(sort_by, page_number, page_size);
            let response = match reader.fetch(&request).await {
                Ok(page) => Response { status: 200, body: serde_json::to_value(&page)? },
                Err(e) => Response::from_error(&e),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response.status != 200 {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Status => print_status(&config),
        Command::Serve => serve(&config, shutdown_flag, &shutdown_notify).await,
    }
}

async fn run_sort(config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    println!("🔍 Source: {}", config.source_file.display());
    println!("📁 Data directory: {}", config.data_directory.display());

    let start_time = Instant::now();
    let sorter = CatalogSorter::new(config.sorter.clone())?.with_shutdown_signal(shutdown_flag);
    let report = sorter.sort(&config.source_file, &config.data_directory).await?;

    println!("\n🎉 Sort completed");
    println!("=======================================");
    println!("📊 Lines read: {}", report.lines_read);
    println!("✨ Records accepted: {}", report.records_accepted);
    println!("🗑️ Records rejected: {}", report.records_rejected);
    println!("📄 Non-record lines: {}", report.non_record_lines);
    println!("📦 Batches: {} ({} runs)", report.batches, report.runs_written);
    println!("⏱️ Total time: {}", format_elapsed(start_time.elapsed()));
    Ok(())
}

fn print_status(config: &Config) -> Result<()> {
    if !SortManifest::exists(&config.data_directory) {
        println!("No sort manifest in {}", config.data_directory.display());
        return Ok(());
    }

    let manifest = SortManifest::load(&config.data_directory)?;
    println!("📝 Last sort: {} (unix time)", manifest.timestamp);
    println!("🔍 Source: {}", manifest.source_file.display());
    for entry in &manifest.derivatives {
        println!(
            "   {:<6} {} ({} records, {})",
            entry.key,
            entry.file_name,
            entry.record_count,
            format_bytes(entry.file_size_bytes)
        );
    }
    if manifest.is_stale(&config.source_file) {
        println!("⚠️ Source changed since the last sort");
    } else {
        println!("✅ Up to date");
    }
    Ok(())
}

async fn serve(config: &Config, shutdown_flag: Arc<AtomicBool>, shutdown: &Notify) -> Result<()> {
    let service = CatalogService::new(config, shutdown_flag)?;

    // A failed startup sort is not fatal: existing files, if any, are served.
    match service.startup().await {
        Ok(report) => info!("Serving {} records", report.records_accepted),
        Err(e) => warn!("Startup sort failed: {}", e),
    }

    let answered = service
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown)
        .await?;
    info!("Answered {} requests", answered);
    Ok(())
}
