use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reposcribe::export::export_csv;
use reposcribe::{HarvestConfig, HarvestEngine};

#[derive(Parser)]
#[command(name = "reposcribe")]
#[command(about = "Resumable GitHub commit history harvester")]
#[command(version)]
struct Cli {
    /// Repository owner (user or organization)
    #[arg(short, long)]
    owner: String,

    /// Repository name
    #[arg(short, long)]
    repo: String,

    /// Commits per listing page
    #[arg(long, default_value_t = 100)]
    per_page: u32,

    /// Commit sha to stop at (its page is still fully processed)
    #[arg(long)]
    stop_sha: Option<String>,

    /// Save per-commit patches and raw detail JSON to disk
    #[arg(long)]
    save_files: bool,

    /// Export the progress file to CSV after the harvest
    #[arg(long)]
    export: bool,

    /// Concurrent detail-fetch workers
    #[arg(long, default_value_t = 5)]
    workers: usize,

    /// Directory for the progress file and artifacts
    #[arg(long, default_value = ".")]
    data_dir: std::path::PathBuf,

    /// GitHub access token (falls back to GITHUB_ACCESS_TOKEN / GITHUB_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting RepoScribe v{}", env!("CARGO_PKG_VERSION"));

    let mut config = HarvestConfig::new(cli.owner, cli.repo, cli.token)?;
    config.per_page = cli.per_page;
    config.stop_sha = cli.stop_sha;
    config.save_files = cli.save_files;
    config.workers = cli.workers;
    config.data_dir = cli.data_dir;

    let progress_path = config.progress_path();
    let export_path = config.export_path();
    let export_requested = cli.export;

    let engine = HarvestEngine::new(config)?;
    let summary = engine.run().await?;

    println!("\n🎉 Harvest Complete!");
    println!("   📄 Pages fetched: {}", summary.pages);
    println!("   ✅ New commits: {}", summary.new_records);
    println!("   ⏭️  Skipped (already processed): {}", summary.skipped);
    println!("   ❌ Failed items: {}", summary.failed);
    println!("   📊 Total records: {}", summary.total_records);
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("   💾 Progress file: {}", progress_path.display());

    if summary.failed > 0 {
        println!("\n💡 Failed commits were not marked processed; re-run to retry them");
    }

    if export_requested {
        export_csv(&progress_path, &export_path)?;
        println!("   📋 Exported: {}", export_path.display());
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}
