use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gramsieve_common::Config;
use gramsieve_harvester::pipeline::supervisor;

/// Concurrent Instagram profile harvester over real browser sessions.
#[derive(Parser, Debug)]
#[command(name = "gramsieve-harvester")]
struct Cli {
    /// CSV of profile URLs to harvest (overrides GS_INPUT_FILE).
    #[arg(long)]
    input: Option<String>,

    /// Done-list CSV tracking completed URLs (overrides GS_DONE_FILE).
    #[arg(long)]
    done_file: Option<String>,

    /// Directory for harvested artifacts (overrides GS_OUTPUT_DIR).
    #[arg(long)]
    output_dir: Option<String>,

    /// WebDriver endpoint (overrides GS_WEBDRIVER_URL).
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Exact number of concurrent browser workers.
    #[arg(long)]
    workers: Option<usize>,

    /// Timeline records to accumulate per profile before stopping.
    #[arg(long)]
    target: Option<usize>,

    /// Process at most this many pending items this run.
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("gramsieve_harvester=info".parse()?),
        )
        .init();

    info!("Gramsieve harvester starting...");

    let cli = Cli::parse();

    // Load config, then apply CLI overrides
    let mut config = Config::from_env();
    if let Some(input) = cli.input {
        config.input_file = input;
    }
    if let Some(done_file) = cli.done_file {
        config.done_file = done_file;
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(webdriver_url) = cli.webdriver_url {
        config.webdriver_url = webdriver_url;
    }
    if let Some(workers) = cli.workers {
        config.max_workers = workers;
        config.force_max_workers = true;
    }
    if let Some(target) = cli.target {
        config.target_records = target;
    }
    if let Some(limit) = cli.limit {
        config.item_limit = Some(limit);
    }
    config.log_redacted();

    let summary = supervisor::run(&config)?;
    info!("{summary}");

    Ok(())
}
