//! Sizes the worker pool from the machine's resources, spawns the workers,
//! and assembles the final run report.

use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use gramsieve_common::Config;
use tokio::runtime::Runtime;
use tracing::{error, info};
use uuid::Uuid;

use crate::infra::persist::ArtifactWriter;
use crate::infra::pictures::{HttpPictureFetcher, PictureFetcher};
use crate::infra::progress::{FailureLog, ProgressStore};
use crate::infra::queue::WorkQueue;
use crate::pipeline::stats::{RunSummary, StatsCounters, Totals};
use crate::pipeline::worker::{ItemReport, RunContext, Worker};
use crate::session::{ChromeSessionFactory, SessionFactory};

/// Estimated resident memory per browser session, in GiB.
const SESSION_MEMORY_GB: f64 = 1.2;
/// Written into the output directory when any item failed for good.
const FAILURE_FILE: &str = "no_response.csv";

/// Execute one full harvest run: load pending work, drive it through a
/// worker pool against the configured WebDriver endpoint, and report.
pub fn run(config: &Config) -> anyhow::Result<RunSummary> {
    let started = Instant::now();
    let run_id = Uuid::new_v4();
    info!(%run_id, "harvest run starting");

    let progress = ProgressStore::open(&config.done_file);
    let mut pending = progress.load(Path::new(&config.input_file));
    if let Some(limit) = config.item_limit {
        pending.truncate(limit);
    }
    let total = pending.len();
    if pending.is_empty() {
        info!("no new profiles to process");
        return Ok(RunSummary {
            totals: Totals::default(),
            elapsed: started.elapsed(),
        });
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {}", config.output_dir))?;

    let runtime = Runtime::new().context("starting async runtime")?;
    let ctx = Arc::new(RunContext {
        queue: WorkQueue::new(pending),
        progress,
        failures: FailureLog::new(),
        stats: StatsCounters::new(total as u32),
        artifacts: ArtifactWriter::new(&config.output_dir),
        target_records: config.target_records,
        throttle: true,
    });
    let sessions: Arc<dyn SessionFactory> = Arc::new(ChromeSessionFactory::new(
        runtime.handle().clone(),
        &config.webdriver_url,
        config.session_id.clone(),
    ));
    let pictures: Arc<dyn PictureFetcher> =
        Arc::new(HttpPictureFetcher::new(runtime.handle().clone()));

    let workers = optimal_worker_count(config).min(total);
    info!(workers, total, "spawning workers");

    let mut processed = 0usize;
    run_pool(ctx.clone(), sessions, pictures, workers, |report| {
        processed += 1;
        info!(
            done = processed,
            total,
            url = %report.item.url,
            saved = report.saved,
            "item finished"
        );
    });

    if !ctx.failures.is_empty() {
        let path = Path::new(&config.output_dir).join(FAILURE_FILE);
        match ctx.failures.write_csv(&path) {
            Ok(()) => {
                info!(count = ctx.failures.len(), file = %path.display(), "failure list written")
            }
            Err(error) => error!(%error, "could not write failure list"),
        }
    }

    Ok(RunSummary {
        totals: ctx.stats.snapshot(),
        elapsed: started.elapsed(),
    })
}

/// Spawn `count` workers over the shared context and block until the queue
/// is drained and every worker has exited. `on_item` runs on this thread
/// for each finished item.
pub fn run_pool(
    ctx: Arc<RunContext>,
    sessions: Arc<dyn SessionFactory>,
    pictures: Arc<dyn PictureFetcher>,
    count: usize,
    mut on_item: impl FnMut(&ItemReport),
) {
    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::with_capacity(count);
    for id in 0..count {
        let worker = Worker::new(
            id,
            ctx.clone(),
            sessions.clone(),
            pictures.clone(),
            tx.clone(),
        );
        let spawned = thread::Builder::new()
            .name(format!("harvest-worker-{id}"))
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(error) => error!(%error, worker = id, "failed to spawn worker thread"),
        }
    }
    drop(tx);

    for report in rx {
        on_item(&report);
    }

    for handle in handles {
        if handle.join().is_err() {
            error!("worker thread panicked");
        }
    }
}

/// Pool size for this machine: the configured cap, constrained by available
/// memory (one browser per `SESSION_MEMORY_GB`) and by physical cores less
/// one, never below a single worker.
fn optimal_worker_count(config: &Config) -> usize {
    if config.force_max_workers {
        return config.max_workers.max(1);
    }
    let cpus = num_cpus::get_physical();
    let available_gb = available_memory_gb();
    let count = clamp_worker_count(config.max_workers, cpus, available_gb);
    info!(
        workers = count,
        cpus,
        available_gb = format!("{available_gb:.1}"),
        "sized worker pool"
    );
    count
}

fn clamp_worker_count(cap: usize, cpus: usize, available_gb: f64) -> usize {
    let by_memory = ((available_gb / SESSION_MEMORY_GB).floor() as usize).max(1);
    let by_cpu = cpus.saturating_sub(1).max(1);
    cap.min(by_memory).min(by_cpu).max(1)
}

fn available_memory_gb() -> f64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    system.available_memory() as f64 / (1024.0 * 1024.0 * 1024.0)
}
