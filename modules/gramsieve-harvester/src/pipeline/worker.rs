//! One worker thread: an exclusive browser session draining the shared
//! work queue until it is empty.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gramsieve_common::WorkItem;
use rand::Rng;
use tracing::{error, info, warn};

use crate::harvest::merge::{Accumulation, HarvestOutcome};
use crate::harvest::pacing::compute_wait;
use crate::harvest::scroll::{
    ScrollController, MAX_FETCH_ATTEMPTS, MIN_RECORD_FLOOR, STAGNATION_LIMIT,
};
use crate::infra::persist::ArtifactWriter;
use crate::infra::pictures::PictureFetcher;
use crate::infra::progress::{FailureLog, FailureReason, ProgressStore};
use crate::infra::queue::WorkQueue;
use crate::pipeline::stats::StatsCounters;
use crate::session::{BrowserSession, SessionFactory};

const SESSION_CREATE_ATTEMPTS: u32 = 3;
const SESSION_RETRY_BASE: Duration = Duration::from_secs(2);

/// Everything the workers share for one run.
pub struct RunContext {
    pub queue: WorkQueue,
    pub progress: ProgressStore,
    pub failures: FailureLog,
    pub stats: StatsCounters,
    pub artifacts: ArtifactWriter,
    pub target_records: usize,
    /// Apply the human-like pacing sleeps between browser actions.
    /// Disabled by tests so scripted runs finish instantly.
    pub throttle: bool,
}

/// Sent back to the supervisor as each item finishes, success or not.
#[derive(Debug)]
pub struct ItemReport {
    pub item: WorkItem,
    pub saved: bool,
}

pub struct Worker {
    id: usize,
    ctx: Arc<RunContext>,
    sessions: Arc<dyn SessionFactory>,
    pictures: Arc<dyn PictureFetcher>,
    reports: mpsc::Sender<ItemReport>,
}

impl Worker {
    pub fn new(
        id: usize,
        ctx: Arc<RunContext>,
        sessions: Arc<dyn SessionFactory>,
        pictures: Arc<dyn PictureFetcher>,
        reports: mpsc::Sender<ItemReport>,
    ) -> Self {
        Self {
            id,
            ctx,
            sessions,
            pictures,
            reports,
        }
    }

    /// Claim and process items until the queue is empty. A failed item is
    /// recorded and the loop moves on; only losing the browser session
    /// entirely ends the worker early.
    pub fn run(self) {
        let mut session = match self.create_session() {
            Some(session) => session,
            None => {
                error!(worker = self.id, "could not establish a browser session, exiting");
                return;
            }
        };
        info!(worker = self.id, "worker started");

        while let Some(item) = self.ctx.queue.claim() {
            match self.process(session.as_mut(), &item) {
                Ok(saved) => self.report(item, saved),
                Err(error) => {
                    error!(worker = self.id, url = %item.url, %error, "item failed");
                    self.ctx.failures.record(&item.url, FailureReason::Error);
                    self.ctx.stats.record_failed();
                    self.report(item, false);
                }
            }
        }

        session.close();
        info!(worker = self.id, "queue drained, worker done");
    }

    fn create_session(&self) -> Option<Box<dyn BrowserSession>> {
        for attempt in 0..SESSION_CREATE_ATTEMPTS {
            match self.sessions.create() {
                Ok(session) => return Some(session),
                Err(error) => {
                    warn!(
                        worker = self.id,
                        attempt = attempt + 1,
                        %error,
                        "browser session creation failed"
                    );
                    if attempt + 1 < SESSION_CREATE_ATTEMPTS {
                        thread::sleep(self.session_retry_backoff(attempt));
                    }
                }
            }
        }
        None
    }

    fn session_retry_backoff(&self, attempt: u32) -> Duration {
        if !self.ctx.throttle {
            return Duration::ZERO;
        }
        let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
        SESSION_RETRY_BASE * 3u32.pow(attempt) + jitter
    }

    fn process(&self, session: &mut dyn BrowserSession, item: &WorkItem) -> anyhow::Result<bool> {
        info!(worker = self.id, url = %item.url, "harvesting profile");
        let mut acc = Accumulation::new();
        let controller = if self.ctx.throttle {
            ScrollController::new(self.ctx.target_records)
        } else {
            ScrollController::tuned(
                self.ctx.target_records,
                MIN_RECORD_FLOOR,
                STAGNATION_LIMIT,
                MAX_FETCH_ATTEMPTS,
            )
        };
        let reason = controller.run(session, &item.url, &mut acc)?;

        match acc.outcome() {
            HarvestOutcome::Private => {
                warn!(worker = self.id, url = %item.url, "profile is private, skipping");
                self.ctx.failures.record(&item.url, FailureReason::Private);
                self.ctx.stats.record_failed();
                self.pace(compute_wait(None));
                Ok(false)
            }
            HarvestOutcome::NoData => {
                warn!(worker = self.id, url = %item.url, "no recognizable responses captured");
                self.ctx.failures.record(&item.url, FailureReason::NoData);
                self.ctx.stats.record_failed();
                self.pace(compute_wait(None));
                Ok(false)
            }
            HarvestOutcome::Success => {
                let profile = acc.profile().cloned();
                let wait = compute_wait(acc.profile());
                let records = acc.record_count();
                let dir = self.ctx.artifacts.write(item, acc)?;
                self.ctx.stats.record_saved();
                info!(worker = self.id, url = %item.url, records, ?reason, "profile saved");

                if let Some(profile) = &profile {
                    if self.pictures.download(item, profile, &dir) {
                        self.ctx.stats.record_picture();
                    }
                }
                if let Err(error) = self.ctx.progress.mark_complete(item) {
                    warn!(%error, url = %item.url, "could not record completion");
                }
                self.pace(wait);
                Ok(true)
            }
        }
    }

    fn report(&self, item: WorkItem, saved: bool) {
        let _ = self.reports.send(ItemReport { item, saved });
    }

    fn pace(&self, wait: Duration) {
        if self.ctx.throttle {
            thread::sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        profile_body, run_context, timeline_body_range, ScriptedFactory, ScriptedSession,
        StubPictureFetcher,
    };

    fn worker(
        ctx: Arc<RunContext>,
        factory: ScriptedFactory,
        pictures_succeed: bool,
    ) -> (Worker, mpsc::Receiver<ItemReport>) {
        let (tx, rx) = mpsc::channel();
        let worker = Worker::new(
            0,
            ctx,
            Arc::new(factory),
            Arc::new(StubPictureFetcher {
                succeed: pictures_succeed,
            }),
            tx,
        );
        (worker, rx)
    }

    #[test]
    fn gives_up_without_a_session_and_leaves_the_queue_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = run_context(tmp.path(), &["https://www.instagram.com/a"], 50);
        let (worker, rx) = worker(ctx.clone(), ScriptedFactory::empty(), false);

        worker.run();

        assert_eq!(ctx.queue.len(), 1);
        assert_eq!(ctx.stats.snapshot().saved, 0);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn session_creation_retries_before_succeeding() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = run_context(tmp.path(), &["https://www.instagram.com/late"], 5);
        let session = ScriptedSession::new()
            .with_step(&[profile_body(false), timeline_body_range(0, 10)]);
        let factory = ScriptedFactory::with_results(vec![
            Err(anyhow::anyhow!("driver not ready")),
            Err(anyhow::anyhow!("driver not ready")),
            Ok(session),
        ]);
        let (worker, rx) = worker(ctx.clone(), factory, false);

        worker.run();

        assert!(rx.recv().unwrap().saved);
        assert_eq!(ctx.stats.snapshot().saved, 1);
    }

    #[test]
    fn successful_item_saves_artifacts_and_completion() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = run_context(tmp.path(), &["https://www.instagram.com/someone"], 5);
        let session = ScriptedSession::new()
            .with_step(&[profile_body(false), timeline_body_range(0, 10)]);
        let (worker, rx) = worker(ctx.clone(), ScriptedFactory::new(vec![session]), true);

        worker.run();

        let report = rx.recv().unwrap();
        assert!(report.saved);
        assert_eq!(report.item.short_name, "someone");
        let totals = ctx.stats.snapshot();
        assert_eq!(totals.saved, 1);
        assert_eq!(totals.pictures_downloaded, 1);
        let done = std::fs::read_to_string(tmp.path().join("done.csv")).unwrap();
        assert!(done.contains("https://www.instagram.com/someone"));
        assert!(tmp
            .path()
            .join("output")
            .join("someone")
            .join("userInfo.json")
            .is_file());
        assert!(ctx.failures.is_empty());
    }

    #[test]
    fn private_profile_lands_in_the_failure_log_not_the_done_list() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = run_context(tmp.path(), &["https://www.instagram.com/priv"], 5);
        let session = ScriptedSession::new().with_step(&[profile_body(true)]);
        let (worker, rx) = worker(ctx.clone(), ScriptedFactory::new(vec![session]), false);

        worker.run();

        let report = rx.recv().unwrap();
        assert!(!report.saved);
        assert_eq!(ctx.stats.snapshot().failed, 1);
        assert_eq!(ctx.failures.urls(), vec!["https://www.instagram.com/priv"]);
        assert!(!tmp.path().join("done.csv").exists());
    }

    #[test]
    fn one_bad_item_does_not_stop_the_worker() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = run_context(
            tmp.path(),
            &["https://www.instagram.com/a", "https://www.instagram.com/b"],
            5,
        );
        let session = ScriptedSession::failing_open();
        let (worker, rx) = worker(ctx.clone(), ScriptedFactory::new(vec![session]), false);

        worker.run();

        let reports: Vec<_> = rx.iter().collect();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| !r.saved));
        assert_eq!(ctx.stats.snapshot().failed, 2);
        assert!(ctx.queue.is_empty());
    }

    #[test]
    fn empty_timeline_reports_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = run_context(tmp.path(), &["https://www.instagram.com/ghost"], 5);
        let session = ScriptedSession::new();
        let (worker, rx) = worker(ctx.clone(), ScriptedFactory::new(vec![session]), false);

        worker.run();

        assert!(!rx.recv().unwrap().saved);
        let rows = std::fs::read_to_string(tmp.path().join("done.csv")).unwrap_or_default();
        assert!(!rows.contains("ghost"));
        assert_eq!(ctx.failures.len(), 1);
    }
}
