//! Drives repeated load-more rounds against one profile page until the
//! timeline has enough records, stops growing, or the fetch budget runs out.

use std::thread;
use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use tracing::{info, warn};

use crate::harvest::classify::classify_event;
use crate::harvest::merge::Accumulation;
use crate::session::BrowserSession;

/// Records to bank before stagnation alone may end the harvest.
pub const MIN_RECORD_FLOOR: usize = 30;
/// Consecutive no-growth evaluations that count as stagnation.
pub const STAGNATION_LIMIT: u32 = 3;
/// Hard cap on load-more rounds per profile.
pub const MAX_FETCH_ATTEMPTS: u32 = 15;

/// Seconds to let the page settle after the initial navigation.
const SETTLE_WAIT_SECS: (f64, f64) = (1.0, 3.0);
/// Seconds to wait after each load-more trigger before reading events.
const FETCH_WAIT_SECS: (f64, f64) = (2.5, 4.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The record target was reached.
    TargetReached,
    /// The count stopped growing with enough records already banked.
    Stagnation,
    /// The fetch budget ran out; whatever accumulated stands.
    AttemptsExhausted,
}

pub struct ScrollController {
    target: usize,
    floor: usize,
    stagnation_limit: u32,
    max_attempts: u32,
    settle_wait: (f64, f64),
    fetch_wait: (f64, f64),
    attempts: u32,
    stagnation: u32,
    prev_count: usize,
}

impl ScrollController {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            floor: MIN_RECORD_FLOOR,
            stagnation_limit: STAGNATION_LIMIT,
            max_attempts: MAX_FETCH_ATTEMPTS,
            settle_wait: SETTLE_WAIT_SECS,
            fetch_wait: FETCH_WAIT_SECS,
            attempts: 0,
            stagnation: 0,
            prev_count: 0,
        }
    }

    /// Controller with explicit thresholds and no waits between rounds.
    pub fn tuned(target: usize, floor: usize, stagnation_limit: u32, max_attempts: u32) -> Self {
        Self {
            target,
            floor,
            stagnation_limit,
            max_attempts,
            settle_wait: (0.0, 0.0),
            fetch_wait: (0.0, 0.0),
            attempts: 0,
            stagnation: 0,
            prev_count: 0,
        }
    }

    /// Harvest one profile page into `acc`. Only the initial navigation is
    /// fatal; every later session hiccup degrades to "no new events this
    /// round" and the termination rules still apply.
    pub fn run(
        mut self,
        session: &mut dyn BrowserSession,
        url: &str,
        acc: &mut Accumulation,
    ) -> anyhow::Result<StopReason> {
        session
            .open(url)
            .with_context(|| format!("opening profile page {url}"))?;
        sleep_uniform(self.settle_wait);
        self.fetch(session);

        loop {
            collect_events(session, acc);
            if let Some(reason) = self.evaluate(acc.record_count()) {
                return Ok(reason);
            }
            self.fetch(session);
        }
    }

    fn fetch(&self, session: &mut dyn BrowserSession) {
        if let Err(error) = session.trigger_load_more() {
            warn!(%error, "load-more trigger failed, continuing");
        }
        sleep_uniform(self.fetch_wait);
    }

    /// Apply the termination rules to the current record count, in
    /// precedence order: target, then stagnation, then the attempt cap.
    /// `None` means fetch another round.
    fn evaluate(&mut self, count: usize) -> Option<StopReason> {
        if count >= self.target {
            return Some(StopReason::TargetReached);
        }
        if count == self.prev_count {
            self.stagnation += 1;
            if self.stagnation >= self.stagnation_limit && count >= self.floor {
                return Some(StopReason::Stagnation);
            }
        } else {
            self.stagnation = 0;
            self.prev_count = count;
            info!(records = count, target = self.target, "timeline grew");
        }
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            return Some(StopReason::AttemptsExhausted);
        }
        None
    }
}

fn collect_events(session: &mut dyn BrowserSession, acc: &mut Accumulation) {
    let events = match session.read_captured_events() {
        Ok(events) => events,
        Err(error) => {
            warn!(%error, "reading captured events failed, treating as no new events");
            return;
        }
    };
    for event in events {
        let classified = classify_event(&event, |id| session.fetch_event_body(id));
        acc.apply(classified);
    }
}

fn sleep_uniform(range: (f64, f64)) {
    let (lo, hi) = range;
    if hi <= lo {
        return;
    }
    let secs = rand::rng().random_range(lo..hi);
    thread::sleep(Duration::from_secs_f64(secs));
}
