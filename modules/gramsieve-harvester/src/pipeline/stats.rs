use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Totals from a harvest run.
#[derive(Debug, Default, Clone, Copy)]
pub struct Totals {
    pub total: u32,
    pub saved: u32,
    pub failed: u32,
    pub pictures_downloaded: u32,
}

/// Shared counters the workers bump as items finish.
pub struct StatsCounters {
    inner: Mutex<Totals>,
}

impl StatsCounters {
    pub fn new(total: u32) -> Self {
        Self {
            inner: Mutex::new(Totals {
                total,
                ..Totals::default()
            }),
        }
    }

    pub fn record_saved(&self) {
        self.lock().saved += 1;
    }

    pub fn record_failed(&self) {
        self.lock().failed += 1;
    }

    pub fn record_picture(&self) {
        self.lock().pictures_downloaded += 1;
    }

    pub fn snapshot(&self) -> Totals {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Totals> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Final report printed when the run ends.
#[derive(Debug)]
pub struct RunSummary {
    pub totals: Totals,
    pub elapsed: Duration,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Harvest Run Complete ===")?;
        writeln!(f, "URLs processed:      {}", self.totals.total)?;
        writeln!(f, "Profiles saved:      {}", self.totals.saved)?;
        writeln!(f, "Pictures downloaded: {}", self.totals.pictures_downloaded)?;
        writeln!(f, "Failed or private:   {}", self.totals.failed)?;
        writeln!(f, "Elapsed:             {:.0}s", self.elapsed.as_secs_f64())?;
        Ok(())
    }
}
