use std::time::Duration;

use gramsieve_common::ProfileSnapshot;
use rand::Rng;

/// Uniform random base wait between items, in seconds.
const BASE_WAIT_RANGE: (f64, f64) = (1.0, 2.0);

/// One full extra second of wait per 500k followers.
const FOLLOWERS_PER_WAIT_UNIT: f64 = 500_000.0;

/// One full extra second of wait per 5k posts.
const POSTS_PER_WAIT_UNIT: f64 = 5_000.0;

/// The complexity component never exceeds this many seconds.
const MAX_COMPLEXITY_WAIT: f64 = 1.0;

/// Deterministic wait component: larger and busier profiles score higher,
/// clamped to [`MAX_COMPLEXITY_WAIT`]. Monotonically non-decreasing in both
/// inputs.
pub fn complexity_score(follower_count: u64, post_count: u64) -> f64 {
    let raw = follower_count as f64 / FOLLOWERS_PER_WAIT_UNIT
        + post_count as f64 / POSTS_PER_WAIT_UNIT;
    raw.min(MAX_COMPLEXITY_WAIT)
}

/// Wait to apply after harvesting one item: a random base draw plus the
/// complexity of the profile just harvested. The random floor keeps timing
/// unpredictable; the complexity term slows down on heavyweight profiles.
pub fn compute_wait(profile: Option<&ProfileSnapshot>) -> Duration {
    let base = rand::rng().random_range(BASE_WAIT_RANGE.0..BASE_WAIT_RANGE.1);
    let extra = profile
        .map(|p| complexity_score(p.follower_count(), p.post_count()))
        .unwrap_or(0.0);
    Duration::from_secs_f64(base + extra)
}
