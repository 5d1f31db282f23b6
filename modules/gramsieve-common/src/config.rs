use std::env;

use tracing::info;

/// Harvest run configuration loaded from environment variables.
///
/// Every knob has a default; nothing is required. The CLI layer may
/// override individual fields after loading.
#[derive(Debug, Clone)]
pub struct Config {
    // Work-tracking files
    pub input_file: String,
    pub done_file: String,
    pub output_dir: String,

    // Browser backend
    pub webdriver_url: String,
    pub session_id: Option<String>,

    // Pool sizing
    pub max_workers: usize,
    pub force_max_workers: bool,

    // Harvest tuning
    pub target_records: usize,
    pub item_limit: Option<usize>,
}

impl Config {
    /// Load configuration from `GS_*` environment variables, falling back
    /// to defaults. Panics with a clear message on unparseable numbers.
    pub fn from_env() -> Self {
        Self {
            input_file: env_or("GS_INPUT_FILE", "input.csv"),
            done_file: env_or("GS_DONE_FILE", "inputdone.csv"),
            output_dir: env_or("GS_OUTPUT_DIR", "output"),
            webdriver_url: env_or("GS_WEBDRIVER_URL", "http://localhost:9515"),
            session_id: env::var("GS_SESSION_ID").ok().filter(|v| !v.is_empty()),
            max_workers: env_or("GS_MAX_WORKERS", "3")
                .parse()
                .expect("GS_MAX_WORKERS must be a number"),
            force_max_workers: env_or("GS_FORCE_MAX_WORKERS", "true")
                .parse()
                .expect("GS_FORCE_MAX_WORKERS must be true or false"),
            target_records: env_or("GS_TARGET_RECORDS", "50")
                .parse()
                .expect("GS_TARGET_RECORDS must be a number"),
            item_limit: env::var("GS_ITEM_LIMIT")
                .ok()
                .map(|v| v.parse().expect("GS_ITEM_LIMIT must be a number")),
        }
    }

    /// Log the effective configuration. Never prints the session cookie.
    pub fn log_redacted(&self) {
        info!("{}", self.redacted());
    }

    /// One-line display form with the session cookie masked.
    pub fn redacted(&self) -> String {
        format!(
            "input={} done={} output={} webdriver={} session_id={} max_workers={} force={} target={} limit={:?}",
            self.input_file,
            self.done_file,
            self.output_dir,
            self.webdriver_url,
            if self.session_id.is_some() { "<set>" } else { "<unset>" },
            self.max_workers,
            self.force_max_workers,
            self.target_records,
            self.item_limit,
        )
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
