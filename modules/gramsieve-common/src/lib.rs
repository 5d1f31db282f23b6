pub mod config;
pub mod types;
pub mod util;

pub use config::Config;
pub use types::*;
pub use util::{normalize_url, short_name};
