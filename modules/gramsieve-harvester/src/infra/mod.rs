pub mod persist;
pub mod pictures;
pub mod progress;
pub mod queue;
