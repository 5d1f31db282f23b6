pub mod classify;
pub mod merge;
pub mod pacing;
pub mod scroll;
