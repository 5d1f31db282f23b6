pub mod stats;
pub mod supervisor;
pub mod worker;
