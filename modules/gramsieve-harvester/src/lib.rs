pub mod harvest;
pub mod infra;
pub mod pipeline;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
