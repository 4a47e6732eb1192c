//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod log;
pub mod rate;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use rate::{RateProvider, RateResult, UpstreamFailure};
