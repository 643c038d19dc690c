//! # Prism Core
//!
//! Renderer-agnostic utilities shared by the Prism crates:
//!
//! - [`math`] - nalgebra type aliases and projection helpers
//! - [`frustum`] - camera matrices and bounding-sphere frustum culling
//! - [`worker_pool`] - fixed-size CPU worker pool
//! - [`profiling`] - optional Tracy instrumentation macros

pub mod frustum;
pub mod math;
pub mod profiling;
pub mod worker_pool;

pub use frustum::{Camera, FrustumPlanes};
pub use worker_pool::WorkerPool;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Prism Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
