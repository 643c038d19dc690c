//! Profiling support via Tracy.
//!
//! Re-exports the CPU macros of [`prism_core::profiling`] and adds plots of
//! per-frame renderer counters. Everything compiles to nothing unless the
//! `profiling` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! prism-graphics = { version = "0.1", features = ["profiling"] }
//! ```

pub use prism_core::profiling::*;

use crate::materials::MaterialStats;

/// Plot the material totals of a frame.
pub fn plot_material_stats(stats: &MaterialStats) {
    prism_core::profile_plot!("draw_count", stats.draw_count);
    prism_core::profile_plot!("cull_count", stats.cull_count);
    prism_core::profile_plot!("triangle_count", stats.triangle_count);
}
