//! Tracy hooks for the renderer's CPU side.
//!
//! The macros forward to [tracy-client](https://docs.rs/tracy-client) when
//! the `profiling` feature is on and expand to nothing otherwise, so call
//! sites never need their own `cfg`.
//!
//! ```ignore
//! prism_core::profile_scope!("build_commands");
//! prism_core::profile_plot!("draw_count", stats.draw_count);
//! prism_core::frame_mark!();
//! ```

#[cfg(feature = "profiling")]
pub use tracy_client::{self, frame_mark as tracy_frame_mark, plot as tracy_plot, span};

#[cfg(feature = "profiling")]
mod enabled {
    /// End the current frame in the profiler timeline.
    #[macro_export]
    macro_rules! frame_mark {
        () => {
            $crate::profiling::tracy_frame_mark()
        };
    }

    /// Span named `$name`, closed when the enclosing scope ends.
    #[macro_export]
    macro_rules! profile_scope {
        ($name:expr) => {
            let _profile_span = $crate::profiling::span!($name);
        };
    }

    /// Sample a counter; `$value` is converted to `f64`.
    #[macro_export]
    macro_rules! profile_plot {
        ($name:literal, $value:expr) => {
            $crate::profiling::tracy_plot!($name, $value as f64)
        };
    }
}

#[cfg(not(feature = "profiling"))]
mod disabled {
    #[macro_export]
    macro_rules! frame_mark {
        () => {};
    }

    #[macro_export]
    macro_rules! profile_scope {
        ($name:expr) => {};
    }

    #[macro_export]
    macro_rules! profile_plot {
        ($name:literal, $value:expr) => {
            let _ = $value;
        };
    }
}

pub use crate::{frame_mark, profile_plot, profile_scope};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_expand_in_statement_position() {
        let draws = 3u32;
        profile_scope!("test_scope");
        profile_plot!("draws", draws);
        frame_mark!();
    }
}
