//! Recoverable graphics errors.
//!
//! Declaration mistakes (duplicate names, render targets without a depth
//! attachment, too many resource groups) are programming errors and panic
//! where they are made. Everything the GPU, the window system or a config
//! file can cause at runtime is a [`GraphicsError`].

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// No usable instance, device or surface.
    InitializationFailed(String),
    ResourceCreationFailed(String),
    OutOfMemory,
    DeviceLost,
    /// A bounded fence wait or swapchain acquisition expired.
    Timeout(String),
    InvalidParameter(String),
    /// The swapchain stayed out of date after recreation.
    SurfaceOutdated,
    Internal(String),
    /// Unreadable or invalid configuration.
    Config(String),
}

impl GraphicsError {
    /// Whether the frame loop can continue after this error.
    ///
    /// Timeouts and stale surfaces go away on a later frame; the rest need
    /// the context to be torn down.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::SurfaceOutdated)
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (what, detail) = match self {
            Self::InitializationFailed(msg) => ("initialization failed", Some(msg)),
            Self::ResourceCreationFailed(msg) => ("resource creation failed", Some(msg)),
            Self::OutOfMemory => ("out of GPU memory", None),
            Self::DeviceLost => ("GPU device lost", None),
            Self::Timeout(msg) => ("timed out", Some(msg)),
            Self::InvalidParameter(msg) => ("invalid parameter", Some(msg)),
            Self::SurfaceOutdated => ("surface outdated, needs reconfiguration", None),
            Self::Internal(msg) => ("internal error", Some(msg)),
            Self::Config(msg) => ("configuration error", Some(msg)),
        };
        match detail {
            Some(detail) => write!(f, "{what}: {detail}"),
            None => f.write_str(what),
        }
    }
}

impl std::error::Error for GraphicsError {}

impl From<toml::de::Error> for GraphicsError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(format!("failed to parse config: {e}"))
    }
}
