//! Render modes: fixed-function rasterization and blend state.

use std::collections::HashMap;

use crate::backend::RasterizationState;
use crate::types::{AlphaBlendMode, CullMode, FillMode, FrontFace};

/// Fixed-function state of a render effect. Creates no GPU object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderModeInfo {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub alpha_blend_mode: AlphaBlendMode,
    pub line_width: f32,
}

impl Default for RenderModeInfo {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Fill,
            cull_mode: CullMode::Back,
            alpha_blend_mode: AlphaBlendMode::Off,
            line_width: 1.0,
        }
    }
}

impl RenderModeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn with_alpha_blend_mode(mut self, mode: AlphaBlendMode) -> Self {
        self.alpha_blend_mode = mode;
        self
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    pub fn rasterization(&self) -> RasterizationState {
        RasterizationState {
            fill_mode: self.fill_mode,
            cull_mode: self.cull_mode,
            front_face: FrontFace::CounterClockwise,
            line_width: self.line_width,
        }
    }
}

/// All render modes of a context, keyed by name.
#[derive(Debug, Default)]
pub struct RenderModeRegistry {
    modes: HashMap<String, RenderModeInfo>,
}

impl RenderModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `info` under `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is taken or the line width is not a positive finite
    /// number.
    pub fn create(&mut self, info: &RenderModeInfo, name: &str) {
        assert!(
            !self.modes.contains_key(name),
            "Attempted to create RenderMode with name: '{name}' which already exists!"
        );
        assert!(
            info.line_width.is_finite() && info.line_width > 0.0,
            "RenderMode '{name}' has invalid line width {}",
            info.line_width
        );
        self.modes.insert(name.to_string(), *info);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> &RenderModeInfo {
        self.modes
            .get(name)
            .unwrap_or_else(|| panic!("RenderMode '{name}' does not exist!"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let info = RenderModeInfo::default();
        assert_eq!(info.fill_mode, FillMode::Fill);
        assert_eq!(info.cull_mode, CullMode::Back);
        assert_eq!(info.alpha_blend_mode, AlphaBlendMode::Off);
        assert_eq!(info.line_width, 1.0);
    }

    #[test]
    fn test_rasterization_state() {
        let state = RenderModeInfo::new()
            .with_fill_mode(FillMode::Line)
            .with_cull_mode(CullMode::None)
            .with_line_width(2.0)
            .rasterization();
        assert_eq!(state.fill_mode, FillMode::Line);
        assert_eq!(state.cull_mode, CullMode::None);
        assert_eq!(state.front_face, FrontFace::CounterClockwise);
        assert_eq!(state.line_width, 2.0);
    }

    #[test]
    #[should_panic(expected = "invalid line width")]
    fn test_zero_line_width_panics() {
        RenderModeRegistry::new().create(&RenderModeInfo::new().with_line_width(0.0), "lines");
    }

    #[test]
    #[should_panic(expected = "Attempted to create RenderMode with name: 'opaque' which already exists!")]
    fn test_duplicate_mode_panics() {
        let mut modes = RenderModeRegistry::new();
        modes.create(&RenderModeInfo::new(), "opaque");
        modes.create(&RenderModeInfo::new(), "opaque");
    }
}
