//! Sampler types and descriptors.

/// Texel filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest neighbor filtering.
    #[default]
    Nearest,
    /// Linear interpolation.
    Linear,
}

/// Address mode for coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Border color used by [`WrapMode::ClampToBorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderColor {
    TransparentBlack,
    #[default]
    OpaqueBlack,
    OpaqueWhite,
}

/// Descriptor for creating a sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    /// Debug label for the sampler.
    pub label: Option<String>,
    /// Magnification and minification filter.
    pub filter: FilterMode,
    /// Mipmap filter.
    pub mipmap_filter: FilterMode,
    /// Address mode for all three coordinates.
    pub wrap: WrapMode,
    /// Maximum anisotropy, `None` disables anisotropic filtering.
    pub max_anisotropy: Option<f32>,
    /// Minimum LOD clamp.
    pub lod_min_clamp: f32,
    /// Maximum LOD clamp.
    pub lod_max_clamp: f32,
    pub border_color: BorderColor,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Linear,
            wrap: WrapMode::Repeat,
            max_anisotropy: None,
            lod_min_clamp: 0.0,
            lod_max_clamp: 0.0,
            border_color: BorderColor::OpaqueBlack,
        }
    }
}

impl SamplerDescriptor {
    /// Sampler with the given filter and wrap mode and every other field at
    /// its default (linear mips, no anisotropy, lod `0..0`, opaque black border).
    pub fn new(filter: FilterMode, wrap: WrapMode) -> Self {
        Self {
            filter,
            wrap,
            ..Default::default()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_defaults() {
        let desc = SamplerDescriptor::new(FilterMode::Linear, WrapMode::ClampToEdge);
        assert_eq!(desc.mipmap_filter, FilterMode::Linear);
        assert_eq!(desc.max_anisotropy, None);
        assert_eq!(desc.lod_min_clamp, 0.0);
        assert_eq!(desc.lod_max_clamp, 0.0);
        assert_eq!(desc.border_color, BorderColor::OpaqueBlack);
    }
}
