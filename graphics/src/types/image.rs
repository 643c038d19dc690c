//! Image types and descriptors.

use bitflags::bitflags;

/// 2D extent of an image or surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero (minimized window).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl std::fmt::Display for Extent2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Image format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ImageFormat {
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
    /// 32-bit red channel, float.
    R32Float,

    // Depth/stencil formats
    /// 16-bit depth.
    Depth16Unorm,
    /// 32-bit depth, float.
    Depth32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24UnormStencil8,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
}

impl ImageFormat {
    /// Returns true if this is a depth or depth/stencil format.
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth32Float
                | Self::Depth24UnormStencil8
                | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24UnormStencil8 | Self::Depth32FloatStencil8)
    }

    /// The aspects a barrier or copy on an image of this format touches.
    pub fn aspect(&self) -> ImageAspect {
        if self.has_stencil() {
            ImageAspect::DEPTH | ImageAspect::STENCIL
        } else if self.is_depth() {
            ImageAspect::DEPTH
        } else {
            ImageAspect::COLOR
        }
    }
}

/// Number of samples per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum SampleCount {
    #[default]
    S1,
    S2,
    S4,
    S8,
    S16,
}

impl SampleCount {
    pub fn count(&self) -> u32 {
        match self {
            Self::S1 => 1,
            Self::S2 => 2,
            Self::S4 => 4,
            Self::S8 => 8,
            Self::S16 => 16,
        }
    }

    pub fn is_multisampled(&self) -> bool {
        *self != Self::S1
    }
}

bitflags! {
    /// Usage flags declared when an image is created.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsageFlags: u32 {
        /// Image can be attached to a render target.
        const RENDER_TARGET = 1 << 0;
        /// Image can be sampled in a shader.
        const TEXTURE = 1 << 1;
        /// Image can be a blit/copy/resolve source.
        const TRANSFER_SRC = 1 << 2;
        /// Image can be a blit/copy/resolve destination.
        const TRANSFER_DST = 1 << 3;
    }
}

impl Default for ImageUsageFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Aspects of an image addressed by a barrier or copy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspect: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Descriptor for creating an image and its default view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ImageDescriptor {
    /// Debug label for the image.
    pub label: Option<String>,
    pub format: ImageFormat,
    pub extent: Extent2d,
    pub samples: SampleCount,
    pub usage: ImageUsageFlags,
}

impl ImageDescriptor {
    /// Create a new image descriptor.
    pub fn new(format: ImageFormat, extent: Extent2d, usage: ImageUsageFlags) -> Self {
        Self {
            label: None,
            format,
            extent,
            samples: SampleCount::S1,
            usage,
        }
    }

    /// Set the sample count.
    pub fn with_samples(mut self, samples: SampleCount) -> Self {
        self.samples = samples;
        self
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
    fn test_depth_formats() {
        assert!(ImageFormat::Depth32Float.is_depth());
        assert!(!ImageFormat::Depth32Float.has_stencil());
        assert!(ImageFormat::Depth24UnormStencil8.has_stencil());
        assert!(!ImageFormat::Rgba16Float.is_depth());
    }

    #[test]
    fn test_aspects() {
        assert_eq!(ImageFormat::Bgra8Unorm.aspect(), ImageAspect::COLOR);
        assert_eq!(ImageFormat::Depth32Float.aspect(), ImageAspect::DEPTH);
        assert_eq!(
            ImageFormat::Depth32FloatStencil8.aspect(),
            ImageAspect::DEPTH | ImageAspect::STENCIL
        );
    }

    #[test]
    fn test_extent() {
        let extent = Extent2d::new(1920, 1080);
        assert!(!extent.is_empty());
        assert!((extent.aspect() - 16.0 / 9.0).abs() < 1e-5);
        assert!(Extent2d::new(0, 600).is_empty());
        assert_eq!(extent.to_string(), "1920x1080");
    }
}
