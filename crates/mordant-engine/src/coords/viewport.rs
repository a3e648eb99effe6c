/// Viewport or texture size in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Sizes with either side ≤ 1 never reach resource creation.
    #[inline]
    pub fn is_degenerate(self) -> bool {
        self.width <= 1 || self.height <= 1
    }

    /// Clamps both sides to `max_dimension` (the device's 2D texture limit).
    #[inline]
    pub fn clamped(self, max_dimension: u32) -> Self {
        Self::new(self.width.min(max_dimension), self.height.min(max_dimension))
    }

    /// Scales both sides by `factor`, rounding to the nearest pixel.
    #[inline]
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(
            (self.width as f32 * factor).round() as u32,
            (self.height as f32 * factor).round() as u32,
        )
    }

    #[inline]
    pub fn max_side(self) -> u32 {
        self.width.max(self.height)
    }

    #[inline]
    pub fn as_array(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }

    #[inline]
    pub fn extent(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Viewport {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_sizes() {
        assert!(Viewport::new(0, 600).is_degenerate());
        assert!(Viewport::new(800, 1).is_degenerate());
        assert!(!Viewport::new(2, 2).is_degenerate());
    }

    #[test]
    fn scaled_rounds() {
        assert_eq!(Viewport::new(800, 600).scaled(0.75), Viewport::new(600, 450));
        assert_eq!(Viewport::new(801, 601).scaled(0.25), Viewport::new(200, 150));
    }

    #[test]
    fn clamped_to_device_limit() {
        assert_eq!(Viewport::new(9000, 100).clamped(8192), Viewport::new(8192, 100));
    }
}
