use crate::coords::{Vec2, Viewport};

/// Platform-agnostic pointer events emitted by the runtime.
///
/// Positions are normalized to [0,1] with the vertical axis flipped, so (0,0)
/// is the bottom-left corner of the surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerEvent {
    Down(Vec2),
    Moved(Vec2),
    Up,
    /// Pointer left the surface.
    Left,
}

/// Converts a physical pixel position (origin top-left, +Y down) into
/// normalized pointer space.
///
/// Positions outside the surface are clamped to the unit square.
pub fn normalize_position(x: f64, y: f64, surface: Viewport) -> Vec2 {
    let w = surface.width.max(1) as f64;
    let h = surface.height.max(1) as f64;
    let nx = (x / w).clamp(0.0, 1.0);
    let ny = (1.0 - y / h).clamp(0.0, 1.0);
    Vec2::new(nx as f32, ny as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_left_maps_to_upper_left_corner() {
        let p = normalize_position(0.0, 0.0, Viewport::new(800, 600));
        assert_eq!(p, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn bottom_right_maps_to_lower_right_corner() {
        let p = normalize_position(800.0, 600.0, Viewport::new(800, 600));
        assert_eq!(p, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn outside_positions_are_clamped() {
        let p = normalize_position(-20.0, 900.0, Viewport::new(800, 600));
        assert_eq!(p, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn zero_sized_surface_does_not_divide_by_zero() {
        let p = normalize_position(10.0, 10.0, Viewport::new(0, 0));
        assert!(p.is_finite());
    }
}
