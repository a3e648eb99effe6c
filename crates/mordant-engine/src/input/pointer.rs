use crate::coords::{Vec2, Viewport};

use super::types::PointerEvent;

/// Damping constant while a button is held; the smoothed velocity closes
/// `1 / PRESSED_DAMPING` of the remaining gap each frame.
pub const PRESSED_DAMPING: f32 = 4.0;

/// Damping constant while no button is held.
pub const RELEASED_DAMPING: f32 = 10.0;

/// Viewport side (physical px) at and above which pointer velocity is not attenuated.
pub const ATTENUATION_REFERENCE_SIZE: f32 = 1400.0;

const DT_EPSILON: f32 = 1e-4;

/// Velocity scale for small viewports: `min(1, max(w, h) / 1400)`.
///
/// The same stroke covers a larger share of a small surface, which would
/// otherwise drive the simulation much harder on phones than on desktops.
pub fn velocity_attenuation(viewport: Viewport) -> f32 {
    (viewport.max_side() as f32 / ATTENUATION_REFERENCE_SIZE).min(1.0)
}

/// Pointer state for the session.
///
/// Mutated by every pointer event and once per frame: the paint simulation
/// damps `velocity`, the scheduler calls [`PointerState::end_frame`] after
/// submission.
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    /// Current normalized position.
    pub position: Vec2,

    /// Position at the end of the previous frame.
    pub previous_position: Vec2,

    /// Smoothed velocity, in normalized units per target frame.
    pub velocity: Vec2,

    /// Smoothed velocity of the previous frame.
    pub previous_velocity: Vec2,

    pub pressed: bool,

    /// Whether the pointer is currently over the surface.
    pub inside: bool,

    has_position: bool,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_event(&mut self, ev: PointerEvent) {
        match ev {
            PointerEvent::Down(pos) => {
                self.move_to(pos);
                self.pressed = true;
            }
            PointerEvent::Moved(pos) => self.move_to(pos),
            PointerEvent::Up => self.pressed = false,
            PointerEvent::Left => {
                self.pressed = false;
                self.inside = false;
                // The next position re-seeds `previous_position`; no stroke
                // spans the gap between the exit and re-entry points.
                self.has_position = false;
            }
        }
    }

    fn move_to(&mut self, pos: Vec2) {
        if !self.has_position {
            // First sighting: no previous position to derive a velocity from.
            self.previous_position = pos;
            self.has_position = true;
        }
        self.position = pos;
        self.inside = true;
    }

    /// Damping constant for the current button state.
    #[inline]
    pub fn damping(&self) -> f32 {
        if self.pressed { PRESSED_DAMPING } else { RELEASED_DAMPING }
    }

    /// Instantaneous velocity for this frame: the positional difference divided
    /// by the elapsed time (in target frames), attenuated on small viewports.
    pub fn target_velocity(&self, dt_frames: f32, viewport: Viewport) -> Vec2 {
        let delta = self.position - self.previous_position;
        delta / dt_frames.max(DT_EPSILON) * velocity_attenuation(viewport)
    }

    /// Moves the smoothed velocity `1 / damping` of the way toward `target`.
    pub fn damp_toward(&mut self, target: Vec2) {
        self.previous_velocity = self.velocity;
        let step = (target - self.velocity) / self.damping();
        self.velocity += step;
    }

    /// Frame bookkeeping after the frame has been submitted.
    pub fn end_frame(&mut self) {
        self.previous_position = self.position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(x: f32, y: f32) -> PointerEvent {
        PointerEvent::Moved(Vec2::new(x, y))
    }

    #[test]
    fn never_moved_pointer_has_zero_velocity() {
        let mut p = PointerState::new();
        for _ in 0..10 {
            let target = p.target_velocity(1.0, Viewport::new(800, 600));
            p.damp_toward(target);
            p.end_frame();
        }
        assert_eq!(p.velocity, Vec2::zero());
    }

    #[test]
    fn first_move_does_not_produce_a_jump() {
        let mut p = PointerState::new();
        p.apply_event(moved(0.8, 0.2));
        let target = p.target_velocity(1.0, Viewport::new(1400, 900));
        assert_eq!(target, Vec2::zero());
    }

    #[test]
    fn target_velocity_is_difference_over_time() {
        let mut p = PointerState::new();
        p.apply_event(moved(0.5, 0.5));
        p.end_frame();
        p.apply_event(moved(0.6, 0.5));
        let v = p.target_velocity(2.0, Viewport::new(2000, 1000));
        assert!((v.x - 0.05).abs() < 1e-6);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn small_viewports_attenuate_velocity() {
        assert_eq!(velocity_attenuation(Viewport::new(2800, 1200)), 1.0);
        assert!((velocity_attenuation(Viewport::new(700, 400)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn damping_converges_geometrically() {
        let mut p = PointerState::new();
        let target = Vec2::new(1.0, 0.0);
        let mut gap = (target - p.velocity).length();
        for _ in 0..20 {
            p.damp_toward(target);
            let next_gap = (target - p.velocity).length();
            assert!(next_gap < gap);
            let expected = gap * (1.0 - 1.0 / RELEASED_DAMPING);
            assert!((next_gap - expected).abs() < 1e-5);
            gap = next_gap;
        }
    }

    #[test]
    fn pressed_pointer_converges_faster() {
        let target = Vec2::new(0.0, 2.0);

        let mut released = PointerState::new();
        let mut pressed = PointerState::new();
        pressed.apply_event(PointerEvent::Down(Vec2::zero()));

        for _ in 0..5 {
            released.damp_toward(target);
            pressed.damp_toward(target);
        }

        let gap_released = (target - released.velocity).length();
        let gap_pressed = (target - pressed.velocity).length();
        assert!(gap_pressed < gap_released);
    }

    #[test]
    fn damp_keeps_previous_velocity() {
        let mut p = PointerState::new();
        p.damp_toward(Vec2::new(1.0, 0.0));
        let first = p.velocity;
        p.damp_toward(Vec2::new(1.0, 0.0));
        assert_eq!(p.previous_velocity, first);
    }

    #[test]
    fn leaving_releases_the_pointer() {
        let mut p = PointerState::new();
        p.apply_event(PointerEvent::Down(Vec2::new(0.2, 0.2)));
        assert!(p.pressed && p.inside);
        p.apply_event(PointerEvent::Left);
        assert!(!p.pressed && !p.inside);
    }

    #[test]
    fn reentry_does_not_bridge_from_the_exit_point() {
        let viewport = Viewport::new(1400, 1000);
        let mut p = PointerState::new();
        p.apply_event(moved(0.02, 0.5));
        p.end_frame();

        p.apply_event(PointerEvent::Left);
        p.apply_event(moved(0.98, 0.5));

        assert_eq!(p.previous_position, p.position);
        assert_eq!(p.target_velocity(1.0, viewport), Vec2::zero());

        // Later moves measure from the re-entry point again.
        p.end_frame();
        p.apply_event(moved(0.9, 0.5));
        assert!((p.target_velocity(1.0, viewport).x + 0.08).abs() < 1e-6);
    }
}
