use crate::coords::Viewport;
use crate::device::DeviceClass;

/// Simulation resolutions and workloads for one device class.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SimConfig {
    /// Paint field size relative to the viewport.
    pub paint_scale: f32,
    /// Reaction-diffusion field size relative to the viewport.
    pub reaction_scale: f32,
    /// Reaction-diffusion dispatches per frame.
    pub reaction_iterations: u32,
}

/// Field sizes derived from one viewport size.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SimResolutions {
    pub viewport: Viewport,
    pub paint: Viewport,
    pub reaction: Viewport,
}

impl SimConfig {
    pub const DESKTOP: SimConfig = SimConfig {
        paint_scale: 0.75,
        reaction_scale: 0.25,
        reaction_iterations: 20,
    };

    pub const CONSTRAINED: SimConfig = SimConfig {
        paint_scale: 0.75,
        reaction_scale: 0.2,
        reaction_iterations: 12,
    };

    pub fn for_class(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Desktop => Self::DESKTOP,
            DeviceClass::Constrained => Self::CONSTRAINED,
        }
    }

    /// Field sizes for `viewport`, or `None` when the viewport is degenerate.
    ///
    /// Derived sides never drop below one texel.
    pub fn resolutions(&self, viewport: Viewport) -> Option<SimResolutions> {
        if viewport.is_degenerate() {
            return None;
        }

        let at_least_one = |v: Viewport| Viewport::new(v.width.max(1), v.height.max(1));
        Some(SimResolutions {
            viewport,
            paint: at_least_one(viewport.scaled(self.paint_scale)),
            reaction: at_least_one(viewport.scaled(self.reaction_scale)),
        })
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::DESKTOP
    }
}
