//! CPU mirrors of the paint and reaction-diffusion kernels.
//!
//! Slow and unoptimized; they walk the same dispatch grids and workgroup
//! caches as the shaders so numeric properties can be checked without a GPU.

use crate::coords::Viewport;

use super::dispatch::{DispatchGrid, PAINT_TILES, REACTION_TILES};
use super::paint::{PointerInfo, RenderInfo};
use super::reaction_diffusion::ReactionParams;

const FRAME_MS: f32 = 1000.0 / 60.0;
const ADVECTION: f32 = 0.5;
const SPLAT_GAIN: f32 = 40.0;

pub const VELOCITY_DISSIPATION: f32 = 0.96;
pub const DENSITY_DISSIPATION: f32 = 0.975;
pub const STROKE_DISSIPATION: f32 = 0.9;

pub type Texel = [f32; 4];

/// Host-side copy of a simulation field, row 0 at the bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct HostField {
    size: Viewport,
    texels: Vec<Texel>,
}

impl HostField {
    pub fn filled(size: Viewport, value: Texel) -> Self {
        Self {
            size,
            texels: vec![value; (size.width * size.height) as usize],
        }
    }

    pub fn from_fn(size: Viewport, mut f: impl FnMut(u32, u32) -> Texel) -> Self {
        let mut texels = Vec::with_capacity((size.width * size.height) as usize);
        for y in 0..size.height {
            for x in 0..size.width {
                texels.push(f(x, y));
            }
        }
        Self { size, texels }
    }

    pub fn size(&self) -> Viewport {
        self.size
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    pub fn get(&self, x: u32, y: u32) -> Texel {
        self.texels[(y * self.size.width + x) as usize]
    }

    fn set(&mut self, x: u32, y: u32, value: Texel) {
        let index = (y * self.size.width + x) as usize;
        self.texels[index] = value;
    }

    fn load_clamped(&self, x: i32, y: i32) -> Texel {
        let x = x.clamp(0, self.size.width as i32 - 1);
        let y = y.clamp(0, self.size.height as i32 - 1);
        self.get(x as u32, y as u32)
    }

    /// `pos` in texel units, centers at +0.5.
    fn sample_bilinear(&self, pos: [f32; 2]) -> Texel {
        let p = [pos[0] - 0.5, pos[1] - 0.5];
        let base = [p[0].floor(), p[1].floor()];
        let f = [p[0] - base[0], p[1] - base[1]];
        let (x, y) = (base[0] as i32, base[1] as i32);

        let bottom = mix(self.load_clamped(x, y), self.load_clamped(x + 1, y), f[0]);
        let top = mix(self.load_clamped(x, y + 1), self.load_clamped(x + 1, y + 1), f[0]);
        mix(bottom, top, f[1])
    }
}

fn mix<const N: usize>(a: [f32; N], b: [f32; N], t: f32) -> [f32; N] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn length(v: [f32; 2]) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn segment(p: [f32; 2], a: [f32; 2], b: [f32; 2]) -> (f32, f32) {
    let pa = [p[0] - a[0], p[1] - a[1]];
    let ba = [b[0] - a[0], b[1] - a[1]];
    let h = ((pa[0] * ba[0] + pa[1] * ba[1]) / (ba[0] * ba[0] + ba[1] * ba[1]).max(1e-8))
        .clamp(0.0, 1.0);
    (length([pa[0] - ba[0] * h, pa[1] - ba[1] * h]), h)
}

fn laplacian_weight(x: i32, y: i32) -> f32 {
    match (x, y) {
        (0, 0) => -1.0,
        (0, _) | (_, 0) => 0.2,
        _ => 0.05,
    }
}

/// One paint dispatch.
pub fn paint_step(input: &HostField, render: &RenderInfo, pointer: &PointerInfo) -> HostField {
    let size = input.size;
    let dims = size.as_array();
    let aspect = [dims[0] / dims[1], 1.0];
    let dt_frames = (render.delta_time_ms / FRAME_MS).max(1e-4);
    let scale = |v: [f32; 2]| [v[0] * aspect[0], v[1] * aspect[1]];

    let mut output = HostField::filled(size, [f32::NAN; 4]);
    let grid = DispatchGrid::covering(size, PAINT_TILES);

    for gy in 0..grid.y {
        for gx in 0..grid.x {
            let (origin, end) = grid.workgroup_region(gx, gy);
            for y in origin[1]..end[1].min(size.height) {
                for x in origin[0]..end[0].min(size.width) {
                    let center = [x as f32 + 0.5, y as f32 + 0.5];
                    let current = input.get(x, y);

                    let back = [
                        center[0] - current[0] * dims[0] * ADVECTION * dt_frames,
                        center[1] - current[1] * dims[1] * ADVECTION * dt_frames,
                    ];
                    let advected = input.sample_bilinear(back);

                    let mut velocity = [
                        advected[0] * VELOCITY_DISSIPATION,
                        advected[1] * VELOCITY_DISSIPATION,
                    ];
                    let mut density = advected[2] * DENSITY_DISSIPATION;
                    let mut stroke = advected[3] * STROKE_DISSIPATION;

                    let uv = [center[0] / dims[0], center[1] / dims[1]];
                    let (distance, h) = segment(
                        scale(uv),
                        scale(pointer.previous_position),
                        scale(pointer.position),
                    );
                    let falloff =
                        (1.0 - smoothstep(0.0, pointer.radius, distance)) * pointer.strength;
                    let splat = mix(pointer.previous_velocity, pointer.velocity, h);
                    let amount = falloff * (length(splat) * SPLAT_GAIN).min(1.0);

                    velocity[0] += splat[0] * falloff;
                    velocity[1] += splat[1] * falloff;
                    density += amount;
                    stroke = stroke.max(amount);

                    output.set(
                        x,
                        y,
                        [
                            velocity[0].clamp(-1.0, 1.0),
                            velocity[1].clamp(-1.0, 1.0),
                            density.clamp(0.0, 1.0),
                            stroke.clamp(0.0, 1.0),
                        ],
                    );
                }
            }
        }
    }

    output
}

/// One reaction-diffusion dispatch, including the workgroup cache and its
/// halo skip policy.
pub fn reaction_step(seed: &HostField, input: &HostField, params: &ReactionParams) -> HostField {
    let size = input.size;
    let (w, h) = (size.width as i32, size.height as i32);
    let (seed_w, seed_h) = (seed.size.width as i32, seed.size.height as i32);
    let cache_size = REACTION_TILES.cache_size().map(|v| v as i32);
    let coverage = REACTION_TILES.coverage().map(|v| v as i32);
    let halo = REACTION_TILES.halo as i32;

    let mut output = HostField::filled(size, [f32::NAN; 4]);
    let mut cache = vec![[0.0f32; 4]; (cache_size[0] * cache_size[1]) as usize];
    let grid = DispatchGrid::covering(size, REACTION_TILES);

    for gy in 0..grid.y as i32 {
        for gx in 0..grid.x as i32 {
            let offset = [gx * coverage[0], gy * coverage[1]];

            for cy in 0..cache_size[1] {
                for cx in 0..cache_size[0] {
                    let tx = (offset[0] + cx - halo).clamp(0, w - 1);
                    let ty = (offset[1] + cy - halo).clamp(0, h - 1);

                    let uv = [(tx as f32 + 0.5) / w as f32, (ty as f32 + 0.5) / h as f32];
                    let sx = ((uv[0] * seed_w as f32) as i32).clamp(0, seed_w - 1);
                    let sy = ((uv[1] * seed_h as f32) as i32).clamp(0, seed_h - 1);
                    let s = seed.load_clamped(sx, sy);
                    let seed_velocity = [
                        s[0] * params.seed_velocity_scale,
                        s[1] * params.seed_velocity_scale,
                    ];

                    let nudged = [seed_velocity[0] + 1e-4, seed_velocity[1] + 1e-4];
                    let drift = length(seed_velocity).min(params.seed_offset_max) / length(nudged);
                    let previous = input.sample_bilinear([
                        tx as f32 + 0.5 - nudged[0] * drift,
                        ty as f32 + 0.5 - nudged[1] * drift,
                    ]);

                    let paint = s[2].clamp(0.0, 1.0);
                    let weight = s[3].clamp(0.0, 1.0);
                    let a = lerp(previous[0], (previous[0] + (1.0 - paint)) * 0.5, weight);
                    let b = lerp(previous[1], (previous[1] + paint) * 0.5, weight);

                    cache[(cy * cache_size[0] + cx) as usize] =
                        [a, b, seed_velocity[0], seed_velocity[1]];
                }
            }

            let bounds_max = [(offset[0] + coverage[0]).min(w), (offset[1] + coverage[1]).min(h)];

            for cy in 0..cache_size[1] {
                for cx in 0..cache_size[0] {
                    let tx = offset[0] + cx - halo;
                    let ty = offset[1] + cy - halo;
                    if tx < offset[0] || ty < offset[1] || tx >= bounds_max[0] || ty >= bounds_max[1] {
                        continue;
                    }

                    let [a, b, vx, vy] = cache[(cy * cache_size[0] + cx) as usize];

                    let mut lap = [0.0f32; 2];
                    for x in -halo..=halo {
                        for y in -halo..=halo {
                            let n = cache[((cy + y) * cache_size[0] + cx + x) as usize];
                            let k = laplacian_weight(x, y);
                            lap[0] += (n[0] - a) * k;
                            lap[1] += (n[1] - b) * k;
                        }
                    }

                    let speed = length([vx, vy]);
                    let s = speed - 1.0;
                    let feed_mix = (1.0 - s * s * s * s - 0.1).clamp(0.0, 1.0);
                    let kill_mix = (speed * speed * speed * speed + 0.4).clamp(0.0, 1.0);
                    let feed = lerp(params.feed_min, params.feed_max, feed_mix);
                    let kill = lerp(params.kill_min, params.kill_max, kill_mix);
                    let diffusion_b = params.diffusion_b - (speed * 0.5).min(0.1);

                    let reaction = a * b * b;
                    let next_a = a + params.diffusion_a * lap[0] - reaction + feed * (1.0 - a);
                    let next_b = b + diffusion_b * lap[1] + reaction - (kill + feed) * b;

                    output.set(
                        tx as u32,
                        ty as u32,
                        [next_a.clamp(0.0, 1.0), next_b.clamp(0.0, 1.0), 0.0, 1.0],
                    );
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::input::{PointerEvent, PointerState};
    use crate::shader::Reflection;
    use crate::sim::SimConfig;

    const VIEWPORT: Viewport = Viewport::new(800, 600);

    fn render_info() -> RenderInfo {
        RenderInfo {
            viewport_size: VIEWPORT.as_array(),
            delta_time_ms: FRAME_MS,
            time_ms: 0.0,
        }
    }

    /// Damps and packs the pointer the way one paint `compute` call does.
    fn pointer_frame(pointer: &mut PointerState) -> PointerInfo {
        let target = pointer.target_velocity(1.0, VIEWPORT);
        pointer.damp_toward(target);
        let info = PointerInfo::from_state(pointer);
        pointer.end_frame();
        info
    }

    fn stroked_paint(size: Viewport) -> HostField {
        let center = [size.width as f32 / 2.0, size.height as f32 / 2.0];
        let radius = size.height as f32 / 6.0;
        HostField::from_fn(size, |x, y| {
            let d = length([x as f32 - center[0], y as f32 - center[1]]);
            if d < radius { [0.01, 0.0, 1.0, 1.0] } else { [0.0; 4] }
        })
    }

    #[test]
    fn constants_match_the_paint_kernel() {
        let kernel = Reflection::from_wgsl(include_str!("shaders/paint.wgsl")).expect("paint kernel");
        for (name, host) in [
            ("FRAME_MS", FRAME_MS),
            ("ADVECTION", ADVECTION),
            ("SPLAT_GAIN", SPLAT_GAIN),
            ("VELOCITY_DISSIPATION", VELOCITY_DISSIPATION),
            ("DENSITY_DISSIPATION", DENSITY_DISSIPATION),
            ("STROKE_DISSIPATION", STROKE_DISSIPATION),
        ] {
            let wgsl = kernel.constant_f32(name).unwrap_or_else(|| panic!("{name} not declared"));
            assert!((wgsl - host).abs() <= host.abs() * 1e-6, "{name}: wgsl {wgsl}, host {host}");
        }
    }

    #[test]
    fn still_pointer_only_decays_paint() {
        let res = SimConfig::DESKTOP.resolutions(VIEWPORT).expect("non-degenerate");
        assert_eq!(res.paint, Viewport::new(600, 450));
        assert_eq!(res.reaction, Viewport::new(200, 150));

        let input = HostField::from_fn(res.paint, |x, y| {
            [0.0, 0.0, ((x * 7 + y * 13) % 100) as f32 / 100.0, ((x * 3 + y * 5) % 50) as f32 / 50.0]
        });

        let mut pointer = PointerState::new();
        pointer.apply_event(PointerEvent::Moved(Vec2::new(0.5, 0.5)));
        let info = pointer_frame(&mut pointer);
        assert_eq!(pointer.velocity, Vec2::zero());

        let output = paint_step(&input, &render_info(), &info);
        for (before, after) in input.texels().iter().zip(output.texels()) {
            assert!(after[2] <= before[2]);
            assert!((after[2] - before[2] * DENSITY_DISSIPATION).abs() < 1e-6);
            assert!((after[3] - before[3] * STROKE_DISSIPATION).abs() < 1e-6);
            assert_eq!([after[0], after[1]], [0.0, 0.0]);
        }
    }

    #[test]
    fn moving_pointer_deposits_paint() {
        let size = Viewport::new(120, 90);
        let mut pointer = PointerState::new();
        pointer.apply_event(PointerEvent::Down(Vec2::new(0.3, 0.5)));
        pointer_frame(&mut pointer);

        pointer.apply_event(PointerEvent::Moved(Vec2::new(0.4, 0.5)));
        let info = pointer_frame(&mut pointer);
        assert!(info.velocity[0] > 0.0);

        let output = paint_step(&HostField::filled(size, [0.0; 4]), &render_info(), &info);
        let under = output.get(42, 45);
        assert!(under[2] > 0.0, "{under:?}");
        assert!(under[0] > 0.0);
        assert_eq!(output.get(5, 5), [0.0; 4]);
    }

    #[test]
    fn reentering_pointer_paints_no_stroke_across_the_canvas() {
        let size = Viewport::new(120, 90);
        let mut pointer = PointerState::new();
        pointer.apply_event(PointerEvent::Moved(Vec2::new(0.02, 0.5)));
        pointer_frame(&mut pointer);

        pointer.apply_event(PointerEvent::Left);
        pointer.apply_event(PointerEvent::Moved(Vec2::new(0.98, 0.5)));
        let info = pointer_frame(&mut pointer);
        assert_eq!(info.strength, 0.5);
        assert_eq!(info.previous_position, info.position);

        let output = paint_step(&HostField::filled(size, [0.0; 4]), &render_info(), &info);
        assert_eq!(output.get(60, 45), [0.0; 4]);
        assert_eq!(output.get(30, 45), [0.0; 4]);
    }

    #[test]
    fn reaction_covers_every_texel_and_stays_in_range() {
        let res = SimConfig::DESKTOP.resolutions(VIEWPORT).expect("non-degenerate");
        let seed = stroked_paint(res.paint);
        let params = ReactionParams::default();

        let mut field = HostField::filled(res.reaction, [1.0, 0.0, 0.0, 1.0]);
        for _ in 0..SimConfig::DESKTOP.reaction_iterations {
            field = reaction_step(&seed, &field, &params);
            for t in field.texels() {
                assert!((0.0..=1.0).contains(&t[0]), "{t:?}");
                assert!((0.0..=1.0).contains(&t[1]), "{t:?}");
            }
        }

        let center = field.get(100, 75);
        assert!(center[1] > 0.1, "{center:?}");
        assert_eq!(field.get(2, 2), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn unseeded_baseline_is_stable() {
        let size = Viewport::new(31, 17);
        let seed = HostField::filled(Viewport::new(93, 51), [0.0; 4]);
        let baseline = HostField::filled(size, [1.0, 0.0, 0.0, 1.0]);

        let next = reaction_step(&seed, &baseline, &ReactionParams::default());
        assert_eq!(next, baseline);
    }
}
