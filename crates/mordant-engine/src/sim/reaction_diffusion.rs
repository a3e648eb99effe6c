use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};

use crate::coords::Viewport;
use crate::shader::ShaderProgram;

use super::dispatch::{DispatchGrid, REACTION_TILES};
use super::field::{validate_size, Field};
use super::paint::PaintSimulation;
use super::swap::SwapPair;
use super::{check_workgroup, uniform_buffer};

const SHADER: &str = include_str!("shaders/reaction_diffusion.wgsl");
const ENTRY_POINT: &str = "compute_main";
const FIELD_LABELS: [&str; 2] = ["mordant reaction field 0", "mordant reaction field 1"];

/// Neutral baseline: chemical A everywhere, no B.
const BASELINE: wgpu::Color = wgpu::Color {
    r: 1.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// Gray-Scott coefficients and seed coupling.
///
/// Feed and kill rates are interpolated between their min/max by the local
/// paint velocity; B diffuses slower where the paint moves fast.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ReactionParams {
    pub diffusion_a: f32,
    pub diffusion_b: f32,
    pub feed_min: f32,
    pub feed_max: f32,
    pub kill_min: f32,
    pub kill_max: f32,
    /// Paint velocity (normalized units per frame) to seed speed.
    pub seed_velocity_scale: f32,
    /// Upper bound of the per-iteration drift, in texels.
    pub seed_offset_max: f32,
}

impl Default for ReactionParams {
    fn default() -> Self {
        Self {
            diffusion_a: 1.0,
            diffusion_b: 0.5,
            feed_min: 0.03,
            feed_max: 0.055,
            kill_min: 0.058,
            kill_max: 0.064,
            seed_velocity_scale: 50.0,
            seed_offset_max: 1.5,
        }
    }
}

/// Reaction-diffusion field seeded by the paint simulation.
pub struct ReactionDiffusion {
    pipeline: wgpu::ComputePipeline,
    field_layout: wgpu::BindGroupLayout,
    uniforms: wgpu::BindGroup,
    params_buffer: wgpu::Buffer,
    params: ReactionParams,
    fields: SwapPair<Field>,
    /// Indexed by paint swap index, then by own swap index.
    bind_groups: [[wgpu::BindGroup; 2]; 2],
    grid: DispatchGrid,
    iterations: u32,
}

impl ReactionDiffusion {
    /// Compiles the kernel, allocates and seeds the first pair at `size`.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: Viewport,
        iterations: u32,
        params: ReactionParams,
        seed: &PaintSimulation,
    ) -> Result<Self> {
        validate_size(size, device.limits().max_texture_dimension_2d)?;

        let program = ShaderProgram::new(device, "mordant reaction-diffusion", SHADER)?;
        let reflection = program.reflection();
        reflection.check_struct_size::<ReactionParams>("ReactionParams")?;
        check_workgroup(reflection, ENTRY_POINT, REACTION_TILES)?;

        let layouts = program.bind_group_layouts(device);
        let pipeline = program.compute_pipeline(device, ENTRY_POINT, &layouts)?;
        let [uniform_layout, field_layout]: [wgpu::BindGroupLayout; 2] = layouts
            .try_into()
            .map_err(|_| anyhow!("reaction-diffusion kernel must declare exactly two bind groups"))?;

        let params_buffer = uniform_buffer::<ReactionParams>(device, "mordant reaction params");
        queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

        let uniforms = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mordant reaction uniforms"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        let [first, second] = Field::pair(device, FIELD_LABELS, size)?;
        let fields = SwapPair::new(first, second);
        seed_baseline(device, queue, &fields);
        let bind_groups = field_bind_groups(device, &field_layout, &fields, seed);

        Ok(Self {
            pipeline,
            field_layout,
            uniforms,
            params_buffer,
            params,
            fields,
            bind_groups,
            grid: DispatchGrid::covering(size, REACTION_TILES),
            iterations,
        })
    }

    /// Replaces both fields with baseline-seeded ones of `size` and rebinds
    /// them to the current paint fields.
    ///
    /// Sizes are validated before anything is released; a failed allocation
    /// rebuilds the pair at its previous size and returns the error.
    pub fn init(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: Viewport,
        seed: &PaintSimulation,
    ) -> Result<()> {
        validate_size(size, device.limits().max_texture_dimension_2d)?;

        let previous = self.size();
        if let Err(err) = self.allocate(device, queue, size, seed) {
            log::warn!(
                "reaction-diffusion field {}x{} unavailable, restoring {}x{}: {err:#}",
                size.width,
                size.height,
                previous.width,
                previous.height
            );
            self.allocate(device, queue, previous, seed)
                .context("restoring the previous reaction-diffusion fields")?;
            return Err(err);
        }
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));

        log::debug!(
            "reaction-diffusion field {}x{}, {} workgroups, {} iterations",
            size.width,
            size.height,
            self.grid.workgroup_count(),
            self.iterations
        );
        Ok(())
    }

    fn allocate(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: Viewport,
        seed: &PaintSimulation,
    ) -> Result<()> {
        self.fields
            .reallocate(|| Field::pair(device, FIELD_LABELS, size))?;
        seed_baseline(device, queue, &self.fields);
        self.grid = DispatchGrid::covering(size, REACTION_TILES);
        self.rebind(device, seed);
        Ok(())
    }

    /// Rebuilds the bind groups after the paint fields were reallocated.
    pub fn rebind(&mut self, device: &wgpu::Device, seed: &PaintSimulation) {
        self.bind_groups = field_bind_groups(device, &self.field_layout, &self.fields, seed);
    }

    /// Records `iterations` dispatches, flipping the pair after each one.
    ///
    /// `seed` must already have recorded its dispatch for this frame.
    pub fn compute(&mut self, pass: &mut wgpu::ComputePass<'_>, seed: &PaintSimulation) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniforms, &[]);

        let seed_index = seed.swap_index();
        for _ in 0..self.iterations {
            pass.set_bind_group(1, &self.bind_groups[seed_index][self.fields.index()], &[]);
            pass.dispatch_workgroups(self.grid.x, self.grid.y, 1);
            self.fields.flip();
        }
    }

    /// Most recently written field.
    pub fn result(&self) -> &Field {
        self.fields.current()
    }

    pub fn field(&self, index: usize) -> &Field {
        self.fields.get(index)
    }

    pub fn swap_index(&self) -> usize {
        self.fields.index()
    }

    pub fn generation(&self) -> u64 {
        self.fields.generation()
    }

    pub fn size(&self) -> Viewport {
        self.fields.current().size()
    }

    pub fn grid(&self) -> DispatchGrid {
        self.grid
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

fn seed_baseline(device: &wgpu::Device, queue: &wgpu::Queue, fields: &SwapPair<Field>) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("mordant reaction seed"),
    });
    fields.get(0).clear(&mut encoder, BASELINE);
    fields.get(1).clear(&mut encoder, BASELINE);
    queue.submit(std::iter::once(encoder.finish()));
}

fn field_bind_groups(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    fields: &SwapPair<Field>,
    seed: &PaintSimulation,
) -> [[wgpu::BindGroup; 2]; 2] {
    std::array::from_fn(|seed_index| {
        std::array::from_fn(|i| {
            let view = fields.view_at(i);
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mordant reaction fields"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(seed.field(seed_index).view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view.read.view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(view.write.view()),
                    },
                ],
            })
        })
    })
}
