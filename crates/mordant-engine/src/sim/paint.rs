use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};

use crate::coords::Viewport;
use crate::input::PointerState;
use crate::shader::ShaderProgram;
use crate::time::FrameTime;

use super::dispatch::{DispatchGrid, PAINT_TILES};
use super::field::{validate_size, Field};
use super::swap::SwapPair;
use super::{check_workgroup, uniform_buffer};

const SHADER: &str = include_str!("shaders/paint.wgsl");
const ENTRY_POINT: &str = "compute_main";
const FIELD_LABELS: [&str; 2] = ["mordant paint field 0", "mordant paint field 1"];

/// Brush radius in aspect-corrected normalized units.
const BRUSH_RADIUS: f32 = 0.04;
/// Splat strength while hovering without a pressed button.
const HOVER_STRENGTH: f32 = 0.5;

/// Frame timing as seen by the kernels.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RenderInfo {
    pub viewport_size: [f32; 2],
    pub delta_time_ms: f32,
    pub time_ms: f32,
}

impl RenderInfo {
    pub fn new(viewport: Viewport, time: &FrameTime) -> Self {
        Self {
            viewport_size: viewport.as_array(),
            delta_time_ms: time.dt_ms(),
            time_ms: time.elapsed_ms(),
        }
    }
}

/// Pointer state as seen by the paint kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointerInfo {
    pub position: [f32; 2],
    pub previous_position: [f32; 2],
    pub velocity: [f32; 2],
    pub previous_velocity: [f32; 2],
    pub strength: f32,
    pub radius: f32,
    pub _pad: [f32; 2],
}

impl PointerInfo {
    pub fn from_state(pointer: &PointerState) -> Self {
        let strength = match (pointer.inside, pointer.pressed) {
            (false, _) => 0.0,
            (true, true) => 1.0,
            (true, false) => HOVER_STRENGTH,
        };

        Self {
            position: pointer.position.to_array(),
            previous_position: pointer.previous_position.to_array(),
            velocity: pointer.velocity.to_array(),
            previous_velocity: pointer.previous_velocity.to_array(),
            strength,
            radius: BRUSH_RADIUS,
            _pad: [0.0; 2],
        }
    }
}

/// Pointer-driven advection/diffusion field.
///
/// Field layout: `xy` velocity, `z` paint density, `w` stroke intensity.
pub struct PaintSimulation {
    pipeline: wgpu::ComputePipeline,
    field_layout: wgpu::BindGroupLayout,
    uniforms: wgpu::BindGroup,
    render_info: wgpu::Buffer,
    pointer_info: wgpu::Buffer,
    fields: SwapPair<Field>,
    bind_groups: [wgpu::BindGroup; 2],
    grid: DispatchGrid,
}

impl PaintSimulation {
    /// Compiles the kernel and allocates the first pair at `size`.
    pub fn new(device: &wgpu::Device, size: Viewport) -> Result<Self> {
        validate_size(size, device.limits().max_texture_dimension_2d)?;

        let program = ShaderProgram::new(device, "mordant paint", SHADER)?;
        let reflection = program.reflection();
        reflection.check_struct_size::<RenderInfo>("RenderInfo")?;
        reflection.check_struct_size::<PointerInfo>("PointerInfo")?;
        check_workgroup(reflection, ENTRY_POINT, PAINT_TILES)?;

        let layouts = program.bind_group_layouts(device);
        let pipeline = program.compute_pipeline(device, ENTRY_POINT, &layouts)?;
        let [uniform_layout, field_layout]: [wgpu::BindGroupLayout; 2] = layouts
            .try_into()
            .map_err(|_| anyhow!("paint kernel must declare exactly two bind groups"))?;

        let render_info = uniform_buffer::<RenderInfo>(device, "mordant paint render info");
        let pointer_info = uniform_buffer::<PointerInfo>(device, "mordant paint pointer info");

        let uniforms = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mordant paint uniforms"),
            layout: &uniform_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: render_info.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: pointer_info.as_entire_binding(),
                },
            ],
        });

        let [first, second] = Field::pair(device, FIELD_LABELS, size)?;
        let fields = SwapPair::new(first, second);
        let bind_groups = field_bind_groups(device, &field_layout, &fields);

        Ok(Self {
            pipeline,
            field_layout,
            uniforms,
            render_info,
            pointer_info,
            fields,
            bind_groups,
            grid: DispatchGrid::covering(size, PAINT_TILES),
        })
    }

    /// Replaces both fields with zeroed ones of `size`.
    ///
    /// A size the device cannot allocate is rejected before anything is
    /// released. If the allocation itself fails, the pair is rebuilt at its
    /// previous size and the error is returned.
    pub fn init(&mut self, device: &wgpu::Device, size: Viewport) -> Result<()> {
        validate_size(size, device.limits().max_texture_dimension_2d)?;
        self.resize_fields(device, size)
    }

    fn resize_fields(&mut self, device: &wgpu::Device, size: Viewport) -> Result<()> {
        let previous = self.size();
        if let Err(err) = self.allocate(device, size) {
            log::warn!(
                "paint field {}x{} unavailable, restoring {}x{}: {err:#}",
                size.width,
                size.height,
                previous.width,
                previous.height
            );
            self.allocate(device, previous)
                .context("restoring the previous paint fields")?;
            return Err(err);
        }

        log::debug!(
            "paint field {}x{}, {} workgroups",
            size.width,
            size.height,
            self.grid.workgroup_count()
        );
        Ok(())
    }

    fn allocate(&mut self, device: &wgpu::Device, size: Viewport) -> Result<()> {
        self.fields
            .reallocate(|| Field::pair(device, FIELD_LABELS, size))?;
        self.bind_groups = field_bind_groups(device, &self.field_layout, &self.fields);
        self.grid = DispatchGrid::covering(size, PAINT_TILES);
        Ok(())
    }

    /// Damps the pointer velocity, uploads this frame's uniforms and records
    /// one dispatch.
    pub fn compute(
        &mut self,
        queue: &wgpu::Queue,
        pass: &mut wgpu::ComputePass<'_>,
        time: &FrameTime,
        pointer: &mut PointerState,
        viewport: Viewport,
    ) {
        let target = pointer.target_velocity(time.dt_frames(), viewport);
        pointer.damp_toward(target);

        queue.write_buffer(
            &self.render_info,
            0,
            bytemuck::bytes_of(&RenderInfo::new(viewport, time)),
        );
        queue.write_buffer(
            &self.pointer_info,
            0,
            bytemuck::bytes_of(&PointerInfo::from_state(pointer)),
        );

        self.dispatch(pass);
    }

    /// Records one dispatch with the current uniforms and flips the pair.
    pub fn dispatch(&mut self, pass: &mut wgpu::ComputePass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniforms, &[]);
        pass.set_bind_group(1, &self.bind_groups[self.fields.index()], &[]);
        pass.dispatch_workgroups(self.grid.x, self.grid.y, 1);
        self.fields.flip();
    }

    /// Most recently written field.
    pub fn result(&self) -> &Field {
        self.fields.current()
    }

    /// One of the two fields, by swap index.
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
}

fn field_bind_groups(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    fields: &SwapPair<Field>,
) -> [wgpu::BindGroup; 2] {
    std::array::from_fn(|i| {
        let view = fields.view_at(i);
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mordant paint fields"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view.read.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view.write.view()),
                },
            ],
        })
    })
}
