use anyhow::{anyhow, Result};
use wgpu::util::DeviceExt;

use crate::coords::Viewport;
use crate::shader::ShaderProgram;
use crate::sim::{PaintSimulation, ReactionDiffusion};

use super::ctx::{RenderCtx, RenderTarget};
use super::vertex::{PositionVertex, UvVertex, FULLSCREEN_POSITIONS, FULLSCREEN_UVS};

const SHADER: &str = include_str!("shaders/composite.wgsl");

/// Background the composite is drawn over.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color::WHITE;

/// Samples both simulation results and draws the final image.
///
/// Holds views into the simulations' fields but never owns or destroys them.
/// Bindings exist for every pair of swap indices, so whichever field each
/// simulation wrote last is what gets sampled.
pub struct CompositePass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    positions: wgpu::Buffer,
    uvs: wgpu::Buffer,
    /// Indexed by paint swap index, then reaction swap index.
    bind_groups: [[wgpu::BindGroup; 2]; 2],
    /// Field generations the bind groups were built from.
    bound: (u64, u64),
}

impl CompositePass {
    /// Builds the pipeline for `ctx.surface_format` and binds the current fields.
    pub fn new(
        ctx: &RenderCtx<'_>,
        paint: &PaintSimulation,
        reaction: &ReactionDiffusion,
    ) -> Result<Self> {
        let device = ctx.device;
        let program = ShaderProgram::new(device, "mordant composite", SHADER)?;
        let [layout]: [wgpu::BindGroupLayout; 1] = program
            .bind_group_layouts(device)
            .try_into()
            .map_err(|_| anyhow!("composite shader must declare exactly one bind group"))?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mordant composite pipeline layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mordant composite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: program.module(),
                entry_point: Some("vertex_main"),
                compilation_options: Default::default(),
                buffers: &[PositionVertex::layout(), UvVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: program.module(),
                entry_point: Some("frag_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mordant composite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mordant composite positions"),
            contents: bytemuck::cast_slice(&FULLSCREEN_POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uvs = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mordant composite uvs"),
            contents: bytemuck::cast_slice(&FULLSCREEN_UVS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let bind_groups = field_bind_groups(device, &layout, &sampler, paint, reaction);

        Ok(Self {
            pipeline,
            layout,
            sampler,
            positions,
            uvs,
            bind_groups,
            bound: (paint.generation(), reaction.generation()),
        })
    }

    /// Rebinds the simulation results. Call after both simulations were resized.
    pub fn set_size(
        &mut self,
        device: &wgpu::Device,
        size: Viewport,
        paint: &PaintSimulation,
        reaction: &ReactionDiffusion,
    ) {
        self.bind_groups = field_bind_groups(device, &self.layout, &self.sampler, paint, reaction);
        self.bound = (paint.generation(), reaction.generation());
        log::debug!("composite rebound for {}x{}", size.width, size.height);
    }

    /// Whether the bindings refer to the simulations' live fields.
    pub fn is_current(&self, paint: &PaintSimulation, reaction: &ReactionDiffusion) -> bool {
        self.bound == (paint.generation(), reaction.generation())
    }

    /// Draws the full-screen triangle into `rpass`.
    pub fn render(
        &self,
        rpass: &mut wgpu::RenderPass<'_>,
        paint: &PaintSimulation,
        reaction: &ReactionDiffusion,
    ) {
        debug_assert!(self.is_current(paint, reaction), "composite bindings are stale");

        let bind_group = &self.bind_groups[paint.swap_index()][reaction.swap_index()];
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, self.positions.slice(..));
        rpass.set_vertex_buffer(1, self.uvs.slice(..));
        rpass.draw(0..FULLSCREEN_POSITIONS.len() as u32, 0..1);
    }

    /// Records a render pass that clears `target` to white and composites into it.
    pub fn encode(
        &self,
        target: RenderTarget<'_>,
        paint: &PaintSimulation,
        reaction: &ReactionDiffusion,
    ) {
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("mordant composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        self.render(&mut rpass, paint, reaction);
    }
}

fn field_bind_groups(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    paint: &PaintSimulation,
    reaction: &ReactionDiffusion,
) -> [[wgpu::BindGroup; 2]; 2] {
    std::array::from_fn(|p| {
        std::array::from_fn(|r| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mordant composite fields"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(reaction.field(r).view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(paint.field(p).view()),
                    },
                ],
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{BindingKind, Reflection};

    #[test]
    fn composite_bindings_are_fragment_only() {
        let reflection = Reflection::from_wgsl(SHADER).expect("composite shader reflects");
        assert_eq!(reflection.group_count(), 1);

        let bindings = reflection.bindings();
        assert_eq!(bindings.len(), 3);
        for slot in bindings {
            assert_eq!(slot.visibility, wgpu::ShaderStages::FRAGMENT);
        }
        assert!(matches!(bindings[0].kind, BindingKind::Sampler { comparison: false }));
        assert!(matches!(
            bindings[1].kind,
            BindingKind::SampledTexture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                ..
            }
        ));
    }
}
