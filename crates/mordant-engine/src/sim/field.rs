use anyhow::{anyhow, ensure, Result};

use crate::coords::Viewport;

use super::swap::Release;

/// Texel format of every simulation field.
pub const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// One simulation texture and its default view.
#[derive(Debug)]
pub struct Field {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Viewport,
}

impl Field {
    /// Allocates a zero-initialized field.
    ///
    /// Fields are written by compute storage access, sampled by later passes,
    /// cleared through render passes when seeded, and copied out for
    /// inspection.
    pub fn new(device: &wgpu::Device, label: &str, size: Viewport) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: size.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FIELD_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view, size }
    }

    /// Allocates the two fields of a swap pair.
    ///
    /// Allocation runs inside error scopes, so a device that cannot provide
    /// the memory yields an error instead of a panic.
    pub fn pair(device: &wgpu::Device, labels: [&str; 2], size: Viewport) -> Result<[Field; 2]> {
        scoped_allocation(device, || labels.map(|label| Field::new(device, label, size)))
            .map_err(|err| err.context(format!("allocating {}x{} fields", size.width, size.height)))
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> Viewport {
        self.size
    }

    /// Records a render-pass clear of the whole field to `value`.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder, value: wgpu::Color) {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("field clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(value),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }
}

impl Release for Field {
    fn release(&self) {
        self.texture.destroy();
    }
}

/// Rejects sizes the device cannot allocate.
///
/// Runs before the previous fields are released, so a rejected size leaves
/// them in place.
pub fn validate_size(size: Viewport, max_dimension: u32) -> Result<()> {
    ensure!(
        size.width > 0 && size.height > 0,
        "field size {}x{} is empty",
        size.width,
        size.height
    );
    ensure!(
        size.width <= max_dimension && size.height <= max_dimension,
        "field size {}x{} exceeds the device limit of {max_dimension}",
        size.width,
        size.height
    );
    Ok(())
}

/// Runs `allocate` inside out-of-memory and validation error scopes and
/// reports whatever they captured.
pub(crate) fn scoped_allocation<R>(device: &wgpu::Device, allocate: impl FnOnce() -> R) -> Result<R> {
    let out_of_memory = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let validation = device.push_error_scope(wgpu::ErrorFilter::Validation);

    let value = allocate();

    // Scopes pop innermost first.
    let invalid = pollster::block_on(validation.pop());
    let exhausted = pollster::block_on(out_of_memory.pop());
    match exhausted.or(invalid) {
        Some(err) => Err(anyhow!("{err}")),
        None => Ok(value),
    }
}
