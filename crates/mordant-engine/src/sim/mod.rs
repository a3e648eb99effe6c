//! Ping-pong compute simulations.
//!
//! Each simulation owns a [`SwapPair`] of [`Field`]s plus the two bind groups
//! that read one field and write the other. Allocation happens in `init`
//! (repeatable on resize); `compute` records dispatches into a compute pass
//! supplied by the frame scheduler.

pub mod config;
pub mod dispatch;
pub mod field;
pub mod paint;
pub mod reaction_diffusion;
pub mod reference;
pub mod swap;

pub use config::{SimConfig, SimResolutions};
pub use dispatch::{DispatchGrid, TileLayout, PAINT_TILES, REACTION_TILES};
pub use field::{Field, FIELD_FORMAT};
pub use paint::{PaintSimulation, PointerInfo, RenderInfo};
pub use reaction_diffusion::{ReactionDiffusion, ReactionParams};
pub use swap::{Release, SwapPair, SwapView};

/// Creates a uniform buffer sized for `T`, written later through the queue.
pub(crate) fn uniform_buffer<T: bytemuck::Pod>(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Checks a kernel's declared `@workgroup_size` against the host tile layout.
pub(crate) fn check_workgroup(
    reflection: &crate::shader::Reflection,
    entry_point: &str,
    layout: TileLayout,
) -> anyhow::Result<()> {
    let size = reflection
        .workgroup_size(entry_point)
        .ok_or_else(|| anyhow::anyhow!("missing compute entry point `{entry_point}`"))?;
    anyhow::ensure!(
        [size[0], size[1]] == layout.workgroup && size[2] == 1,
        "`{entry_point}` declares workgroup size {size:?}, expected {:?}",
        layout.workgroup
    );
    Ok(())
}
