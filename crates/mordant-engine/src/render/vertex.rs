//! Vertex streams for the full-screen triangle.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct PositionVertex {
    pub pos: [f32; 2], // clip space
}

impl PositionVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PositionVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct UvVertex {
    pub uv: [f32; 2], // 0..1 on screen, origin bottom-left
}

impl UvVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<UvVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// One triangle covering clip space; the excess is clipped.
pub(super) const FULLSCREEN_POSITIONS: [PositionVertex; 3] = [
    PositionVertex { pos: [-1.0, 3.0] },
    PositionVertex { pos: [-1.0, -1.0] },
    PositionVertex { pos: [3.0, -1.0] },
];

pub(super) const FULLSCREEN_UVS: [UvVertex; 3] = [
    UvVertex { uv: [0.0, 2.0] },
    UvVertex { uv: [0.0, 0.0] },
    UvVertex { uv: [2.0, 0.0] },
];
