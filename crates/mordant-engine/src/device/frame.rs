/// Represents a single acquired frame.
///
/// The surface texture is acquired fresh every frame and must never be kept
/// across frames; it is presented right after its encoder is submitted.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
