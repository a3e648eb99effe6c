//! Headless device acquisition for GPU-backed tests.
//!
//! Machines without a usable adapter (CI containers, mostly) get `None` and the
//! calling test returns early.

pub(crate) struct HeadlessGpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

pub(crate) fn headless() -> Option<HeadlessGpu> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("mordant test device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .ok()?;

        super::log_uncaptured_errors(&device);

        Some(HeadlessGpu { device, queue })
    })
}

/// Bytes per `Rgba16Float` texel.
const TEXEL_BYTES: u32 = 8;

fn padded_row(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * TEXEL_BYTES).div_ceil(align) * align
}

/// Uploads `texels` (row 0 first) into an `Rgba16Float` texture.
pub(crate) fn write_texels(gpu: &HeadlessGpu, texture: &wgpu::Texture, texels: &[[f32; 4]]) {
    let (width, height) = (texture.width(), texture.height());
    assert_eq!(texels.len(), (width * height) as usize);

    let row_bytes = padded_row(width) as usize;
    let mut data = vec![0u8; row_bytes * height as usize];
    for (i, texel) in texels.iter().enumerate() {
        let (x, y) = (i % width as usize, i / width as usize);
        let offset = y * row_bytes + x * TEXEL_BYTES as usize;
        for (c, value) in texel.iter().enumerate() {
            let bits = half::f16::from_f32(*value).to_bits().to_le_bytes();
            data[offset + c * 2..offset + c * 2 + 2].copy_from_slice(&bits);
        }
    }

    gpu.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(padded_row(width)),
            rows_per_image: Some(height),
        },
        texture.size(),
    );
}

/// Copies an `Rgba16Float` texture back to the host, row 0 first.
pub(crate) fn read_texels(gpu: &HeadlessGpu, texture: &wgpu::Texture) -> Vec<[f32; 4]> {
    let (width, height) = (texture.width(), texture.height());
    let row_bytes = padded_row(width);

    let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("mordant test readback"),
        size: (row_bytes * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row_bytes),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.device
        .poll(wgpu::PollType::wait_indefinitely())
        .expect("device poll");
    rx.recv().expect("map callback").expect("readback mapping");

    let data = slice.get_mapped_range();
    let mut texels = Vec::with_capacity((width * height) as usize);
    for y in 0..height as usize {
        let row = &data[y * row_bytes as usize..];
        for x in 0..width as usize {
            let texel = &row[x * TEXEL_BYTES as usize..];
            texels.push(std::array::from_fn(|c| {
                half::f16::from_le_bytes([texel[c * 2], texel[c * 2 + 1]]).to_f32()
            }));
        }
    }
    texels
}

/// Returns a headless GPU or logs why the calling test is skipped.
macro_rules! headless_or_skip {
    () => {
        match $crate::device::testing::headless() {
            Some(gpu) => gpu,
            None => {
                eprintln!("no GPU adapter available; skipping");
                return;
            }
        }
    };
}

pub(crate) use headless_or_skip;
