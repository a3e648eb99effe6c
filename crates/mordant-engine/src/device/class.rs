/// Coarse performance class of the active adapter.
///
/// Simulation resolutions and iteration counts are scaled down on constrained
/// devices.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum DeviceClass {
    #[default]
    Desktop,
    Constrained,
}

impl DeviceClass {
    /// Integrated and software adapters are treated as constrained.
    pub fn from_device_type(device_type: wgpu::DeviceType) -> Self {
        match device_type {
            wgpu::DeviceType::IntegratedGpu | wgpu::DeviceType::Cpu => DeviceClass::Constrained,
            wgpu::DeviceType::DiscreteGpu
            | wgpu::DeviceType::VirtualGpu
            | wgpu::DeviceType::Other => DeviceClass::Desktop,
        }
    }
}
