use anyhow::{Context, Result};

use super::Reflection;

/// A compiled WGSL module plus its reflected interface.
pub struct ShaderProgram {
    label: &'static str,
    module: wgpu::ShaderModule,
    reflection: Reflection,
}

impl ShaderProgram {
    /// Reflects `source` and compiles it on `device`.
    ///
    /// Reflection runs first so malformed sources fail with a readable error
    /// instead of a device validation error.
    pub fn new(device: &wgpu::Device, label: &'static str, source: &str) -> Result<Self> {
        let reflection = Reflection::from_wgsl(source)
            .with_context(|| format!("failed to reflect shader `{label}`"))?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        Ok(Self {
            label,
            module,
            reflection,
        })
    }

    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    pub fn reflection(&self) -> &Reflection {
        &self.reflection
    }

    /// Creates one bind group layout per reflected group, in group order.
    pub fn bind_group_layouts(&self, device: &wgpu::Device) -> Vec<wgpu::BindGroupLayout> {
        (0..self.reflection.group_count())
            .map(|group| {
                let entries = self.reflection.layout_entries(group);
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(self.label),
                    entries: &entries,
                })
            })
            .collect()
    }

    /// Builds a compute pipeline for `entry_point` over `layouts`.
    pub fn compute_pipeline(
        &self,
        device: &wgpu::Device,
        entry_point: &str,
        layouts: &[wgpu::BindGroupLayout],
    ) -> Result<wgpu::ComputePipeline> {
        self.reflection
            .workgroup_size(entry_point)
            .with_context(|| format!("`{}` has no compute entry point `{entry_point}`", self.label))?;

        let layout_refs: Vec<&wgpu::BindGroupLayout> = layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(self.label),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });

        Ok(device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(self.label),
            layout: Some(&pipeline_layout),
            module: &self.module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        }))
    }
}
