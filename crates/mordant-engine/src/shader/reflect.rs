use std::collections::HashMap;
use std::num::NonZeroU64;

use anyhow::{anyhow, bail, Context, Result};

/// Layout of a WGSL struct as computed by naga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub size: u32,
    pub offsets: HashMap<String, u32>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Uniform { size: u32 },
    Storage { size: u32, read_only: bool },
    SampledTexture {
        sample_type: wgpu::TextureSampleType,
        view_dimension: wgpu::TextureViewDimension,
        multisampled: bool,
    },
    StorageTexture {
        format: wgpu::TextureFormat,
        access: wgpu::StorageTextureAccess,
        view_dimension: wgpu::TextureViewDimension,
    },
    Sampler { comparison: bool },
}

/// One `@group(g) @binding(b)` resource declared by the module.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSlot {
    pub name: Option<String>,
    pub group: u32,
    pub binding: u32,
    pub kind: BindingKind,
    /// Stages whose entry points actually use the resource.
    pub visibility: wgpu::ShaderStages,
}

impl BindingSlot {
    pub fn layout_entry(&self) -> wgpu::BindGroupLayoutEntry {
        let ty = match self.kind {
            BindingKind::Uniform { size } => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(size as u64),
            },
            BindingKind::Storage { size, read_only } => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(size as u64),
            },
            BindingKind::SampledTexture {
                sample_type,
                view_dimension,
                multisampled,
            } => wgpu::BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled,
            },
            BindingKind::StorageTexture {
                format,
                access,
                view_dimension,
            } => wgpu::BindingType::StorageTexture {
                access,
                format,
                view_dimension,
            },
            BindingKind::Sampler { comparison } => wgpu::BindingType::Sampler(if comparison {
                wgpu::SamplerBindingType::Comparison
            } else {
                wgpu::SamplerBindingType::Filtering
            }),
        };

        wgpu::BindGroupLayoutEntry {
            binding: self.binding,
            visibility: self.visibility,
            ty,
            count: None,
        }
    }
}

/// Bindings, struct layouts and workgroup sizes of a WGSL module.
#[derive(Debug, Clone)]
pub struct Reflection {
    bindings: Vec<BindingSlot>,
    structs: HashMap<String, StructLayout>,
    workgroup_sizes: HashMap<String, [u32; 3]>,
    /// Named module-scope `f32` constants, after constant evaluation.
    constants: HashMap<String, f32>,
}

impl Reflection {
    /// Parses and validates `source`, then collects its resource interface.
    pub fn from_wgsl(source: &str) -> Result<Self> {
        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| anyhow!("wgsl parse error:\n{}", e.emit_to_string(source)))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        let info = validator
            .validate(&module)
            .map_err(|e| anyhow!("wgsl validation error: {e:?}"))?;

        // Sampled float textures are filterable only when the module samples
        // them through a filtering sampler.
        let has_filtering_sampler = module.global_variables.iter().any(|(_, var)| {
            matches!(
                module.types[var.ty].inner,
                naga::TypeInner::Sampler { comparison: false }
            )
        });

        let mut bindings = Vec::new();
        for (handle, var) in module.global_variables.iter() {
            let Some(rb) = &var.binding else { continue };

            let mut visibility = wgpu::ShaderStages::NONE;
            for (index, ep) in module.entry_points.iter().enumerate() {
                if info.get_entry_point(index)[handle].is_empty() {
                    continue;
                }
                visibility |= match ep.stage {
                    naga::ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
                    naga::ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
                    naga::ShaderStage::Compute => wgpu::ShaderStages::COMPUTE,
                    _ => wgpu::ShaderStages::NONE,
                };
            }

            if visibility.is_empty() {
                log::debug!(
                    "binding @group({}) @binding({}) is unused by every entry point; skipped",
                    rb.group,
                    rb.binding
                );
                continue;
            }

            let kind = binding_kind(&module, var, has_filtering_sampler).with_context(|| {
                format!(
                    "unsupported resource `{}` at @group({}) @binding({})",
                    var.name.as_deref().unwrap_or("?"),
                    rb.group,
                    rb.binding
                )
            })?;

            bindings.push(BindingSlot {
                name: var.name.clone(),
                group: rb.group,
                binding: rb.binding,
                kind,
                visibility,
            });
        }
        bindings.sort_by_key(|b| (b.group, b.binding));

        let mut structs = HashMap::new();
        for (_, ty) in module.types.iter() {
            let (Some(name), naga::TypeInner::Struct { members, span }) = (&ty.name, &ty.inner)
            else {
                continue;
            };
            let offsets = members
                .iter()
                .filter_map(|m| m.name.clone().map(|n| (n, m.offset)))
                .collect();
            structs.insert(name.clone(), StructLayout { size: *span, offsets });
        }

        let workgroup_sizes = module
            .entry_points
            .iter()
            .filter(|ep| ep.stage == naga::ShaderStage::Compute)
            .map(|ep| (ep.name.clone(), ep.workgroup_size))
            .collect();

        let constants = module
            .constants
            .iter()
            .filter_map(|(_, constant)| {
                let name = constant.name.clone()?;
                match module.global_expressions[constant.init] {
                    naga::Expression::Literal(naga::Literal::F32(value)) => Some((name, value)),
                    _ => None,
                }
            })
            .collect();

        Ok(Self {
            bindings,
            structs,
            workgroup_sizes,
            constants,
        })
    }

    pub fn bindings(&self) -> &[BindingSlot] {
        &self.bindings
    }

    /// Largest group index in use, plus one.
    pub fn group_count(&self) -> u32 {
        self.bindings.iter().map(|b| b.group + 1).max().unwrap_or(0)
    }

    /// Layout entries for `group`, ordered by binding index.
    pub fn layout_entries(&self, group: u32) -> Vec<wgpu::BindGroupLayoutEntry> {
        self.bindings
            .iter()
            .filter(|b| b.group == group)
            .map(BindingSlot::layout_entry)
            .collect()
    }

    pub fn struct_layout(&self, name: &str) -> Option<&StructLayout> {
        self.structs.get(name)
    }

    /// Checks that the host-side mirror `T` has the size of WGSL struct `name`.
    pub fn check_struct_size<T>(&self, name: &str) -> Result<()> {
        let layout = self
            .struct_layout(name)
            .with_context(|| format!("struct `{name}` not declared by shader"))?;
        let host = std::mem::size_of::<T>();
        if layout.size as usize != host {
            bail!(
                "struct `{name}` is {} bytes in WGSL but {host} bytes on the host",
                layout.size
            );
        }
        Ok(())
    }

    pub fn workgroup_size(&self, entry_point: &str) -> Option<[u32; 3]> {
        self.workgroup_sizes.get(entry_point).copied()
    }

    /// Value of the module-scope `const name: f32`.
    pub fn constant_f32(&self, name: &str) -> Option<f32> {
        self.constants.get(name).copied()
    }
}

fn binding_kind(
    module: &naga::Module,
    var: &naga::GlobalVariable,
    has_filtering_sampler: bool,
) -> Result<BindingKind> {
    let inner = &module.types[var.ty].inner;

    match var.space {
        naga::AddressSpace::Uniform => Ok(BindingKind::Uniform {
            size: inner.size(module.to_ctx()),
        }),
        naga::AddressSpace::Storage { access } => Ok(BindingKind::Storage {
            size: inner.size(module.to_ctx()),
            read_only: !access.contains(naga::StorageAccess::STORE),
        }),
        naga::AddressSpace::Handle => match *inner {
            naga::TypeInner::Sampler { comparison } => Ok(BindingKind::Sampler { comparison }),
            naga::TypeInner::Image {
                dim,
                arrayed,
                class,
            } => {
                let view_dimension = view_dimension(dim, arrayed)?;
                match class {
                    naga::ImageClass::Sampled { kind, multi } => {
                        let sample_type = match kind {
                            naga::ScalarKind::Float => wgpu::TextureSampleType::Float {
                                filterable: has_filtering_sampler && !multi,
                            },
                            naga::ScalarKind::Sint => wgpu::TextureSampleType::Sint,
                            naga::ScalarKind::Uint => wgpu::TextureSampleType::Uint,
                            other => bail!("unsupported sampled texture kind {other:?}"),
                        };
                        Ok(BindingKind::SampledTexture {
                            sample_type,
                            view_dimension,
                            multisampled: multi,
                        })
                    }
                    naga::ImageClass::Depth { multi } => Ok(BindingKind::SampledTexture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension,
                        multisampled: multi,
                    }),
                    naga::ImageClass::Storage { format, access } => {
                        let access = match (
                            access.contains(naga::StorageAccess::LOAD),
                            access.contains(naga::StorageAccess::STORE),
                        ) {
                            (true, true) => wgpu::StorageTextureAccess::ReadWrite,
                            (true, false) => wgpu::StorageTextureAccess::ReadOnly,
                            _ => wgpu::StorageTextureAccess::WriteOnly,
                        };
                        Ok(BindingKind::StorageTexture {
                            format: storage_format(format)?,
                            access,
                            view_dimension,
                        })
                    }
                    other => bail!("unsupported image class {other:?}"),
                }
            }
            ref other => bail!("unsupported handle type {other:?}"),
        },
        other => bail!("unsupported address space {other:?}"),
    }
}

fn view_dimension(dim: naga::ImageDimension, arrayed: bool) -> Result<wgpu::TextureViewDimension> {
    Ok(match (dim, arrayed) {
        (naga::ImageDimension::D1, false) => wgpu::TextureViewDimension::D1,
        (naga::ImageDimension::D2, false) => wgpu::TextureViewDimension::D2,
        (naga::ImageDimension::D2, true) => wgpu::TextureViewDimension::D2Array,
        (naga::ImageDimension::D3, false) => wgpu::TextureViewDimension::D3,
        (naga::ImageDimension::Cube, false) => wgpu::TextureViewDimension::Cube,
        (naga::ImageDimension::Cube, true) => wgpu::TextureViewDimension::CubeArray,
        (dim, arrayed) => bail!("unsupported texture dimension {dim:?} (arrayed: {arrayed})"),
    })
}

fn storage_format(format: naga::StorageFormat) -> Result<wgpu::TextureFormat> {
    Ok(match format {
        naga::StorageFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        naga::StorageFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        naga::StorageFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        naga::StorageFormat::R32Float => wgpu::TextureFormat::R32Float,
        naga::StorageFormat::Rg32Float => wgpu::TextureFormat::Rg32Float,
        other => bail!("unsupported storage texture format {other:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPUTE_SRC: &str = r#"
struct Params {
    size: vec2f,
    time: f32,
    scale: f32,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(1) @binding(0) var inputTex: texture_2d<f32>;
@group(1) @binding(1) var outputTex: texture_storage_2d<rgba16float, write>;

@compute @workgroup_size(8, 4, 1)
fn compute_main(@builtin(global_invocation_id) id: vec3<u32>) {
    let v = textureLoad(inputTex, vec2i(id.xy), 0) * params.scale;
    textureStore(outputTex, vec2i(id.xy), v);
}
"#;

    const RENDER_SRC: &str = r#"
@group(0) @binding(0) var samp: sampler;
@group(0) @binding(1) var colorTex: texture_2d<f32>;

@vertex
fn vertex_main(@location(0) p: vec2f) -> @builtin(position) vec4f {
    return vec4f(p, 0.0, 1.0);
}

@fragment
fn frag_main(@builtin(position) p: vec4f) -> @location(0) vec4f {
    return textureSample(colorTex, samp, p.xy);
}
"#;

    #[test]
    fn reflects_compute_bindings() {
        let r = Reflection::from_wgsl(COMPUTE_SRC).unwrap();
        assert_eq!(r.group_count(), 2);

        let b = r.bindings();
        assert_eq!(b.len(), 3);
        assert_eq!(b[0].kind, BindingKind::Uniform { size: 16 });
        assert_eq!(b[0].visibility, wgpu::ShaderStages::COMPUTE);
        assert_eq!(
            b[1].kind,
            BindingKind::SampledTexture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            }
        );
        assert_eq!(
            b[2].kind,
            BindingKind::StorageTexture {
                format: wgpu::TextureFormat::Rgba16Float,
                access: wgpu::StorageTextureAccess::WriteOnly,
                view_dimension: wgpu::TextureViewDimension::D2,
            }
        );
    }

    #[test]
    fn reflects_struct_layout_and_workgroup() {
        let r = Reflection::from_wgsl(COMPUTE_SRC).unwrap();
        let params = r.struct_layout("Params").unwrap();
        assert_eq!(params.size, 16);
        assert_eq!(params.offsets["time"], 8);
        assert_eq!(r.workgroup_size("compute_main"), Some([8, 4, 1]));
        assert!(r.check_struct_size::<[f32; 4]>("Params").is_ok());
        assert!(r.check_struct_size::<[f32; 3]>("Params").is_err());
    }

    #[test]
    fn fragment_textures_become_filterable_next_to_a_sampler() {
        let r = Reflection::from_wgsl(RENDER_SRC).unwrap();
        let entries = r.layout_entries(0);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].visibility, wgpu::ShaderStages::FRAGMENT);
        assert!(matches!(
            entries[1].ty,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                ..
            }
        ));
    }

    #[test]
    fn reflects_evaluated_f32_constants() {
        let r = Reflection::from_wgsl(
            "const RATE: f32 = 1.0 / 4.0;\nconst COUNT: u32 = 3u;\n@compute @workgroup_size(1) fn main() { _ = RATE * f32(COUNT); }",
        )
        .unwrap();
        assert_eq!(r.constant_f32("RATE"), Some(0.25));
        assert_eq!(r.constant_f32("COUNT"), None);
        assert_eq!(r.constant_f32("MISSING"), None);
    }

    #[test]
    fn rejects_invalid_source() {
        assert!(Reflection::from_wgsl("fn broken( {").is_err());
    }
}
