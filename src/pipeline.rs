use wgpu::{BindGroupLayout, Device, RenderPipeline, TextureFormat};

use crate::mesh::PlaneVertex;
use crate::shader::PLANE_SHADER_WGSL;

/// Format the sticker snapshot is uploaded in.
pub const IMAGE_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    Front,
    Reflection,
}

impl PlaneKind {
    fn entry_points(self) -> (&'static str, &'static str) {
        match self {
            PlaneKind::Front => ("vs_front", "fs_front"),
            PlaneKind::Reflection => ("vs_reflection", "fs_reflection"),
        }
    }

    fn label(self) -> &'static str {
        match self {
            PlaneKind::Front => "front_plane_pipeline",
            PlaneKind::Reflection => "reflection_plane_pipeline",
        }
    }
}

/// Group 0: the per-plane [`PlaneUniforms`](crate::shader::PlaneUniforms).
pub fn create_uniform_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("plane_uniform_bind_group_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Group 1: the sticker image and its sampler, shared by both planes.
pub fn create_texture_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("plane_texture_bind_group_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub fn create_image_sampler(device: &Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("plane_image_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn alpha_blending() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Pipeline for one of the two planes.
///
/// Neither plane uses a depth attachment: the reflection is drawn first and the front plane is
/// composited over it, so draw order alone decides visibility. Both faces are drawn because the
/// lifted edge can turn its back towards the camera.
pub fn create_plane_pipeline(
    device: &Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    format: TextureFormat,
    kind: PlaneKind,
) -> RenderPipeline {
    let (vertex_entry, fragment_entry) = kind.entry_points();
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(kind.label()),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vertex_entry),
            buffers: &[PlaneVertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(alpha_blending()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Both plane pipelines, built from one shader module.
pub struct PlanePipelines {
    pub uniform_layout: BindGroupLayout,
    pub texture_layout: BindGroupLayout,
    pub front: RenderPipeline,
    pub reflection: RenderPipeline,
}

impl PlanePipelines {
    pub fn new(device: &Device, format: TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("plane_shader"),
            source: wgpu::ShaderSource::Wgsl(PLANE_SHADER_WGSL.into()),
        });
        let uniform_layout = create_uniform_bind_group_layout(device);
        let texture_layout = create_texture_bind_group_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("plane_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let front = create_plane_pipeline(device, &shader, &layout, format, PlaneKind::Front);
        let reflection =
            create_plane_pipeline(device, &shader, &layout, format, PlaneKind::Reflection);

        Self {
            uniform_layout,
            texture_layout,
            front,
            reflection,
        }
    }
}
