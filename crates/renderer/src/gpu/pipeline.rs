use crate::compile::ShaderModules;
use crate::model::MeshVertex;

use super::targets::{COLOR_FORMAT, DEPTH_FORMAT, DEPTH_VALUE_FORMAT};

const MESH_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];
const PARTICLE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

fn mesh_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &MESH_ATTRIBUTES,
    }
}

fn particle_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &PARTICLE_ATTRIBUTES,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, filterable: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, kind: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(kind),
        count: None,
    }
}

const FILTERING: wgpu::SamplerBindingType = wgpu::SamplerBindingType::Filtering;
const NON_FILTERING: wgpu::SamplerBindingType = wgpu::SamplerBindingType::NonFiltering;

/// Colour is read through the linear sampler, the ripple canvas through the
/// nearest one.
fn ripple_layout_entries() -> [wgpu::BindGroupLayoutEntry; 5] {
    [
        uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
        texture_entry(1, true),
        texture_entry(2, true),
        sampler_entry(3, FILTERING),
        sampler_entry(4, NON_FILTERING),
    ]
}

pub(crate) struct BindLayouts {
    pub scene: wgpu::BindGroupLayout,
    pub scatter: wgpu::BindGroupLayout,
    pub additive: wgpu::BindGroupLayout,
    pub scan: wgpu::BindGroupLayout,
    pub ripple: wgpu::BindGroupLayout,
    pub ascii: wgpu::BindGroupLayout,
    pub present: wgpu::BindGroupLayout,
}

impl BindLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let layout = |label: &str, entries: &[wgpu::BindGroupLayoutEntry]| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries,
            })
        };
        Self {
            scene: layout(
                "scene layout",
                &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
            ),
            scatter: layout(
                "scatter layout",
                &[
                    uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                    texture_entry(1, true),
                    sampler_entry(2, FILTERING),
                ],
            ),
            additive: layout(
                "additive layout",
                &[
                    texture_entry(0, true),
                    texture_entry(1, true),
                    sampler_entry(2, FILTERING),
                ],
            ),
            scan: layout(
                "scan layout",
                &[
                    uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                    texture_entry(1, true),
                    texture_entry(2, false),
                    sampler_entry(3, FILTERING),
                    sampler_entry(4, NON_FILTERING),
                ],
            ),
            ripple: layout("ripple layout", &ripple_layout_entries()),
            ascii: layout(
                "ascii layout",
                &[
                    uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                    texture_entry(1, true),
                    texture_entry(2, false),
                    texture_entry(3, true),
                    sampler_entry(4, NON_FILTERING),
                ],
            ),
            present: layout(
                "present layout",
                &[texture_entry(0, true), sampler_entry(1, FILTERING)],
            ),
        }
    }
}

pub(crate) struct Pipelines {
    pub layouts: BindLayouts,
    pub mesh_lit: wgpu::RenderPipeline,
    pub particles: wgpu::RenderPipeline,
    pub occlusion_mesh: wgpu::RenderPipeline,
    pub cone: wgpu::RenderPipeline,
    pub scatter: wgpu::RenderPipeline,
    pub additive: wgpu::RenderPipeline,
    pub scan: wgpu::RenderPipeline,
    pub ripple: wgpu::RenderPipeline,
    pub ascii: wgpu::RenderPipeline,
    pub present: wgpu::RenderPipeline,
}

struct MeshPipelineDesc<'a> {
    label: &'a str,
    vertex: &'a wgpu::ShaderModule,
    fragment: &'a wgpu::ShaderModule,
    buffer: wgpu::VertexBufferLayout<'static>,
    targets: &'a [Option<wgpu::ColorTargetState>],
    cull_mode: Option<wgpu::Face>,
    depth_write: bool,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        modules: &ShaderModules,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let layouts = BindLayouts::new(device);
        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&layouts.scene],
            push_constant_ranges: &[],
        });

        let scene_targets = [
            Some(opaque_target(COLOR_FORMAT)),
            Some(opaque_target(DEPTH_VALUE_FORMAT)),
        ];
        let occlusion_targets = [Some(opaque_target(COLOR_FORMAT))];
        let cone_targets = [Some(wgpu::ColorTargetState {
            format: COLOR_FORMAT,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let mesh_lit = mesh_pipeline(
            device,
            &scene_layout,
            MeshPipelineDesc {
                label: "lit mesh pipeline",
                vertex: &modules.mesh_vertex,
                fragment: &modules.mesh_lit,
                buffer: mesh_buffer_layout(),
                targets: &scene_targets,
                cull_mode: Some(wgpu::Face::Back),
                depth_write: true,
            },
        );
        let particles = mesh_pipeline(
            device,
            &scene_layout,
            MeshPipelineDesc {
                label: "particle pipeline",
                vertex: &modules.particle_vertex,
                fragment: &modules.particle_fragment,
                buffer: particle_buffer_layout(),
                targets: &scene_targets,
                cull_mode: None,
                depth_write: true,
            },
        );
        let occlusion_mesh = mesh_pipeline(
            device,
            &scene_layout,
            MeshPipelineDesc {
                label: "occlusion mesh pipeline",
                vertex: &modules.mesh_vertex,
                fragment: &modules.mesh_black,
                buffer: mesh_buffer_layout(),
                targets: &occlusion_targets,
                cull_mode: Some(wgpu::Face::Back),
                depth_write: true,
            },
        );
        let cone = mesh_pipeline(
            device,
            &scene_layout,
            MeshPipelineDesc {
                label: "light cone pipeline",
                vertex: &modules.cone_vertex,
                fragment: &modules.cone_fragment,
                buffer: mesh_buffer_layout(),
                targets: &cone_targets,
                cull_mode: Some(wgpu::Face::Back),
                depth_write: false,
            },
        );

        let fullscreen = |label: &str,
                          layout: &wgpu::BindGroupLayout,
                          fragment: &wgpu::ShaderModule,
                          format: wgpu::TextureFormat| {
            fullscreen_pipeline(device, label, layout, &modules.fullscreen_vertex, fragment, format)
        };

        Self {
            mesh_lit,
            particles,
            occlusion_mesh,
            cone,
            scatter: fullscreen("scatter pipeline", &layouts.scatter, &modules.scatter, COLOR_FORMAT),
            additive: fullscreen(
                "additive pipeline",
                &layouts.additive,
                &modules.additive,
                COLOR_FORMAT,
            ),
            scan: fullscreen("scan pipeline", &layouts.scan, &modules.scan, COLOR_FORMAT),
            ripple: fullscreen("ripple pipeline", &layouts.ripple, &modules.ripple, COLOR_FORMAT),
            ascii: fullscreen("ascii pipeline", &layouts.ascii, &modules.ascii, surface_format),
            present: fullscreen(
                "present pipeline",
                &layouts.present,
                &modules.present,
                surface_format,
            ),
            layouts,
        }
    }
}

fn opaque_target(format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
    wgpu::ColorTargetState {
        format,
        blend: None,
        write_mask: wgpu::ColorWrites::ALL,
    }
}

fn mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    desc: MeshPipelineDesc<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: desc.vertex,
            entry_point: Some("main"),
            buffers: &[desc.buffer],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: desc.fragment,
            entry_point: Some("main"),
            targets: desc.targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    bind_layout: &wgpu::BindGroupLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
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
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            targets: &[Some(opaque_target(format))],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ripple_layout_declares_point_sampler() {
        let entries = ripple_layout_entries();
        let bindings: Vec<u32> = entries.iter().map(|entry| entry.binding).collect();
        assert_eq!(bindings, [0, 1, 2, 3, 4]);
        assert_eq!(entries[3].ty, wgpu::BindingType::Sampler(FILTERING));
        assert_eq!(entries[4].ty, wgpu::BindingType::Sampler(NON_FILTERING));
    }
}
