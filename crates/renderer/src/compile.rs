use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::shaders;

/// Compiles one of the built-in GLSL sources.
pub(crate) fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    tracing::trace!(label, ?stage, "compiling shader");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    })
}

/// Every module the pipelines need, compiled once per device.
pub(crate) struct ShaderModules {
    pub fullscreen_vertex: wgpu::ShaderModule,
    pub mesh_vertex: wgpu::ShaderModule,
    pub mesh_lit: wgpu::ShaderModule,
    pub mesh_black: wgpu::ShaderModule,
    pub particle_vertex: wgpu::ShaderModule,
    pub particle_fragment: wgpu::ShaderModule,
    pub cone_vertex: wgpu::ShaderModule,
    pub cone_fragment: wgpu::ShaderModule,
    pub scatter: wgpu::ShaderModule,
    pub additive: wgpu::ShaderModule,
    pub scan: wgpu::ShaderModule,
    pub ripple: wgpu::ShaderModule,
    pub ascii: wgpu::ShaderModule,
    pub present: wgpu::ShaderModule,
}

impl ShaderModules {
    pub fn compile(device: &wgpu::Device) -> Self {
        let vertex = |label: &str, source: &'static str| {
            compile_glsl(device, label, source, ShaderStage::Vertex)
        };
        let fragment = |label: &str, source: &'static str| {
            compile_glsl(device, label, source, ShaderStage::Fragment)
        };
        Self {
            fullscreen_vertex: vertex("fullscreen triangle vertex", shaders::FULLSCREEN_VERTEX),
            mesh_vertex: vertex("mesh vertex", shaders::MESH_VERTEX),
            mesh_lit: fragment("lit mesh fragment", shaders::MESH_LIT_FRAGMENT),
            mesh_black: fragment("occlusion mesh fragment", shaders::MESH_BLACK_FRAGMENT),
            particle_vertex: vertex("particle vertex", shaders::PARTICLE_VERTEX),
            particle_fragment: fragment("particle fragment", shaders::PARTICLE_FRAGMENT),
            cone_vertex: vertex("light cone vertex", shaders::CONE_VERTEX),
            cone_fragment: fragment("light cone fragment", shaders::CONE_FRAGMENT),
            scatter: fragment("light scattering fragment", shaders::SCATTER_FRAGMENT),
            additive: fragment("additive fragment", shaders::ADDITIVE_FRAGMENT),
            scan: fragment("scan fragment", shaders::SCAN_FRAGMENT),
            ripple: fragment("ripple fragment", shaders::RIPPLE_FRAGMENT),
            ascii: fragment("ascii fragment", shaders::ASCII_FRAGMENT),
            present: fragment("present fragment", shaders::PRESENT_FRAGMENT),
        }
    }
}
