use anyhow::Result;
use effects::{GlyphAtlasLayout, RippleCanvas, TargetLayout};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::compile::ShaderModules;
use crate::compositor::{FrameInputs, Pass, PassPlan, RenderBackend};
use crate::model::MeshData;
use crate::scene::LightCone;
use crate::types::{AdapterProfile, RendererConfig};

use super::context::GpuContext;
use super::pipeline::Pipelines;
use super::targets::RenderTargets;
use super::textures::{self, AtlasTexture};
use super::uniforms::{AsciiUniforms, RippleUniforms, ScanUniforms, ScatterUniforms, SceneUniforms};

const DEPTH_CLEAR: wgpu::Color = wgpu::Color {
    r: 1.0,
    g: 0.0,
    b: 0.0,
    a: 0.0,
};

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Option<Self> {
        if mesh.is_empty() {
            return None;
        }
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Some(Self {
            vertices,
            indices,
            index_count: mesh.indices.len() as u32,
        })
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    fn destroy(&self) {
        self.vertices.destroy();
        self.indices.destroy();
    }
}

struct UniformBuffers {
    scene: wgpu::Buffer,
    scatter: wgpu::Buffer,
    scan: wgpu::Buffer,
    ripple: wgpu::Buffer,
    ascii: wgpu::Buffer,
}

impl UniformBuffers {
    fn new(device: &wgpu::Device) -> Self {
        let buffer = |label: &str, size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            scene: buffer("scene uniforms", std::mem::size_of::<SceneUniforms>()),
            scatter: buffer("scatter uniforms", std::mem::size_of::<ScatterUniforms>()),
            scan: buffer("scan uniforms", std::mem::size_of::<ScanUniforms>()),
            ripple: buffer("ripple uniforms", std::mem::size_of::<RippleUniforms>()),
            ascii: buffer("ascii uniforms", std::mem::size_of::<AsciiUniforms>()),
        }
    }

    fn destroy(&self) {
        for buffer in [&self.scene, &self.scatter, &self.scan, &self.ripple, &self.ascii] {
            buffer.destroy();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    SceneColor,
    Post(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
    Scene,
    Occlusion,
    Scatter,
    Post(usize),
    Surface,
}

/// One pass of the plan bound to concrete targets.
struct Step {
    pass: Pass,
    bind_group: Option<wgpu::BindGroup>,
    output: Output,
}

/// wgpu implementation of [`RenderBackend`].
pub(crate) struct GpuState {
    context: GpuContext,
    pipelines: Pipelines,
    plan: PassPlan,
    uniforms: UniformBuffers,
    scene_bind_group: wgpu::BindGroup,
    linear_sampler: wgpu::Sampler,
    nearest_sampler: wgpu::Sampler,
    atlas: AtlasTexture,
    cone: Option<GpuMesh>,
    model: Option<GpuMesh>,
    particles: Option<wgpu::Buffer>,
    particle_capacity: usize,
    targets: Option<RenderTargets>,
    steps: Vec<Step>,
    released: bool,
}

impl GpuState {
    pub(crate) fn new<T>(target: &T, config: &RendererConfig) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let (width, height) = config.surface_size;
        let context = GpuContext::new(target, PhysicalSize::new(width, height), config.color_space)?;
        let device = &context.device;

        let modules = ShaderModules::compile(device);
        let pipelines = Pipelines::new(device, &modules, context.surface_format);
        let uniforms = UniformBuffers::new(device);
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene bind group"),
            layout: &pipelines.layouts.scene,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.scene.as_entire_binding(),
            }],
        });

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nearest sampler"),
            ..Default::default()
        });

        let header = &config.header;
        let atlas_layout = GlyphAtlasLayout::from_config(&header.ascii);
        let atlas_image = textures::load_atlas(header.ascii.atlas.as_deref(), &atlas_layout);
        let atlas = textures::create_atlas_texture(device, &context.queue, &atlas_image);
        let cone = GpuMesh::upload(device, "light cone", &LightCone::mesh());

        info!(
            adapter = %context.adapter_profile.name,
            format = ?context.surface_format,
            color_space = ?context.color_space,
            "GPU initialised"
        );

        Ok(Self {
            plan: PassPlan::for_effects(&header.effects()),
            context,
            pipelines,
            uniforms,
            scene_bind_group,
            linear_sampler,
            nearest_sampler,
            atlas,
            cone,
            model: None,
            particles: None,
            particle_capacity: 0,
            targets: None,
            steps: Vec::new(),
            released: false,
        })
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Reconfigures the swapchain immediately; offscreen targets follow later.
    pub(crate) fn resize_surface(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    pub(crate) fn reconfigure_surface(&mut self) {
        self.context.reconfigure();
    }

    fn source_view<'a>(targets: &'a RenderTargets, source: Source) -> &'a wgpu::TextureView {
        match source {
            Source::SceneColor => &targets.scene_color.view,
            Source::Post(index) => &targets.post[index].view,
        }
    }

    fn build_steps(&self, targets: &RenderTargets) -> Vec<Step> {
        let device = &self.context.device;
        let layouts = &self.pipelines.layouts;
        let mut steps = Vec::with_capacity(self.plan.len());
        let mut current = Source::SceneColor;
        let mut next_post = 0;

        let texture = |view| wgpu::BindingResource::TextureView(view);
        let sampler = |sampler| wgpu::BindingResource::Sampler(sampler);
        let entry = |binding, resource| wgpu::BindGroupEntry { binding, resource };

        for &pass in self.plan.passes() {
            let source = Self::source_view(targets, current);
            let (bind_group, output) = match pass {
                Pass::Scene => (None, Output::Scene),
                Pass::Occlusion => (None, Output::Occlusion),
                Pass::LightScattering => {
                    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("scatter bind group"),
                        layout: &layouts.scatter,
                        entries: &[
                            entry(0, self.uniforms.scatter.as_entire_binding()),
                            entry(1, texture(&targets.occlusion.view)),
                            entry(2, sampler(&self.linear_sampler)),
                        ],
                    });
                    (Some(group), Output::Scatter)
                }
                Pass::Additive => {
                    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("additive bind group"),
                        layout: &layouts.additive,
                        entries: &[
                            entry(0, texture(source)),
                            entry(1, texture(&targets.scatter.view)),
                            entry(2, sampler(&self.linear_sampler)),
                        ],
                    });
                    (Some(group), Output::Post(next_post))
                }
                Pass::Scan => {
                    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("scan bind group"),
                        layout: &layouts.scan,
                        entries: &[
                            entry(0, self.uniforms.scan.as_entire_binding()),
                            entry(1, texture(source)),
                            entry(2, texture(&targets.scene_depth.view)),
                            entry(3, sampler(&self.linear_sampler)),
                            entry(4, sampler(&self.nearest_sampler)),
                        ],
                    });
                    (Some(group), Output::Post(next_post))
                }
                Pass::Ripple => {
                    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("ripple bind group"),
                        layout: &layouts.ripple,
                        entries: &[
                            entry(0, self.uniforms.ripple.as_entire_binding()),
                            entry(1, texture(source)),
                            entry(2, texture(&targets.ripple.view)),
                            entry(3, sampler(&self.linear_sampler)),
                            entry(4, sampler(&self.nearest_sampler)),
                        ],
                    });
                    (Some(group), Output::Post(next_post))
                }
                Pass::Ascii => {
                    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("ascii bind group"),
                        layout: &layouts.ascii,
                        entries: &[
                            entry(0, self.uniforms.ascii.as_entire_binding()),
                            entry(1, texture(source)),
                            entry(2, texture(&targets.scene_depth.view)),
                            entry(3, texture(&self.atlas.view)),
                            entry(4, sampler(&self.nearest_sampler)),
                        ],
                    });
                    (Some(group), Output::Surface)
                }
                Pass::Present => {
                    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("present bind group"),
                        layout: &layouts.present,
                        entries: &[
                            entry(0, texture(source)),
                            entry(1, sampler(&self.linear_sampler)),
                        ],
                    });
                    (Some(group), Output::Surface)
                }
            };
            if let Output::Post(index) = output {
                current = Source::Post(index);
                next_post = 1 - index;
            }
            steps.push(Step {
                pass,
                bind_group,
                output,
            });
        }
        steps
    }

    fn write_uniforms(&self, frame: &FrameInputs, layout: &TargetLayout) {
        let queue = &self.context.queue;
        let scene = SceneUniforms::from_frame(frame, layout.scene);
        queue.write_buffer(&self.uniforms.scene, 0, bytemuck::bytes_of(&scene));
        let scatter = ScatterUniforms::from(&frame.scatter);
        queue.write_buffer(&self.uniforms.scatter, 0, bytemuck::bytes_of(&scatter));
        let scan = ScanUniforms::new(frame.scan_phase, frame.near, frame.far);
        queue.write_buffer(&self.uniforms.scan, 0, bytemuck::bytes_of(&scan));
        let ripple = RippleUniforms::new(frame.ripple_distort);
        queue.write_buffer(&self.uniforms.ripple, 0, bytemuck::bytes_of(&ripple));
        let ascii = AsciiUniforms::from(&frame.ascii);
        queue.write_buffer(&self.uniforms.ascii, 0, bytemuck::bytes_of(&ascii));
    }

    fn write_particles(&mut self, frame: &FrameInputs) {
        if frame.particles.is_empty() {
            return;
        }
        let positions: Vec<[f32; 3]> = frame.particles.iter().map(|p| p.to_array()).collect();
        if self.particles.is_none() || self.particle_capacity < positions.len() {
            if let Some(old) = self.particles.take() {
                old.destroy();
            }
            self.particles = Some(self.context.device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("particle instances"),
                    contents: bytemuck::cast_slice(&positions),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                },
            ));
            self.particle_capacity = positions.len();
            debug!(capacity = positions.len(), "allocated particle buffer");
        } else if let Some(buffer) = &self.particles {
            self.context
                .queue
                .write_buffer(buffer, 0, bytemuck::cast_slice(&positions));
        }
    }

    fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameInputs,
        targets: &RenderTargets,
        surface_view: &wgpu::TextureView,
    ) {
        for step in &self.steps {
            match step.output {
                Output::Scene => self.encode_scene(encoder, frame, targets),
                Output::Occlusion => self.encode_occlusion(encoder, frame, targets),
                Output::Scatter => self.encode_fullscreen(encoder, step, &targets.scatter.view),
                Output::Post(index) => {
                    self.encode_fullscreen(encoder, step, &targets.post[index].view)
                }
                Output::Surface => self.encode_fullscreen(encoder, step, surface_view),
            }
        }
    }

    fn encode_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameInputs,
        targets: &RenderTargets,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[
                Some(clear_attachment(&targets.scene_color.view, wgpu::Color::BLACK)),
                Some(clear_attachment(&targets.scene_depth.view, DEPTH_CLEAR)),
            ],
            depth_stencil_attachment: Some(depth_attachment(&targets.scene_depth_attachment.view)),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_bind_group(0, &self.scene_bind_group, &[]);

        if let (Some(_), Some(model)) = (frame.model, &self.model) {
            pass.set_pipeline(&self.pipelines.mesh_lit);
            model.draw(&mut pass);
        }

        if let Some(buffer) = &self.particles {
            let count = frame.particles.len().min(self.particle_capacity);
            if count > 0 {
                pass.set_pipeline(&self.pipelines.particles);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..6, 0..count as u32);
            }
        }
    }

    fn encode_occlusion(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameInputs,
        targets: &RenderTargets,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("occlusion pass"),
            color_attachments: &[Some(clear_attachment(
                &targets.occlusion.view,
                wgpu::Color::BLACK,
            ))],
            depth_stencil_attachment: Some(depth_attachment(
                &targets.occlusion_depth_attachment.view,
            )),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_bind_group(0, &self.scene_bind_group, &[]);

        if let (Some(_), Some(model)) = (frame.model, &self.model) {
            pass.set_pipeline(&self.pipelines.occlusion_mesh);
            model.draw(&mut pass);
        }
        if let (Some(_), Some(cone)) = (frame.cone, &self.cone) {
            pass.set_pipeline(&self.pipelines.cone);
            cone.draw(&mut pass);
        }
    }

    fn encode_fullscreen(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        step: &Step,
        view: &wgpu::TextureView,
    ) {
        let pipeline = match step.pass {
            Pass::LightScattering => &self.pipelines.scatter,
            Pass::Additive => &self.pipelines.additive,
            Pass::Scan => &self.pipelines.scan,
            Pass::Ripple => &self.pipelines.ripple,
            Pass::Ascii => &self.pipelines.ascii,
            Pass::Present => &self.pipelines.present,
            Pass::Scene | Pass::Occlusion => return,
        };
        let Some(bind_group) = &step.bind_group else {
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("effect pass"),
            color_attachments: &[Some(clear_attachment(view, wgpu::Color::BLACK))],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn clear_attachment(
    view: &wgpu::TextureView,
    color: wgpu::Color,
) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        depth_slice: None,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(color),
            store: wgpu::StoreOp::Store,
        },
    }
}

fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Discard,
        }),
        stencil_ops: None,
    }
}

impl RenderBackend for GpuState {
    fn reallocate_targets(&mut self, layout: &TargetLayout) {
        if self.released {
            return;
        }
        if let Some(old) = self.targets.take() {
            self.steps.clear();
            old.destroy();
        }
        let targets = RenderTargets::new(&self.context.device, &self.context.queue, layout);
        self.steps = self.build_steps(&targets);
        self.targets = Some(targets);
        debug!(
            scene_width = layout.scene[0],
            scene_height = layout.scene[1],
            occlusion_width = layout.occlusion[0],
            occlusion_height = layout.occlusion[1],
            "render targets allocated"
        );
    }

    fn install_model(&mut self, mesh: &MeshData) {
        if self.released {
            return;
        }
        if let Some(old) = self.model.take() {
            old.destroy();
        }
        self.model = GpuMesh::upload(&self.context.device, "model", mesh);
        if self.model.is_none() {
            warn!("model has no triangles; nothing to draw");
        }
    }

    fn upload_ripple(&mut self, canvas: &RippleCanvas) {
        if let Some(targets) = &self.targets {
            textures::upload_ripple(&self.context.queue, &targets.ripple.texture, canvas);
        }
    }

    fn render_frame(&mut self, frame: &FrameInputs) -> Result<(), wgpu::SurfaceError> {
        if self.released {
            return Ok(());
        }
        self.write_particles(frame);
        let Some(targets) = &self.targets else {
            debug!("render skipped; targets not allocated");
            return Ok(());
        };
        self.write_uniforms(frame, &targets.layout);

        let surface_texture = self.context.surface.get_current_texture()?;
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.encode(&mut encoder, frame, targets, &surface_view);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.steps.clear();
        if let Some(targets) = self.targets.take() {
            targets.destroy();
        }
        if let Some(model) = self.model.take() {
            model.destroy();
        }
        if let Some(cone) = self.cone.take() {
            cone.destroy();
        }
        if let Some(particles) = self.particles.take() {
            particles.destroy();
        }
        self.uniforms.destroy();
        self.atlas.texture.destroy();
        self.released = true;
        info!("GPU resources released");
    }
}
