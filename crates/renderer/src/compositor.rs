//! Frame orchestration independent of the GPU.
//!
//! The compositor owns every piece of per-frame state (scene transforms, scan
//! phase, ripples, particles, target layout) and drives a [`RenderBackend`]
//! through one fixed pass chain per tick:
//!
//! ```text
//!   Scene ─▶ [Occlusion ─▶ LightScattering ─▶ Additive] ─▶ [Scan] ─▶ [Ripple] ─▶ Ascii | Present
//! ```
//!
//! Bracketed passes are skipped when their effect is disabled.

use std::path::Path;

use effects::{
    CellGrid, Frustum, GlyphAtlasLayout, ParticleField, RippleCanvas, RippleField, ScanLine,
    TargetLayout, Viewport,
};
use glam::{Mat4, Vec3};
use headerconfig::{EffectToggles, HeaderConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info};

use crate::model::{MeshData, ModelFuture, ModelLoader};
use crate::scene::{PointLight, SceneState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Scene,
    Occlusion,
    LightScattering,
    Additive,
    Scan,
    Ripple,
    Ascii,
    Present,
}

/// Ordered list of passes for one effect configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    passes: Vec<Pass>,
}

impl PassPlan {
    pub fn for_effects(effects: &EffectToggles) -> Self {
        let mut passes = vec![Pass::Scene];
        if effects.volumetric {
            passes.extend([Pass::Occlusion, Pass::LightScattering, Pass::Additive]);
        }
        if effects.scan {
            passes.push(Pass::Scan);
        }
        if effects.ripple {
            passes.push(Pass::Ripple);
        }
        passes.push(if effects.ascii {
            Pass::Ascii
        } else {
            Pass::Present
        });
        Self { passes }
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn contains(&self, pass: Pass) -> bool {
        self.passes.contains(&pass)
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightFrame {
    pub position: Vec3,
    /// Colour premultiplied by intensity.
    pub color: Vec3,
    pub distance: f32,
    pub decay: f32,
}

impl From<&PointLight> for LightFrame {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position,
            color: light.color * light.intensity,
            distance: light.distance,
            decay: light.decay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeFrame {
    pub model: Mat4,
    pub spot: Vec3,
    pub attenuation: f32,
    pub angle_power: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterParams {
    /// Light position in texture space, origin top-left.
    pub light_uv: [f32; 2],
    pub exposure: f32,
    pub decay: f32,
    pub density: f32,
    pub weight: f32,
    pub samples: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsciiParams {
    pub cells: CellGrid,
    pub atlas: GlyphAtlasLayout,
    pub near: f32,
    /// Far plane used for glyph selection, already scaled.
    pub far: f32,
}

/// Everything the backend needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInputs {
    pub plan: PassPlan,
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub near: f32,
    pub far: f32,
    /// Model transform; `None` while no mesh is installed.
    pub model: Option<Mat4>,
    pub lights: Vec<LightFrame>,
    pub cone: Option<ConeFrame>,
    pub particles: Vec<Vec3>,
    pub particle_size: f32,
    pub particle_decay_modifier: f32,
    pub scatter: ScatterParams,
    pub scan_phase: f32,
    pub ripple_distort: [f32; 2],
    pub ascii: AsciiParams,
}

/// GPU operations the compositor relies on.
pub trait RenderBackend {
    /// (Re)creates every offscreen target for `layout`; the ripple texture
    /// starts at the baseline colour.
    fn reallocate_targets(&mut self, layout: &TargetLayout);
    fn install_model(&mut self, mesh: &MeshData);
    fn upload_ripple(&mut self, canvas: &RippleCanvas);
    fn render_frame(&mut self, frame: &FrameInputs) -> Result<(), wgpu::SurfaceError>;
    /// Destroys every GPU resource the backend owns.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub dt: f32,
    pub active_ripples: usize,
    pub ripple_uploaded: bool,
    pub model_installed: bool,
}

enum ModelSlot {
    Absent,
    Loading(ModelFuture),
    Installed,
}

pub struct Compositor<B: RenderBackend> {
    backend: B,
    effects: EffectToggles,
    plan: PassPlan,
    scene: SceneState,
    ripples: RippleField,
    canvas: RippleCanvas,
    scan: ScanLine,
    particles: ParticleField,
    viewport: Viewport,
    layout: TargetLayout,
    atlas: GlyphAtlasLayout,
    config: HeaderConfig,
    model: ModelSlot,
    frame_index: u64,
    released: bool,
}

impl<B: RenderBackend> Compositor<B> {
    pub fn new(mut backend: B, config: &HeaderConfig, viewport: Viewport, seed: u64) -> Self {
        let effects = config.effects();
        let layout = TargetLayout::compute(
            viewport,
            &effects,
            config.ascii.cell_size,
            config.ripple.canvas_downsample,
        );
        backend.reallocate_targets(&layout);

        let scene = SceneState::new(config, viewport.aspect());
        let frustum = Frustum::new(
            config.camera.fov_degrees,
            config.camera.distance,
            viewport.aspect(),
        );
        let mut rng = StdRng::seed_from_u64(seed);
        let particles = ParticleField::generate(
            config.particles.count,
            config.particles.depth,
            config.particles.max_speed,
            frustum,
            &mut rng,
        );

        let plan = PassPlan::for_effects(&effects);
        debug!(passes = ?plan.passes(), "compositor pass plan");

        Self {
            backend,
            effects,
            plan,
            scene,
            ripples: RippleField::from_config(&config.ripple),
            canvas: RippleCanvas::new(layout.ripple_canvas[0], layout.ripple_canvas[1]),
            scan: ScanLine::new(config.scan.speed),
            particles,
            viewport,
            layout,
            atlas: GlyphAtlasLayout::from_config(&config.ascii),
            config: config.clone(),
            model: ModelSlot::Absent,
            frame_index: 0,
            released: false,
        }
    }

    /// Loads `path` in the background, or installs the placeholder cube when
    /// there is no model to load.
    pub fn start_model(&mut self, path: Option<&Path>) {
        match path {
            Some(path) if self.effects.model => {
                info!(path = %path.display(), "loading model");
                self.model = ModelSlot::Loading(ModelLoader::spawn(path.to_path_buf()));
            }
            _ => {
                debug!("using placeholder cube");
                self.install_mesh(MeshData::cube([1.0, 1.0, 1.0]));
            }
        }
    }

    pub fn load_model(&mut self, future: ModelFuture) {
        self.model = ModelSlot::Loading(future);
    }

    pub fn install_mesh(&mut self, mesh: MeshData) {
        self.backend.install_model(&mesh);
        self.model = ModelSlot::Installed;
    }

    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        self.pointer_moved_within(x, y, self.viewport);
    }

    /// Pointer position in pixels of `surface`, which may differ from the
    /// allocated viewport while a resize is pending.
    pub fn pointer_moved_within(&mut self, x: f64, y: f64, surface: Viewport) {
        self.scene.set_pointer(surface.normalize(x, y));
    }

    /// Starts a ripple at the last known pointer position.
    pub fn click(&mut self) {
        if self.effects.ripple {
            self.ripples.add(self.scene.pointer);
        }
    }

    pub fn click_at(&mut self, x: f64, y: f64) {
        self.pointer_moved(x, y);
        self.click();
    }

    /// Applies a settled viewport size. Returns `true` when targets were
    /// reallocated.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        self.scene.set_aspect(viewport.aspect());
        self.particles.set_frustum(Frustum::new(
            self.config.camera.fov_degrees,
            self.config.camera.distance,
            viewport.aspect(),
        ));

        let layout = TargetLayout::compute(
            viewport,
            &self.effects,
            self.config.ascii.cell_size,
            self.config.ripple.canvas_downsample,
        );
        if layout == self.layout {
            return false;
        }
        info!(
            width = viewport.width,
            height = viewport.height,
            scene_width = layout.scene[0],
            scene_height = layout.scene[1],
            "reallocating render targets"
        );
        self.layout = layout;
        self.canvas
            .resize(layout.ripple_canvas[0], layout.ripple_canvas[1]);
        self.backend.reallocate_targets(&layout);
        true
    }

    pub fn tick(&mut self, dt: f32) -> Result<FrameReport, wgpu::SurfaceError> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.poll_model();

        self.scene.advance(dt);
        self.scan.advance(dt);
        self.ripples.advance(dt);

        let mut ripple_uploaded = false;
        if self.effects.ripple && self.canvas.rasterize(&self.ripples) {
            self.backend.upload_ripple(&self.canvas);
            ripple_uploaded = true;
        }

        let inputs = self.frame_inputs();
        self.backend.render_frame(&inputs)?;

        let report = FrameReport {
            frame_index: self.frame_index,
            dt,
            active_ripples: self.ripples.len(),
            ripple_uploaded,
            model_installed: matches!(self.model, ModelSlot::Installed),
        };
        self.frame_index += 1;
        Ok(report)
    }

    /// Drops frame state and releases GPU resources. Safe to call twice.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.ripples.clear();
        self.model = ModelSlot::Absent;
        self.backend.release();
        self.released = true;
        info!(frames = self.frame_index, "compositor shut down");
    }

    fn poll_model(&mut self) {
        let ModelSlot::Loading(future) = &mut self.model else {
            return;
        };
        let Some(result) = future.poll() else {
            return;
        };
        match result {
            Ok(mesh) => {
                info!(
                    path = %future.path().display(),
                    triangles = mesh.triangle_count(),
                    "model loaded"
                );
                self.backend.install_model(&mesh);
                self.model = ModelSlot::Installed;
            }
            Err(err) => {
                error!(error = %err, "failed to load model; continuing without it");
                self.model = ModelSlot::Absent;
            }
        }
    }

    fn frame_inputs(&self) -> FrameInputs {
        let camera = &self.scene.camera;
        let volumetric = &self.config.volumetric;
        let cone = &self.scene.cone;
        FrameInputs {
            plan: self.plan.clone(),
            view: camera.view(),
            projection: camera.projection(),
            camera_position: camera.position,
            near: camera.near,
            far: camera.far,
            model: matches!(self.model, ModelSlot::Installed).then(|| self.scene.model_matrix()),
            lights: self.scene.lights.iter().map(LightFrame::from).collect(),
            cone: self.effects.volumetric.then(|| ConeFrame {
                model: cone.model_matrix(),
                spot: cone.position,
                attenuation: cone.attenuation,
                angle_power: cone.angle_power,
            }),
            particles: if self.effects.particles {
                self.particles.positions(self.scene.pointer)
            } else {
                Vec::new()
            },
            particle_size: self.config.particles.point_size,
            particle_decay_modifier: self.config.particles.decay_modifier,
            scatter: ScatterParams {
                light_uv: self.scene.light_screen_uv(),
                exposure: volumetric.exposure,
                decay: volumetric.decay,
                density: volumetric.density,
                weight: volumetric.weight,
                samples: volumetric.samples,
            },
            scan_phase: self.scan.phase(),
            ripple_distort: self.config.ripple.distort,
            ascii: AsciiParams {
                cells: self.layout.cells,
                atlas: self.atlas,
                near: camera.near,
                far: camera.far * self.config.ascii.depth_far_scale,
            },
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn effects(&self) -> EffectToggles {
        self.effects
    }

    pub fn plan(&self) -> &PassPlan {
        &self.plan
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn ripples(&self) -> &RippleField {
        &self.ripples
    }

    pub fn canvas(&self) -> &RippleCanvas {
        &self.canvas
    }

    pub fn scan(&self) -> &ScanLine {
        &self.scan
    }

    pub fn layout(&self) -> &TargetLayout {
        &self.layout
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_loading_model(&self) -> bool {
        matches!(self.model, ModelSlot::Loading(_))
    }
}
