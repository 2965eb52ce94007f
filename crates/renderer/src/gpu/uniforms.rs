use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use headerconfig::MAX_LIGHTS;

use crate::compositor::{AsciiParams, FrameInputs, ScatterParams};

/// Mirrors `SceneParams` in the mesh shaders.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct SceneUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub cone_model: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// xyz position, w cutoff distance.
    pub light_position: [[f32; 4]; MAX_LIGHTS],
    /// rgb colour times intensity, w decay.
    pub light_color: [[f32; 4]; MAX_LIGHTS],
    /// xyz spot position, w attenuation.
    pub cone_spot: [f32; 4],
    /// x light count, y particle size (px), z particle decay modifier, w cone angle power.
    pub params: [f32; 4],
    pub target_size: [f32; 4],
}

unsafe impl Zeroable for SceneUniforms {}
unsafe impl Pod for SceneUniforms {}

impl SceneUniforms {
    pub fn from_frame(frame: &FrameInputs, target_size: [u32; 2]) -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.view = frame.view.to_cols_array_2d();
        uniforms.projection = frame.projection.to_cols_array_2d();
        uniforms.model = frame.model.unwrap_or(Mat4::IDENTITY).to_cols_array_2d();
        uniforms.camera_position = frame.camera_position.extend(1.0).to_array();

        let count = frame.lights.len().min(MAX_LIGHTS);
        for (slot, light) in frame.lights.iter().take(MAX_LIGHTS).enumerate() {
            uniforms.light_position[slot] = light.position.extend(light.distance).to_array();
            uniforms.light_color[slot] = light.color.extend(light.decay).to_array();
        }

        let mut angle_power = 0.0;
        if let Some(cone) = &frame.cone {
            uniforms.cone_model = cone.model.to_cols_array_2d();
            uniforms.cone_spot = cone.spot.extend(cone.attenuation).to_array();
            angle_power = cone.angle_power;
        } else {
            uniforms.cone_model = Mat4::IDENTITY.to_cols_array_2d();
        }

        uniforms.params = [
            count as f32,
            frame.particle_size,
            frame.particle_decay_modifier,
            angle_power,
        ];
        uniforms.target_size = [
            target_size[0].max(1) as f32,
            target_size[1].max(1) as f32,
            0.0,
            0.0,
        ];
        uniforms
    }
}

#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScatterUniforms {
    /// xy light uv, z exposure, w decay.
    pub light: [f32; 4],
    /// x density, y weight, z samples.
    pub params: [f32; 4],
}

unsafe impl Zeroable for ScatterUniforms {}
unsafe impl Pod for ScatterUniforms {}

impl From<&ScatterParams> for ScatterUniforms {
    fn from(params: &ScatterParams) -> Self {
        let samples = params.samples.min(headerconfig::MAX_SCATTER_SAMPLES);
        Self {
            light: [
                params.light_uv[0],
                params.light_uv[1],
                params.exposure,
                params.decay,
            ],
            params: [params.density, params.weight, samples as f32, 0.0],
        }
    }
}

#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScanUniforms {
    /// x phase, y near, z far.
    pub params: [f32; 4],
}

unsafe impl Zeroable for ScanUniforms {}
unsafe impl Pod for ScanUniforms {}

impl ScanUniforms {
    pub fn new(phase: f32, near: f32, far: f32) -> Self {
        Self {
            params: [phase, near, far, 0.0],
        }
    }
}

#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct RippleUniforms {
    pub distort: [f32; 4],
}

unsafe impl Zeroable for RippleUniforms {}
unsafe impl Pod for RippleUniforms {}

impl RippleUniforms {
    pub fn new(distort: [f32; 2]) -> Self {
        Self {
            distort: [distort[0], distort[1], 0.0, 0.0],
        }
    }
}

#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct AsciiUniforms {
    /// xy precise cell count across the viewport.
    pub cells: [f32; 4],
    /// x atlas columns, y atlas rows, z glyph total.
    pub glyphs: [f32; 4],
    /// x near, y scaled far.
    pub depth_range: [f32; 4],
}

unsafe impl Zeroable for AsciiUniforms {}
unsafe impl Pod for AsciiUniforms {}

impl From<&AsciiParams> for AsciiUniforms {
    fn from(params: &AsciiParams) -> Self {
        let atlas = &params.atlas;
        Self {
            cells: [params.cells.precise[0], params.cells.precise[1], 0.0, 0.0],
            glyphs: [
                atlas.columns.max(1) as f32,
                atlas.rows.max(1) as f32,
                atlas.total().max(1) as f32,
                0.0,
            ],
            depth_range: [params.near, params.far, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{LightFrame, PassPlan};
    use effects::{CellGrid, GlyphAtlasLayout, Viewport};
    use glam::Vec3;
    use headerconfig::EffectToggles;

    fn frame() -> FrameInputs {
        let viewport = Viewport::new(800, 600).unwrap();
        FrameInputs {
            plan: PassPlan::for_effects(&EffectToggles::all()),
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            camera_position: Vec3::new(0.0, 0.0, 10.0),
            near: 8.0,
            far: 15.0,
            model: None,
            lights: vec![
                LightFrame {
                    position: Vec3::new(1.0, 2.0, 3.0),
                    color: Vec3::new(0.0, 2.0, 3.0),
                    distance: 10.0,
                    decay: 1.0,
                };
                6
            ],
            cone: None,
            particles: Vec::new(),
            particle_size: 2.0,
            particle_decay_modifier: 2.5,
            scatter: ScatterParams {
                light_uv: [0.25, 0.75],
                exposure: 0.2,
                decay: 0.96,
                density: 0.6,
                weight: 0.2,
                samples: 500,
            },
            scan_phase: 0.0,
            ripple_distort: [0.001, 0.001],
            ascii: AsciiParams {
                cells: CellGrid::new(viewport, [8, 8]),
                atlas: GlyphAtlasLayout::new([64, 64], [8, 8]),
                near: 8.0,
                far: 5.25,
            },
        }
    }

    #[test]
    fn uniform_blocks_are_std140_sized() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 4 * 64 + 16 * (1 + 4 + 4 + 3));
        assert_eq!(std::mem::size_of::<ScatterUniforms>(), 32);
        assert_eq!(std::mem::size_of::<ScanUniforms>(), 16);
        assert_eq!(std::mem::size_of::<RippleUniforms>(), 16);
        assert_eq!(std::mem::size_of::<AsciiUniforms>(), 48);
    }

    #[test]
    fn scene_uniforms_cap_light_count() {
        let uniforms = SceneUniforms::from_frame(&frame(), [200, 150]);
        assert_eq!(uniforms.params[0], MAX_LIGHTS as f32);
        assert_eq!(uniforms.light_position[3], [1.0, 2.0, 3.0, 10.0]);
        assert_eq!(uniforms.light_color[0], [0.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniforms.target_size[..2], [200.0, 150.0]);
        assert_eq!(uniforms.model, Mat4::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn scatter_samples_are_clamped() {
        let uniforms = ScatterUniforms::from(&frame().scatter);
        assert_eq!(uniforms.params[2], headerconfig::MAX_SCATTER_SAMPLES as f32);
        assert_eq!(uniforms.light[..2], [0.25, 0.75]);
    }

    #[test]
    fn ascii_uniforms_describe_atlas_grid() {
        let uniforms = AsciiUniforms::from(&frame().ascii);
        assert_eq!(uniforms.cells[..2], [100.0, 75.0]);
        assert_eq!(uniforms.glyphs[..3], [8.0, 8.0, 64.0]);
        assert_eq!(uniforms.depth_range[..2], [8.0, 5.25]);
    }
}
