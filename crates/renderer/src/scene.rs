//! Camera, lights, and the volumetric light cone.

use glam::{Mat4, Vec3, Vec4Swizzles};
use headerconfig::{CameraConfig, HeaderConfig, LightConfig, VolumetricConfig};

use crate::model::{MeshData, MeshVertex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub aspect: f32,
}

impl Camera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            position: Vec3::new(0.0, 0.0, config.distance),
            aspect,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, Vec3::NEG_Z, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Normalized device coordinates of a world-space point.
    pub fn project(&self, point: Vec3) -> Vec3 {
        let clip = self.view_projection() * point.extend(1.0);
        clip.xyz() / clip.w
    }

    /// Texture coordinates of a world-space point, origin top-left.
    pub fn screen_uv(&self, point: Vec3) -> [f32; 2] {
        let ndc = self.project(point);
        [(ndc.x + 1.0) / 2.0, (1.0 - ndc.y) / 2.0]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub name: String,
    pub color: Vec3,
    pub intensity: f32,
    pub distance: f32,
    pub decay: f32,
    pub position: Vec3,
    pub follows_pointer: bool,
}

impl PointLight {
    pub fn from_config(config: &LightConfig) -> Self {
        Self {
            name: config.name.clone(),
            color: Vec3::from(config.color),
            intensity: config.intensity,
            distance: config.distance,
            decay: config.decay,
            position: Vec3::from(config.position),
            follows_pointer: config.follows_pointer,
        }
    }

    /// Light reaching a point `distance` away, before surface terms.
    pub fn irradiance_factor(&self, distance: f32, decay_modifier: f32) -> f32 {
        let decay = self.decay * decay_modifier;
        if self.distance <= 0.0 || decay <= 0.0 {
            return 1.0;
        }
        (1.0 - distance / self.distance).clamp(0.0, 1.0).powf(decay)
    }
}

/// Open cone of light whose narrow end sits at `position` and widens toward `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCone {
    pub position: Vec3,
    pub target: Vec3,
    pub sweep: f32,
    pub attenuation: f32,
    pub angle_power: f32,
}

pub const CONE_TOP_RADIUS: f32 = 3.0;
pub const CONE_BOTTOM_RADIUS: f32 = 6.0;
pub const CONE_LENGTH: f32 = 15.0;
pub const CONE_RADIAL_SEGMENTS: u32 = 32;
pub const CONE_HEIGHT_SEGMENTS: u32 = 6;

impl LightCone {
    pub fn from_config(config: &VolumetricConfig) -> Self {
        Self {
            position: Vec3::from(config.cone_position),
            target: Vec3::from(config.cone_target),
            sweep: config.pointer_sweep,
            attenuation: config.attenuation,
            angle_power: config.angle_power,
        }
    }

    /// Moves the cone horizontally with the pointer; returns the new x.
    pub fn follow_pointer(&mut self, nx: f32) -> f32 {
        self.position.x = self.sweep * (nx * 2.0 - 1.0);
        self.position.x
    }

    /// Places local +Z on the line from `position` to `target`.
    pub fn model_matrix(&self) -> Mat4 {
        let forward = (self.target - self.position).normalize_or_zero();
        if forward == Vec3::ZERO {
            return Mat4::from_translation(self.position);
        }
        let mut right = Vec3::Y.cross(forward);
        if right.length_squared() < 1e-8 {
            right = Vec3::X;
        }
        let right = right.normalize();
        let up = forward.cross(right);
        Mat4::from_cols(
            right.extend(0.0),
            up.extend(0.0),
            forward.extend(0.0),
            self.position.extend(1.0),
        )
    }

    /// Cone mesh in local space: apex ring at the origin, opening along +Z.
    pub fn mesh() -> MeshData {
        let slope = (CONE_BOTTOM_RADIUS - CONE_TOP_RADIUS) / CONE_LENGTH;
        let mut mesh = MeshData::default();
        for row in 0..=CONE_HEIGHT_SEGMENTS {
            let t = row as f32 / CONE_HEIGHT_SEGMENTS as f32;
            let radius = CONE_TOP_RADIUS + (CONE_BOTTOM_RADIUS - CONE_TOP_RADIUS) * t;
            let z = t * CONE_LENGTH;
            for column in 0..=CONE_RADIAL_SEGMENTS {
                let theta = column as f32 / CONE_RADIAL_SEGMENTS as f32 * std::f32::consts::TAU;
                let (sin, cos) = theta.sin_cos();
                mesh.vertices.push(MeshVertex {
                    position: [radius * sin, radius * cos, z],
                    normal: Vec3::new(sin, cos, -slope).normalize().to_array(),
                    color: [1.0, 1.0, 1.0],
                });
            }
        }
        let stride = CONE_RADIAL_SEGMENTS + 1;
        for row in 0..CONE_HEIGHT_SEGMENTS {
            for column in 0..CONE_RADIAL_SEGMENTS {
                let a = row * stride + column;
                let b = a + stride;
                mesh.indices
                    .extend_from_slice(&[a, b, a + 1, b, b + 1, a + 1]);
            }
        }
        mesh
    }
}

/// Per-frame scene state advanced by the frame loop.
#[derive(Debug, Clone)]
pub struct SceneState {
    pub camera: Camera,
    pub lights: Vec<PointLight>,
    pub cone: LightCone,
    pub model_rotation: f32,
    pub spin_speed: f32,
    pub model_scale: f32,
    /// Normalized pointer position, origin top-left.
    pub pointer: [f32; 2],
}

impl SceneState {
    pub fn new(config: &HeaderConfig, aspect: f32) -> Self {
        Self {
            camera: Camera::from_config(&config.camera, aspect),
            lights: config.lights.iter().map(PointLight::from_config).collect(),
            cone: LightCone::from_config(&config.volumetric),
            model_rotation: 0.0,
            spin_speed: config.model.spin_speed,
            model_scale: config.model.scale,
            pointer: [0.0, 0.0],
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.model_rotation += dt * self.spin_speed;
    }

    pub fn set_pointer(&mut self, pointer: [f32; 2]) {
        self.pointer = pointer;
        let x = self.cone.follow_pointer(pointer[0]);
        for light in self.lights.iter_mut().filter(|light| light.follows_pointer) {
            light.position.x = x;
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.camera.aspect = aspect;
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.model_rotation) * Mat4::from_scale(Vec3::splat(self.model_scale))
    }

    /// Where the cone sits on screen, as seen by the occlusion camera.
    pub fn light_screen_uv(&self) -> [f32; 2] {
        self.camera.screen_uv(self.cone.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SceneState {
        SceneState::new(&HeaderConfig::default(), 16.0 / 9.0)
    }

    #[test]
    fn camera_centre_projects_to_middle() {
        let scene = scene();
        let uv = scene.camera.screen_uv(Vec3::ZERO);
        assert!((uv[0] - 0.5).abs() < 1e-5);
        assert!((uv[1] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn points_above_centre_have_smaller_v() {
        let scene = scene();
        let uv = scene.camera.screen_uv(Vec3::new(0.0, 0.5, 0.0));
        assert!(uv[1] < 0.5);
    }

    #[test]
    fn pointer_moves_cone_and_back_light() {
        let mut scene = scene();
        scene.set_pointer([1.0, 0.3]);
        assert!((scene.cone.position.x - 5.0).abs() < 1e-6);
        let back = scene.lights.iter().find(|l| l.name == "back").unwrap();
        assert!((back.position.x - 5.0).abs() < 1e-6);
        let key = scene.lights.iter().find(|l| l.name == "key").unwrap();
        assert_eq!(key.position.x, 5.0);
        let fill = scene.lights.iter().find(|l| l.name == "fill").unwrap();
        assert_eq!(fill.position.x, -5.0);

        scene.set_pointer([0.0, 0.0]);
        assert!((scene.cone.position.x + 5.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_advances_with_spin_speed() {
        let mut scene = scene();
        scene.advance(1.0 / 60.0);
        assert!((scene.model_rotation - 0.5 / 60.0).abs() < 1e-7);
    }

    #[test]
    fn cone_points_at_target() {
        let cone = LightCone::from_config(&VolumetricConfig::default());
        let matrix = cone.model_matrix();
        let apex = matrix.transform_point3(Vec3::ZERO);
        let far = matrix.transform_point3(Vec3::new(0.0, 0.0, CONE_LENGTH));
        assert!((apex - cone.position).length() < 1e-5);
        let direction = (far - apex).normalize();
        let expected = (cone.target - cone.position).normalize();
        assert!(direction.dot(expected) > 0.9999);
    }

    #[test]
    fn cone_pointing_straight_down_still_has_a_basis() {
        let mut cone = LightCone::from_config(&VolumetricConfig::default());
        cone.follow_pointer(0.5);
        let matrix = cone.model_matrix();
        assert!(matrix.is_finite());
        assert!((matrix.determinant() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn cone_mesh_is_open_and_widens() {
        let mesh = LightCone::mesh();
        let rows = CONE_HEIGHT_SEGMENTS + 1;
        let columns = CONE_RADIAL_SEGMENTS + 1;
        assert_eq!(mesh.vertices.len() as u32, rows * columns);
        assert_eq!(
            mesh.triangle_count() as u32,
            CONE_HEIGHT_SEGMENTS * CONE_RADIAL_SEGMENTS * 2
        );
        let first = Vec3::from(mesh.vertices[0].position);
        let last = Vec3::from(mesh.vertices.last().unwrap().position);
        assert!((first.truncate().length() - CONE_TOP_RADIUS).abs() < 1e-5);
        assert!((last.truncate().length() - CONE_BOTTOM_RADIUS).abs() < 1e-4);
    }

    #[test]
    fn light_cutoff_matches_distance() {
        let light = PointLight::from_config(&HeaderConfig::default().lights[0]);
        assert_eq!(light.irradiance_factor(10.0, 1.0), 0.0);
        assert!((light.irradiance_factor(5.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((light.irradiance_factor(5.0, 2.5) - 0.5f32.powf(2.5)).abs() < 1e-6);
    }
}
