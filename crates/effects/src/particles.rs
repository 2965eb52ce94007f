use glam::Vec3;
use rand::Rng;

/// Visible extent of the z = 0 plane for a camera `distance` units away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub width: f32,
    pub height: f32,
}

impl Frustum {
    pub fn new(fov_degrees: f32, distance: f32, aspect: f32) -> Self {
        let height = 2.0 * distance * (fov_degrees.to_radians() / 2.0).tan();
        Self {
            width: height * aspect,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub base: Vec3,
    pub speed: f32,
}

/// Dust drifting across the header, nudged by the pointer.
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    frustum: Frustum,
}

impl ParticleField {
    pub fn generate<R: Rng>(
        count: usize,
        depth: f32,
        max_speed: f32,
        frustum: Frustum,
        rng: &mut R,
    ) -> Self {
        let particles = (0..count)
            .map(|_| {
                let x = rng.gen::<f32>() * frustum.width;
                let y = -rng.gen::<f32>() * frustum.height;
                let z = (rng.gen::<f32>() * 2.0 - 1.0) * depth / 2.0;
                Particle {
                    base: Vec3::new(x, y, z),
                    speed: 1.0 + rng.gen::<f32>() * max_speed,
                }
            })
            .collect();
        Self { particles, frustum }
    }

    /// Keeps the generated bases and rescales the wrap region.
    pub fn set_frustum(&mut self, frustum: Frustum) {
        self.frustum = frustum;
    }

    pub fn frustum(&self) -> Frustum {
        self.frustum
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// World positions for a normalized pointer position.
    pub fn positions(&self, pointer: [f32; 2]) -> Vec<Vec3> {
        let Frustum { width, height } = self.frustum;
        let [nx, ny] = pointer;
        self.particles
            .iter()
            .map(|particle| {
                let x = (particle.base.x * width / 2.0 + particle.speed * (1.0 + nx * 4.0) * 0.2)
                    % width;
                let y = (particle.base.y * height / 2.0
                    + particle.speed * (1.0 - ny * 4.0) * 0.1)
                    % height;
                Vec3::new(x - width / 2.0, y + height / 2.0, particle.base.z)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frustum() -> Frustum {
        Frustum::new(15.0, 10.0, 16.0 / 9.0)
    }

    #[test]
    fn frustum_matches_camera_fov() {
        let frustum = Frustum::new(90.0, 1.0, 2.0);
        assert!((frustum.height - 2.0).abs() < 1e-5);
        assert!((frustum.width - 4.0).abs() < 1e-5);
    }

    #[test]
    fn generated_particles_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let field = ParticleField::generate(60, 3.0, 5.0, frustum(), &mut rng);
        assert_eq!(field.len(), 60);
        let f = frustum();
        for particle in field.particles() {
            assert!(particle.base.x >= 0.0 && particle.base.x < f.width);
            assert!(particle.base.y <= 0.0 && particle.base.y > -f.height);
            assert!(particle.base.z.abs() <= 1.5);
            assert!(particle.speed >= 1.0 && particle.speed < 6.0);
        }
    }

    #[test]
    fn same_seed_same_field() {
        let a = ParticleField::generate(8, 3.0, 5.0, frustum(), &mut StdRng::seed_from_u64(3));
        let b = ParticleField::generate(8, 3.0, 5.0, frustum(), &mut StdRng::seed_from_u64(3));
        assert_eq!(a.particles(), b.particles());
    }

    #[test]
    fn positions_wrap_inside_frustum() {
        let mut rng = StdRng::seed_from_u64(11);
        let field = ParticleField::generate(60, 3.0, 5.0, frustum(), &mut rng);
        let f = frustum();
        for pointer in [[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]] {
            for position in field.positions(pointer) {
                assert!(position.x.abs() <= f.width / 2.0 + 1e-4, "x {}", position.x);
                assert!(
                    position.y > -f.height / 2.0 - 1e-4 && position.y < f.height * 1.5,
                    "y {}",
                    position.y
                );
            }
        }
    }

    #[test]
    fn pointer_moves_particles_horizontally() {
        let mut field = ParticleField::generate(
            1,
            0.0,
            0.0,
            Frustum::new(90.0, 10.0, 1.0),
            &mut StdRng::seed_from_u64(1),
        );
        field.particles[0].base = Vec3::ZERO;
        let rest = field.positions([0.0, 0.0])[0];
        let pushed = field.positions([1.0, 0.0])[0];
        assert!((pushed.x - rest.x - 0.8).abs() < 1e-4);
        assert_eq!(pushed.y, rest.y);
    }
}
