/// Sweeping depth band used by the scan pass.
///
/// The phase runs over `[0, 2)`: the first half sweeps the band from the near
/// plane to the far plane, the second half parks it beyond the scene.
#[derive(Debug, Clone, Copy)]
pub struct ScanLine {
    phase: f32,
    speed: f32,
}

const PERIOD: f32 = 2.0;
const SHARPNESS: i32 = 140;

impl ScanLine {
    pub fn new(speed: f32) -> Self {
        Self { phase: 0.0, speed }
    }

    pub fn with_phase(speed: f32, phase: f32) -> Self {
        Self {
            phase: phase.rem_euclid(PERIOD),
            speed,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.phase = (self.phase + dt * self.speed).rem_euclid(PERIOD);
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Depth the band currently sits at.
    pub fn band_depth(&self) -> f32 {
        self.phase.clamp(0.0, 1.0)
    }

    /// Red boost added by the scan pass for a fragment at linear `depth`.
    pub fn intensity(&self, depth: f32) -> f32 {
        let depth = depth.clamp(0.0, 1.0);
        let band = (1.0 - (depth - self.band_depth()).abs()).powi(SHARPNESS);
        band * (1.0 - depth.powi(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_wraps_modulo_two() {
        let mut scan = ScanLine::with_phase(0.5, 1.9);
        scan.advance(0.6);
        assert!((scan.phase() - 0.2).abs() < 1e-5, "phase {}", scan.phase());
    }

    #[test]
    fn negative_dt_does_not_rewind() {
        let mut scan = ScanLine::with_phase(0.5, 0.4);
        scan.advance(-1.0);
        scan.advance(f32::NAN);
        assert!((scan.phase() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn band_peaks_at_phase_depth() {
        let scan = ScanLine::with_phase(0.5, 0.3);
        assert!((scan.intensity(0.3) - (1.0 - 0.3f32.powi(10))).abs() < 1e-5);
        assert!(scan.intensity(0.5) < 1e-6);
    }

    #[test]
    fn far_plane_never_lights_up() {
        let scan = ScanLine::with_phase(0.5, 1.5);
        assert_eq!(scan.band_depth(), 1.0);
        assert!(scan.intensity(1.0).abs() < 1e-6);
    }
}
