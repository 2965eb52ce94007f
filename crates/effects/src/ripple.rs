//! Click ripples and the low-resolution canvas they are painted into.
//!
//! The canvas encodes, per pixel, the ripple centre tint in R/G and the
//! distortion strength in B; the ripple pass reads it back as a texture.

use std::collections::VecDeque;

use crate::easing::{ease_out_quart, lerp};

/// Canvas colour with no active distortion: `rgb(128, 128, 0)`.
pub const RIPPLE_BASELINE: [u8; 4] = [128, 128, 0, 255];

const INNER_RADIUS_FRACTION: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ripple {
    /// Life progress in `[0, 1]`.
    pub age: f32,
    /// Centre in normalized viewport coordinates, origin top-left.
    pub position: [f32; 2],
}

impl Ripple {
    /// Red/green tint carried by the gradient, `position * 255`.
    pub fn tint(&self) -> [f32; 2] {
        [self.position[0] * 255.0, self.position[1] * 255.0]
    }
}

/// Ripple opacity over its lifetime: eases in until `peak`, then fades out linearly.
pub fn ripple_alpha(age: f32, peak: f32) -> f32 {
    if age < peak {
        ease_out_quart(age / peak)
    } else {
        (1.0 - (age - peak) / (1.0 - peak)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct RippleField {
    ripples: VecDeque<Ripple>,
    speed: f32,
    peak: f32,
    max_active: usize,
    evicted: u64,
}

impl RippleField {
    pub fn new(speed: f32, peak: f32, max_active: usize) -> Self {
        Self {
            ripples: VecDeque::new(),
            speed,
            peak,
            max_active: max_active.max(1),
            evicted: 0,
        }
    }

    pub fn from_config(config: &headerconfig::RippleConfig) -> Self {
        Self::new(config.speed, config.peak, config.max_active)
    }

    /// Starts a ripple at a normalized position, evicting the oldest when full.
    pub fn add(&mut self, position: [f32; 2]) {
        if self.ripples.len() >= self.max_active {
            self.ripples.pop_front();
            self.evicted += 1;
        }
        self.ripples.push_back(Ripple {
            age: 0.0,
            position: [position[0].clamp(0.0, 1.0), position[1].clamp(0.0, 1.0)],
        });
    }

    pub fn advance(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let step = dt * self.speed;
        for ripple in &mut self.ripples {
            ripple.age += step;
        }
        self.ripples.retain(|ripple| ripple.age <= 1.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ripple> {
        self.ripples.iter()
    }

    pub fn len(&self) -> usize {
        self.ripples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ripples.is_empty()
    }

    pub fn clear(&mut self) {
        self.ripples.clear();
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Number of ripples dropped because the cap was reached.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

/// RGBA8 raster of the active ripples.
#[derive(Debug, Clone)]
pub struct RippleCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    drew_last_frame: bool,
}

impl RippleCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut canvas = Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
            drew_last_frame: false,
        };
        canvas.fill_baseline();
        canvas
    }

    /// Resizes the backing store; the next rasterize repaints from scratch.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; (width * height * 4) as usize];
        self.fill_baseline();
    }

    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let mut out = [0u8; 4];
        out.copy_from_slice(self.pixels.get(offset..offset + 4)?);
        Some(out)
    }

    /// Repaints the canvas from `field`. Returns `true` when the pixels changed
    /// and need to be uploaded.
    pub fn rasterize(&mut self, field: &RippleField) -> bool {
        if field.is_empty() {
            if self.drew_last_frame {
                self.fill_baseline();
                self.drew_last_frame = false;
                return true;
            }
            return false;
        }

        self.fill_baseline();
        for ripple in field.iter() {
            self.draw_ripple(ripple, field.peak());
        }
        self.drew_last_frame = true;
        true
    }

    fn fill_baseline(&mut self) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&RIPPLE_BASELINE);
        }
    }

    fn draw_ripple(&mut self, ripple: &Ripple, peak: f32) {
        let outer = self.height as f32 * ease_out_quart(ripple.age);
        if outer <= 0.0 {
            return;
        }
        let inner = outer * INNER_RADIUS_FRACTION;
        let alpha = ripple_alpha(ripple.age, peak);
        let tint = ripple.tint();
        let stops = GradientStops {
            mid: [tint[0] / 255.0, tint[1] / 255.0, 16.0 * alpha / 255.0, alpha],
            edge: [128.0 / 255.0, 128.0 / 255.0, 0.0, 0.5],
        };

        let cx = ripple.position[0] * self.width as f32;
        let cy = ripple.position[1] * self.height as f32;
        let min_x = (cx - outer).floor().max(0.0) as u32;
        let min_y = (cy - outer).floor().max(0.0) as u32;
        let max_x = ((cx + outer).ceil() as i64).clamp(0, self.width as i64) as u32;
        let max_y = ((cy + outer).ceil() as i64).clamp(0, self.height as i64) as u32;

        for y in min_y..max_y {
            for x in min_x..max_x {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let distance = (dx * dx + dy * dy).sqrt();
                if distance > outer {
                    continue;
                }
                let t = ((distance - inner) / (outer - inner)).clamp(0.0, 1.0);
                let src = stops.sample(t);
                if src[3] <= 0.0 {
                    continue;
                }
                let offset = ((y * self.width + x) * 4) as usize;
                composite_over(&mut self.pixels[offset..offset + 4], src);
            }
        }
    }
}

/// Three-stop radial gradient, colours in straight (non-premultiplied) form.
struct GradientStops {
    mid: [f32; 4],
    edge: [f32; 4],
}

const MID_STOP: f32 = 0.8;

impl GradientStops {
    /// Premultiplied colour at offset `t`.
    fn sample(&self, t: f32) -> [f32; 4] {
        let mid = premultiply(self.mid);
        let edge = premultiply(self.edge);
        if t <= MID_STOP {
            let f = t / MID_STOP;
            [mid[0] * f, mid[1] * f, mid[2] * f, mid[3] * f]
        } else {
            let f = (t - MID_STOP) / (1.0 - MID_STOP);
            [
                lerp(mid[0], edge[0], f),
                lerp(mid[1], edge[1], f),
                lerp(mid[2], edge[2], f),
                lerp(mid[3], edge[3], f),
            ]
        }
    }
}

fn premultiply(color: [f32; 4]) -> [f32; 4] {
    [color[0] * color[3], color[1] * color[3], color[2] * color[3], color[3]]
}

fn composite_over(dst: &mut [u8], src: [f32; 4]) {
    let keep = 1.0 - src[3];
    let da = dst[3] as f32 / 255.0;
    let out_a = src[3] + da * keep;
    for channel in 0..3 {
        let dc = dst[channel] as f32 / 255.0 * da;
        let premul = src[channel] + dc * keep;
        let straight = if out_a > 0.0 { premul / out_a } else { 0.0 };
        dst[channel] = (straight.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    dst[3] = (out_a.clamp(0.0, 1.0) * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> RippleField {
        RippleField::new(0.3, 0.2, 32)
    }

    #[test]
    fn ripple_expires_once_age_exceeds_one() {
        let mut ripples = field();
        ripples.add([0.5, 0.5]);
        let mut steps = 0;
        while !ripples.is_empty() {
            ripples.advance(1.0);
            steps += 1;
            assert!(steps < 10, "ripple never expired");
        }
        // 3 * 0.3 = 0.9 survives; the fourth step crosses 1.
        assert_eq!(steps, 4);
    }

    #[test]
    fn ripple_survives_at_small_dt_until_threshold() {
        let mut ripples = field();
        ripples.add([0.1, 0.9]);
        let dt = 1.0 / 60.0;
        let mut elapsed = 0.0f32;
        while !ripples.is_empty() {
            ripples.advance(dt);
            elapsed += dt;
        }
        assert!(elapsed * 0.3 > 1.0 - 1e-4);
        assert!((elapsed - dt) * 0.3 <= 1.0 + 1e-4);
    }

    #[test]
    fn alpha_is_continuous_at_peak() {
        let peak = 0.2;
        let before = ripple_alpha(peak - 1e-4, peak);
        let after = ripple_alpha(peak, peak);
        assert!((before - after).abs() < 1e-3, "{before} vs {after}");
        assert!((after - 1.0).abs() < 1e-6);
        assert!(ripple_alpha(1.0, peak).abs() < 1e-6);
        assert_eq!(ripple_alpha(0.0, peak), 0.0);
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut ripples = RippleField::new(0.3, 0.2, 2);
        ripples.add([0.1, 0.1]);
        ripples.advance(0.1);
        ripples.add([0.2, 0.2]);
        ripples.add([0.3, 0.3]);
        assert_eq!(ripples.len(), 2);
        assert_eq!(ripples.evicted(), 1);
        let first = ripples.iter().next().unwrap();
        assert_eq!(first.position, [0.2, 0.2]);
    }

    #[test]
    fn tint_follows_position() {
        let ripple = Ripple {
            age: 0.0,
            position: [0.5, 1.0],
        };
        assert_eq!(ripple.tint(), [127.5, 255.0]);
    }

    #[test]
    fn idle_canvas_stays_at_baseline() {
        let mut canvas = RippleCanvas::new(16, 8);
        assert!(!canvas.rasterize(&field()));
        assert!(canvas
            .pixels()
            .chunks_exact(4)
            .all(|pixel| pixel == RIPPLE_BASELINE));
    }

    #[test]
    fn canvas_clears_once_after_last_ripple() {
        let mut ripples = field();
        let mut canvas = RippleCanvas::new(64, 32);
        ripples.add([0.5, 0.5]);
        ripples.advance(0.5);
        assert!(canvas.rasterize(&ripples));
        assert_ne!(canvas.pixel(32, 16 + 6), Some(RIPPLE_BASELINE));

        ripples.advance(10.0);
        assert!(ripples.is_empty());
        assert!(canvas.rasterize(&ripples), "final clear must be uploaded");
        assert_eq!(canvas.pixel(32, 22), Some(RIPPLE_BASELINE));
        assert!(!canvas.rasterize(&ripples), "idle frames skip upload");
    }

    #[test]
    fn ripple_centre_is_untouched_inside_inner_radius() {
        let mut ripples = field();
        let mut canvas = RippleCanvas::new(64, 64);
        ripples.add([0.5, 0.5]);
        ripples.advance(1.0);
        canvas.rasterize(&ripples);
        assert_eq!(canvas.pixel(32, 32), Some(RIPPLE_BASELINE));
    }

    #[test]
    fn resize_resets_to_baseline() {
        let mut canvas = RippleCanvas::new(4, 4);
        canvas.resize(8, 2);
        assert_eq!(canvas.size(), [8, 2]);
        assert_eq!(canvas.pixels().len(), 8 * 2 * 4);
        assert_eq!(canvas.pixel(7, 1), Some(RIPPLE_BASELINE));
    }

    #[test]
    fn pixel_outside_canvas_is_none() {
        let canvas = RippleCanvas::new(8, 4);
        assert_eq!(canvas.pixel(8, 0), None);
        assert_eq!(canvas.pixel(0, 4), None);
        assert_eq!(canvas.pixel(7, 3), Some(RIPPLE_BASELINE));
    }

    fn assert_rgba_near(actual: Option<[u8; 4]>, expected: [u8; 4], tolerance: u8) {
        let actual = actual.expect("pixel inside canvas");
        for channel in 0..4 {
            let diff = actual[channel].abs_diff(expected[channel]);
            assert!(
                diff <= tolerance,
                "channel {channel}: got {actual:?}, expected {expected:?} (+/-{tolerance})"
            );
        }
    }

    /// One ripple at full opacity (age == peak) on a 400x200 canvas, centred at
    /// (100, 150). Outer radius is 200 * easeOutQuart(0.2) = 118.08 px, inner
    /// radius 29.52 px, tint (63.75, 191.25). Sampled along row 150, so every
    /// pixel sits 0.5 px off the horizontal axis.
    #[test]
    fn ring_gradient_matches_envelope() {
        let mut ripples = RippleField::new(1.0, 0.2, 4);
        ripples.add([0.25, 0.75]);
        ripples.advance(0.2);
        assert_eq!(ripple_alpha(0.2, 0.2), 1.0);

        let mut canvas = RippleCanvas::new(400, 200);
        assert!(canvas.rasterize(&ripples));

        // Inside the inner radius the gradient is transparent.
        assert_eq!(canvas.pixel(120, 150), Some(RIPPLE_BASELINE));

        // Halfway up the first segment (t ~ 0.395): half the tint over the baseline.
        assert_rgba_near(canvas.pixel(164, 150), [96, 159, 8, 255], 1);

        // Mid stop (t ~ 0.8): the tint itself, blue = 16 * alpha.
        assert_rgba_near(canvas.pixel(200, 150), [64, 191, 16, 255], 1);

        // Just inside the outer radius the half-transparent edge stop lets the
        // baseline through.
        assert_rgba_near(canvas.pixel(217, 150), [126, 130, 0, 255], 2);

        // Just outside the outer radius nothing is drawn.
        assert_eq!(canvas.pixel(219, 150), Some(RIPPLE_BASELINE));
        assert_eq!(canvas.pixel(100, 150 - 119), Some(RIPPLE_BASELINE));
    }
}
