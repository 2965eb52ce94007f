use headerconfig::EffectToggles;

use crate::glyph::CellGrid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ViewportError {
    #[error("viewport {width}x{height} has a zero dimension")]
    Empty { width: u32, height: u32 },
}

/// Drawable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Result<Self, ViewportError> {
        if width == 0 || height == 0 {
            return Err(ViewportError::Empty { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Maps a pixel position to `[0, 1]²`, origin top-left.
    pub fn normalize(&self, x: f64, y: f64) -> [f32; 2] {
        [
            (x / self.width as f64).clamp(0.0, 1.0) as f32,
            (y / self.height as f64).clamp(0.0, 1.0) as f32,
        ]
    }

    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

/// Sizes of every offscreen buffer for one viewport and effect set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetLayout {
    pub viewport: Viewport,
    /// Scene colour/depth and every intermediate effect target.
    pub scene: [u32; 2],
    pub occlusion: [u32; 2],
    pub ripple_canvas: [u32; 2],
    pub cells: CellGrid,
}

impl TargetLayout {
    pub fn compute(
        viewport: Viewport,
        effects: &EffectToggles,
        cell_size: [u32; 2],
        ripple_downsample: u32,
    ) -> Self {
        let cells = CellGrid::new(viewport, cell_size);
        let scene = if effects.ascii {
            [cells.count[0] * 2, cells.count[1] * 2]
        } else {
            viewport.size()
        };
        let occlusion = if effects.ascii {
            scene
        } else {
            [(viewport.width / 2).max(1), (viewport.height / 2).max(1)]
        };
        let downsample = ripple_downsample.max(1);
        let ripple_canvas = [
            (viewport.width / downsample).max(1),
            (viewport.height / downsample).max(1),
        ];
        Self {
            viewport,
            scene,
            occlusion,
            ripple_canvas,
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii_only() -> EffectToggles {
        headerconfig::EffectPreset::Ascii.toggles()
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert_eq!(
            Viewport::new(0, 600),
            Err(ViewportError::Empty {
                width: 0,
                height: 600
            })
        );
        assert!(Viewport::new(800, 0).is_err());
    }

    #[test]
    fn normalize_clamps_to_unit_square() {
        let viewport = Viewport::new(800, 600).unwrap();
        assert_eq!(viewport.normalize(400.0, 150.0), [0.5, 0.25]);
        assert_eq!(viewport.normalize(-5.0, 900.0), [0.0, 1.0]);
    }

    #[test]
    fn ascii_targets_oversample_cells() {
        let layout = TargetLayout::compute(
            Viewport::new(800, 600).unwrap(),
            &ascii_only(),
            [8, 8],
            2,
        );
        assert_eq!(layout.cells.count, [100, 75]);
        assert_eq!(layout.scene, [200, 150]);
        assert_eq!(layout.occlusion, layout.scene);
        assert_eq!(layout.ripple_canvas, [400, 300]);
    }

    #[test]
    fn doubling_viewport_doubles_cells() {
        let small = TargetLayout::compute(Viewport::new(800, 600).unwrap(), &ascii_only(), [8, 8], 2);
        let large =
            TargetLayout::compute(Viewport::new(1600, 1200).unwrap(), &ascii_only(), [8, 8], 2);
        assert_eq!(large.cells.count, [small.cells.count[0] * 2, small.cells.count[1] * 2]);
        assert_eq!(large.scene, [400, 300]);
    }

    #[test]
    fn full_resolution_without_ascii() {
        let effects = headerconfig::EffectPreset::Scan.toggles();
        let layout = TargetLayout::compute(Viewport::new(801, 601).unwrap(), &effects, [8, 8], 2);
        assert_eq!(layout.scene, [801, 601]);
        assert_eq!(layout.occlusion, [400, 300]);
    }
}
