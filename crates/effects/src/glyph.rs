use crate::layout::Viewport;

/// Grid of equally sized glyphs packed row-major into an atlas image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphAtlasLayout {
    pub columns: u32,
    pub rows: u32,
    pub glyph_size: [u32; 2],
}

impl GlyphAtlasLayout {
    pub fn new(atlas_size: [u32; 2], glyph_size: [u32; 2]) -> Self {
        let glyph_size = [glyph_size[0].max(1), glyph_size[1].max(1)];
        Self {
            columns: (atlas_size[0] / glyph_size[0]).max(1),
            rows: (atlas_size[1] / glyph_size[1]).max(1),
            glyph_size,
        }
    }

    pub fn from_config(config: &headerconfig::AsciiConfig) -> Self {
        Self::new(config.atlas_size, config.cell_size)
    }

    pub fn total(&self) -> u32 {
        self.columns * self.rows
    }

    pub fn atlas_size(&self) -> [u32; 2] {
        [
            self.columns * self.glyph_size[0],
            self.rows * self.glyph_size[1],
        ]
    }

    /// Column/row of glyph `index`; index 0 is the top-left cell.
    pub fn cell(&self, index: u32) -> (u32, u32) {
        let index = index.min(self.total() - 1);
        (index % self.columns, index / self.columns)
    }

    /// Normalized `[u0, v0, u1, v1]` rectangle of glyph `index`.
    pub fn uv_rect(&self, index: u32) -> [f32; 4] {
        let (column, row) = self.cell(index);
        let cols = self.columns as f32;
        let rows = self.rows as f32;
        [
            column as f32 / cols,
            row as f32 / rows,
            (column + 1) as f32 / cols,
            (row + 1) as f32 / rows,
        ]
    }
}

/// Character cells covering a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGrid {
    pub cell_size: [u32; 2],
    /// Whole cells needed to cover the viewport (partial cells round up).
    pub count: [u32; 2],
    /// Exact viewport-to-cell ratio; the shader scales uvs by this.
    pub precise: [f32; 2],
}

impl CellGrid {
    pub fn new(viewport: Viewport, cell_size: [u32; 2]) -> Self {
        let cell_size = [cell_size[0].max(1), cell_size[1].max(1)];
        Self {
            cell_size,
            count: [
                viewport.width.div_ceil(cell_size[0]),
                viewport.height.div_ceil(cell_size[1]),
            ],
            precise: [
                viewport.width as f32 / cell_size[0] as f32,
                viewport.height as f32 / cell_size[1] as f32,
            ],
        }
    }
}

/// Converts `[0, 1]` device depth from a right-handed zero-to-one projection
/// into linear `[0, 1]` depth between `near` and `far`.
pub fn linearize_depth(depth: f32, near: f32, far: f32) -> f32 {
    let view_z = -near * far / ((near - far) * depth + far);
    ((view_z + near) / (near - far)).clamp(0.0, 1.0)
}

/// Glyph picked for a linear depth; `total` must be non-zero.
pub fn glyph_index(depth: f32, total: u32) -> u32 {
    let depth = if depth.is_finite() {
        depth.clamp(0.0, 1.0)
    } else {
        1.0
    };
    ((depth * total as f32).floor() as u32).min(total.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_index_floors_into_range() {
        assert_eq!(glyph_index(0.0, 64), 0);
        assert_eq!(glyph_index(0.5, 64), 32);
        assert_eq!(glyph_index(0.999, 64), 63);
        assert_eq!(glyph_index(1.0, 64), 63);
        assert_eq!(glyph_index(-0.3, 64), 0);
        for step in 0..=1000 {
            let index = glyph_index(step as f32 / 1000.0, 64);
            assert!(index < 64);
        }
    }

    #[test]
    fn atlas_cells_are_row_major_from_top_left() {
        let atlas = GlyphAtlasLayout::new([64, 64], [8, 8]);
        assert_eq!(atlas.total(), 64);
        assert_eq!(atlas.cell(0), (0, 0));
        assert_eq!(atlas.cell(9), (1, 1));
        assert_eq!(atlas.cell(63), (7, 7));
        assert_eq!(atlas.uv_rect(8), [0.0, 0.125, 0.125, 0.25]);
    }

    #[test]
    fn cell_grid_rounds_partial_cells_up() {
        let grid = CellGrid::new(Viewport::new(801, 600).unwrap(), [8, 8]);
        assert_eq!(grid.count, [101, 75]);
        assert!((grid.precise[0] - 100.125).abs() < 1e-4);
    }

    #[test]
    fn linearized_depth_spans_unit_range() {
        let (near, far) = (8.0, 15.0);
        assert!(linearize_depth(0.0, near, far).abs() < 1e-6);
        assert!((linearize_depth(1.0, near, far) - 1.0).abs() < 1e-5);
        let mid = linearize_depth(0.5, near, far);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn linearized_depth_matches_view_distance() {
        let (near, far) = (8.0f32, 15.0f32);
        // Device depth of a point 11.5 units in front of the camera.
        let z = -11.5f32;
        let device = (far / (near - far) * z + near * far / (near - far)) / -z;
        let linear = linearize_depth(device, near, far);
        assert!((linear - 0.5).abs() < 1e-4, "{linear}");
    }
}
