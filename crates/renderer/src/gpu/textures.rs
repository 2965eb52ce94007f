use std::path::Path;

use anyhow::{Context, Result};
use effects::{GlyphAtlasLayout, RippleCanvas, RIPPLE_BASELINE};
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

pub(crate) const RIPPLE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Loads the glyph atlas, falling back to a generated density ramp.
pub(crate) fn load_atlas(path: Option<&Path>, layout: &GlyphAtlasLayout) -> RgbaImage {
    let Some(path) = path else {
        tracing::warn!("no glyph atlas configured; using generated density ramp");
        return procedural_atlas(layout);
    };
    match read_atlas(path) {
        Ok(image) => {
            let expected = layout.atlas_size();
            if image.dimensions() != (expected[0], expected[1]) {
                tracing::warn!(
                    path = %path.display(),
                    width = image.width(),
                    height = image.height(),
                    expected_width = expected[0],
                    expected_height = expected[1],
                    "glyph atlas size differs from configuration; glyphs will be rescaled"
                );
            }
            tracing::debug!(path = %path.display(), glyphs = layout.total(), "loaded glyph atlas");
            image
        }
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "failed to load glyph atlas; using generated density ramp"
            );
            procedural_atlas(layout)
        }
    }
}

fn read_atlas(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode glyph atlas {}", path.display()))?;
    Ok(image.to_rgba8())
}

/// White ordered-dither glyphs; glyph 0 is solid and the last glyph is blank.
pub(crate) fn procedural_atlas(layout: &GlyphAtlasLayout) -> RgbaImage {
    let [width, height] = layout.atlas_size();
    let [glyph_width, glyph_height] = layout.glyph_size;
    let last = layout.total().saturating_sub(1).max(1) as f32;
    RgbaImage::from_fn(width, height, |x, y| {
        let index = (y / glyph_height) * layout.columns + x / glyph_width;
        let coverage = 1.0 - index as f32 / last;
        let local_x = (x % glyph_width) as usize;
        let local_y = (y % glyph_height) as usize;
        let threshold = (f32::from(BAYER_4X4[local_y % 4][local_x % 4]) + 0.5) / 16.0;
        if threshold < coverage {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([0, 0, 0, 255])
        }
    })
}

pub(crate) struct AtlasTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

pub(crate) fn create_atlas_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &RgbaImage,
) -> AtlasTexture {
    let size = wgpu::Extent3d {
        width: image.width().max(1),
        height: image.height().max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("glyph atlas"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        image.as_raw(),
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    AtlasTexture { texture, view }
}

/// Ripple texture filled with the baseline colour.
pub(crate) fn create_ripple_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    size: [u32; 2],
) -> wgpu::Texture {
    let width = size[0].max(1);
    let height = size[1].max(1);
    let baseline: Vec<u8> = RIPPLE_BASELINE
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("ripple canvas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RIPPLE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &baseline,
    )
}

/// Copies the rasterized canvas into the ripple texture. Mismatched sizes are
/// skipped; the next reallocation brings them back in sync.
pub(crate) fn upload_ripple(queue: &wgpu::Queue, texture: &wgpu::Texture, canvas: &RippleCanvas) {
    let [width, height] = canvas.size();
    if texture.width() != width || texture.height() != height {
        tracing::debug!(
            canvas_width = width,
            canvas_height = height,
            texture_width = texture.width(),
            texture_height = texture.height(),
            "ripple upload skipped until targets are reallocated"
        );
        return;
    }
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        canvas.pixels(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(image: &RgbaImage, layout: &GlyphAtlasLayout, index: u32) -> usize {
        let (column, row) = layout.cell(index);
        let [w, h] = layout.glyph_size;
        let mut lit = 0;
        for y in row * h..(row + 1) * h {
            for x in column * w..(column + 1) * w {
                if image.get_pixel(x, y)[0] == 255 {
                    lit += 1;
                }
            }
        }
        lit
    }

    #[test]
    fn procedural_atlas_ramps_from_solid_to_blank() {
        let layout = GlyphAtlasLayout::new([64, 64], [8, 8]);
        let image = procedural_atlas(&layout);
        assert_eq!(image.dimensions(), (64, 64));
        assert_eq!(coverage(&image, &layout, 0), 64);
        assert_eq!(coverage(&image, &layout, 63), 0);
        let counts: Vec<usize> = (0..64).map(|i| coverage(&image, &layout, i)).collect();
        assert!(counts.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn missing_atlas_falls_back() {
        let layout = GlyphAtlasLayout::new([32, 16], [8, 8]);
        let image = load_atlas(Some(Path::new("/nonexistent/font.png")), &layout);
        assert_eq!(image.dimensions(), (32, 16));
    }

    #[test]
    fn atlas_loads_from_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font.png");
        let layout = GlyphAtlasLayout::new([16, 16], [8, 8]);
        let source = RgbaImage::from_pixel(16, 16, image::Rgba([10, 20, 30, 255]));
        source.save(&path).unwrap();
        let image = load_atlas(Some(&path), &layout);
        assert_eq!(image.get_pixel(3, 3), &image::Rgba([10, 20, 30, 255]));
    }
}
