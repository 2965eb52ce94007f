use effects::TargetLayout;

use super::textures::create_ripple_texture;

/// Colour format of every intermediate target; float so scattering can exceed 1.
pub(crate) const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Device depth copied out of the scene pass for the scan and ASCII passes.
pub(crate) const DEPTH_VALUE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub(crate) struct Target {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Target {
    fn new(
        device: &wgpu::Device,
        label: &str,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size[0].max(1),
                height: size[1].max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    fn color(device: &wgpu::Device, label: &str, size: [u32; 2], format: wgpu::TextureFormat) -> Self {
        Self::new(
            device,
            label,
            size,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    fn depth(device: &wgpu::Device, label: &str, size: [u32; 2]) -> Self {
        Self::new(
            device,
            label,
            size,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
    }
}

/// Offscreen buffers for one [`TargetLayout`].
pub(crate) struct RenderTargets {
    pub layout: TargetLayout,
    pub scene_color: Target,
    pub scene_depth: Target,
    pub scene_depth_attachment: Target,
    pub occlusion: Target,
    pub occlusion_depth_attachment: Target,
    pub scatter: Target,
    /// Ping-pong pair for the additive, scan, and ripple passes.
    pub post: [Target; 2],
    pub ripple: Target,
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, layout: &TargetLayout) -> Self {
        let ripple = create_ripple_texture(device, queue, layout.ripple_canvas);
        let ripple_view = ripple.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            layout: *layout,
            scene_color: Target::color(device, "scene colour", layout.scene, COLOR_FORMAT),
            scene_depth: Target::color(device, "scene depth", layout.scene, DEPTH_VALUE_FORMAT),
            scene_depth_attachment: Target::depth(device, "scene depth attachment", layout.scene),
            occlusion: Target::color(device, "occlusion", layout.occlusion, COLOR_FORMAT),
            occlusion_depth_attachment: Target::depth(
                device,
                "occlusion depth attachment",
                layout.occlusion,
            ),
            scatter: Target::color(device, "light scattering", layout.occlusion, COLOR_FORMAT),
            post: [
                Target::color(device, "post a", layout.scene, COLOR_FORMAT),
                Target::color(device, "post b", layout.scene, COLOR_FORMAT),
            ],
            ripple: Target {
                texture: ripple,
                view: ripple_view,
            },
        }
    }

    pub fn destroy(&self) {
        for target in [
            &self.scene_color,
            &self.scene_depth,
            &self.scene_depth_attachment,
            &self.occlusion,
            &self.occlusion_depth_attachment,
            &self.scatter,
            &self.post[0],
            &self.post[1],
            &self.ripple,
        ] {
            target.texture.destroy();
        }
    }
}
