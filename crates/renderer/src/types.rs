use headerconfig::HeaderConfig;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Gamma-encoded swapchain; shader output is written as-is.
    #[default]
    Auto,
    /// Treat shader outputs as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and let an sRGB swapchain encode them.
    Linear,
}

impl std::str::FromStr for ColorSpaceMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorSpaceMode::Auto),
            "gamma" => Ok(ColorSpaceMode::Gamma),
            "linear" => Ok(ColorSpaceMode::Linear),
            other => Err(format!(
                "invalid color space '{other}'; expected auto, gamma, or linear"
            )),
        }
    }
}

/// Summary of the adapter wgpu picked, used to tune frame pacing.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
            || self.name.to_ascii_lowercase().contains("llvmpipe")
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Scene and effect parameters come from [`HeaderConfig`]; the remaining
/// fields mirror CLI flags that only matter to the window and swapchain.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub header: HeaderConfig,
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Optional FPS cap; `None` redraws as fast as the swapchain allows.
    pub target_fps: Option<f32>,
    pub color_space: ColorSpaceMode,
    /// Seed for particle placement.
    pub seed: u64,
}

impl RendererConfig {
    pub fn from_header(header: HeaderConfig) -> Self {
        let size = header.window.size;
        let target_fps = header.window.fps;
        Self {
            header,
            surface_size: (size[0], size[1]),
            target_fps,
            color_space: ColorSpaceMode::default(),
            seed: 0,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::from_header(HeaderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_inherits_window_section() {
        let mut header = HeaderConfig::default();
        header.window.size = [640, 200];
        header.window.fps = Some(30.0);
        let config = RendererConfig::from_header(header);
        assert_eq!(config.surface_size, (640, 200));
        assert_eq!(config.target_fps, Some(30.0));
    }

    #[test]
    fn parses_color_space_names() {
        assert_eq!("Linear".parse::<ColorSpaceMode>(), Ok(ColorSpaceMode::Linear));
        assert!("hdr".parse::<ColorSpaceMode>().is_err());
    }
}
