use anyhow::{Context, Result};
use headerconfig::HeaderConfig;
use renderer::{PassPlan, Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{parse_surface_size, RunArgs};
use crate::paths::AppPaths;

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = build_renderer_config(&args, &paths)?;
    let effects = config.header.effects();
    tracing::info!(
        preset = %config.header.effects.preset,
        passes = ?PassPlan::for_effects(&effects).passes(),
        model = ?config.header.model.path,
        atlas = ?config.header.ascii.atlas,
        "bootstrapping asciiheader"
    );
    Renderer::new(config).run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the explicit `--config`, else the user config file if present, else
/// the built-in defaults.
pub fn load_header_config(args: &RunArgs, paths: &AppPaths) -> Result<HeaderConfig> {
    if let Some(path) = args.config.as_ref() {
        return HeaderConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()));
    }
    let default_file = paths.config_file();
    if default_file.is_file() {
        tracing::debug!(path = %default_file.display(), "using user configuration");
        return HeaderConfig::load(&default_file)
            .with_context(|| format!("failed to load configuration {}", default_file.display()));
    }
    tracing::debug!(
        searched = %default_file.display(),
        "no configuration file found; using defaults"
    );
    Ok(HeaderConfig::default())
}

/// Applies CLI overrides on top of the loaded configuration.
pub fn build_renderer_config(args: &RunArgs, paths: &AppPaths) -> Result<RendererConfig> {
    let mut header = load_header_config(args, paths)?;

    if let Some(path) = args.model.as_ref() {
        header.model.path = Some(path.clone());
    }
    if let Some(path) = args.atlas.as_ref() {
        header.ascii.atlas = Some(path.clone());
    }
    if let Some(stage) = args.stage {
        // A stage on the command line reproduces that step exactly.
        header.effects = headerconfig::EffectsConfig {
            preset: stage,
            ..headerconfig::EffectsConfig::default()
        };
    }
    if let Some(size) = args.size.as_deref() {
        let (width, height) = parse_surface_size(size)?;
        header.window.size = [width, height];
    }
    if let Some(fps) = args.fps {
        header.window.fps = (fps > 0.0).then_some(fps);
    }
    header
        .validate()
        .context("configuration is invalid after applying command-line overrides")?;

    let mut config = RendererConfig::from_header(header);
    config.color_space = args.color_space;
    config.seed = args.seed;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use headerconfig::EffectPreset;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_config_file() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(dir.path().to_path_buf());
        let config = build_renderer_config(&RunArgs::default(), &paths).unwrap();
        let defaults = HeaderConfig::default();
        assert_eq!(config.surface_size.0, defaults.window.size[0]);
        assert_eq!(config.header.effects.preset, defaults.effects.preset);
    }

    #[test]
    fn user_config_file_is_picked_up() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "[window]\nsize = [640, 200]\n\n[effects]\npreset = \"scan\"\n",
        )
        .unwrap();
        let paths = AppPaths::from_raw(dir.path().to_path_buf());
        let config = build_renderer_config(&RunArgs::default(), &paths).unwrap();
        assert_eq!(config.surface_size, (640, 200));
        assert_eq!(config.header.effects.preset, EffectPreset::Scan);
    }

    #[test]
    fn cli_overrides_config() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("header.toml");
        fs::write(
            &file,
            "[effects]\npreset = \"full\"\nripple = false\n\n[window]\nfps = 60.0\n",
        )
        .unwrap();
        let args = RunArgs {
            config: Some(file),
            model: Some(PathBuf::from("/models/hand.glb")),
            stage: Some(EffectPreset::Ripple),
            size: Some("1024x256".into()),
            fps: Some(0.0),
            seed: 42,
            ..RunArgs::default()
        };
        let paths = AppPaths::from_raw(dir.path().join("unused"));
        let config = build_renderer_config(&args, &paths).unwrap();
        assert_eq!(config.surface_size, (1024, 256));
        assert_eq!(config.target_fps, None);
        assert_eq!(config.seed, 42);
        assert_eq!(
            config.header.model.path.as_deref(),
            Some(std::path::Path::new("/models/hand.glb"))
        );
        let effects = config.header.effects();
        assert!(effects.ripple, "stage resets per-effect overrides");
        assert!(effects.ascii);
        assert!(!effects.scan);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let args = RunArgs {
            config: Some(dir.path().join("missing.toml")),
            ..RunArgs::default()
        };
        let paths = AppPaths::from_raw(dir.path().to_path_buf());
        assert!(build_renderer_config(&args, &paths).is_err());
    }

    #[test]
    fn bad_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let args = RunArgs {
            size: Some("wide".into()),
            ..RunArgs::default()
        };
        let paths = AppPaths::from_raw(dir.path().to_path_buf());
        assert!(build_renderer_config(&args, &paths).is_err());
    }
}
