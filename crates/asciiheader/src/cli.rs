use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use headerconfig::EffectPreset;
use renderer::ColorSpaceMode;

#[derive(Parser, Debug)]
#[command(
    name = "asciiheader",
    author,
    version,
    about = "Interactive ASCII-rendered 3D header",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `config.toml` in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// glTF/GLB model to display instead of the configured one.
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Glyph atlas image (a grid of glyphs, densest first).
    #[arg(long, value_name = "FILE")]
    pub atlas: Option<PathBuf>,

    /// Effect preset: scene, model, particles, ascii, ripple, scan, volumetric, or full.
    #[arg(long, value_name = "PRESET", value_parser = parse_stage)]
    pub stage: Option<EffectPreset>,

    /// Initial window size (e.g. `1280x400`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Optional FPS cap (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "auto"
    )]
    pub color_space: ColorSpaceMode,

    /// Seed for particle placement.
    #[arg(long, value_name = "SEED", default_value_t = 0)]
    pub seed: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect and validate configuration files.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the default configuration as TOML.
    Print,
    /// Parse and validate a configuration file.
    Check {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Print the resolved configuration directory and file.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_stage(value: &str) -> Result<EffectPreset, String> {
    value.parse()
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "srgb" => Ok(ColorSpaceMode::Linear),
        "srgb-off" => Ok(ColorSpaceMode::Gamma),
        other => other.parse(),
    }
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32)> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1280x400"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size argument"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size argument"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_surface_size("1280x400").unwrap(), (1280, 400));
        assert_eq!(parse_surface_size(" 640 X 200 ").unwrap(), (640, 200));
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x400").is_err());
        assert!(parse_surface_size("wide x tall").is_err());
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "asciiheader",
            "--stage",
            "Ripple",
            "--size",
            "800x300",
            "--fps",
            "30",
            "--color-space",
            "linear",
            "--seed",
            "7",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.stage, Some(EffectPreset::Ripple));
        assert_eq!(cli.run.size.as_deref(), Some("800x300"));
        assert_eq!(cli.run.fps, Some(30.0));
        assert_eq!(cli.run.color_space, ColorSpaceMode::Linear);
        assert_eq!(cli.run.seed, 7);
    }

    #[test]
    fn rejects_unknown_stage() {
        assert!(Cli::try_parse_from(["asciiheader", "--stage", "bloom"]).is_err());
    }

    #[test]
    fn parses_config_subcommands() {
        let cli = Cli::try_parse_from(["asciiheader", "config", "check", "header.toml"]).unwrap();
        match cli.command {
            Some(Command::Config(ConfigCommand {
                action: ConfigAction::Check { path },
            })) => assert_eq!(path, PathBuf::from("header.toml")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn color_space_aliases() {
        assert_eq!(parse_color_space("srgb").unwrap(), ColorSpaceMode::Linear);
        assert_eq!(parse_color_space("GAMMA").unwrap(), ColorSpaceMode::Gamma);
        assert!(parse_color_space("").is_err());
        assert!(parse_color_space("hdr").is_err());
    }
}
