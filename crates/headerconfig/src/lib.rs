use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Upper bound on point lights; must match `MAX_LIGHTS` in the renderer's GLSL.
pub const MAX_LIGHTS: usize = 4;
/// Upper bound on scattering samples; must match `MAX_SAMPLES` in the scattering shader.
pub const MAX_SCATTER_SAMPLES: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub version: u32,
    pub camera: CameraConfig,
    pub model: ModelConfig,
    pub lights: Vec<LightConfig>,
    pub ascii: AsciiConfig,
    pub ripple: RippleConfig,
    pub scan: ScanConfig,
    pub particles: ParticleConfig,
    pub volumetric: VolumetricConfig,
    pub effects: EffectsConfig,
    pub window: WindowConfig,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            version: 1,
            camera: CameraConfig::default(),
            model: ModelConfig::default(),
            lights: default_lights(),
            ascii: AsciiConfig::default(),
            ripple: RippleConfig::default(),
            scan: ScanConfig::default(),
            particles: ParticleConfig::default(),
            volumetric: VolumetricConfig::default(),
            effects: EffectsConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

/// Perspective camera looking down -Z from `distance` units away.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 15.0,
            near: 8.0,
            far: 15.0,
            distance: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// glTF/GLB file; `None` renders the placeholder cube.
    pub path: Option<PathBuf>,
    /// Rotation speed about Y in radians per second.
    pub spin_speed: f32,
    pub scale: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            spin_speed: 0.5,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightConfig {
    pub name: String,
    #[serde(
        serialize_with = "serialize_color",
        deserialize_with = "deserialize_color"
    )]
    pub color: [f32; 3],
    pub intensity: f32,
    /// Cutoff distance; zero disables attenuation.
    pub distance: f32,
    #[serde(default = "default_decay")]
    pub decay: f32,
    pub position: [f32; 3],
    /// Follows the pointer together with the light cone.
    #[serde(default)]
    pub follows_pointer: bool,
}

fn default_decay() -> f32 {
    1.0
}

fn default_lights() -> Vec<LightConfig> {
    vec![
        LightConfig {
            name: "back".into(),
            color: rgb_from_hex(0x00aaff),
            intensity: 3.0,
            distance: 10.0,
            decay: 1.0,
            position: [-5.0, 5.0, -5.0],
            follows_pointer: true,
        },
        LightConfig {
            name: "fill".into(),
            color: rgb_from_hex(0x00aaff),
            intensity: 0.7,
            distance: 10.0,
            decay: 1.0,
            position: [-5.0, 0.0, 5.0],
            follows_pointer: false,
        },
        LightConfig {
            name: "key".into(),
            color: rgb_from_hex(0xff00ff),
            intensity: 2.0,
            distance: 10.0,
            decay: 1.0,
            position: [5.0, 0.0, 0.0],
            follows_pointer: false,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsciiConfig {
    /// Glyph atlas image; `None` uses the built-in density ramp.
    pub atlas: Option<PathBuf>,
    /// Atlas dimensions in pixels.
    pub atlas_size: [u32; 2],
    /// Glyph (and on-screen cell) size in pixels.
    pub cell_size: [u32; 2],
    /// Multiplier applied to the camera far plane before depth linearization.
    pub depth_far_scale: f32,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            atlas: None,
            atlas_size: [64, 64],
            cell_size: [8, 8],
            depth_far_scale: 0.35,
        }
    }
}

impl AsciiConfig {
    pub fn atlas_columns(&self) -> u32 {
        self.atlas_size[0] / self.cell_size[0].max(1)
    }

    pub fn atlas_rows(&self) -> u32 {
        self.atlas_size[1] / self.cell_size[1].max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleConfig {
    pub speed: f32,
    pub peak: f32,
    pub max_active: usize,
    /// Ripple canvas is the viewport divided by this factor.
    pub canvas_downsample: u32,
    pub distort: [f32; 2],
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            speed: 0.3,
            peak: 0.2,
            max_active: 32,
            canvas_downsample: 2,
            distort: [0.001, 0.001],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub speed: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { speed: 0.5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    pub depth: f32,
    pub max_speed: f32,
    /// Quad edge in render-target pixels.
    pub point_size: f32,
    pub decay_modifier: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 60,
            depth: 3.0,
            max_speed: 5.0,
            point_size: 2.0,
            decay_modifier: 2.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumetricConfig {
    pub cone_position: [f32; 3],
    pub cone_target: [f32; 3],
    /// Horizontal travel of the cone as the pointer sweeps the viewport.
    pub pointer_sweep: f32,
    pub attenuation: f32,
    pub angle_power: f32,
    pub exposure: f32,
    pub decay: f32,
    pub density: f32,
    pub weight: f32,
    pub samples: u32,
}

impl Default for VolumetricConfig {
    fn default() -> Self {
        Self {
            cone_position: [-5.0, 5.0, -8.0],
            cone_target: [0.0, 0.0, -8.0],
            pointer_sweep: 5.0,
            attenuation: 25.0,
            angle_power: 10.0,
            exposure: 0.2,
            decay: 0.96,
            density: 0.6,
            weight: 0.2,
            samples: 80,
        }
    }
}

/// Named toggle sets, one per step of the header build-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectPreset {
    Scene,
    Model,
    Particles,
    Ascii,
    Ripple,
    Scan,
    Volumetric,
    Full,
}

impl EffectPreset {
    pub const ALL: [EffectPreset; 8] = [
        EffectPreset::Scene,
        EffectPreset::Model,
        EffectPreset::Particles,
        EffectPreset::Ascii,
        EffectPreset::Ripple,
        EffectPreset::Scan,
        EffectPreset::Volumetric,
        EffectPreset::Full,
    ];

    pub fn toggles(self) -> EffectToggles {
        let none = EffectToggles {
            model: true,
            particles: false,
            volumetric: false,
            ascii: false,
            scan: false,
            ripple: false,
        };
        match self {
            EffectPreset::Scene => EffectToggles {
                model: false,
                ..none
            },
            EffectPreset::Model => none,
            EffectPreset::Particles => EffectToggles {
                particles: true,
                ..none
            },
            EffectPreset::Ascii => EffectToggles {
                ascii: true,
                ..none
            },
            EffectPreset::Ripple => EffectToggles {
                ascii: true,
                ripple: true,
                ..none
            },
            EffectPreset::Scan => EffectToggles { scan: true, ..none },
            EffectPreset::Volumetric => EffectToggles {
                ascii: true,
                volumetric: true,
                ..none
            },
            EffectPreset::Full => EffectToggles::all(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EffectPreset::Scene => "scene",
            EffectPreset::Model => "model",
            EffectPreset::Particles => "particles",
            EffectPreset::Ascii => "ascii",
            EffectPreset::Ripple => "ripple",
            EffectPreset::Scan => "scan",
            EffectPreset::Volumetric => "volumetric",
            EffectPreset::Full => "full",
        }
    }
}

impl fmt::Display for EffectPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EffectPreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        EffectPreset::ALL
            .iter()
            .copied()
            .find(|preset| preset.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown effect preset '{}'; expected one of scene, model, particles, ascii, ripple, scan, volumetric, full",
                    value.trim()
                )
            })
    }
}

/// Resolved on/off state for every optional part of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectToggles {
    /// When false the placeholder cube is shown instead of the model.
    pub model: bool,
    pub particles: bool,
    pub volumetric: bool,
    pub ascii: bool,
    pub scan: bool,
    pub ripple: bool,
}

impl EffectToggles {
    pub fn all() -> Self {
        Self {
            model: true,
            particles: true,
            volumetric: true,
            ascii: true,
            scan: true,
            ripple: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub preset: EffectPreset,
    pub model: Option<bool>,
    pub particles: Option<bool>,
    pub volumetric: Option<bool>,
    pub ascii: Option<bool>,
    pub scan: Option<bool>,
    pub ripple: Option<bool>,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            preset: EffectPreset::Full,
            model: None,
            particles: None,
            volumetric: None,
            ascii: None,
            scan: None,
            ripple: None,
        }
    }
}

impl EffectsConfig {
    /// Preset toggles with any explicit per-effect overrides applied.
    pub fn resolved(&self) -> EffectToggles {
        let base = self.preset.toggles();
        EffectToggles {
            model: self.model.unwrap_or(base.model),
            particles: self.particles.unwrap_or(base.particles),
            volumetric: self.volumetric.unwrap_or(base.volumetric),
            ascii: self.ascii.unwrap_or(base.ascii),
            scan: self.scan.unwrap_or(base.scan),
            ripple: self.ripple.unwrap_or(base.ripple),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub size: [u32; 2],
    pub fps: Option<f32>,
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub resize_debounce: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "ASCII Header".into(),
            size: [1280, 720],
            fps: None,
            resize_debounce: default_debounce(),
        }
    }
}

fn default_debounce() -> Duration {
    Duration::from_millis(50)
}

pub fn rgb_from_hex(value: u32) -> [f32; 3] {
    [
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ]
}

fn parse_color(raw: &str) -> Result<[f32; 3], String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .unwrap_or(trimmed);
    if digits.len() != 6 {
        return Err(format!("invalid color '{trimmed}'; expected #rrggbb"));
    }
    let value = u32::from_str_radix(digits, 16)
        .map_err(|_| format!("invalid color '{trimmed}'; expected #rrggbb"))?;
    Ok(rgb_from_hex(value))
}

fn serialize_color<S>(color: &[f32; 3], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    serializer.serialize_str(&format!(
        "#{:02x}{:02x}{:02x}",
        channel(color[0]),
        channel(color[1]),
        channel(color[2])
    ))
}

fn deserialize_color<'de, D>(deserializer: D) -> Result<[f32; 3], D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
        Rgb([f32; 3]),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Str(raw) => parse_color(&raw).map_err(de::Error::custom),
        Helper::Num(value) => {
            if !(0..=0xff_ffff).contains(&value) {
                return Err(de::Error::custom("color must be within 0x000000-0xffffff"));
            }
            Ok(rgb_from_hex(value as u32))
        }
        Helper::Rgb(rgb) => Ok(rgb),
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl HeaderConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: HeaderConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        config.resolve_relative_paths(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn effects(&self) -> EffectToggles {
        self.effects.resolved()
    }

    /// Asset paths in a config file are relative to the file itself.
    fn resolve_relative_paths(&mut self, base: &Path) {
        if let Some(path) = self.model.path.as_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        if let Some(path) = self.ascii.atlas.as_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_finite()?;

        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(
                "camera.fov_degrees must be within (0, 180)".into(),
            ));
        }
        if camera.near <= 0.0 || camera.far <= camera.near {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far (near={}, far={})",
                camera.near, camera.far
            )));
        }

        if self.model.scale <= 0.0 {
            return Err(ConfigError::Invalid("model.scale must be > 0".into()));
        }

        if self.lights.len() > MAX_LIGHTS {
            return Err(ConfigError::Invalid(format!(
                "at most {MAX_LIGHTS} lights are supported (found {})",
                self.lights.len()
            )));
        }
        for light in &self.lights {
            if light.intensity < 0.0 || light.distance < 0.0 || light.decay < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "light '{}' intensity, distance, and decay must be >= 0",
                    light.name
                )));
            }
        }

        let ascii = &self.ascii;
        if ascii.cell_size.contains(&0) {
            return Err(ConfigError::Invalid(
                "ascii.cell_size must be greater than zero".into(),
            ));
        }
        if ascii.atlas_columns() == 0 || ascii.atlas_rows() == 0 {
            return Err(ConfigError::Invalid(format!(
                "ascii.atlas_size {:?} must hold at least one {:?} glyph",
                ascii.atlas_size, ascii.cell_size
            )));
        }
        if ascii.depth_far_scale <= 0.0 {
            return Err(ConfigError::Invalid(
                "ascii.depth_far_scale must be > 0".into(),
            ));
        }

        let ripple = &self.ripple;
        if ripple.speed <= 0.0 {
            return Err(ConfigError::Invalid("ripple.speed must be > 0".into()));
        }
        if !(ripple.peak > 0.0 && ripple.peak < 1.0) {
            return Err(ConfigError::Invalid(
                "ripple.peak must be within (0, 1)".into(),
            ));
        }
        if ripple.max_active == 0 {
            return Err(ConfigError::Invalid(
                "ripple.max_active must be at least 1".into(),
            ));
        }
        if ripple.canvas_downsample == 0 {
            return Err(ConfigError::Invalid(
                "ripple.canvas_downsample must be at least 1".into(),
            ));
        }

        if self.scan.speed < 0.0 {
            return Err(ConfigError::Invalid("scan.speed must be >= 0".into()));
        }

        if self.particles.depth < 0.0 || self.particles.max_speed < 0.0 {
            return Err(ConfigError::Invalid(
                "particles.depth and particles.max_speed must be >= 0".into(),
            ));
        }
        if self.particles.point_size <= 0.0 {
            return Err(ConfigError::Invalid(
                "particles.point_size must be > 0".into(),
            ));
        }

        let volumetric = &self.volumetric;
        if volumetric.samples == 0 || volumetric.samples > MAX_SCATTER_SAMPLES {
            return Err(ConfigError::Invalid(format!(
                "volumetric.samples must be within 1-{MAX_SCATTER_SAMPLES}"
            )));
        }
        if volumetric.cone_position == volumetric.cone_target {
            return Err(ConfigError::Invalid(
                "volumetric.cone_target must differ from cone_position".into(),
            ));
        }

        let window = &self.window;
        if window.size.contains(&0) {
            return Err(ConfigError::Invalid(
                "window.size must be greater than zero".into(),
            ));
        }
        if let Some(fps) = window.fps {
            if fps < 0.0 {
                return Err(ConfigError::Invalid("window.fps must be >= 0".into()));
            }
        }

        Ok(())
    }

    /// Range checks below compare with `<`/`<=`, which NaN slips through.
    fn check_finite(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        let volumetric = &self.volumetric;
        let particles = &self.particles;
        let mut fields: Vec<(String, f32)> = vec![
            ("camera.fov_degrees".into(), camera.fov_degrees),
            ("camera.near".into(), camera.near),
            ("camera.far".into(), camera.far),
            ("camera.distance".into(), camera.distance),
            ("model.spin_speed".into(), self.model.spin_speed),
            ("model.scale".into(), self.model.scale),
            ("ascii.depth_far_scale".into(), self.ascii.depth_far_scale),
            ("ripple.speed".into(), self.ripple.speed),
            ("ripple.peak".into(), self.ripple.peak),
            ("ripple.distort[0]".into(), self.ripple.distort[0]),
            ("ripple.distort[1]".into(), self.ripple.distort[1]),
            ("scan.speed".into(), self.scan.speed),
            ("particles.depth".into(), particles.depth),
            ("particles.max_speed".into(), particles.max_speed),
            ("particles.point_size".into(), particles.point_size),
            ("particles.decay_modifier".into(), particles.decay_modifier),
            ("volumetric.pointer_sweep".into(), volumetric.pointer_sweep),
            ("volumetric.attenuation".into(), volumetric.attenuation),
            ("volumetric.angle_power".into(), volumetric.angle_power),
            ("volumetric.exposure".into(), volumetric.exposure),
            ("volumetric.decay".into(), volumetric.decay),
            ("volumetric.density".into(), volumetric.density),
            ("volumetric.weight".into(), volumetric.weight),
        ];
        for (axis, (position, target)) in volumetric
            .cone_position
            .iter()
            .zip(&volumetric.cone_target)
            .enumerate()
        {
            fields.push((format!("volumetric.cone_position[{axis}]"), *position));
            fields.push((format!("volumetric.cone_target[{axis}]"), *target));
        }
        for light in &self.lights {
            let name = &light.name;
            fields.push((format!("lights.{name}.intensity"), light.intensity));
            fields.push((format!("lights.{name}.distance"), light.distance));
            fields.push((format!("lights.{name}.decay"), light.decay));
            for axis in 0..3 {
                fields.push((format!("lights.{name}.color[{axis}]"), light.color[axis]));
                fields.push((format!("lights.{name}.position[{axis}]"), light.position[axis]));
            }
        }
        if let Some(fps) = self.window.fps {
            fields.push(("window.fps".into(), fps));
        }

        match fields.into_iter().find(|(_, value)| !value.is_finite()) {
            Some((name, value)) => Err(ConfigError::Invalid(format!(
                "{name} must be a finite number (found {value})"
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1

[camera]
fov_degrees = 20
near = 0.1
far = 20

[model]
path = "model/cybertruck.glb"
spin_speed = 0.25

[[lights]]
name = "key"
color = "#ff00ff"
intensity = 2
distance = 10
position = [5.0, 0.0, 0.0]

[ascii]
atlas = "font.png"
cell_size = [8, 8]

[ripple]
max_active = 8

[effects]
preset = "ripple"
scan = true

[window]
size = [800, 600]
resize_debounce = "120ms"
"##;

    #[test]
    fn parses_sample_config() {
        let config = HeaderConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.camera.fov_degrees, 20.0);
        assert_eq!(config.lights.len(), 1);
        assert_eq!(config.lights[0].color, [1.0, 0.0, 1.0]);
        assert_eq!(config.lights[0].decay, 1.0);
        assert_eq!(config.ripple.max_active, 8);
        assert_eq!(config.ripple.speed, 0.3);
        assert_eq!(config.window.resize_debounce, Duration::from_millis(120));
    }

    #[test]
    fn empty_document_matches_defaults() {
        let config = HeaderConfig::from_toml_str("").expect("defaults");
        assert_eq!(config.camera.near, 8.0);
        assert_eq!(config.camera.far, 15.0);
        assert_eq!(config.lights.len(), 3);
        assert_eq!(config.ascii.atlas_columns() * config.ascii.atlas_rows(), 64);
        assert_eq!(config.window.resize_debounce, Duration::from_millis(50));
        assert_eq!(config.effects(), EffectToggles::all());
    }

    #[test]
    fn preset_overrides_apply() {
        let config = HeaderConfig::from_toml_str(SAMPLE).unwrap();
        let toggles = config.effects();
        assert!(toggles.ascii);
        assert!(toggles.ripple);
        assert!(toggles.scan, "explicit override should win over preset");
        assert!(!toggles.volumetric);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let rendered = HeaderConfig::default().to_toml_string().unwrap();
        let parsed = HeaderConfig::from_toml_str(&rendered).expect("reparse");
        assert_eq!(parsed.lights[0].color, rgb_from_hex(0x00aaff));
        assert_eq!(parsed.window.resize_debounce, Duration::from_millis(50));
    }

    #[test]
    fn rejects_inverted_clip_planes() {
        let err = HeaderConfig::from_toml_str(
            r#"
[camera]
near = 15
far = 8
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_too_many_lights() {
        let mut doc = String::new();
        for index in 0..=MAX_LIGHTS {
            doc.push_str(&format!(
                "[[lights]]\nname = \"l{index}\"\ncolor = 0xffffff\nintensity = 1\ndistance = 5\nposition = [0.0, 0.0, 0.0]\n\n"
            ));
        }
        let err = HeaderConfig::from_toml_str(&doc).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_color() {
        let err = HeaderConfig::from_toml_str(
            r##"
[[lights]]
name = "odd"
color = "#12"
intensity = 1
distance = 5
position = [0.0, 0.0, 0.0]
"##,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_ripple_cap() {
        let err = HeaderConfig::from_toml_str("[ripple]\nmax_active = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_finite_numbers() {
        for document in [
            "[ripple]\nspeed = nan\n",
            "[ripple]\npeak = nan\n",
            "[camera]\nfar = inf\n",
            "[scan]\nspeed = -nan\n",
            "[window]\nfps = nan\n",
            "[volumetric]\ncone_target = [0.0, nan, 0.0]\n",
            "[[lights]]\nname = \"key\"\ncolor = \"#ffffff\"\nintensity = nan\ndistance = 1\nposition = [0.0, 0.0, 0.0]\n",
        ] {
            let err = HeaderConfig::from_toml_str(document).unwrap_err();
            match err {
                ConfigError::Invalid(message) => {
                    assert!(message.contains("finite"), "{document}: {message}")
                }
                other => panic!("{document}: unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn parses_preset_names() {
        assert_eq!("Volumetric".parse::<EffectPreset>(), Ok(EffectPreset::Volumetric));
        assert!("bloom".parse::<EffectPreset>().is_err());
        assert!(!EffectPreset::Scene.toggles().model);
    }
}
