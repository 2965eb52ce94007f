//! Renderer crate for the ASCII header.
//!
//! A lit 3D model, drifting particles and a volumetric light cone are drawn
//! into offscreen targets, then pushed through a chain of full-screen passes
//! before the last one lands on the window surface:
//!
//! ```text
//!   Scene ─▶ [Occlusion ─▶ LightScattering ─▶ Additive] ─▶ [Scan] ─▶ [Ripple] ─▶ Ascii | Present
//! ```
//!
//! [`compositor::Compositor`] owns the CPU side of a frame (scene animation,
//! ripples, resize handling) and talks to the GPU through the
//! [`compositor::RenderBackend`] trait. The `wgpu` implementation of that trait
//! lives in the private `gpu` module; `window` wires it to a `winit` event
//! loop. [`Renderer`] is the thin entry point the CLI calls.

pub mod compositor;
mod compile;
mod gpu;
pub mod model;
pub mod runtime;
pub mod scene;
mod shaders;
pub mod types;
mod window;

use anyhow::Result;

pub use compositor::{Compositor, FrameInputs, FrameReport, Pass, PassPlan, RenderBackend};
pub use model::{MeshData, MeshVertex, ModelLoadError, ModelLoader};
pub use runtime::{FrameClock, FrameScheduler, SteppedTimeSource, SystemTimeSource, TimeSource};
pub use types::{AdapterProfile, ColorSpaceMode, RendererConfig};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the header window and blocks until it is closed.
    ///
    /// Fails when no display server, GPU adapter, or surface is available.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            width = self.config.surface_size.0,
            height = self.config.surface_size.1,
            preset = %self.config.header.effects.preset,
            "starting renderer"
        );
        window::run_window(self.config.clone())
    }
}
