//! wgpu backend for the compositor.
//!
//! - `context` owns the instance, device, and surface, and reconfigures the
//!   swapchain on resize.
//! - `targets` allocates the offscreen colour and depth buffers for one
//!   `TargetLayout`.
//! - `textures` loads the glyph atlas and keeps the ripple texture in sync with
//!   the CPU canvas.
//! - `pipeline` builds bind group layouts and one render pipeline per pass.
//! - `uniforms` mirrors the GLSL uniform blocks.
//! - `state` walks the pass plan each frame and implements `RenderBackend`.

mod context;
mod pipeline;
mod state;
mod targets;
mod textures;
mod uniforms;

pub(crate) use state::GpuState;
