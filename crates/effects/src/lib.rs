//! CPU-side state for the header's post-processing chain.
//!
//! Everything here is plain data advanced by the frame loop; the renderer
//! uploads the results as textures and uniforms.

pub mod debounce;
pub mod easing;
pub mod glyph;
pub mod layout;
pub mod particles;
pub mod ripple;
pub mod scan;

pub use debounce::ResizeDebouncer;
pub use glyph::{glyph_index, linearize_depth, CellGrid, GlyphAtlasLayout};
pub use layout::{TargetLayout, Viewport, ViewportError};
pub use particles::{Frustum, Particle, ParticleField};
pub use ripple::{ripple_alpha, Ripple, RippleCanvas, RippleField, RIPPLE_BASELINE};
pub use scan::ScanLine;
