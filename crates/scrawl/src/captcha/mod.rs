//! CAPTCHA synthesis.
//!
//! Leaf to root: `bezier` (curve sampling), `distort` (per-glyph warps),
//! `font` (rasterizer contract), `glyph` (rasterize, distort, paste),
//! `scene` (full canvas pipeline), `encode` (image bytes), and `session`
//! (configuration plus one `generate` call per request).

mod bezier;
mod distort;
mod encode;
mod font;
mod glyph;
mod scene;
mod session;

pub use bezier::{BezierCache, CoefficientTable, pascal_row};
pub use distort::{Distortion, offset, rotate, warp};
pub use encode::{CanvasEncoder, ImageEncoder};
pub use font::{Face, GlyphRasterizer, TrueTypeRasterizer};
pub use glyph::{GlyphBitmap, GlyphComposer, crop_to_content, layout, paste_masked};
pub use scene::{Palette, SceneComposer, Smoothing};
pub use session::CaptchaSession;

use rand::Rng;

/// Uniform sample in `[low, high)`; a zero-width range yields `low`
pub(crate) fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    low + (high - low) * rng.random::<f64>()
}
