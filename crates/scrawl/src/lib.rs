//! # Scrawl - distortion engine
//!
//! Procedural text CAPTCHA synthesis: per-glyph warps, a Bezier scribble,
//! speckle noise and a smoothing pass over a randomly coloured canvas.
//!
//! ```text
//! CaptchaConfig -> CaptchaSession::generate() -> CaptchaResult { id, text, image }
//! ```

pub mod captcha;
pub mod config;

pub use captcha::CaptchaSession;
pub use config::{AppConfig, CaptchaConfig};
pub use scrawl_common::{CaptchaResult, OutputFormat, Result, ScrawlError};
