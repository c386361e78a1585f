//! # Scrawl Common
//!
//! Shared types, errors, and defaults used across Scrawl components.
//!
//! ## Modules
//! - `types` - Core data structures (CaptchaResult, OutputFormat, etc.)
//! - `error` - Common error type
//! - `constants` - Default pipeline parameters

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Result, ScrawlError};
pub use types::*;
