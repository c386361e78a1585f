//! Shared constants for Scrawl components.

/// Default canvas width in pixels
pub const DEFAULT_WIDTH: u32 = 200;

/// Default canvas height in pixels
pub const DEFAULT_HEIGHT: u32 = 75;

/// Default challenge length
pub const DEFAULT_TEXT_LENGTH: usize = 4;

/// Challenge alphabet: uppercase letters plus digits that are hard to
/// confuse with letters (no 0, 1, 2)
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ3456789";

/// Alphabet for result identifiers
pub const ID_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ3456789";

/// Result identifier length
pub const ID_LENGTH: usize = 24;

/// Default font file
pub const DEFAULT_FONT_PATH: &str = "assets/fonts/DejaVuSans.ttf";

/// Default glyph pixel sizes
pub const DEFAULT_FONT_SIZES: [f32; 3] = [65.0, 70.0, 75.0];

/// Horizontal advance ratio between neighbouring glyphs
pub const DEFAULT_SQUEEZE_FACTOR: f64 = 0.75;

/// Luminance multiplier used to build the glyph paste mask
pub const DEFAULT_EDGE_GAIN: f64 = 1.97;

/// Ink channel range (inclusive)
pub const INK_CHANNEL_RANGE: (u8, u8) = (0, 200);

/// Background channel range (inclusive)
pub const BACKGROUND_CHANNEL_RANGE: (u8, u8) = (238, 255);

/// Bezier sampling: 21 samples of t over [0, 1]
pub const BEZIER_SAMPLES: usize = 21;

/// Decorative curve control points
pub const DEFAULT_CURVE_POINTS: usize = 6;

/// Decorative curve stroke width
pub const DEFAULT_CURVE_WIDTH: u32 = 4;

/// Noise speckle count
pub const DEFAULT_NOISE_COUNT: usize = 50;

/// Noise speckle length and stroke width
pub const DEFAULT_NOISE_LEVEL: u32 = 2;

/// Default sigma for gaussian smoothing
pub const DEFAULT_SMOOTH_SIGMA: f32 = 0.65;

/// Warp corner displacement limits, as fractions of the glyph size
pub mod warp {
    pub const DX_FACTOR: f64 = 0.27;
    pub const DY_FACTOR: f64 = 0.21;
}

/// Offset jitter limits, as fractions of the glyph size
pub mod offset {
    pub const DX_FACTOR: f64 = 0.1;
    pub const DY_FACTOR: f64 = 0.2;
}

/// Maximum glyph rotation in degrees
pub const DEFAULT_MAX_ANGLE: f32 = 25.0;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/scrawl.toml";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "SCRAWL";
