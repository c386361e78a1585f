//! Configuration management for Scrawl.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use scrawl_common::constants::{self, ENV_PREFIX};
use scrawl_common::{OutputFormat, Result, ScrawlError};

use crate::captcha::{Distortion, Smoothing};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// CAPTCHA rendering configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// Where and how finished images are written
    #[serde(default)]
    pub output: OutputConfig,
}

/// CAPTCHA-specific configuration.
///
/// Read-only once a session has been initialized from it.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Canvas width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Canvas height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Fixed ink colour for glyphs, curve and noise (random if unset)
    #[serde(default)]
    pub color: Option<[u8; 3]>,

    /// Fixed background colour (random light colour if unset)
    #[serde(default)]
    pub background: Option<[u8; 3]>,

    /// Fixed challenge text (random if unset)
    #[serde(default)]
    pub text: Option<String>,

    /// Characters random challenges are drawn from
    #[serde(default = "default_alphabet")]
    pub alphabet: String,

    /// Random challenge length
    #[serde(default = "default_length")]
    pub length: usize,

    /// Font files, loaded once at session start
    #[serde(default = "default_fonts")]
    pub fonts: Vec<PathBuf>,

    /// Glyph pixel sizes, combined with every font
    #[serde(default = "default_font_sizes")]
    pub font_sizes: Vec<f32>,

    /// Advance ratio between neighbouring glyphs (< 1 overlaps them)
    #[serde(default = "default_squeeze_factor")]
    pub squeeze_factor: f64,

    /// Luminance multiplier for the glyph paste mask
    #[serde(default = "default_edge_gain")]
    pub edge_gain: f64,

    /// Per-glyph distortion chain, applied in order
    #[serde(default = "Distortion::default_chain")]
    pub distortions: Vec<Distortion>,

    /// Decorative curve
    #[serde(default)]
    pub curve: CurveConfig,

    /// Speckle noise
    #[serde(default)]
    pub noise: NoiseConfig,

    /// Final smoothing pass
    #[serde(default)]
    pub smoothing: Smoothing,

    /// Encoded image format
    #[serde(default)]
    pub format: OutputFormat,

    /// Fixed RNG seed for reproducible output
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            color: None,
            background: None,
            text: None,
            alphabet: default_alphabet(),
            length: default_length(),
            fonts: default_fonts(),
            font_sizes: default_font_sizes(),
            squeeze_factor: default_squeeze_factor(),
            edge_gain: default_edge_gain(),
            distortions: Distortion::default_chain(),
            curve: CurveConfig::default(),
            noise: NoiseConfig::default(),
            smoothing: Smoothing::default(),
            format: OutputFormat::default(),
            seed: None,
        }
    }
}

/// Decorative Bezier curve configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CurveConfig {
    /// Control points, evenly spaced across the width
    #[serde(default = "default_curve_points")]
    pub points: usize,

    /// Stroke width in pixels
    #[serde(default = "default_curve_width")]
    pub width: u32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            points: default_curve_points(),
            width: default_curve_width(),
        }
    }
}

/// Speckle noise configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NoiseConfig {
    /// Number of speckles (0 disables noise)
    #[serde(default = "default_noise_count")]
    pub count: usize,

    /// Speckle length and stroke width
    #[serde(default = "default_noise_level")]
    pub level: u32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            count: default_noise_count(),
            level: default_noise_level(),
        }
    }
}

/// Output handling for the command line front end
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory to write `<id>.<ext>` files into
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Print base64 data URIs instead of `id<TAB>text`
    #[serde(default)]
    pub data_uri: bool,
}

// Default value functions
fn default_width() -> u32 { constants::DEFAULT_WIDTH }
fn default_height() -> u32 { constants::DEFAULT_HEIGHT }
fn default_alphabet() -> String { constants::DEFAULT_ALPHABET.to_string() }
fn default_length() -> usize { constants::DEFAULT_TEXT_LENGTH }
fn default_fonts() -> Vec<PathBuf> { vec![PathBuf::from(constants::DEFAULT_FONT_PATH)] }
fn default_font_sizes() -> Vec<f32> { constants::DEFAULT_FONT_SIZES.to_vec() }
fn default_squeeze_factor() -> f64 { constants::DEFAULT_SQUEEZE_FACTOR }
fn default_edge_gain() -> f64 { constants::DEFAULT_EDGE_GAIN }
fn default_curve_points() -> usize { constants::DEFAULT_CURVE_POINTS }
fn default_curve_width() -> u32 { constants::DEFAULT_CURVE_WIDTH }
fn default_noise_count() -> usize { constants::DEFAULT_NOISE_COUNT }
fn default_noise_level() -> u32 { constants::DEFAULT_NOISE_LEVEL }

fn invalid(msg: impl Into<String>) -> ScrawlError {
    ScrawlError::InvalidInput(msg.into())
}

impl CaptchaConfig {
    /// Check every parameter the pipeline divides by or samples from
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if let Some(text) = &self.text {
            if text.is_empty() {
                return Err(invalid("challenge text is empty"));
            }
        } else if self.alphabet.is_empty() || self.length == 0 {
            return Err(invalid("random challenges need a non-empty alphabet and length"));
        }
        if self.fonts.is_empty() {
            return Err(invalid("no font files configured"));
        }
        if self.font_sizes.is_empty() || !self.font_sizes.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(invalid(format!("font sizes must be positive: {:?}", self.font_sizes)));
        }
        if !(self.squeeze_factor.is_finite() && self.squeeze_factor > 0.0) {
            return Err(invalid(format!("squeeze factor must be positive: {}", self.squeeze_factor)));
        }
        if !(self.edge_gain.is_finite() && self.edge_gain > 0.0) {
            return Err(invalid(format!("edge gain must be positive: {}", self.edge_gain)));
        }
        for step in &self.distortions {
            step.validate()?;
        }
        if self.curve.points < 2 || self.curve.width == 0 {
            return Err(invalid(format!(
                "curve needs >= 2 points and a non-zero width, got {:?}",
                self.curve
            )));
        }
        if self.noise.level == 0 {
            return Err(invalid("noise level must be at least 1"));
        }
        self.smoothing.validate()?;

        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from file (if present) and `SCRAWL_*` environment
    /// variables. CLI overrides are applied by the caller.
    pub fn load(config_path: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ScrawlError::Config(format!("failed to load config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| ScrawlError::Config(format!("failed to parse config: {e}")))
    }

    /// Parse configuration from an in-memory TOML document
    pub fn from_toml(source: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| ScrawlError::Config(format!("failed to parse config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = CaptchaConfig::default();
        assert_eq!((config.width, config.height), (200, 75));
        assert_eq!(config.distortions, Distortion::default_chain());
        assert_eq!(config.format, OutputFormat::Jpeg);
        assert_eq!(config.smoothing, Smoothing::Kernel);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let cases: Vec<Box<dyn Fn(&mut CaptchaConfig)>> = vec![
            Box::new(|c| c.width = 0),
            Box::new(|c| c.height = 0),
            Box::new(|c| c.text = Some(String::new())),
            Box::new(|c| c.alphabet.clear()),
            Box::new(|c| c.length = 0),
            Box::new(|c| c.fonts.clear()),
            Box::new(|c| c.font_sizes = vec![70.0, -1.0]),
            Box::new(|c| c.squeeze_factor = 0.0),
            Box::new(|c| c.curve.points = 1),
            Box::new(|c| c.noise.level = 0),
            Box::new(|c| c.smoothing = Smoothing::Gaussian { sigma: f32::NAN }),
        ];

        for mutate in cases {
            let mut config = CaptchaConfig::default();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(ScrawlError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_fixed_text_ignores_alphabet() {
        let config = CaptchaConfig {
            text: Some("AB3K".to_string()),
            alphabet: String::new(),
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_toml_sections() {
        let config = AppConfig::from_toml(
            r#"
            [captcha]
            width = 320
            color = [10, 20, 30]
            font_sizes = [40, 48]
            format = "png"
            distortions = [
                { kind = "rotate", max_angle = 10.0 },
                { kind = "warp" },
            ]

            [captcha.noise]
            count = 0

            [captcha.smoothing]
            kind = "gaussian"

            [output]
            data_uri = true
            "#,
        )
        .unwrap();

        let captcha = &config.captcha;
        assert_eq!(captcha.width, 320);
        assert_eq!(captcha.height, 75);
        assert_eq!(captcha.color, Some([10, 20, 30]));
        assert_eq!(captcha.font_sizes, vec![40.0, 48.0]);
        assert_eq!(captcha.format, OutputFormat::Png);
        assert_eq!(captcha.noise.count, 0);
        assert_eq!(captcha.noise.level, 2);
        assert_eq!(captcha.smoothing, Smoothing::Gaussian { sigma: 0.65 });
        assert_eq!(
            captcha.distortions,
            vec![Distortion::Rotate { max_angle: 10.0 }, Distortion::warp()]
        );
        assert!(config.output.data_uri);
    }

    #[test]
    fn test_unknown_distortion_rejected() {
        let err = AppConfig::from_toml(
            r#"
            [captcha]
            distortions = [{ kind = "shear" }]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ScrawlError::Config(_)));
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[captcha]\nheight = 90\ntext = \"XY7Z\"").unwrap();

        let config = AppConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.captcha.height, 90);
        assert_eq!(config.captcha.text.as_deref(), Some("XY7Z"));

        let config = AppConfig::load("/nonexistent/scrawl.toml").unwrap();
        assert_eq!(config.captcha.width, 200);
    }
}
