//! CAPTCHA session: validated configuration plus its collaborators.
//!
//! A session is immutable after construction and safe to share between
//! threads. Every `generate` call draws fresh text, palette and distortions
//! from a request-local RNG.

use std::sync::Arc;

use image::RgbImage;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use scrawl_common::constants::{ID_ALPHABET, ID_LENGTH};
use scrawl_common::{CaptchaResult, Result, ScrawlError};

use super::bezier::BezierCache;
use super::encode::{CanvasEncoder, ImageEncoder};
use super::font::{GlyphRasterizer, TrueTypeRasterizer};
use super::scene::{Palette, SceneComposer};
use crate::config::CaptchaConfig;

/// CAPTCHA generator service
#[derive(Clone)]
pub struct CaptchaSession {
    config: Arc<CaptchaConfig>,
    alphabet: Arc<[char]>,
    rasterizer: Arc<dyn GlyphRasterizer>,
    encoder: Arc<dyn CanvasEncoder>,
    bezier: Arc<BezierCache>,
}

impl CaptchaSession {
    /// Validate `config` and load its font files
    pub fn initialize(config: CaptchaConfig) -> Result<Self> {
        config.validate()?;
        let rasterizer = TrueTypeRasterizer::from_files(&config.fonts)?;

        tracing::info!(
            fonts = config.fonts.len(),
            sizes = ?config.font_sizes,
            width = config.width,
            height = config.height,
            "CAPTCHA session initialized"
        );

        Self::with_collaborators(config, Arc::new(rasterizer), Arc::new(ImageEncoder))
    }

    /// Build a session around caller-supplied rasterizer and encoder
    pub fn with_collaborators(
        config: CaptchaConfig,
        rasterizer: Arc<dyn GlyphRasterizer>,
        encoder: Arc<dyn CanvasEncoder>,
    ) -> Result<Self> {
        config.validate()?;
        if rasterizer.font_count() == 0 {
            return Err(ScrawlError::ResourceUnavailable("rasterizer has no fonts".to_string()));
        }

        let alphabet: Arc<[char]> = config.alphabet.chars().collect();

        Ok(Self {
            config: Arc::new(config),
            alphabet,
            rasterizer,
            encoder,
            bezier: BezierCache::shared(),
        })
    }

    pub fn config(&self) -> &CaptchaConfig {
        &self.config
    }

    /// Generate one CAPTCHA, seeded from the config when it carries a seed
    pub fn generate(&self) -> Result<CaptchaResult> {
        match self.config.seed {
            Some(seed) => self.generate_with(&mut StdRng::seed_from_u64(seed)),
            None => self.generate_with(&mut rand::rng()),
        }
    }

    /// Generate one CAPTCHA with the caller's RNG
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CaptchaResult> {
        let text = self.challenge_text(rng);
        let canvas = self.render(&text, rng)?;
        let image = self.encoder.encode(&canvas, self.config.format)?;
        let id = generate_id(rng);

        tracing::debug!(
            id = %id,
            format = %self.config.format,
            bytes = image.len(),
            "Generated CAPTCHA"
        );

        Ok(CaptchaResult {
            id,
            text,
            format: self.config.format,
            image,
        })
    }

    /// Draw `text` onto a fresh canvas without encoding it
    pub fn render<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Result<RgbImage> {
        let scene = SceneComposer::new(&self.config, self.rasterizer.as_ref(), &self.bezier)?;
        let palette = Palette::pick(&self.config, rng);
        scene.compose(text, palette, rng)
    }

    /// Fixed text from the config, or `length` characters drawn from the
    /// alphabet with replacement
    pub fn challenge_text<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        if let Some(text) = &self.config.text {
            return text.clone();
        }

        (0..self.config.length)
            .filter_map(|_| self.alphabet.choose(rng).copied())
            .collect()
    }
}

/// Random identifier, sampled without replacement from the id alphabet
fn generate_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let alphabet: Vec<char> = ID_ALPHABET.chars().collect();
    alphabet.choose_multiple(rng, ID_LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::font::testing::BlockRasterizer;
    use scrawl_common::OutputFormat;
    use std::collections::HashSet;

    fn session(config: CaptchaConfig) -> CaptchaSession {
        CaptchaSession::with_collaborators(config, Arc::new(BlockRasterizer), Arc::new(ImageEncoder))
            .unwrap()
    }

    #[test]
    fn test_end_to_end_fixed_text() {
        let session = session(CaptchaConfig {
            text: Some("AB3K".to_string()),
            ..Default::default()
        });

        let mut rng = StdRng::seed_from_u64(1);
        let canvas = session.render("AB3K", &mut rng).unwrap();
        assert_eq!(canvas.dimensions(), (200, 75));

        let result = session.generate().unwrap();
        assert_eq!(result.text, "AB3K");
        assert_eq!(result.format, OutputFormat::Jpeg);
        assert!(!result.image.is_empty());

        let decoded = image::load_from_memory(&result.image).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 75));
    }

    #[test]
    fn test_identifier_shape() {
        let session = session(CaptchaConfig::default());
        let result = session.generate().unwrap();

        assert_eq!(result.id.chars().count(), ID_LENGTH);
        assert!(result.id.chars().all(|c| ID_ALPHABET.contains(c)));
        let unique: HashSet<char> = result.id.chars().collect();
        assert_eq!(unique.len(), ID_LENGTH);
    }

    #[test]
    fn test_random_text_from_alphabet() {
        let session = session(CaptchaConfig {
            alphabet: "XYZ".to_string(),
            length: 6,
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(4);

        let text = session.challenge_text(&mut rng);
        assert_eq!(text.len(), 6);
        assert!(text.chars().all(|c| "XYZ".contains(c)));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let session = session(CaptchaConfig {
            text: Some("AB3K".to_string()),
            seed: Some(2024),
            format: OutputFormat::Png,
            ..Default::default()
        });

        let first = session.generate().unwrap();
        let second = session.generate().unwrap();
        assert_eq!(first.image, second.image);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_unseeded_generation_differs() {
        let session = session(CaptchaConfig {
            text: Some("AB3K".to_string()),
            format: OutputFormat::Png,
            ..Default::default()
        });

        let first = session.generate().unwrap();
        let second = session.generate().unwrap();
        assert_ne!(first.image, second.image);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = CaptchaSession::with_collaborators(
            CaptchaConfig {
                width: 0,
                ..Default::default()
            },
            Arc::new(BlockRasterizer),
            Arc::new(ImageEncoder),
        )
        .err();
        assert!(matches!(err, Some(ScrawlError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_font_surfaces_immediately() {
        let err = CaptchaSession::initialize(CaptchaConfig {
            fonts: vec!["/nonexistent/scrawl/font.ttf".into()],
            ..Default::default()
        })
        .err();
        assert!(matches!(err, Some(ScrawlError::ResourceUnavailable(_))));
    }

    #[test]
    fn test_concurrent_generation() {
        let session = session(CaptchaConfig::default());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = session.clone();
                std::thread::spawn(move || session.generate().unwrap())
            })
            .collect();

        let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap().id).collect();
        assert_eq!(ids.len(), 4);
    }
}
