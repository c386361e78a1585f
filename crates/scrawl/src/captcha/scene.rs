//! Full-canvas pipeline: background, text, curve, noise, smoothing.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::filter::{filter, gaussian_blur_f32};
use imageproc::kernel::Kernel;
use imageproc::rect::Rect;
use rand::Rng;
use serde::{Deserialize, Serialize};

use scrawl_common::constants::{BACKGROUND_CHANNEL_RANGE, DEFAULT_SMOOTH_SIGMA, INK_CHANNEL_RANGE};
use scrawl_common::{Result, ScrawlError};

use super::bezier::BezierCache;
use super::font::GlyphRasterizer;
use super::glyph::GlyphComposer;
use super::uniform;
use crate::config::CaptchaConfig;

/// 3x3 smoothing kernel, weights summing to `SMOOTH_SCALE`
const SMOOTH_KERNEL: [i32; 9] = [1, 1, 1, 1, 5, 1, 1, 1, 1];
const SMOOTH_SCALE: i32 = 13;

/// Final softening pass over the whole canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Smoothing {
    /// Fixed `[1 1 1; 1 5 1; 1 1 1] / 13` kernel; the outer ring is copied
    #[default]
    Kernel,
    /// Gaussian blur
    Gaussian {
        #[serde(default = "default_sigma")]
        sigma: f32,
    },
    /// Leave the canvas untouched
    Off,
}

fn default_sigma() -> f32 { DEFAULT_SMOOTH_SIGMA }

impl Smoothing {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Gaussian { sigma } if !(sigma.is_finite() && sigma > 0.0) => Err(
                ScrawlError::InvalidInput(format!("gaussian sigma must be positive: {sigma}")),
            ),
            _ => Ok(()),
        }
    }

    pub fn apply(&self, canvas: RgbImage) -> RgbImage {
        match *self {
            Self::Kernel => smooth_kernel(&canvas),
            Self::Gaussian { sigma } => gaussian_blur_f32(&canvas, sigma),
            Self::Off => canvas,
        }
    }
}

fn smooth_kernel(canvas: &RgbImage) -> RgbImage {
    let (width, height) = canvas.dimensions();
    if width < 3 || height < 3 {
        return canvas.clone();
    }

    let mut out: RgbImage = filter(canvas, Kernel::new(&SMOOTH_KERNEL, 3, 3), |acc: i32| {
        ((acc + SMOOTH_SCALE / 2) / SMOOTH_SCALE).clamp(0, 255) as u8
    });

    for (x, y, p) in canvas.enumerate_pixels() {
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            out.put_pixel(x, y, *p);
        }
    }
    out
}

/// Colours for one generation. The ink is shared by glyphs, curve and noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub ink: Rgb<u8>,
    pub background: Rgb<u8>,
}

impl Palette {
    /// Fixed colours from `config` where set, random ones otherwise
    pub fn pick<R: Rng + ?Sized>(config: &CaptchaConfig, rng: &mut R) -> Self {
        let ink = match config.color {
            Some(rgb) => Rgb(rgb),
            None => random_color(rng, INK_CHANNEL_RANGE),
        };
        let background = match config.background {
            Some(rgb) => Rgb(rgb),
            None => random_color(rng, BACKGROUND_CHANNEL_RANGE),
        };
        Self { ink, background }
    }
}

fn random_color<R: Rng + ?Sized>(rng: &mut R, (low, high): (u8, u8)) -> Rgb<u8> {
    Rgb([
        rng.random_range(low..=high),
        rng.random_range(low..=high),
        rng.random_range(low..=high),
    ])
}

/// Builds the finished canvas for one challenge
pub struct SceneComposer<'a> {
    config: &'a CaptchaConfig,
    glyphs: GlyphComposer<'a>,
    bezier: &'a BezierCache,
}

impl<'a> SceneComposer<'a> {
    pub fn new(
        config: &'a CaptchaConfig,
        rasterizer: &'a dyn GlyphRasterizer,
        bezier: &'a BezierCache,
    ) -> Result<Self> {
        let glyphs = GlyphComposer::new(
            rasterizer,
            &config.font_sizes,
            &config.distortions,
            config.edge_gain,
            config.squeeze_factor,
        )?;

        Ok(Self { config, glyphs, bezier })
    }

    /// Run every stage in order. The result is exactly `width x height`.
    pub fn compose<R: Rng + ?Sized>(&self, text: &str, palette: Palette, rng: &mut R) -> Result<RgbImage> {
        let mut canvas = self.background(palette.background);
        self.draw_text(&mut canvas, text, palette.ink, rng)?;
        self.draw_curve(&mut canvas, palette.ink, rng)?;
        self.draw_noise(&mut canvas, palette.ink, rng);
        Ok(self.smooth(canvas))
    }

    /// Canvas filled with the background colour
    pub fn background(&self, color: Rgb<u8>) -> RgbImage {
        RgbImage::from_pixel(self.config.width, self.config.height, color)
    }

    /// Distorted glyph run, centred on the canvas
    pub fn draw_text<R: Rng + ?Sized>(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        ink: Rgb<u8>,
        rng: &mut R,
    ) -> Result<()> {
        self.glyphs.draw_text(canvas, text, ink, rng)
    }

    /// Bezier curve through evenly spaced control points at random heights
    pub fn draw_curve<R: Rng + ?Sized>(&self, canvas: &mut RgbImage, ink: Rgb<u8>, rng: &mut R) -> Result<()> {
        let (width, height) = canvas.dimensions();
        let count = self.config.curve.points;
        let spacing = width as f64 / (count + 1) as f64;

        let control: Vec<(f64, f64)> = (1..=count)
            .map(|i| (spacing * i as f64, rng.random_range(0..=height) as f64))
            .collect();

        let path = self.bezier.evaluate(&control)?;
        stroke_polyline(canvas, &path, ink, self.config.curve.width);
        Ok(())
    }

    /// Short horizontal speckles inside a 10% margin
    pub fn draw_noise<R: Rng + ?Sized>(&self, canvas: &mut RgbImage, ink: Rgb<u8>, rng: &mut R) {
        let (width, height) = (canvas.width() as f64, canvas.height() as f64);
        let (mx, my) = (width / 10.0, height / 10.0);
        let level = self.config.noise.level;

        for _ in 0..self.config.noise.count {
            let x = uniform(rng, mx, width - mx) as i32;
            let y = uniform(rng, my, height - my) as i32;
            let speckle = Rect::at(x, y - (level / 2) as i32).of_size(level + 1, level);
            draw_filled_rect_mut(canvas, speckle, ink);
        }
    }

    /// Final softening pass
    pub fn smooth(&self, canvas: RgbImage) -> RgbImage {
        self.config.smoothing.apply(canvas)
    }
}

/// Stroke connected segments through `points` with round joins. The stroke
/// is exactly `width` pixels across; even widths stamp a 2x2 cluster of
/// circles with radius `(width - 2) / 2`.
fn stroke_polyline(canvas: &mut RgbImage, points: &[(f64, f64)], color: Rgb<u8>, width: u32) {
    if width <= 1 {
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            draw_line_segment_mut(canvas, (a.0 as f32, a.1 as f32), (b.0 as f32, b.1 as f32), color);
        }
        return;
    }

    let radius = ((width - 1) / 2) as i32;
    let spread = if width % 2 == 0 { 1 } else { 0 };
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let steps = (b.0 - a.0).hypot(b.1 - a.1).ceil().max(1.0) as usize;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let x = (a.0 + (b.0 - a.0) * t).round() as i32;
            let y = (a.1 + (b.1 - a.1) * t).round() as i32;
            for (ox, oy) in [(0, 0), (spread, 0), (0, spread), (spread, spread)] {
                draw_filled_circle_mut(canvas, (x + ox, y + oy), radius, color);
            }
        }
    }
}
