//! Glyph composition: rasterize, distort, and paste one character at a time.

use image::{GrayImage, Rgb, RgbImage, imageops};
use rand::Rng;
use rand::seq::IndexedRandom;

use scrawl_common::{Result, ScrawlError};

use super::distort::Distortion;
use super::font::{Face, GlyphRasterizer};

/// A distorted character and the mask used to blend it
#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    pub image: RgbImage,
    pub mask: GrayImage,
}

impl GlyphBitmap {
    /// Build the paste mask from luminance scaled by `edge_gain`.
    ///
    /// A gain above 1 saturates the anti-aliased rim so edges blend in
    /// brighter than a plain luminance mask would allow.
    pub fn new(image: RgbImage, edge_gain: f64) -> Self {
        let mut mask = imageops::grayscale(&image);
        for p in mask.pixels_mut() {
            p.0[0] = (p.0[0] as f64 * edge_gain).min(255.0) as u8;
        }
        Self { image, mask }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Renders a challenge string into independently distorted glyphs
pub struct GlyphComposer<'a> {
    rasterizer: &'a dyn GlyphRasterizer,
    faces: Vec<Face>,
    distortions: &'a [Distortion],
    edge_gain: f64,
    squeeze_factor: f64,
}

impl<'a> GlyphComposer<'a> {
    /// Every loaded font is paired with every size
    pub fn new(
        rasterizer: &'a dyn GlyphRasterizer,
        font_sizes: &[f32],
        distortions: &'a [Distortion],
        edge_gain: f64,
        squeeze_factor: f64,
    ) -> Result<Self> {
        let faces: Vec<Face> = (0..rasterizer.font_count())
            .flat_map(|font| font_sizes.iter().map(move |&size| Face { font, size }))
            .collect();

        if faces.is_empty() {
            return Err(ScrawlError::InvalidInput(
                "no font/size combinations available".to_string(),
            ));
        }

        Ok(Self {
            rasterizer,
            faces,
            distortions,
            edge_gain,
            squeeze_factor,
        })
    }

    /// All (font, size) combinations glyphs are drawn from
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Rasterize `ch` with a random face, crop it, and run the distortion chain
    pub fn compose_glyph<R: Rng + ?Sized>(&self, ch: char, ink: Rgb<u8>, rng: &mut R) -> Result<GlyphBitmap> {
        let face = *self
            .faces
            .choose(rng)
            .ok_or_else(|| ScrawlError::InvalidInput("no faces".to_string()))?;

        let cell = self.rasterizer.render(ch, face, ink)?;
        let (width, height) = cell.dimensions();
        tracing::trace!(%ch, font = face.font, size = face.size, width, height, "Rasterized glyph");

        let image = self
            .distortions
            .iter()
            .fold(crop_to_content(cell), |image, step| step.apply(image, rng));

        Ok(GlyphBitmap::new(image, self.edge_gain))
    }

    /// Compose every character of `text` and paste the run, centred, onto
    /// `canvas`. The canvas keeps its size.
    pub fn draw_text<R: Rng + ?Sized>(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        ink: Rgb<u8>,
        rng: &mut R,
    ) -> Result<()> {
        if text.is_empty() {
            return Err(ScrawlError::InvalidInput("challenge text is empty".to_string()));
        }

        let glyphs = text
            .chars()
            .map(|ch| self.compose_glyph(ch, ink, rng))
            .collect::<Result<Vec<_>>>()?;

        let sizes: Vec<(u32, u32)> = glyphs.iter().map(|g| g.image.dimensions()).collect();
        let positions = layout(canvas.dimensions(), &sizes, self.squeeze_factor);

        for (glyph, (x, y)) in glyphs.iter().zip(positions) {
            paste_masked(canvas, glyph, x, y);
        }

        Ok(())
    }
}

/// Crop to the bounding box of non-black pixels; an empty cell is returned as is
pub fn crop_to_content(image: RgbImage) -> RgbImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;

    for (x, y, p) in image.enumerate_pixels() {
        if p.0 == [0, 0, 0] {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => {
            imageops::crop_imm(&image, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
        }
        None => image,
    }
}

/// Horizontal advance of a glyph that is followed by another
fn squeezed(width: u32, squeeze_factor: f64) -> i64 {
    (width as f64 * squeeze_factor).floor() as i64
}

/// Top-left paste position of each glyph.
///
/// Every glyph but the last advances by its squeezed width, the last by its
/// full width, and the whole run is centred horizontally. Each glyph is
/// centred vertically on its own; positions may be negative.
pub fn layout(canvas: (u32, u32), glyphs: &[(u32, u32)], squeeze_factor: f64) -> Vec<(i64, i64)> {
    let Some((&(last_width, _), rest)) = glyphs.split_last() else {
        return Vec::new();
    };

    let run: i64 = rest.iter().map(|&(w, _)| squeezed(w, squeeze_factor)).sum();
    let mut x = (canvas.0 as i64 - run - last_width as i64) / 2;

    glyphs
        .iter()
        .map(|&(w, h)| {
            let position = (x, (canvas.1 as i64 - h as i64) / 2);
            x += squeezed(w, squeeze_factor);
            position
        })
        .collect()
}

/// Blend `glyph` into `canvas` at `(x, y)` through its mask, clipping at the
/// canvas edges. Pixels under a zero mask are left untouched.
pub fn paste_masked(canvas: &mut RgbImage, glyph: &GlyphBitmap, x: i64, y: i64) {
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);

    for (gx, gy, mask) in glyph.mask.enumerate_pixels() {
        let alpha = mask.0[0] as u32;
        if alpha == 0 {
            continue;
        }

        let (tx, ty) = (x + gx as i64, y + gy as i64);
        if tx < 0 || ty < 0 || tx >= cw || ty >= ch {
            continue;
        }

        let src = glyph.image.get_pixel(gx, gy);
        let dst = canvas.get_pixel_mut(tx as u32, ty as u32);
        for (d, s) in dst.0.iter_mut().zip(src.0) {
            *d = ((s as u32 * alpha + *d as u32 * (255 - alpha) + 127) / 255) as u8;
        }
    }
}
