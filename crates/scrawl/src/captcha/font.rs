//! Glyph rasterization.
//!
//! The pipeline only needs two things from a font backend: the cell size of
//! a character and an RGB rendering of it on black. `GlyphRasterizer` is that
//! contract; `TrueTypeRasterizer` implements it with `rusttype`.

use std::path::Path;

use image::{Rgb, RgbImage};
use rusttype::{Font, Scale, point};

use scrawl_common::{Result, ScrawlError};

/// A loaded font at a pixel size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Index into the rasterizer's font list
    pub font: usize,
    /// Pixel height
    pub size: f32,
}

/// Font backend used by the glyph composer
pub trait GlyphRasterizer: Send + Sync {
    /// Number of loaded fonts
    fn font_count(&self) -> usize;

    /// Cell size `(width, height)` of `ch`, at least 1x1
    fn measure(&self, ch: char, face: Face) -> Result<(u32, u32)>;

    /// Render `ch` in `color` on a black cell of `measure` size
    fn render(&self, ch: char, face: Face, color: Rgb<u8>) -> Result<RgbImage>;
}

/// `rusttype` backed rasterizer holding every configured font in memory
pub struct TrueTypeRasterizer {
    fonts: Vec<Font<'static>>,
}

impl TrueTypeRasterizer {
    /// Load every font file up front; any failure aborts initialization
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        if paths.is_empty() {
            return Err(ScrawlError::InvalidInput("no font files configured".to_string()));
        }

        let fonts = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                let data = std::fs::read(path).map_err(|e| {
                    ScrawlError::ResourceUnavailable(format!("{}: {e}", path.display()))
                })?;
                let font = Font::try_from_vec(data).ok_or_else(|| {
                    ScrawlError::ResourceUnavailable(format!(
                        "{}: not a TrueType/OpenType font",
                        path.display()
                    ))
                })?;

                tracing::debug!(path = %path.display(), glyphs = font.glyph_count(), "Loaded font");
                Ok(font)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { fonts })
    }

    fn font(&self, face: Face) -> Result<&Font<'static>> {
        self.fonts.get(face.font).ok_or_else(|| {
            ScrawlError::InvalidInput(format!(
                "font index {} out of range ({} loaded)",
                face.font,
                self.fonts.len()
            ))
        })
    }
}

impl GlyphRasterizer for TrueTypeRasterizer {
    fn font_count(&self) -> usize {
        self.fonts.len()
    }

    fn measure(&self, ch: char, face: Face) -> Result<(u32, u32)> {
        let font = self.font(face)?;
        let scale = Scale::uniform(face.size);
        let v_metrics = font.v_metrics(scale);

        let glyph = font.glyph(ch).scaled(scale);
        let advance = glyph.h_metrics().advance_width;
        let overhang = glyph
            .positioned(point(0.0, v_metrics.ascent))
            .pixel_bounding_box()
            .map_or(0, |bb| bb.max.x.max(0));

        let width = (advance.ceil() as u32).max(overhang as u32).max(1);
        let height = ((v_metrics.ascent - v_metrics.descent).ceil() as u32).max(1);
        Ok((width, height))
    }

    fn render(&self, ch: char, face: Face, color: Rgb<u8>) -> Result<RgbImage> {
        let (width, height) = self.measure(ch, face)?;
        let font = self.font(face)?;
        let scale = Scale::uniform(face.size);
        let ascent = font.v_metrics(scale).ascent;

        let mut cell = RgbImage::new(width, height);
        let glyph = font.glyph(ch).scaled(scale).positioned(point(0.0, ascent));

        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|x, y, coverage| {
                let px = bb.min.x + x as i32;
                let py = bb.min.y + y as i32;
                if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                    return;
                }
                let shade = Rgb(color.0.map(|c| (c as f32 * coverage).round() as u8));
                cell.put_pixel(px as u32, py as u32, shade);
            });
        }

        Ok(cell)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic stand-in for a real font: every character is a solid
    /// block with a half-intensity rim, surrounded by a 2px black margin.
    /// Font 1 draws the block hollow.
    pub(crate) struct BlockRasterizer;

    impl GlyphRasterizer for BlockRasterizer {
        fn font_count(&self) -> usize {
            2
        }

        fn measure(&self, _ch: char, face: Face) -> Result<(u32, u32)> {
            if face.font >= self.font_count() {
                return Err(ScrawlError::InvalidInput("no such font".to_string()));
            }
            Ok((((face.size * 0.6) as u32).max(8), (face.size as u32).max(8)))
        }

        fn render(&self, ch: char, face: Face, color: Rgb<u8>) -> Result<RgbImage> {
            let (width, height) = self.measure(ch, face)?;
            let rim = Rgb(color.0.map(|c| c / 2));
            let hollow = face.font == 1;

            Ok(RgbImage::from_fn(width, height, |x, y| {
                let depth = x.min(y).min(width - 1 - x).min(height - 1 - y);
                match depth {
                    0 | 1 => Rgb([0, 0, 0]),
                    2 => rim,
                    d if hollow && d > 5 => Rgb([0, 0, 0]),
                    _ => color,
                }
            }))
        }
    }
}
