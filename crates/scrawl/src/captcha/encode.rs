//! Canvas encoding.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};

use scrawl_common::{OutputFormat, Result, ScrawlError};

/// Turns a finished canvas into file bytes
pub trait CanvasEncoder: Send + Sync {
    fn encode(&self, canvas: &RgbImage, format: OutputFormat) -> Result<Vec<u8>>;
}

/// Encoder backed by the `image` crate's codecs
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageEncoder;

impl CanvasEncoder for ImageEncoder {
    fn encode(&self, canvas: &RgbImage, format: OutputFormat) -> Result<Vec<u8>> {
        let target = match format {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Gif => ImageFormat::Gif,
        };

        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), target)
            .map_err(|e| ScrawlError::EncodingFailure(format!("{format} encode failed: {e}")))?;

        Ok(bytes)
    }
}
