//! Core types shared across Scrawl components.

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::ScrawlError;

/// Encoded image formats a CAPTCHA can be delivered in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    Bmp,
    Gif,
}

impl OutputFormat {
    /// File extension (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
        }
    }

    /// MIME type used in data URIs
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ScrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            "gif" => Ok(Self::Gif),
            other => Err(ScrawlError::EncodingFailure(format!(
                "unsupported output format '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
        })
    }
}

/// A finished CAPTCHA handed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaResult {
    /// Random 24-character identifier
    pub id: String,

    /// The challenge plaintext (server-side only)
    pub text: String,

    /// Encoding of `image`
    pub format: OutputFormat,

    /// Encoded image bytes
    #[serde(skip)]
    pub image: Vec<u8>,
}

impl CaptchaResult {
    /// `data:<mime>;base64,<payload>` form of the image
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime(),
            STANDARD.encode(&self.image)
        )
    }

    /// Suggested file name, `<id>.<ext>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.format.extension())
    }
}
