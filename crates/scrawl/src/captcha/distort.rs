//! Per-glyph geometric distortions.
//!
//! Every transform consumes a canvas and returns a replacement that is at
//! least as large in both dimensions. None of them keep state between
//! calls; all randomness comes from the caller's RNG.

use image::{Rgb, RgbImage, imageops};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center, warp_into_with};
use rand::Rng;
use serde::{Deserialize, Serialize};

use scrawl_common::constants::{self, DEFAULT_MAX_ANGLE};
use scrawl_common::{Result, ScrawlError};

use super::uniform;

const BLANK: Rgb<u8> = Rgb([0, 0, 0]);

/// One step of the glyph distortion chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Distortion {
    /// Quad resample with randomly displaced corners
    Warp {
        #[serde(default = "default_warp_dx")]
        dx_factor: f64,
        #[serde(default = "default_warp_dy")]
        dy_factor: f64,
    },
    /// Rotation by up to `max_angle` degrees either way
    Rotate {
        #[serde(default = "default_max_angle")]
        max_angle: f32,
    },
    /// Translation jitter inside a grown canvas
    Offset {
        #[serde(default = "default_offset_dx")]
        dx_factor: f64,
        #[serde(default = "default_offset_dy")]
        dy_factor: f64,
    },
}

fn default_warp_dx() -> f64 { constants::warp::DX_FACTOR }
fn default_warp_dy() -> f64 { constants::warp::DY_FACTOR }
fn default_max_angle() -> f32 { DEFAULT_MAX_ANGLE }
fn default_offset_dx() -> f64 { constants::offset::DX_FACTOR }
fn default_offset_dy() -> f64 { constants::offset::DY_FACTOR }

impl Distortion {
    pub fn warp() -> Self {
        Self::Warp {
            dx_factor: default_warp_dx(),
            dy_factor: default_warp_dy(),
        }
    }

    pub fn rotate() -> Self {
        Self::Rotate {
            max_angle: default_max_angle(),
        }
    }

    pub fn offset() -> Self {
        Self::Offset {
            dx_factor: default_offset_dx(),
            dy_factor: default_offset_dy(),
        }
    }

    /// Warp, then rotate, then offset
    pub fn default_chain() -> Vec<Self> {
        vec![Self::warp(), Self::rotate(), Self::offset()]
    }

    /// Run this step over `image`
    pub fn apply<R: Rng + ?Sized>(&self, image: RgbImage, rng: &mut R) -> RgbImage {
        match *self {
            Self::Warp { dx_factor, dy_factor } => warp(&image, dx_factor, dy_factor, rng),
            Self::Rotate { max_angle } => rotate(&image, max_angle, rng),
            Self::Offset { dx_factor, dy_factor } => offset(&image, dx_factor, dy_factor, rng),
        }
    }

    /// Reject parameters that could fold or invert the output
    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            Self::Warp { dx_factor, dy_factor } | Self::Offset { dx_factor, dy_factor } => {
                (0.0..=0.5).contains(&dx_factor) && (0.0..=0.5).contains(&dy_factor)
            }
            Self::Rotate { max_angle } => (0.0..=180.0).contains(&max_angle),
        };

        if ok {
            Ok(())
        } else {
            Err(ScrawlError::InvalidInput(format!(
                "distortion parameters out of range: {self:?}"
            )))
        }
    }
}

/// Bilinear quad: maps the output rectangle onto four source corners
#[derive(Clone, Copy)]
struct Quad {
    origin: (f32, f32),
    along_x: (f32, f32),
    along_y: (f32, f32),
    twist: (f32, f32),
}

impl Quad {
    /// Corners are upper-left, lower-left, lower-right, upper-right in
    /// source coordinates; `size` is the output rectangle.
    fn new(corners: [(f32, f32); 4], size: (u32, u32)) -> Self {
        let [ul, ll, lr, ur] = corners;
        let (w, h) = (size.0 as f32, size.1 as f32);

        Self {
            origin: ul,
            along_x: ((ur.0 - ul.0) / w, (ur.1 - ul.1) / w),
            along_y: ((ll.0 - ul.0) / h, (ll.1 - ul.1) / h),
            twist: (
                (ul.0 - ll.0 + lr.0 - ur.0) / (w * h),
                (ul.1 - ll.1 + lr.1 - ur.1) / (w * h),
            ),
        }
    }

    fn source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.origin.0 + self.along_x.0 * x + self.along_y.0 * y + self.twist.0 * x * y,
            self.origin.1 + self.along_x.1 * x + self.along_y.1 * y + self.twist.1 * x * y,
        )
    }
}

/// Perspective-like distortion.
///
/// The source is padded by the absolute corner displacements, then a
/// quadrilateral whose corners lie on or outside the padded content is
/// resampled back to the original size, so content is squeezed but never cut.
pub fn warp<R: Rng + ?Sized>(image: &RgbImage, dx_factor: f64, dy_factor: f64, rng: &mut R) -> RgbImage {
    let (width, height) = image.dimensions();
    let dx = width as f64 * dx_factor;
    let dy = height as f64 * dy_factor;

    let x1 = uniform(rng, -dx, dx) as i64;
    let y1 = uniform(rng, -dy, dy) as i64;
    let x2 = uniform(rng, -dx, dx) as i64;
    let y2 = uniform(rng, -dy, dy) as i64;

    let grown_w = width as i64 + x1.abs() + x2.abs();
    let grown_h = height as i64 + y1.abs() + y2.abs();
    let mut grown = RgbImage::new(grown_w as u32, grown_h as u32);
    imageops::replace(&mut grown, image, x1.abs(), y1.abs());

    let (gw, gh) = (grown_w as f32, grown_h as f32);
    let (x1, y1, x2, y2) = (x1 as f32, y1 as f32, x2 as f32, y2 as f32);
    let quad = Quad::new(
        [
            (x1, y1),
            (-x1, gh - y2),
            (gw + x2, gh + y2),
            (gw - x2, -y1),
        ],
        (width, height),
    );

    let mut out = RgbImage::new(width, height);
    warp_into_with(
        &grown,
        move |x, y| quad.source(x, y),
        Interpolation::Bilinear,
        BLANK,
        &mut out,
    );
    out
}

/// Translate content by a random non-negative amount, growing the canvas
pub fn offset<R: Rng + ?Sized>(image: &RgbImage, dx_factor: f64, dy_factor: f64, rng: &mut R) -> RgbImage {
    let (width, height) = image.dimensions();
    let dx = (rng.random::<f64>() * width as f64 * dx_factor) as u32;
    let dy = (rng.random::<f64>() * height as f64 * dy_factor) as u32;

    let mut out = RgbImage::new(width + dx, height + dy);
    imageops::replace(&mut out, image, dx as i64, dy as i64);
    out
}

/// Rotate about the centre with bilinear resampling, expanding the canvas
/// to the rotated bounding box
pub fn rotate<R: Rng + ?Sized>(image: &RgbImage, max_angle: f32, rng: &mut R) -> RgbImage {
    let (width, height) = image.dimensions();
    let max_angle = max_angle as f64;
    let theta = uniform(rng, -max_angle, max_angle).to_radians();

    let (cos, sin) = (theta.cos().abs(), theta.sin().abs());
    let (w, h) = (width as f64, height as f64);
    let new_w = expanded(w * cos + h * sin, width);
    let new_h = expanded(w * sin + h * cos, height);

    let mut canvas = RgbImage::new(new_w, new_h);
    imageops::replace(
        &mut canvas,
        image,
        ((new_w - width) / 2) as i64,
        ((new_h - height) / 2) as i64,
    );

    rotate_about_center(&canvas, theta as f32, Interpolation::Bilinear, BLANK)
}

/// Rotated extent rounded up, never below `base`, and padded so the source
/// sits exactly in the middle
fn expanded(extent: f64, base: u32) -> u32 {
    let mut size = (extent.ceil() as u32).max(base);
    if (size - base) % 2 == 1 {
        size += 1;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn block(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if x > 2 && y > 2 && x < width - 3 && y < height - 3 {
                Rgb([200, 40, 90])
            } else {
                BLANK
            }
        })
    }

    fn lit(image: &RgbImage) -> usize {
        image.pixels().filter(|p| p.0 != BLANK.0).count()
    }

    #[test]
    fn test_transforms_never_shrink() {
        let mut rng = StdRng::seed_from_u64(7);

        for seed in 0..40u32 {
            let src = block(20 + seed % 13, 30 + seed % 7);
            for step in Distortion::default_chain() {
                let out = step.apply(src.clone(), &mut rng);
                assert!(out.width() >= src.width(), "{step:?} shrank width");
                assert!(out.height() >= src.height(), "{step:?} shrank height");
            }
        }
    }

    #[test]
    fn test_warp_keeps_size_and_content() {
        let mut rng = StdRng::seed_from_u64(11);
        let src = block(40, 50);

        for _ in 0..20 {
            let out = warp(&src, 0.27, 0.21, &mut rng);
            assert_eq!(out.dimensions(), src.dimensions());
            assert!(lit(&out) > 0);
        }
    }

    #[test]
    fn test_warp_without_displacement_is_identity_sized() {
        let mut rng = StdRng::seed_from_u64(1);
        let src = block(16, 16);
        let out = warp(&src, 0.0, 0.0, &mut rng);

        assert_eq!(out.dimensions(), (16, 16));
        assert_ne!(out.get_pixel(8, 8).0, BLANK.0);
        assert_eq!(out.get_pixel(0, 0).0, BLANK.0);
    }

    #[test]
    fn test_offset_preserves_pixels() {
        let mut rng = StdRng::seed_from_u64(3);
        let src = block(30, 40);

        for _ in 0..20 {
            let out = offset(&src, 0.1, 0.2, &mut rng);
            let dx = out.width() - src.width();
            let dy = out.height() - src.height();
            assert!(dx < 3 && dy < 8);

            for (x, y, p) in src.enumerate_pixels() {
                assert_eq!(out.get_pixel(x + dx, y + dy), p);
            }
        }
    }

    #[test]
    fn test_rotate_expands_to_fit() {
        let mut rng = StdRng::seed_from_u64(5);
        let src = RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]));

        for _ in 0..20 {
            let out = rotate(&src, 25.0, &mut rng);
            assert!(out.width() >= 40 && out.height() >= 20);
            assert!(out.width() <= 40 + 20 && out.height() <= 20 + 40);

            // Centre of the source stays lit
            let centre = out.get_pixel(out.width() / 2, out.height() / 2);
            assert!(centre.0.iter().all(|&c| c > 200));
        }
    }

    #[test]
    fn test_rotate_large_angle_grows_canvas() {
        let mut rng = StdRng::seed_from_u64(9);
        let src = RgbImage::from_pixel(40, 10, Rgb([255, 255, 255]));
        let out = rotate(&src, 90.0, &mut rng);

        assert!(out.width() >= 40 && out.height() >= 10);
        assert_eq!((out.width() - 40) % 2, 0);
        assert_eq!((out.height() - 10) % 2, 0);
    }

    #[test]
    fn test_validate_ranges() {
        assert!(Distortion::warp().validate().is_ok());
        assert!(Distortion::rotate().validate().is_ok());
        assert!(Distortion::offset().validate().is_ok());

        let bad = Distortion::Warp {
            dx_factor: 0.9,
            dy_factor: 0.1,
        };
        assert!(matches!(bad.validate(), Err(ScrawlError::InvalidInput(_))));
        assert!(Distortion::Rotate { max_angle: f32::NAN }.validate().is_err());
    }

    #[test]
    fn test_same_seed_same_output() {
        let src = block(24, 32);
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            Distortion::default_chain()
                .iter()
                .fold(src.clone(), |img, step| step.apply(img, &mut rng))
        };

        assert_eq!(run(42), run(42));
    }
}
