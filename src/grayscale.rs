//! Luma conversion and [0, 1] normalization

use image::{GrayImage, Luma, RgbImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use crate::error::{Result, DssimError};

/// Channel weights for the RGB -> luma reduction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LumaWeights {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl LumaWeights {
    /// ITU-R BT.601, as used by OpenCV's `COLOR_BGR2GRAY`
    pub fn bt601() -> Self {
        Self { r: 0.299, g: 0.587, b: 0.114 }
    }

    /// ITU-R BT.709, as used by the `image` crate's `to_luma8`
    pub fn bt709() -> Self {
        Self { r: 0.2126, g: 0.7152, b: 0.0722 }
    }

    pub fn validate(&self) -> Result<()> {
        let all = [self.r, self.g, self.b];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DssimError::InvalidParameter(format!(
                "luma weights must be finite and non-negative: {:?}",
                self
            )));
        }
        let sum: f32 = all.iter().sum();
        if (sum - 1.0).abs() > 1e-3 {
            return Err(DssimError::InvalidParameter(format!(
                "luma weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }
}

impl Default for LumaWeights {
    fn default() -> Self {
        Self::bt601()
    }
}

/// Reduce an RGB image to a single luma channel, rounding to nearest
pub fn to_grayscale(img: &RgbImage, weights: &LumaWeights) -> GrayImage {
    let (width, height) = img.dimensions();

    GrayImage::from_fn(width, height, |x, y| {
        let p = img.get_pixel(x, y);
        let luma = p[0] as f32 * weights.r + p[1] as f32 * weights.g + p[2] as f32 * weights.b;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Rescale 8-bit luma to floats in [0, 1], shaped `(height, width)`
pub fn normalize(img: &GrayImage) -> Array2<f64> {
    let (width, height) = img.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        img.get_pixel(x as u32, y as u32)[0] as f64 / u8::MAX as f64
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_primary_weights() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));

        let gray = to_grayscale(&img, &LumaWeights::bt601());
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 29);
    }

    #[test]
    fn test_neutral_gray_unchanged() {
        let img = RgbImage::from_pixel(5, 5, Rgb([128, 128, 128]));
        for weights in [LumaWeights::bt601(), LumaWeights::bt709()] {
            let gray = to_grayscale(&img, &weights);
            assert!(gray.pixels().all(|p| p[0] == 128));
        }
    }

    #[test]
    fn test_normalize_shape_and_range() {
        let mut img = GrayImage::new(4, 2);
        img.put_pixel(3, 1, Luma([255]));

        let arr = normalize(&img);
        assert_eq!(arr.dim(), (2, 4));
        assert_eq!(arr[[1, 3]], 1.0);
        assert_eq!(arr[[0, 0]], 0.0);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        assert!(LumaWeights::bt601().validate().is_ok());
        assert!(LumaWeights { r: 0.5, g: 0.5, b: 0.5 }.validate().is_err());
        assert!(LumaWeights { r: -0.1, g: 0.6, b: 0.5 }.validate().is_err());
    }
}
