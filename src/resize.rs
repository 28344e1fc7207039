//! Resizing to an exact target size
//!
//! `Bilinear` and `Nearest` follow OpenCV's `INTER_LINEAR` / `INTER_NEAREST`
//! conventions (half-pixel centers, edge clamping, no antialiasing on
//! downscale). The remaining modes delegate to `image::imageops::resize`.

use image::imageops::{self, FilterType};
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;
use crate::error::{Result, DssimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    Bilinear,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Bilinear
    }
}

impl FromStr for Interpolation {
    type Err = DssimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Interpolation::Nearest),
            "bilinear" | "linear" => Ok(Interpolation::Bilinear),
            "triangle" => Ok(Interpolation::Triangle),
            "catmullrom" | "cubic" => Ok(Interpolation::CatmullRom),
            "gaussian" => Ok(Interpolation::Gaussian),
            "lanczos3" | "lanczos" => Ok(Interpolation::Lanczos3),
            other => Err(DssimError::InvalidParameter(format!("unknown interpolation '{}'", other))),
        }
    }
}

/// Resize `img` to exactly `width` x `height`
pub fn resize_to(img: &RgbImage, width: u32, height: u32, interpolation: Interpolation) -> Result<RgbImage> {
    let (src_w, src_h) = img.dimensions();

    if width == 0 || height == 0 {
        return Err(DssimError::InvalidParameter(format!(
            "cannot resize to empty target {}x{}",
            width, height
        )));
    }
    if src_w == 0 || src_h == 0 {
        return Err(DssimError::Processing("cannot resize an empty image".into()));
    }

    if (src_w, src_h) == (width, height) {
        return Ok(img.clone());
    }

    debug!("resize {}x{} -> {}x{} ({:?})", src_w, src_h, width, height, interpolation);

    let resized = match interpolation {
        Interpolation::Nearest => resize_nearest(img, width, height),
        Interpolation::Bilinear => resize_bilinear(img, width, height),
        Interpolation::Triangle => imageops::resize(img, width, height, FilterType::Triangle),
        Interpolation::CatmullRom => imageops::resize(img, width, height, FilterType::CatmullRom),
        Interpolation::Gaussian => imageops::resize(img, width, height, FilterType::Gaussian),
        Interpolation::Lanczos3 => imageops::resize(img, width, height, FilterType::Lanczos3),
    };

    Ok(resized)
}

/// Source index and weight of the right-hand neighbour for one destination coordinate
fn linear_taps(src_len: u32, dst_len: u32) -> Vec<(usize, f32)> {
    let scale = src_len as f64 / dst_len as f64;
    let last = src_len as usize - 1;

    (0..dst_len)
        .map(|d| {
            let f = (d as f64 + 0.5) * scale - 0.5;
            let mut s = f.floor();
            let mut frac = f - s;

            if s < 0.0 {
                s = 0.0;
                frac = 0.0;
            }
            if s as usize >= last {
                s = last as f64;
                frac = 0.0;
            }

            (s as usize, frac as f32)
        })
        .collect()
}

fn resize_bilinear(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = img.dimensions();
    let src_stride = src_w as usize * 3;
    let src = img.as_raw();

    let x_taps = linear_taps(src_w, width);
    let y_taps = linear_taps(src_h, height);

    let mut out = vec![0u8; width as usize * height as usize * 3];

    out.par_chunks_mut(width as usize * 3)
        .zip(y_taps.par_iter())
        .for_each(|(row, &(sy, fy))| {
            let sy1 = (sy + 1).min(src_h as usize - 1);
            let top = &src[sy * src_stride..(sy + 1) * src_stride];
            let bottom = &src[sy1 * src_stride..(sy1 + 1) * src_stride];

            for (dx, &(sx, fx)) in x_taps.iter().enumerate() {
                let sx1 = (sx + 1).min(src_w as usize - 1);
                for c in 0..3 {
                    let t = top[sx * 3 + c] as f32 * (1.0 - fx) + top[sx1 * 3 + c] as f32 * fx;
                    let b = bottom[sx * 3 + c] as f32 * (1.0 - fx) + bottom[sx1 * 3 + c] as f32 * fx;
                    let v = t * (1.0 - fy) + b * fy;
                    row[dx * 3 + c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    // buffer length is width * height * 3 by construction
    RgbImage::from_raw(width, height, out).unwrap_or_else(|| RgbImage::new(width, height))
}

fn resize_nearest(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = img.dimensions();
    let sx_scale = src_w as f64 / width as f64;
    let sy_scale = src_h as f64 / height as f64;

    RgbImage::from_fn(width, height, |x, y| {
        let sx = ((x as f64 * sx_scale).floor() as u32).min(src_w - 1);
        let sy = ((y as f64 * sy_scale).floor() as u32).min(src_h - 1);
        *img.get_pixel(sx, sy)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 77])
        })
    }

    #[test]
    fn test_output_matches_requested_size() {
        let img = gradient(37, 23);
        let modes = [
            Interpolation::Nearest,
            Interpolation::Bilinear,
            Interpolation::Triangle,
            Interpolation::CatmullRom,
            Interpolation::Gaussian,
            Interpolation::Lanczos3,
        ];
        for mode in modes {
            for (w, h) in [(400, 400), (10, 5), (37, 90), (1, 1)] {
                let out = resize_to(&img, w, h, mode).unwrap();
                assert_eq!(out.dimensions(), (w, h), "mode {:?}", mode);
            }
        }
    }

    #[test]
    fn test_same_size_is_identity() {
        let img = gradient(16, 9);
        let out = resize_to(&img, 16, 9, Interpolation::Bilinear).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_zero_target_rejected() {
        let img = gradient(8, 8);
        assert!(resize_to(&img, 0, 8, Interpolation::Bilinear).is_err());
        assert!(resize_to(&img, 8, 0, Interpolation::Nearest).is_err());
    }

    #[test]
    fn test_bilinear_constant_stays_constant() {
        let img = RgbImage::from_pixel(13, 7, Rgb([90, 140, 200]));
        let out = resize_to(&img, 40, 21, Interpolation::Bilinear).unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([90, 140, 200])));
    }

    #[test]
    fn test_bilinear_upscale_interpolates() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([200, 200, 200]));

        // 2 -> 4: centers map to -0.25, 0.25, 0.75, 1.25
        let out = resize_to(&img, 4, 1, Interpolation::Bilinear).unwrap();
        let row: Vec<u8> = (0..4).map(|x| out.get_pixel(x, 0)[0]).collect();
        assert_eq!(row, vec![0, 50, 150, 200]);
    }

    #[test]
    fn test_linear_taps_clamp_edges() {
        let taps = linear_taps(4, 8);
        assert_eq!(taps[0], (0, 0.0));
        assert_eq!(taps[7], (3, 0.0));
    }

    #[test]
    fn test_parse_interpolation() {
        assert_eq!("linear".parse::<Interpolation>().unwrap(), Interpolation::Bilinear);
        assert_eq!("Lanczos3".parse::<Interpolation>().unwrap(), Interpolation::Lanczos3);
        assert!("bicubic-ish".parse::<Interpolation>().is_err());
    }
}
