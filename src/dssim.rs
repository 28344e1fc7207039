//! DSSIM calculator
//!
//! Pipeline, in order:
//! 1. Load A and B as 8-bit RGB
//! 2. Resize B to A's width and height
//! 3. Convert both to luma and rescale to [0, 1]
//! 4. SSIM(A, B), data range from `SsimSettings::data_range`
//! 5. Map SSIM to DSSIM

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;
use crate::error::{Result, DssimError};
use crate::grayscale::{normalize, to_grayscale};
use crate::loader::load_rgb;
use crate::resize::resize_to;
use crate::settings::DssimSettings;
use crate::ssim::ssim;

/// File names the comparison runs on when none are given
pub const DEFAULT_REFERENCE: &str = "output-i1-k100-w400-h400-ufalse-dfalse.png";
pub const DEFAULT_CANDIDATE: &str = "output-i1-k100-w400-h400-ufalse-dtrue.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DssimTransform {
    /// `(1 - ssim) / 2`: identical images give 0, SSIM -1 gives 1
    Standard,
    /// `1 - (1 - ssim) / 2`: the value the chart comparison script printed
    Script,
}

impl Default for DssimTransform {
    fn default() -> Self {
        DssimTransform::Standard
    }
}

impl DssimTransform {
    pub fn apply(self, ssim: f64) -> f64 {
        match self {
            DssimTransform::Standard => (1.0 - ssim) / 2.0,
            DssimTransform::Script => 1.0 - (1.0 - ssim) / 2.0,
        }
    }
}

impl FromStr for DssimTransform {
    type Err = DssimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(DssimTransform::Standard),
            "script" | "legacy" => Ok(DssimTransform::Script),
            other => Err(DssimError::InvalidParameter(format!("unknown transform '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DssimReport {
    pub ssim: f64,
    pub dssim: f64,
    /// Dynamic range the SSIM constants were computed from
    pub data_range: f64,
    /// Size of the reference image (the comparison size)
    pub reference_size: (u32, u32),
    /// Size of the candidate before it was resized
    pub candidate_size: (u32, u32),
}

/// Compare two in-memory images; `candidate` is resized to `reference`'s size
pub fn compare_images(reference: &RgbImage, candidate: &RgbImage, settings: &DssimSettings) -> Result<DssimReport> {
    settings.validate()?;

    let (w, h) = reference.dimensions();
    let resized = resize_to(candidate, w, h, settings.interpolation)?;

    let x = normalize(&to_grayscale(reference, &settings.luma));
    let y = normalize(&to_grayscale(&resized, &settings.luma));

    let out = ssim(&x, &y, &settings.ssim)?;
    let dssim = settings.transform.apply(out.mssim);

    Ok(DssimReport {
        ssim: out.mssim,
        dssim,
        data_range: out.data_range,
        reference_size: (w, h),
        candidate_size: candidate.dimensions(),
    })
}

/// Compare two image files with explicit settings
pub fn compute_dssim_with(path_a: &Path, path_b: &Path, settings: &DssimSettings) -> Result<DssimReport> {
    let now = Instant::now();

    let reference = load_rgb(path_a)?;
    let candidate = load_rgb(path_b)?;
    let report = compare_images(&reference, &candidate, settings)?;

    debug!(
        "{} vs {}: ssim={:.6} dssim={:.6} in {:?}",
        path_a.display(),
        path_b.display(),
        report.ssim,
        report.dssim,
        now.elapsed()
    );
    Ok(report)
}

/// DSSIM of two image files with default settings
pub fn compute_dssim(path_a: &Path, path_b: &Path) -> Result<f64> {
    compute_dssim_with(path_a, path_b, &DssimSettings::default()).map(|r| r.dssim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_standard_transform_endpoints() {
        assert_eq!(DssimTransform::Standard.apply(1.0), 0.0);
        assert_eq!(DssimTransform::Standard.apply(-1.0), 1.0);
        assert_eq!(DssimTransform::Standard.apply(0.0), 0.5);
    }

    #[test]
    fn test_script_transform_is_increasing() {
        let t = DssimTransform::Script;
        assert_eq!(t.apply(1.0), 1.0);
        assert_eq!(t.apply(-1.0), 0.0);

        let samples: Vec<f64> = (-10..=10).map(|i| t.apply(i as f64 / 10.0)).collect();
        assert!(samples.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_parse_transform() {
        assert_eq!("script".parse::<DssimTransform>().unwrap(), DssimTransform::Script);
        assert_eq!("Standard".parse::<DssimTransform>().unwrap(), DssimTransform::Standard);
        assert!("inverse".parse::<DssimTransform>().is_err());
    }

    #[test]
    fn test_candidate_is_resized_to_reference() {
        let reference = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, 40]));
        let candidate = RgbImage::from_fn(20, 90, |x, y| Rgb([(x * 9) as u8, (y * 2) as u8, 40]));

        let report = compare_images(&reference, &candidate, &DssimSettings::default()).unwrap();
        assert_eq!(report.reference_size, (64, 48));
        assert_eq!(report.candidate_size, (20, 90));
        assert!((0.0..=1.0).contains(&report.dssim));
    }

    #[test]
    fn test_identical_in_memory() {
        let img = RgbImage::from_fn(30, 30, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8]));
        let report = compare_images(&img, &img, &DssimSettings::default()).unwrap();
        assert!((report.ssim - 1.0).abs() < 1e-9);
        assert!(report.dssim.abs() < 1e-9);
    }

    #[test]
    fn test_reference_smaller_than_window() {
        let tiny = RgbImage::new(4, 4);
        assert!(compare_images(&tiny, &tiny, &DssimSettings::default()).is_err());
    }
}
