//! Structural similarity index (Wang et al. 2004)
//!
//! Local means, variances and covariance are computed with a separable
//! window (uniform box or Gaussian) over mirror-reflected borders
//! (`d c b a | a b c d | d c b a`). The SSIM map is averaged over the
//! interior, skipping a border of `(win_size - 1) / 2` pixels on each side.
//!
//! With the default settings (7x7 uniform window, sample covariance,
//! K1 = 0.01, K2 = 0.03) the result lines up with scikit-image's
//! `structural_similarity`.

use ndarray::{Array1, Array2, Axis, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};
use crate::error::{Result, DssimError};

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Uniform,
    Gaussian,
}

/// How the dynamic range `L` in `C1 = (K1 L)^2`, `C2 = (K2 L)^2` is obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRange {
    /// `max - min` of the second image only
    SecondImage,
    /// `max - min` over both images
    Union,
    /// A fixed value, e.g. 1.0 for normalized input
    Fixed(f64),
}

impl Default for DataRange {
    fn default() -> Self {
        DataRange::SecondImage
    }
}

impl FromStr for DataRange {
    type Err = DssimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "second" | "second_image" | "b" => Ok(DataRange::SecondImage),
            "union" | "both" => Ok(DataRange::Union),
            other => other
                .parse::<f64>()
                .map(DataRange::Fixed)
                .map_err(|_| DssimError::InvalidParameter(format!("unknown data range '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SsimSettings {
    /// Window weighting (default: uniform)
    pub window: Window,
    /// Side length of the window, odd and >= 3 (default: 7)
    pub win_size: usize,
    /// Standard deviation of the Gaussian window (default: 1.5)
    pub sigma: f64,
    /// Luminance stabilizer (default: 0.01)
    pub k1: f64,
    /// Contrast stabilizer (default: 0.03)
    pub k2: f64,
    /// Scale variances by N / (N - 1) (default: true)
    pub sample_covariance: bool,
    /// Dynamic range source (default: second image)
    pub data_range: DataRange,
}

impl Default for SsimSettings {
    fn default() -> Self {
        Self {
            window: Window::Uniform,
            win_size: 7,
            sigma: 1.5,
            k1: 0.01,
            k2: 0.03,
            sample_covariance: true,
            data_range: DataRange::SecondImage,
        }
    }
}

impl SsimSettings {
    /// 11x11 Gaussian window with sigma 1.5 and population covariance, the
    /// parameters of the original paper
    pub fn gaussian() -> Self {
        Self {
            window: Window::Gaussian,
            win_size: 11,
            sample_covariance: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.win_size < 3 || self.win_size % 2 == 0 {
            return Err(DssimError::InvalidParameter(format!(
                "win_size must be odd and >= 3, got {}",
                self.win_size
            )));
        }
        if self.window == Window::Gaussian && !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(DssimError::InvalidParameter(format!("sigma must be positive, got {}", self.sigma)));
        }
        if self.k1 < 0.0 || self.k2 < 0.0 {
            return Err(DssimError::InvalidParameter("k1 and k2 must be non-negative".into()));
        }
        if let DataRange::Fixed(range) = self.data_range {
            if !(range > 0.0 && range.is_finite()) {
                return Err(DssimError::InvalidParameter(format!("data range must be positive, got {}", range)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SsimOutput {
    /// Mean SSIM over the interior of the map
    pub mssim: f64,
    /// Dynamic range actually used for the constants
    pub data_range: f64,
}

// ============================================================================
// WINDOW FILTERING
// ============================================================================

fn window_kernel(settings: &SsimSettings) -> Array1<f64> {
    let n = settings.win_size;
    match settings.window {
        Window::Uniform => Array1::from_elem(n, 1.0 / n as f64),
        Window::Gaussian => {
            let radius = (n / 2) as f64;
            let two_var = 2.0 * settings.sigma * settings.sigma;
            let raw = Array1::from_shape_fn(n, |i| {
                let d = i as f64 - radius;
                (-d * d / two_var).exp()
            });
            let sum = raw.sum();
            raw / sum
        }
    }
}

/// Mirror an out-of-range index back into `0..len` (half-sample symmetric)
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let m = index.rem_euclid(period);
    if m >= len {
        (period - 1 - m) as usize
    } else {
        m as usize
    }
}

/// Convolve every lane along `axis` with `kernel`
fn filter_axis(input: &Array2<f64>, kernel: &Array1<f64>, axis: Axis) -> Array2<f64> {
    let radius = (kernel.len() / 2) as isize;
    let mut output = Array2::<f64>::zeros(input.raw_dim());

    Zip::from(output.lanes_mut(axis))
        .and(input.lanes(axis))
        .for_each(|mut out_lane, in_lane| {
            let len = in_lane.len();
            for i in 0..len {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let j = reflect(i as isize + k as isize - radius, len);
                    acc += w * in_lane[j];
                }
                out_lane[i] = acc;
            }
        });

    output
}

fn filter2d(input: &Array2<f64>, kernel: &Array1<f64>) -> Array2<f64> {
    let rows = filter_axis(input, kernel, Axis(0));
    filter_axis(&rows, kernel, Axis(1))
}

fn extent(img: &Array2<f64>) -> (f64, f64) {
    img.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn resolve_data_range(x: &Array2<f64>, y: &Array2<f64>, data_range: DataRange) -> f64 {
    let range = match data_range {
        DataRange::SecondImage => {
            let (lo, hi) = extent(y);
            hi - lo
        }
        DataRange::Union => {
            let (xlo, xhi) = extent(x);
            let (ylo, yhi) = extent(y);
            xhi.max(yhi) - xlo.min(ylo)
        }
        DataRange::Fixed(range) => range,
    };

    // a constant reference image has no range; fall back to the full normalized span
    if range > 0.0 {
        range
    } else {
        warn!("data range is zero ({:?}), using 1.0", data_range);
        1.0
    }
}

// ============================================================================
// SSIM
// ============================================================================

/// Per-pixel SSIM map and the data range it was computed with
pub fn ssim_map(x: &Array2<f64>, y: &Array2<f64>, settings: &SsimSettings) -> Result<(Array2<f64>, f64)> {
    settings.validate()?;

    if x.dim() != y.dim() {
        return Err(DssimError::ShapeMismatch { left: x.dim(), right: y.dim() });
    }
    let (rows, cols) = x.dim();
    if rows < settings.win_size || cols < settings.win_size {
        return Err(DssimError::InvalidParameter(format!(
            "image {}x{} is smaller than the {}x{} window",
            cols, rows, settings.win_size, settings.win_size
        )));
    }

    let data_range = resolve_data_range(x, y, settings.data_range);
    let c1 = (settings.k1 * data_range).powi(2);
    let c2 = (settings.k2 * data_range).powi(2);

    let np = (settings.win_size * settings.win_size) as f64;
    let cov_norm = if settings.sample_covariance { np / (np - 1.0) } else { 1.0 };

    let kernel = window_kernel(settings);

    let products = vec![x.clone(), y.clone(), x * x, y * y, x * y];
    let filtered: Vec<Array2<f64>> = products
        .par_iter()
        .map(|p| filter2d(p, &kernel))
        .collect();
    let (ux, uy, uxx, uyy, uxy) = (&filtered[0], &filtered[1], &filtered[2], &filtered[3], &filtered[4]);

    let mut map = Array2::<f64>::zeros((rows, cols));
    Zip::from(&mut map)
        .and(ux)
        .and(uy)
        .and(uxx)
        .and(uyy)
        .and(uxy)
        .for_each(|s, &mx, &my, &mxx, &myy, &mxy| {
            let vx = cov_norm * (mxx - mx * mx);
            let vy = cov_norm * (myy - my * my);
            let vxy = cov_norm * (mxy - mx * my);

            let a1 = 2.0 * mx * my + c1;
            let a2 = 2.0 * vxy + c2;
            let b1 = mx * mx + my * my + c1;
            let b2 = vx + vy + c2;

            *s = (a1 * a2) / (b1 * b2);
        });

    Ok((map, data_range))
}

/// Mean structural similarity of two equally shaped images
pub fn ssim(x: &Array2<f64>, y: &Array2<f64>, settings: &SsimSettings) -> Result<SsimOutput> {
    let (map, data_range) = ssim_map(x, y, settings)?;

    let pad = (settings.win_size - 1) / 2;
    let (rows, cols) = map.dim();
    let interior = map.slice(ndarray::s![pad..rows - pad, pad..cols - pad]);

    let mssim = interior
        .mean()
        .ok_or_else(|| DssimError::Processing("empty SSIM interior".into()))?;

    debug!("ssim {:.6} (data range {:.4}, {}x{} interior)", mssim, data_range, cols - 2 * pad, rows - 2 * pad);

    Ok(SsimOutput { mssim, data_range })
}

// ============================================================================
// TESTS
// ============================================================================
