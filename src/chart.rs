//! Line-Density Chart Renderer
//!
//! Renders the charts the DSSIM comparison runs on:
//! 1. Model - a sine wave sampled `k` times per pixel column
//! 2. Series - `iterations` copies of the model with Gaussian noise
//! 3. Downsampling (optional) - M4 or every n-th sample per series
//! 4. Density - each series drawn as a polyline, columns normalized to sum 1,
//!    all series summed
//! 5. Coloring - Lab gradient from a pale green to a deep blue, empty cells white
//!
//! Rendering a full-resolution chart and a downsampled chart with the same
//! settings and seed, then comparing them, quantifies what the downsampling
//! loses visually.

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use palette::{IntoColor, Lab, LinSrgb, Mix};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info};
use crate::error::{Result, DssimError};
use crate::loader::save_rgb;

pub type DensityImage = ImageBuffer<Luma<f32>, Vec<f32>>;

const SERIES_PER_CHUNK: usize = 8;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Downsample {
    None,
    /// First, min, max and last sample of every pixel column
    M4,
    /// Every n-th sample
    EveryNth(u32),
}

impl FromStr for Downsample {
    type Err = DssimError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "none" => Ok(Downsample::None),
            "m4" => Ok(Downsample::M4),
            _ => lower
                .strip_prefix("nth:")
                .and_then(|n| n.parse::<u32>().ok())
                .map(Downsample::EveryNth)
                .ok_or_else(|| DssimError::InvalidParameter(format!("unknown downsampling '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Number of noisy series (default: 100)
    pub iterations: u32,
    /// Samples per pixel column (default: 2)
    pub k: u32,
    /// Chart width in pixels (default: 400)
    pub width: u32,
    /// Chart height in pixels, also the value range of the series (default: 300)
    pub height: u32,
    /// Standard deviation of the additive noise, 0 for the bare model (default: 12.0)
    pub noise_std_dev: f32,
    /// Seed of the first series, series `i` uses `seed + i` (default: 42)
    pub seed: u64,
    /// Series reduction before drawing (default: none)
    pub downsample: Downsample,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            iterations: 100,
            k: 2,
            width: 400,
            height: 300,
            noise_std_dev: 12.0,
            seed: 42,
            downsample: Downsample::None,
        }
    }
}

impl ChartSettings {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 || self.k == 0 || self.width == 0 || self.height == 0 {
            return Err(DssimError::InvalidParameter(
                "iterations, k, width and height must all be positive".into(),
            ));
        }
        if !(self.noise_std_dev >= 0.0 && self.noise_std_dev.is_finite()) {
            return Err(DssimError::InvalidParameter(format!(
                "noise standard deviation must be >= 0, got {}",
                self.noise_std_dev
            )));
        }
        if self.downsample == Downsample::EveryNth(0) {
            return Err(DssimError::InvalidParameter("every-nth step must be >= 1".into()));
        }
        Ok(())
    }

    fn sample_count(&self) -> usize {
        self.width as usize * self.k as usize
    }
}

/// `output-i{iterations}-k{k}-w{width}-h{height}-u{noiseless}-d{downsampled}.png`
pub fn chart_file_name(settings: &ChartSettings) -> String {
    format!(
        "output-i{}-k{}-w{}-h{}-u{}-d{}.png",
        settings.iterations,
        settings.k,
        settings.width,
        settings.height,
        settings.noise_std_dev == 0.0,
        settings.downsample != Downsample::None,
    )
}

// ============================================================================
// SERIES
// ============================================================================

/// Sine model, `width * k` samples
fn model(settings: &ChartSettings) -> Vec<f32> {
    let heightf = settings.height as f32;
    let k = settings.k as f32;

    (0..settings.sample_count())
        .map(|i| {
            let xf = i as f32 / k;
            heightf / 4.0 * (xf / 20.0).sin() + heightf / 2.0
        })
        .collect()
}

/// Model plus noise, clamped to `[0, height]` and truncated to whole pixels
fn noisy_series(model: &[f32], settings: &ChartSettings, index: u32) -> Result<Vec<u32>> {
    let normal = Normal::new(0.0f32, settings.noise_std_dev)
        .map_err(|e| DssimError::InvalidParameter(format!("noise distribution: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(settings.seed.wrapping_add(index as u64));

    Ok(model
        .iter()
        .map(|v| {
            let value = v + normal.sample(&mut rng);
            if value < 0.0 {
                0
            } else if value > settings.height as f32 {
                settings.height
            } else {
                value as u32
            }
        })
        .collect())
}

/// Indices kept by M4: first, min, max, last of every `bucket` samples, in time order
pub fn m4_indices(series: &[u32], bucket: usize) -> Vec<usize> {
    let mut kept = Vec::new();
    if bucket == 0 {
        return kept;
    }

    for start in (0..series.len()).step_by(bucket) {
        let end = (start + bucket).min(series.len());
        let window = &series[start..end];

        let mut min_idx = 0;
        let mut max_idx = 0;
        for (i, &v) in window.iter().enumerate() {
            if v < window[min_idx] {
                min_idx = i;
            }
            if v > window[max_idx] {
                max_idx = i;
            }
        }

        let mut picks = [start, start + min_idx, start + max_idx, end - 1];
        picks.sort_unstable();
        for idx in picks {
            if kept.last() != Some(&idx) {
                kept.push(idx);
            }
        }
    }

    kept
}

/// Chart-space points of a series after downsampling
fn series_points(series: &[u32], settings: &ChartSettings) -> Vec<(f32, f32)> {
    let k = settings.k as f32;
    let indices: Vec<usize> = match settings.downsample {
        Downsample::None => (0..series.len()).collect(),
        Downsample::M4 => m4_indices(series, settings.k as usize),
        Downsample::EveryNth(n) => (0..series.len()).step_by(n.max(1) as usize).collect(),
    };

    indices
        .into_iter()
        .map(|i| (i as f32 / k, series[i] as f32))
        .collect()
}

// ============================================================================
// DENSITY
// ============================================================================

/// Draw one series as a polyline and normalize every column to sum 1
fn render_series(points: &[(f32, f32)], width: u32, height: u32) -> DensityImage {
    let mut data = DensityImage::new(width, height);

    for segment in points.windows(2) {
        draw_line_segment_mut(&mut data, segment[0], segment[1], Luma([1.0]));
    }

    for x in 0..width {
        let sum: f32 = (0..height).map(|y| data.get_pixel(x, y)[0]).sum();
        if sum > 0.0 {
            for y in 0..height {
                let value = data.get_pixel(x, y)[0];
                data.put_pixel(x, y, Luma([value / sum]));
            }
        }
    }

    data
}

/// Reducer that combines the densities of two series
fn sum_images(image: DensityImage, mut aggregated: DensityImage) -> DensityImage {
    for (acc, value) in aggregated.iter_mut().zip(image.iter()) {
        *acc += value;
    }
    aggregated
}

/// Summed, column-normalized density of all series
pub fn render_density(settings: &ChartSettings) -> Result<DensityImage> {
    settings.validate()?;
    let (width, height) = (settings.width, settings.height);

    let now = Instant::now();
    let model = model(settings);
    let data: Vec<Vec<u32>> = (0..settings.iterations)
        .into_par_iter()
        .map(|i| noisy_series(&model, settings, i))
        .collect::<Result<_>>()?;
    debug!("prepared {} series of {} samples in {:?}", data.len(), model.len(), now.elapsed());

    // fixed chunks summed in a fixed order keep the f32 sums reproducible
    let now = Instant::now();
    let aggregated = data
        .par_chunks(SERIES_PER_CHUNK)
        .map(|chunk| {
            chunk.iter().fold(DensityImage::new(width, height), |acc, series| {
                sum_images(render_series(&series_points(series, settings), width, height), acc)
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .fold(DensityImage::new(width, height), |acc, partial| sum_images(partial, acc));
    debug!("computed line density in {:?}", now.elapsed());

    Ok(aggregated)
}

// ============================================================================
// COLORING
// ============================================================================

/// Map density to color: empty cells white, others along the Lab gradient by `value / max`
pub fn colorize(density: &DensityImage) -> RgbImage {
    let start: Lab = LinSrgb::new(247.0f32 / 255.0, 252.0 / 255.0, 241.0 / 255.0).into_color();
    let end: Lab = LinSrgb::new(14.0f32 / 255.0, 66.0 / 255.0, 127.0 / 255.0).into_color();

    let max_value = density.pixels().fold(0.0f32, |max, pixel| max.max(pixel[0]));

    let mut img = RgbImage::new(density.width(), density.height());
    for (x, y, pixel) in density.enumerate_pixels() {
        let value = pixel[0];
        if value == 0.0 || max_value == 0.0 {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        } else {
            let color: LinSrgb = start.mix(end, value / max_value).into_color();
            img.put_pixel(x, y, Rgb([
                (color.red * 255.0).round().clamp(0.0, 255.0) as u8,
                (color.green * 255.0).round().clamp(0.0, 255.0) as u8,
                (color.blue * 255.0).round().clamp(0.0, 255.0) as u8,
            ]));
        }
    }

    img
}

// ============================================================================
// MAIN ENTRY POINTS
// ============================================================================

/// Render a colored chart in memory
pub fn render_chart(settings: &ChartSettings) -> Result<RgbImage> {
    let density = render_density(settings)?;
    Ok(colorize(&density))
}

/// Render a chart and save it as PNG
pub fn save_chart(settings: &ChartSettings, path: &Path) -> Result<()> {
    let img = render_chart(settings)?;
    save_rgb(&img, path)?;
    info!("wrote {} ({}x{})", path.display(), img.width(), img.height());
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
