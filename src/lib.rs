pub mod error;
pub mod loader;
pub mod resize;
pub mod grayscale;
pub mod ssim;
pub mod dssim;
pub mod settings;
pub mod chart;

pub use error::{DssimError, Result};
pub use dssim::{compare_images, compute_dssim, compute_dssim_with, DssimReport, DssimTransform};
pub use settings::DssimSettings;
pub use chart::{render_chart, save_chart, ChartSettings, Downsample};
