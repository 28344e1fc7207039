//! Image file I/O
//!
//! Inputs are decoded to 8-bit RGB regardless of the stored format: alpha is
//! dropped and 16-bit samples are reduced to 8 bits, the same view a plain
//! color `imread` gives.

use image::RgbImage;
use std::path::Path;
use tracing::debug;
use crate::error::{Result, DssimError};

/// Load an image from disk as 8-bit RGB
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)
        .map_err(|e| DssimError::Processing(format!("Failed to load {}: {}", path.display(), e)))?;

    let rgb = img.to_rgb8();
    debug!("loaded {} ({}x{})", path.display(), rgb.width(), rgb.height());
    Ok(rgb)
}

/// Save an in-memory image to disk, creating the parent directory if needed
pub fn save_rgb(img: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    img.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    #[test]
    fn test_missing_file_fails() {
        let result = load_rgb(Path::new("does-not-exist-4f1c.png"));
        assert!(result.is_err());
    }

    #[test]
    fn test_alpha_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        let img: RgbaImage = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 0]));
        img.save(&path).unwrap();

        let rgb = load_rgb(&path).unwrap();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([10, 20, 30]));
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");
        let img = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));

        save_rgb(&img, &path).unwrap();
        assert!(path.exists());
    }
}
