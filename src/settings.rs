//! Calculator configuration
//!
//! Every knob that changes the numeric result lives here so two runs can be
//! reproduced from one JSON file:
//!
//! ```json
//! {
//!   "interpolation": "bilinear",
//!   "luma": { "r": 0.299, "g": 0.587, "b": 0.114 },
//!   "ssim": {
//!     "window": "uniform", "win_size": 7, "sigma": 1.5,
//!     "k1": 0.01, "k2": 0.03, "sample_covariance": true,
//!     "data_range": "second_image"
//!   },
//!   "transform": "standard"
//! }
//! ```
//!
//! Missing fields take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::dssim::DssimTransform;
use crate::error::Result;
use crate::grayscale::LumaWeights;
use crate::resize::Interpolation;
use crate::ssim::SsimSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DssimSettings {
    /// Resampling used to bring the second image to the first one's size (default: bilinear)
    pub interpolation: Interpolation,
    /// RGB -> luma weights (default: BT.601)
    pub luma: LumaWeights,
    /// Window, stabilizers and data range of the SSIM stage
    pub ssim: SsimSettings,
    /// SSIM -> DSSIM mapping (default: standard)
    pub transform: DssimTransform,
}

impl DssimSettings {
    /// Read settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: DssimSettings = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.luma.validate()?;
        self.ssim.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssim::{DataRange, Window};

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: DssimSettings =
            serde_json::from_str(r#"{ "interpolation": "nearest", "transform": "script" }"#).unwrap();
        assert_eq!(settings.interpolation, Interpolation::Nearest);
        assert_eq!(settings.transform, DssimTransform::Script);
        assert_eq!(settings.ssim.win_size, 7);
        assert_eq!(settings.luma, LumaWeights::bt601());
    }

    #[test]
    fn test_save_load_keeps_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dssim.json");

        let mut settings = DssimSettings::default();
        settings.ssim = SsimSettings::gaussian();
        settings.ssim.data_range = DataRange::Fixed(1.0);
        settings.save(&path).unwrap();

        let loaded = DssimSettings::load(&path).unwrap();
        assert_eq!(loaded.ssim.window, Window::Gaussian);
        assert_eq!(loaded.ssim.win_size, 11);
        assert_eq!(loaded.ssim.data_range, DataRange::Fixed(1.0));
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "ssim": { "win_size": 4 } }"#).unwrap();
        assert!(DssimSettings::load(&path).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(DssimSettings::load(Path::new("no-such-settings.json")).is_err());
    }
}
