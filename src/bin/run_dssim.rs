use std::path::PathBuf;
use chart_dssim_lib::dssim::{compute_dssim_with, DssimTransform, DEFAULT_CANDIDATE, DEFAULT_REFERENCE};
use chart_dssim_lib::settings::DssimSettings;

// Full-resolution chart vs. the downsampled one, printed the way the
// original comparison did it (script transform, B-only data range).
fn main() {
    let reference = PathBuf::from(DEFAULT_REFERENCE);
    let candidate = PathBuf::from(DEFAULT_CANDIDATE);

    let settings = DssimSettings {
        transform: DssimTransform::Script,
        ..DssimSettings::default()
    };

    match compute_dssim_with(&reference, &candidate, &settings) {
        Ok(report) => println!("{}", report.dssim),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
