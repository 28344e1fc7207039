use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use chart_dssim_lib::chart::{chart_file_name, save_chart, ChartSettings, Downsample};
use chart_dssim_lib::dssim::{compute_dssim_with, DssimTransform, DEFAULT_CANDIDATE, DEFAULT_REFERENCE};
use chart_dssim_lib::resize::Interpolation;
use chart_dssim_lib::settings::DssimSettings;
use chart_dssim_lib::ssim::{DataRange, SsimSettings, Window};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "structural dissimilarity between line-density charts")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the DSSIM of two images, the second resized to the first
    Compare(CompareArgs),
    /// Render a line-density chart to PNG
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
struct CompareArgs {
    #[arg(default_value = DEFAULT_REFERENCE)]
    reference: PathBuf,

    #[arg(default_value = DEFAULT_CANDIDATE)]
    candidate: PathBuf,

    /// JSON settings file, flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// nearest | bilinear | triangle | catmullrom | gaussian | lanczos3
    #[arg(long)]
    interpolation: Option<Interpolation>,

    /// uniform (7x7) | gaussian (11x11, sigma 1.5)
    #[arg(long)]
    window: Option<String>,

    #[arg(long)]
    win_size: Option<usize>,

    /// second | union | <number>
    #[arg(long)]
    data_range: Option<DataRange>,

    /// standard: (1-ssim)/2 | script: 1-(1-ssim)/2
    #[arg(long)]
    transform: Option<DssimTransform>,

    /// print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    #[arg(short, long, default_value_t = 100)]
    iterations: u32,

    #[arg(short, default_value_t = 2)]
    k: u32,

    #[arg(long, default_value_t = 400)]
    width: u32,

    #[arg(long, default_value_t = 300)]
    height: u32,

    #[arg(long, default_value_t = 12.0)]
    noise: f32,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// none | m4 | nth:N
    #[arg(long, default_value = "none")]
    downsample: Downsample,

    /// defaults to output-i..-k..-w..-h..-u..-d...png in the working directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn compare_settings(args: &CompareArgs) -> Result<DssimSettings> {
    let mut settings = match &args.config {
        Some(path) => DssimSettings::load(path)?,
        None => DssimSettings::default(),
    };

    if let Some(interpolation) = args.interpolation {
        settings.interpolation = interpolation;
    }
    if let Some(window) = &args.window {
        let data_range = settings.ssim.data_range;
        settings.ssim = match window.to_ascii_lowercase().as_str() {
            "uniform" => SsimSettings { window: Window::Uniform, ..SsimSettings::default() },
            "gaussian" => SsimSettings::gaussian(),
            other => anyhow::bail!("unknown window '{}'", other),
        };
        settings.ssim.data_range = data_range;
    }
    if let Some(win_size) = args.win_size {
        settings.ssim.win_size = win_size;
    }
    if let Some(data_range) = args.data_range {
        settings.ssim.data_range = data_range;
    }
    if let Some(transform) = args.transform {
        settings.transform = transform;
    }

    settings.validate()?;
    Ok(settings)
}

fn compare(args: CompareArgs) -> Result<()> {
    let settings = compare_settings(&args)?;

    match compute_dssim_with(&args.reference, &args.candidate, &settings) {
        Ok(report) if args.json => println!("{}", serde_json::to_string_pretty(&report)?),
        Ok(report) => println!("{}", report.dssim),
        Err(e) if args.json => {
            println!("{}", serde_json::json!({ "error": e }));
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn render(args: RenderArgs) -> Result<()> {
    let settings = ChartSettings {
        iterations: args.iterations,
        k: args.k,
        width: args.width,
        height: args.height,
        noise_std_dev: args.noise,
        seed: args.seed,
        downsample: args.downsample,
    };
    let path = args.output.unwrap_or_else(|| PathBuf::from(chart_file_name(&settings)));

    save_chart(&settings, &path)?;
    println!("{}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Compare(args) => compare(args),
        Command::Render(args) => render(args),
    }
}
