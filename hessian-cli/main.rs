use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use hessian_cli::{
    DetectionPlan, draw_points, load_gray, resolve_threads, run_detection, start_thread_pool, to_detector_image,
};
use hessian_detect::{DetectorConfig, FastHessianConfig, IntensityKind};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "hessian")]
#[command(about = "Detect Fast-Hessian blobs and corner features in images")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(name = "detect")]
    Detect(DetectArgs),
    /// Print the default configuration of a mode
    #[command(name = "config")]
    Config(ConfigArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    FastHessian,
    Harris,
    ShiTomasi,
    Hessian,
    Laplacian,
    Fast,
}

impl From<Mode> for IntensityKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::FastHessian => IntensityKind::FastHessian,
            Mode::Harris => IntensityKind::Harris,
            Mode::ShiTomasi => IntensityKind::ShiTomasi,
            Mode::Hessian => IntensityKind::HessianDeterminant,
            Mode::Laplacian => IntensityKind::Laplacian,
            Mode::Fast => IntensityKind::Fast,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

#[derive(Args, Debug, Clone)]
struct DetectArgs {
    #[arg(long, required = true)]
    input: PathBuf,
    #[arg(long, value_enum, default_value_t = Mode::FastHessian)]
    mode: Mode,
    /// Detector settings in JSON or TOML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run the detector on every level of an image pyramid
    #[arg(long)]
    pyramid: bool,
    /// Image with the detected points drawn on it
    #[arg(long)]
    output: Option<PathBuf>,
    /// Detection report
    #[arg(long)]
    json: Option<PathBuf>,
    /// Worker threads; defaults to the config file value, then one per CPU
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    #[arg(long, value_enum, default_value_t = Mode::FastHessian)]
    mode: Mode,
    #[arg(long, value_enum, default_value_t = Format::Toml)]
    format: Format,
}

fn detect(args: DetectArgs) -> Result<()> {
    let mut plan = DetectionPlan::for_intensity(args.mode.into(), args.pyramid);
    if let Some(path) = &args.config {
        plan = plan.load_config(path)?;
    }
    start_thread_pool(resolve_threads(args.threads, &plan, args.config.is_some()))?;

    let gray = load_gray(&args.input).with_context(|| format!("failed to read {}", args.input.display()))?;
    let img = to_detector_image(&gray)?;
    info!("{}: {}x{}", args.input.display(), img.width(), img.height());

    let report = run_detection(&img, &plan)?;
    println!("Detected {} points with {} in {:.2} ms", report.points.len(), report.mode, report.elapsed_ms);

    if let Some(path) = &args.output {
        draw_points(&gray, &report.points)
            .save(path)
            .with_context(|| format!("failed to save {}", path.display()))?;
        println!("Saved result image as {}", path.display());
    }
    if let Some(path) = &args.json {
        report.save_json(path)?;
        println!("Saved report as {}", path.display());
    }
    Ok(())
}

fn print_config(args: ConfigArgs) -> Result<()> {
    let text = match (IntensityKind::from(args.mode), args.format) {
        (IntensityKind::FastHessian, Format::Json) => FastHessianConfig::default().to_json()?,
        (IntensityKind::FastHessian, Format::Toml) => FastHessianConfig::default().to_toml()?,
        (kind, Format::Json) => DetectorConfig::new(kind).to_json()?,
        (kind, Format::Toml) => DetectorConfig::new(kind).to_toml()?,
    };
    println!("{}", text);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.cmd {
        Command::Detect(args) => detect(args),
        Command::Config(args) => print_config(args),
    }
}
