use std::path::Path;
use std::time::Instant;

use hessian_core::{CoreError, Image, ScalePoint};
use hessian_detect::{
    DetectError, DetectorBuilder, DetectorConfig, FastHessianConfig, FastHessianDetector, GeneralFeatureDetector,
    ImagePyramid, IntensityKind, PyramidConfig, PyramidFeatureDetector,
};
use image::{GrayImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_circle_mut;
use log::{debug, info};
use serde::Serialize;

pub use hessian_core;
pub use hessian_detect;

#[derive(Debug)]
pub enum CliError {
    Detect(DetectError),
    Image(image::ImageError),
    Config(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Detect(e) => write!(f, "Detection error: {}", e),
            CliError::Image(e) => write!(f, "Image error: {}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Json(e) => write!(f, "JSON error: {}", e),
            CliError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Detect(e) => Some(e),
            CliError::Image(e) => Some(e),
            CliError::Config(_) => None,
            CliError::Io(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::ThreadPool(e) => Some(e),
        }
    }
}

impl From<DetectError> for CliError {
    fn from(err: DetectError) -> Self {
        CliError::Detect(err)
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::Detect(err.into())
    }
}

impl From<image::ImageError> for CliError {
    fn from(err: image::ImageError) -> Self {
        CliError::Image(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for CliError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        CliError::ThreadPool(err)
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// What the `detect` command runs
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionPlan {
    /// Multi-octave Fast-Hessian
    ScaleSpace(FastHessianConfig),
    /// One intensity algorithm at the input resolution
    Single(DetectorConfig),
    /// One intensity algorithm on every level of an image pyramid
    Pyramid(DetectorConfig, PyramidConfig),
}

impl DetectionPlan {
    /// Default plan for `kind`. Fast-Hessian runs in scale space.
    pub fn for_intensity(kind: IntensityKind, pyramid: bool) -> Self {
        match (kind, pyramid) {
            (IntensityKind::FastHessian, false) => DetectionPlan::ScaleSpace(FastHessianConfig::default()),
            (_, false) => DetectionPlan::Single(DetectorConfig::new(kind)),
            (_, true) => DetectionPlan::Pyramid(DetectorConfig::new(kind), PyramidConfig::default()),
        }
    }

    /// Replaces the detector settings with those stored in `path`
    /// (`.toml`, anything else is read as JSON).
    pub fn load_config(self, path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let toml = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let config_err = |e: Box<dyn std::error::Error>| CliError::Config(format!("{}: {}", path.display(), e));

        Ok(match self {
            DetectionPlan::ScaleSpace(_) => DetectionPlan::ScaleSpace(if toml {
                FastHessianConfig::from_toml(&content).map_err(config_err)?
            } else {
                FastHessianConfig::from_json(&content).map_err(config_err)?
            }),
            DetectionPlan::Single(_) | DetectionPlan::Pyramid(..) => {
                let config = if toml {
                    DetectorConfig::from_toml(&content).map_err(config_err)?
                } else {
                    DetectorConfig::from_json(&content).map_err(config_err)?
                };
                match self {
                    DetectionPlan::Pyramid(_, pyramid) => DetectionPlan::Pyramid(config, pyramid),
                    _ => DetectionPlan::Single(config),
                }
            }
        })
    }

    pub fn name(&self) -> String {
        match self {
            DetectionPlan::ScaleSpace(_) => "fast-hessian scale space".to_string(),
            DetectionPlan::Single(c) => c.intensity.name().to_string(),
            DetectionPlan::Pyramid(c, _) => format!("{} pyramid", c.intensity.name()),
        }
    }

    /// Worker count stored in the plan's detector settings.
    pub fn n_threads(&self) -> usize {
        match self {
            DetectionPlan::ScaleSpace(c) => c.n_threads,
            DetectionPlan::Single(c) | DetectionPlan::Pyramid(c, _) => c.n_threads,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            DetectionPlan::ScaleSpace(c) => c.summary(),
            DetectionPlan::Single(c) => c.summary(),
            DetectionPlan::Pyramid(c, p) => format!("{}, pyramid factor={}, levels<={}", c.summary(), p.scale_factor, p.max_levels),
        }
    }
}

/// Worker count for a run: `requested` wins, then the plan's `n_threads` when
/// its settings were loaded from a file, then one per logical CPU.
pub fn resolve_threads(requested: Option<usize>, plan: &DetectionPlan, from_file: bool) -> usize {
    requested
        .or_else(|| from_file.then(|| plan.n_threads()))
        .unwrap_or_else(hessian_core::default_threads)
}

/// Start the global rayon pool with `n_threads` workers.
pub fn start_thread_pool(n_threads: usize) -> CliResult<()> {
    if n_threads == 0 {
        return Err(CliError::Config("thread count must be >= 1".to_string()));
    }
    hessian_core::init_thread_pool(n_threads)?;
    debug!("thread pool started with {} workers", n_threads);
    Ok(())
}

/// Result of one `detect` run, written out with `--json`
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub mode: String,
    pub width: usize,
    pub height: usize,
    pub elapsed_ms: f64,
    pub points: Vec<ScalePoint>,
}

impl DetectionReport {
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> CliResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Copy an 8-bit grayscale image into a detector image
pub fn to_detector_image(img: &GrayImage) -> CliResult<Image<u8>> {
    let (w, h) = img.dimensions();
    Ok(Image::from_vec(w as usize, h as usize, img.as_raw().clone())?)
}

/// Load an image from disk as 8-bit grayscale
pub fn load_gray<P: AsRef<Path>>(path: P) -> CliResult<GrayImage> {
    Ok(image::ImageReader::open(path)?.decode()?.to_luma8())
}

/// Run `plan` on `img`
pub fn run_detection(img: &Image<u8>, plan: &DetectionPlan) -> CliResult<DetectionReport> {
    debug!("{}", plan.summary());
    let t0 = Instant::now();
    let points = match plan {
        DetectionPlan::ScaleSpace(config) => {
            let mut detector = FastHessianDetector::new(config.clone())?;
            detector.detect(img.view())?.to_vec()
        }
        DetectionPlan::Single(config) => {
            let mut detector = DetectorBuilder::from_config(config.clone()).build()?;
            detector.detect_image(img.view())?
        }
        DetectionPlan::Pyramid(config, pyramid) => {
            config.validate()?;
            let general = GeneralFeatureDetector::new(
                config.create_intensity()?,
                config.radius,
                config.threshold,
                config.max_features,
            )?
            .with_extra_border(config.ignore_border);
            let mut detector = PyramidFeatureDetector::new(ImagePyramid::new(pyramid.clone())?, general)
                .with_subpixel_refinement(config.subpixel_refinement);
            detector.detect(img.view())?.to_vec()
        }
    };
    let elapsed = t0.elapsed();
    info!("{}: {} points in {:.2?}", plan.name(), points.len(), elapsed);

    Ok(DetectionReport {
        mode: plan.name(),
        width: img.width(),
        height: img.height(),
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        points,
    })
}

/// Overlay `points` on `img`: red for positive responses, blue for negative.
/// Circle radius follows the point scale.
pub fn draw_points(img: &GrayImage, points: &[ScalePoint]) -> RgbaImage {
    let mut output: RgbaImage = image::DynamicImage::ImageLuma8(img.clone()).into_rgba8();
    for p in points {
        let color = if p.intensity >= 0.0 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 96, 255, 255]) };
        let radius = (2.5 * p.scale).round().max(2.0) as i32;
        draw_hollow_circle_mut(&mut output, (p.x.round() as i32, p.y.round() as i32), radius, color);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_image(w: u32, h: u32, cx: u32, cy: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, image::Luma([30]));
        for y in cy - 5..=cy + 5 {
            for x in cx - 5..=cx + 5 {
                img.put_pixel(x, y, image::Luma([220]));
            }
        }
        img
    }

    #[test]
    fn test_to_detector_image() {
        let img = blob_image(40, 30, 20, 15);
        let converted = to_detector_image(&img).unwrap();
        assert_eq!((converted.width(), converted.height()), (40, 30));
        assert_eq!(converted.get(20, 15), 220);
        assert_eq!(converted.get(0, 0), 30);
    }

    #[test]
    fn test_plans_per_intensity() {
        assert!(matches!(DetectionPlan::for_intensity(IntensityKind::FastHessian, false), DetectionPlan::ScaleSpace(_)));
        assert!(matches!(DetectionPlan::for_intensity(IntensityKind::Harris, false), DetectionPlan::Single(_)));
        assert!(matches!(DetectionPlan::for_intensity(IntensityKind::FastHessian, true), DetectionPlan::Pyramid(..)));
    }

    #[test]
    fn test_run_every_plan() {
        let img = to_detector_image(&blob_image(120, 100, 60, 50)).unwrap();
        for kind in IntensityKind::ALL {
            for pyramid in [false, true] {
                let plan = DetectionPlan::for_intensity(kind, pyramid);
                let report = run_detection(&img, &plan).unwrap();
                assert_eq!((report.width, report.height), (120, 100));
                assert!(report.points.iter().all(|p| p.x >= 0.0 && p.x < 120.0 && p.y >= 0.0 && p.y < 100.0));
            }
        }
        let report = run_detection(&img, &DetectionPlan::for_intensity(IntensityKind::FastHessian, false)).unwrap();
        assert!(!report.points.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = std::env::temp_dir().join(format!("hessian-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let toml_path = dir.join("harris.toml");
        DetectorConfig::harris_preset().save_toml(&toml_path).unwrap();
        let plan = DetectionPlan::for_intensity(IntensityKind::Harris, false).load_config(&toml_path).unwrap();
        assert_eq!(plan, DetectionPlan::Single(DetectorConfig::harris_preset()));

        let json_path = dir.join("scale.json");
        let config = FastHessianConfig { threshold: 3.0, ..Default::default() };
        std::fs::write(&json_path, config.to_json().unwrap()).unwrap();
        let plan = DetectionPlan::for_intensity(IntensityKind::FastHessian, false).load_config(&json_path).unwrap();
        assert_eq!(plan, DetectionPlan::ScaleSpace(config));

        std::fs::write(&json_path, "{ not json").unwrap();
        let err = DetectionPlan::for_intensity(IntensityKind::FastHessian, false).load_config(&json_path);
        assert!(matches!(err, Err(CliError::Config(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_thread_count_resolution() {
        let config = FastHessianConfig { n_threads: 3, ..Default::default() };
        let plan = DetectionPlan::ScaleSpace(config);
        assert_eq!(resolve_threads(Some(5), &plan, true), 5);
        assert_eq!(resolve_threads(None, &plan, true), 3);
        assert_eq!(resolve_threads(None, &plan, false), hessian_core::default_threads());

        let plan = DetectionPlan::Pyramid(DetectorConfig { n_threads: 2, ..DetectorConfig::harris_preset() }, PyramidConfig::default());
        assert_eq!(plan.n_threads(), 2);
        assert_eq!(resolve_threads(None, &plan, true), 2);
    }

    #[test]
    fn test_thread_pool_errors_are_reported() {
        assert!(matches!(start_thread_pool(0), Err(CliError::Config(_))));
        // the global pool can only be built once per process
        let _ = start_thread_pool(2);
        assert!(matches!(start_thread_pool(2), Err(CliError::ThreadPool(_))));
    }

    #[test]
    fn test_draw_points() {
        let img = blob_image(40, 40, 20, 20);
        let points = [ScalePoint::new(20.0, 20.0, 2.0, 5.0), ScalePoint::new(10.0, 10.0, 1.0, -5.0)];
        let out = draw_points(&img, &points);
        assert_eq!(out.dimensions(), (40, 40));
        assert_eq!(out.get_pixel(25, 20), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(0, 0), &Rgba([30, 30, 30, 255]));
    }

    #[test]
    fn test_report_json() {
        let report = DetectionReport {
            mode: "harris".to_string(),
            width: 4,
            height: 3,
            elapsed_ms: 1.5,
            points: vec![ScalePoint::new(1.0, 2.0, 1.2, 9.0)],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["points"][0]["scale"], serde_json::json!(1.2f32));
        assert_eq!(json["width"], 4);
    }
}
