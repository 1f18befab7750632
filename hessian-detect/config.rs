use crate::blob::{BlobKind, HessianBlobIntensity};
use crate::builder::DetectorBuilder;
use crate::corner::CornerIntensity;
use crate::error::{DetectError, DetectResult};
use crate::fast::FastCornerIntensity;
use crate::intensity::{FastHessianBoxIntensity, FeatureIntensity};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Intensity algorithm selected by a [`DetectorConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IntensityKind {
    FastHessian,
    Harris,
    ShiTomasi,
    HessianDeterminant,
    Laplacian,
    Fast,
}

impl IntensityKind {
    pub const ALL: [IntensityKind; 6] = [
        IntensityKind::FastHessian,
        IntensityKind::Harris,
        IntensityKind::ShiTomasi,
        IntensityKind::HessianDeterminant,
        IntensityKind::Laplacian,
        IntensityKind::Fast,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IntensityKind::FastHessian => "fast-hessian",
            IntensityKind::Harris => "harris",
            IntensityKind::ShiTomasi => "shi-tomasi",
            IntensityKind::HessianDeterminant => "hessian",
            IntensityKind::Laplacian => "laplacian",
            IntensityKind::Fast => "fast",
        }
    }

    /// Extraction threshold that suits the response scale of 8-bit input
    pub fn default_threshold(self) -> f32 {
        match self {
            IntensityKind::FastHessian => 1.0,
            IntensityKind::Harris => 100.0,
            IntensityKind::ShiTomasi => 50.0,
            IntensityKind::HessianDeterminant => 100.0,
            IntensityKind::Laplacian => 10.0,
            IntensityKind::Fast => 1.0,
        }
    }
}

impl std::str::FromStr for IntensityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntensityKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown intensity '{}'", s))
    }
}

/// Complete single-scale detector configuration with all settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    pub intensity: IntensityKind,
    /// Non-maximum suppression radius, in intensity cells
    pub radius: usize,
    pub threshold: f32,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub max_features: Option<usize>,
    /// Cells ignored along each edge on top of the algorithm's own border
    pub ignore_border: usize,
    /// Fast-Hessian box size and sample period
    pub box_size: usize,
    pub skip: usize,
    /// Structure tensor window radius for Harris / Shi-Tomasi
    pub window_radius: usize,
    pub harris_k: f32,
    /// FAST segment test
    pub fast_threshold: f32,
    pub fast_arc: usize,
    pub subpixel_refinement: bool,
    /// Size of the global rayon pool when these settings drive a run
    pub n_threads: usize,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub version: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new(IntensityKind::FastHessian)
    }
}

impl DetectorConfig {
    /// Create new configuration with default settings for `intensity`
    pub fn new(intensity: IntensityKind) -> Self {
        Self {
            intensity,
            radius: 2,
            threshold: intensity.default_threshold(),
            max_features: None,
            ignore_border: 0,
            box_size: 9,
            skip: 1,
            window_radius: 2,
            harris_k: 0.04,
            fast_threshold: 20.0,
            fast_arc: 9,
            subpixel_refinement: true,
            n_threads: 1,
            name: None,
            description: None,
            version: None,
        }
    }

    /// Few, well separated features
    pub fn sparse_preset() -> Self {
        Self {
            radius: 6,
            threshold: 4.0,
            max_features: Some(500),
            box_size: 15,
            skip: 2,
            n_threads: hessian_core::default_threads(),
            name: Some("Sparse".to_string()),
            description: Some("Coarse Fast-Hessian blobs with wide suppression".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new(IntensityKind::FastHessian)
        }
    }

    /// Many features, tight suppression
    pub fn dense_preset() -> Self {
        Self {
            radius: 1,
            threshold: 0.25,
            max_features: None,
            n_threads: hessian_core::default_threads(),
            name: Some("Dense".to_string()),
            description: Some("Fine Fast-Hessian blobs with minimal suppression".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new(IntensityKind::FastHessian)
        }
    }

    pub fn harris_preset() -> Self {
        Self {
            radius: 3,
            max_features: Some(1000),
            name: Some("Harris".to_string()),
            description: Some("Harris corners over a 5x5 window".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new(IntensityKind::Harris)
        }
    }

    pub fn fast_preset() -> Self {
        Self {
            radius: 2,
            fast_threshold: 30.0,
            fast_arc: 9,
            subpixel_refinement: false,
            name: Some("Fast".to_string()),
            description: Some("FAST-9 segment test corners of both polarities".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new(IntensityKind::Fast)
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    /// Convert to DetectorBuilder for further customization
    pub fn to_builder(self) -> DetectorBuilder {
        DetectorBuilder::from_config(self)
    }

    /// Instantiates the configured intensity algorithm
    pub fn create_intensity(&self) -> DetectResult<Box<dyn FeatureIntensity + Send>> {
        Ok(match self.intensity {
            IntensityKind::FastHessian => Box::new(FastHessianBoxIntensity::new(self.box_size, self.skip)?),
            IntensityKind::Harris => Box::new(CornerIntensity::harris(self.harris_k, self.window_radius)?),
            IntensityKind::ShiTomasi => Box::new(CornerIntensity::shi_tomasi(self.window_radius)?),
            IntensityKind::HessianDeterminant => Box::new(HessianBlobIntensity::new(BlobKind::Determinant)),
            IntensityKind::Laplacian => Box::new(HessianBlobIntensity::new(BlobKind::Trace)),
            IntensityKind::Fast => Box::new(FastCornerIntensity::new(self.fast_threshold, self.fast_arc)?),
        })
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        let detail = match self.intensity {
            IntensityKind::FastHessian => format!("size={}, skip={}", self.box_size, self.skip),
            IntensityKind::Harris => format!("window={}, k={}", self.window_radius, self.harris_k),
            IntensityKind::ShiTomasi => format!("window={}", self.window_radius),
            IntensityKind::HessianDeterminant | IntensityKind::Laplacian => "3-tap".to_string(),
            IntensityKind::Fast => format!("threshold={}, arc={}", self.fast_threshold, self.fast_arc),
        };
        let max = self.max_features.map_or("all".to_string(), |n| n.to_string());
        format!(
            "DetectorConfig: {} [{}], radius={}, threshold={}, max_features={}, border+={}, subpixel={}, threads={}",
            self.intensity.name(),
            detail,
            self.radius,
            self.threshold,
            max,
            self.ignore_border,
            self.subpixel_refinement,
            self.n_threads
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> DetectResult<()> {
        if !self.threshold.is_finite() {
            return Err(DetectError::InvalidThreshold(self.threshold));
        }
        if self.n_threads == 0 {
            return Err(DetectError::InvalidScaleSpace("n_threads must be >= 1"));
        }
        // parameter checks live in the algorithm constructors
        self.create_intensity().map(|_| ())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

/// Multi-octave Fast-Hessian settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FastHessianConfig {
    /// Minimum determinant response for an interest point
    pub threshold: f32,
    /// Non-maximum suppression radius within one scale, in sampled cells
    pub extract_radius: usize,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub max_features_per_scale: Option<usize>,
    /// Sample period of the first octave
    pub initial_sample_rate: usize,
    /// Box size of the first level of the first octave
    pub initial_size: usize,
    /// Size increment between levels of the first octave
    pub scale_step: usize,
    pub scales_per_octave: usize,
    pub octaves: usize,
    /// Size of the global rayon pool; levels of an octave run in parallel
    pub n_threads: usize,
}

impl Default for FastHessianConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            extract_radius: 2,
            max_features_per_scale: None,
            initial_sample_rate: 1,
            initial_size: 9,
            scale_step: 6,
            scales_per_octave: 4,
            octaves: 4,
            n_threads: 1,
        }
    }
}

impl FastHessianConfig {
    /// Box sizes of every level in `octave`, coarsest last
    pub fn octave_sizes(&self, octave: usize) -> Vec<usize> {
        let factor = 1usize << octave;
        let step = self.scale_step * factor;
        let first = self.initial_size + (factor - 1) * self.scale_step;
        (0..self.scales_per_octave).map(|i| first + i * step).collect()
    }

    /// Sample period used in `octave`
    pub fn octave_skip(&self, octave: usize) -> usize {
        self.initial_sample_rate << octave
    }

    pub fn summary(&self) -> String {
        let max = self.max_features_per_scale.map_or("all".to_string(), |n| n.to_string());
        format!(
            "FastHessianConfig: threshold={}, radius={}, max/scale={}, sample={}, size={}, step={}, scales={}, octaves={}, threads={}",
            self.threshold,
            self.extract_radius,
            max,
            self.initial_sample_rate,
            self.initial_size,
            self.scale_step,
            self.scales_per_octave,
            self.octaves,
            self.n_threads
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> DetectResult<()> {
        if !self.threshold.is_finite() {
            return Err(DetectError::InvalidThreshold(self.threshold));
        }
        if self.initial_sample_rate == 0 {
            return Err(DetectError::InvalidSkip(0));
        }
        if self.initial_size < 3 {
            return Err(DetectError::Image(hessian_core::CoreError::InvalidKernelSize(self.initial_size)));
        }
        if self.scale_step == 0 {
            return Err(DetectError::InvalidScaleSpace("scale_step must be >= 1"));
        }
        if self.scales_per_octave < 3 {
            return Err(DetectError::InvalidScaleSpace("scales_per_octave must be >= 3"));
        }
        if self.octaves == 0 || self.octaves > 16 {
            return Err(DetectError::InvalidScaleSpace("octaves must be in 1..=16"));
        }
        if self.n_threads == 0 {
            return Err(DetectError::InvalidScaleSpace("n_threads must be >= 1"));
        }
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

/// Geometric image pyramid settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PyramidConfig {
    pub scale_factor: f32,
    pub max_levels: usize,
    /// Levels smaller than this along either axis are not generated
    pub min_size: usize,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self { scale_factor: 1.2, max_levels: 8, min_size: 32 }
    }
}

impl PyramidConfig {
    pub fn validate(&self) -> DetectResult<()> {
        if !(self.scale_factor > 1.0 && self.scale_factor.is_finite()) {
            return Err(DetectError::InvalidPyramid("scale_factor must be > 1"));
        }
        if self.max_levels == 0 {
            return Err(DetectError::InvalidPyramid("max_levels must be >= 1"));
        }
        if self.min_size == 0 {
            return Err(DetectError::InvalidPyramid("min_size must be >= 1"));
        }
        Ok(())
    }
}
