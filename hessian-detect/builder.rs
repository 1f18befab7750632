use crate::config::{DetectorConfig, IntensityKind};
use crate::configured_detector::ConfiguredDetector;
use crate::detector::GeneralFeatureDetector;
use crate::error::DetectResult;

/// Builder for creating a `ConfiguredDetector`
#[derive(Debug, Clone)]
pub struct DetectorBuilder {
    config: DetectorConfig,
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new(IntensityKind::FastHessian)
    }
}

impl DetectorBuilder {
    /// Create a new builder with default settings for `intensity`
    pub fn new(intensity: IntensityKind) -> Self {
        Self { config: DetectorConfig::new(intensity) }
    }

    /// Switch the intensity algorithm, resetting the threshold to its default
    pub fn intensity(mut self, intensity: IntensityKind) -> Self {
        self.config.intensity = intensity;
        self.config.threshold = intensity.default_threshold();
        self
    }

    /// Set the non-maximum suppression radius
    pub fn radius(mut self, radius: usize) -> Self {
        self.config.radius = radius;
        self
    }

    /// Set the extraction threshold
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Keep at most `n` features of each polarity
    pub fn max_features(mut self, n: usize) -> Self {
        self.config.max_features = Some(n);
        self
    }

    pub fn unlimited_features(mut self) -> Self {
        self.config.max_features = None;
        self
    }

    /// Ignore additional cells along the image edge
    pub fn ignore_border(mut self, border: usize) -> Self {
        self.config.ignore_border = border;
        self
    }

    /// Set the Fast-Hessian box size and sample period
    pub fn box_size(mut self, size: usize, skip: usize) -> Self {
        self.config.box_size = size;
        self.config.skip = skip;
        self
    }

    pub fn harris_k(mut self, k: f32) -> Self {
        self.config.harris_k = k;
        self
    }

    /// Set the structure tensor window radius
    pub fn window_radius(mut self, radius: usize) -> Self {
        self.config.window_radius = radius;
        self
    }

    /// Set the FAST pixel threshold and minimum arc length
    pub fn fast(mut self, threshold: f32, min_arc: usize) -> Self {
        self.config.fast_threshold = threshold;
        self.config.fast_arc = min_arc;
        self
    }

    /// Enable or disable subpixel refinement
    pub fn subpixel_refinement(mut self, enable: bool) -> Self {
        self.config.subpixel_refinement = enable;
        self
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Apply the sparse preset
    pub fn preset_sparse(mut self) -> Self {
        self.config = DetectorConfig::sparse_preset();
        self
    }

    /// Apply the dense preset
    pub fn preset_dense(mut self) -> Self {
        self.config = DetectorConfig::dense_preset();
        self
    }

    /// Apply the Harris preset
    pub fn preset_harris(mut self) -> Self {
        self.config = DetectorConfig::harris_preset();
        self
    }

    /// Apply the FAST preset
    pub fn preset_fast(mut self) -> Self {
        self.config = DetectorConfig::fast_preset();
        self
    }

    /// Build the `ConfiguredDetector`
    pub fn build(self) -> DetectResult<ConfiguredDetector> {
        self.config.validate()?;
        let intensity = self.config.create_intensity()?;
        let detector = GeneralFeatureDetector::new(
            intensity,
            self.config.radius,
            self.config.threshold,
            self.config.max_features,
        )?
        .with_extra_border(self.config.ignore_border);
        Ok(ConfiguredDetector::new(detector, self.config))
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.config.summary()
    }

    /// Create a builder from an existing `DetectorConfig`
    pub fn from_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Convert the builder into a `DetectorConfig`
    pub fn to_config(self) -> DetectorConfig {
        self.config
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectError;

    #[test]
    fn test_builder_sets_fields() {
        let config = DetectorBuilder::new(IntensityKind::Harris)
            .radius(4)
            .threshold(12.0)
            .max_features(100)
            .harris_k(0.06)
            .window_radius(3)
            .ignore_border(1)
            .threads(2)
            .to_config();
        assert_eq!(config.intensity, IntensityKind::Harris);
        assert_eq!(config.radius, 4);
        assert_eq!(config.threshold, 12.0);
        assert_eq!(config.max_features, Some(100));
        assert_eq!(config.harris_k, 0.06);
        assert_eq!(config.window_radius, 3);
        assert_eq!(config.ignore_border, 1);
        assert_eq!(config.n_threads, 2);
    }

    #[test]
    fn test_intensity_resets_threshold() {
        let config = DetectorBuilder::default().threshold(99.0).intensity(IntensityKind::Laplacian).to_config();
        assert_eq!(config.threshold, IntensityKind::Laplacian.default_threshold());
    }

    #[test]
    fn test_config_round_trip() {
        let config = DetectorConfig::sparse_preset();
        let back = DetectorBuilder::from_config(config.clone()).to_config();
        assert_eq!(back, config);
        assert_eq!(config.clone().to_builder().summary(), config.summary());
    }

    #[test]
    fn test_build_rejects_invalid() {
        let err = DetectorBuilder::new(IntensityKind::FastHessian).box_size(9, 0).build().unwrap_err();
        assert_eq!(err, DetectError::InvalidSkip(0));
        let err = DetectorBuilder::new(IntensityKind::Fast).fast(10.0, 8).build().unwrap_err();
        assert_eq!(err, DetectError::InvalidArcLength(8));
    }

    #[test]
    fn test_build_every_kind() {
        for kind in IntensityKind::ALL {
            let detector = DetectorBuilder::new(kind).build().unwrap();
            assert_eq!(detector.config().intensity, kind);
        }
    }
}
