use std::fmt;

use hessian_core::{Candidate, Image, ImageView, Pixel, ScalePoint, convert_to_f32};

use crate::config::{DetectorConfig, IntensityKind};
use crate::detector::GeneralFeatureDetector;
use crate::error::DetectResult;
use crate::intensity::FeatureIntensity;
use crate::refinement::PeakRefinement;
use crate::scale_space::size_to_scale;

/// A single-scale detector built from a [`DetectorConfig`].
///
/// Wraps a [`GeneralFeatureDetector`] over a boxed intensity algorithm and
/// maps its candidates back to input pixel coordinates.
pub struct ConfiguredDetector {
    detector: GeneralFeatureDetector<Box<dyn FeatureIntensity + Send>>,
    config: DetectorConfig,
    scratch: Image<f32>,
}

impl fmt::Debug for ConfiguredDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfiguredDetector")
            .field("algorithm", &self.detector.algorithm().name())
            .field("config", &self.config)
            .finish()
    }
}

impl ConfiguredDetector {
    pub(crate) fn new(
        detector: GeneralFeatureDetector<Box<dyn FeatureIntensity + Send>>,
        config: DetectorConfig,
    ) -> Self {
        Self { detector, config, scratch: Image::new(0, 0) }
    }

    /// Detect features in a floating point image.
    ///
    /// Maximums are listed first, then minimums, each in discovery order.
    pub fn detect(&mut self, image: ImageView<'_, f32>) -> DetectResult<Vec<ScalePoint>> {
        self.detector.process(image)?;

        let map = self.detector.intensity();
        let skip = self.detector.algorithm().sample_period();
        let scale = match self.config.intensity {
            IntensityKind::FastHessian => size_to_scale(self.config.box_size as f32),
            _ => self.detector.canonical_radius().max(1) as f32,
        };
        let refine = self.config.subpixel_refinement;
        let to_point = |c: &Candidate| {
            let (x, y) = if refine {
                PeakRefinement::refine_subpixel(map, c.x, c.y)
            } else {
                (c.x as f32, c.y as f32)
            };
            ScalePoint::new(x * skip as f32, y * skip as f32, scale, c.intensity)
        };

        Ok(self.detector.maximums().iter().chain(self.detector.minimums()).map(to_point).collect())
    }

    /// Detect features in an image of any supported pixel type
    pub fn detect_image<T: Pixel>(&mut self, image: ImageView<'_, T>) -> DetectResult<Vec<ScalePoint>> {
        let mut scratch = std::mem::replace(&mut self.scratch, Image::new(0, 0));
        convert_to_f32(image, &mut scratch);
        let result = self.detect(scratch.view());
        self.scratch = scratch;
        result
    }

    /// Raw maximums of the last call, in intensity-map cells
    pub fn maximums(&self) -> &[Candidate] {
        self.detector.maximums()
    }

    /// Raw minimums of the last call, in intensity-map cells
    pub fn minimums(&self) -> &[Candidate] {
        self.detector.minimums()
    }

    /// Intensity map of the last call
    pub fn intensity(&self) -> ImageView<'_, f32> {
        self.detector.intensity()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Get a summary of the detector's configuration.
    pub fn config_summary(&self) -> String {
        self.config.summary()
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::DetectorBuilder;
    use crate::config::IntensityKind;
    use hessian_core::Image;

    fn bright_square(w: usize, h: usize, cx: usize, cy: usize) -> Image<u8> {
        let mut img = Image::new(w, h);
        for y in cy - 2..=cy + 2 {
            for x in cx - 2..=cx + 2 {
                img.set(x, y, 200);
            }
        }
        img
    }

    #[test]
    fn test_detects_blob_in_u8_image() {
        let img = bright_square(48, 40, 24, 20);
        let mut det = DetectorBuilder::new(IntensityKind::FastHessian).radius(2).build().unwrap();
        let points = det.detect_image(img.view()).unwrap();
        assert!(!points.is_empty());
        let best = points.iter().fold(points[0], |a, &b| if b.intensity > a.intensity { b } else { a });
        assert!((best.x - 24.0).abs() <= 0.5 && (best.y - 20.0).abs() <= 0.5, "{:?}", best);
        assert!((best.scale - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_skip_scales_locations() {
        let img = bright_square(64, 64, 32, 32);
        let mut det = DetectorBuilder::new(IntensityKind::FastHessian)
            .box_size(9, 2)
            .subpixel_refinement(false)
            .build()
            .unwrap();
        let points = det.detect_image(img.view()).unwrap();
        assert!(points.iter().any(|p| (p.x, p.y) == (32.0, 32.0)));
        assert!(points.iter().all(|p| p.x as usize % 2 == 0 && p.y as usize % 2 == 0));
        assert_eq!(det.intensity().width(), 32);
    }

    #[test]
    fn test_laplacian_returns_both_polarities() {
        let mut img = Image::<f32>::new(30, 30);
        for y in 6..=10 {
            for x in 6..=10 {
                img.set(x, y, 80.0);
                img.set(x + 12, y + 12, -80.0);
            }
        }
        let mut det = DetectorBuilder::new(IntensityKind::Laplacian).radius(3).build().unwrap();
        let points = det.detect(img.view()).unwrap();
        assert_eq!(points.len(), det.maximums().len() + det.minimums().len());
        assert!(points.iter().any(|p| p.intensity > 0.0));
        assert!(points.iter().any(|p| p.intensity < 0.0));
        assert!(det.config_summary().contains("laplacian"));
    }
}
