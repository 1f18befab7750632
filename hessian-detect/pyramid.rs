use hessian_core::{Image, ImageView, Pixel, ScalePoint, convert_to_f32};
use log::debug;

use crate::config::PyramidConfig;
use crate::detector::GeneralFeatureDetector;
use crate::error::{DetectError, DetectResult};
use crate::intensity::FeatureIntensity;
use crate::refinement::PeakRefinement;
use crate::types::ScaleLevel;

/// Geometric image pyramid for multi-scale feature detection
#[derive(Debug, Clone)]
pub struct ImagePyramid {
    config: PyramidConfig,
    levels: Vec<ScaleLevel>,
    images: Vec<Image<f32>>,
}

impl ImagePyramid {
    pub fn new(config: PyramidConfig) -> DetectResult<Self> {
        config.validate()?;
        Ok(Self { config, levels: Vec::new(), images: Vec::new() })
    }

    /// Generate scale levels for image pyramid
    pub fn generate_scale_levels(width: usize, height: usize, config: &PyramidConfig) -> Vec<ScaleLevel> {
        let mut levels = Vec::new();
        let mut current_scale = 1.0f32;

        while levels.len() < config.max_levels {
            let scaled_width = ((width as f32) / current_scale) as usize;
            let scaled_height = ((height as f32) / current_scale) as usize;

            // Stop when image becomes too small for meaningful detection
            if scaled_width < config.min_size || scaled_height < config.min_size {
                break;
            }

            levels.push(ScaleLevel {
                level: levels.len(),
                scale: current_scale,
                width: scaled_width,
                height: scaled_height,
            });
            current_scale *= config.scale_factor;
        }

        levels
    }

    /// Build every level from `image`. Buffers from earlier calls are reused.
    pub fn build<T: Pixel>(&mut self, image: ImageView<'_, T>) -> DetectResult<()> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(DetectError::InvalidImageSize { width, height });
        }

        self.levels = Self::generate_scale_levels(width, height, &self.config);
        if self.images.len() < self.levels.len().max(1) {
            self.images.resize_with(self.levels.len().max(1), || Image::new(0, 0));
        }

        convert_to_f32(image, &mut self.images[0]);
        let (base, rest) = self.images.split_at_mut(1);
        for (level, out) in self.levels.iter().skip(1).zip(rest.iter_mut()) {
            Self::downsample(base[0].view(), level.width, level.height, out);
        }
        Ok(())
    }

    /// Downsample image using bilinear interpolation
    fn downsample(src: ImageView<'_, f32>, width: usize, height: usize, out: &mut Image<f32>) {
        out.reshape(width, height);
        let x_ratio = src.width() as f32 / width as f32;
        let y_ratio = src.height() as f32 / height as f32;

        for y in 0..height {
            let src_y = y as f32 * y_ratio;
            for (x, value) in out.row_mut(y).iter_mut().enumerate() {
                *value = PeakRefinement::bilinear_interpolate(src, x as f32 * x_ratio, src_y);
            }
        }
    }

    pub fn levels(&self) -> &[ScaleLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Image of level `index` from the last `build`.
    pub fn image(&self, index: usize) -> Option<ImageView<'_, f32>> {
        if index < self.levels.len() {
            Some(self.images[index].view())
        } else {
            None
        }
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }
}

/// Runs a [`GeneralFeatureDetector`] on every pyramid level and reports the
/// features in base image coordinates, tagged with the level scale.
#[derive(Debug, Clone)]
pub struct PyramidFeatureDetector<I> {
    pyramid: ImagePyramid,
    detector: GeneralFeatureDetector<I>,
    subpixel_refinement: bool,
    points: Vec<ScalePoint>,
}

impl<I: FeatureIntensity> PyramidFeatureDetector<I> {
    pub fn new(pyramid: ImagePyramid, detector: GeneralFeatureDetector<I>) -> Self {
        Self { pyramid, detector, subpixel_refinement: true, points: Vec::new() }
    }

    pub fn with_subpixel_refinement(mut self, enable: bool) -> Self {
        self.subpixel_refinement = enable;
        self
    }

    pub fn detect<T: Pixel>(&mut self, image: ImageView<'_, T>) -> DetectResult<&[ScalePoint]> {
        self.points.clear();
        self.pyramid.build(image)?;

        let (base_w, base_h) = (image.width() as f32, image.height() as f32);
        for (index, level) in self.pyramid.levels.iter().enumerate() {
            match self.detector.process(self.pyramid.images[index].view()) {
                Ok(()) => {}
                // coarser levels are only smaller
                Err(DetectError::IgnoreBorderTooLarge { .. }) => break,
                Err(e) => return Err(e),
            }

            let map = self.detector.intensity();
            let period = self.detector.algorithm().sample_period() as f32;
            let sx = period * base_w / level.width as f32;
            let sy = period * base_h / level.height as f32;
            let before = self.points.len();
            for c in self.detector.maximums().iter().chain(self.detector.minimums()) {
                let (x, y) = if self.subpixel_refinement {
                    PeakRefinement::refine_subpixel(map, c.x, c.y)
                } else {
                    (c.x as f32, c.y as f32)
                };
                self.points.push(ScalePoint::new(x * sx, y * sy, level.scale, c.intensity));
            }
            debug!(
                "level {} ({}x{}, scale {:.3}): {} features",
                level.level,
                level.width,
                level.height,
                level.scale,
                self.points.len() - before
            );
        }
        Ok(&self.points)
    }

    pub fn points(&self) -> &[ScalePoint] {
        &self.points
    }

    pub fn pyramid(&self) -> &ImagePyramid {
        &self.pyramid
    }

    pub fn detector(&self) -> &GeneralFeatureDetector<I> {
        &self.detector
    }
}
