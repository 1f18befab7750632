use hessian_core::{Candidate, Image, ImageView, IntegralImage};

use crate::error::{DetectError, DetectResult};
use crate::fast_hessian;
use crate::types::Extremum;

/// An algorithm that turns an image into a per-pixel feature intensity map.
///
/// Implementations own their output buffer and overwrite every cell on each
/// call to [`process`](FeatureIntensity::process).
pub trait FeatureIntensity {
    fn process(&mut self, image: ImageView<'_, f32>) -> DetectResult<()>;

    /// Intensity map from the last call to `process`.
    fn intensity(&self) -> ImageView<'_, f32>;

    /// Candidate locations found while computing the intensity, if this
    /// algorithm produces them. Extraction then only inspects these points.
    fn candidates(&self, _kind: Extremum) -> Option<&[Candidate]> {
        None
    }

    /// Cells along each edge of the intensity map that hold no valid response.
    fn ignore_border(&self) -> usize;

    /// Radius, in input pixels, of the region that contributes to one response.
    fn canonical_radius(&self) -> usize;

    /// Input pixels between adjacent intensity cells.
    fn sample_period(&self) -> usize {
        1
    }

    fn local_maximums(&self) -> bool;

    fn local_minimums(&self) -> bool;

    fn name(&self) -> &'static str;
}

impl<F: FeatureIntensity + ?Sized> FeatureIntensity for Box<F> {
    fn process(&mut self, image: ImageView<'_, f32>) -> DetectResult<()> {
        (**self).process(image)
    }

    fn intensity(&self) -> ImageView<'_, f32> {
        (**self).intensity()
    }

    fn candidates(&self, kind: Extremum) -> Option<&[Candidate]> {
        (**self).candidates(kind)
    }

    fn ignore_border(&self) -> usize {
        (**self).ignore_border()
    }

    fn canonical_radius(&self) -> usize {
        (**self).canonical_radius()
    }

    fn sample_period(&self) -> usize {
        (**self).sample_period()
    }

    fn local_maximums(&self) -> bool {
        (**self).local_maximums()
    }

    fn local_minimums(&self) -> bool {
        (**self).local_minimums()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Single-scale Fast-Hessian determinant of a box filter of side `size`,
/// sampled every `skip` pixels.
#[derive(Debug, Clone)]
pub struct FastHessianBoxIntensity {
    size: usize,
    skip: usize,
    integral: IntegralImage,
    map: Image<f32>,
}

impl FastHessianBoxIntensity {
    pub fn new(size: usize, skip: usize) -> DetectResult<Self> {
        if skip == 0 {
            return Err(DetectError::InvalidSkip(skip));
        }
        hessian_core::BoxGeometry::new(size)?;
        Ok(Self { size, skip, integral: IntegralImage::new(), map: Image::new(0, 0) })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn skip(&self) -> usize {
        self.skip
    }
}

impl FeatureIntensity for FastHessianBoxIntensity {
    fn process(&mut self, image: ImageView<'_, f32>) -> DetectResult<()> {
        self.integral.update(image);
        self.map.reshape(image.width() / self.skip, image.height() / self.skip);
        fast_hessian::intensity(self.integral.view(), self.skip, self.size, &mut self.map.view_mut())
    }

    fn intensity(&self) -> ImageView<'_, f32> {
        self.map.view()
    }

    fn ignore_border(&self) -> usize {
        // kernels may read integral column -1, which is exactly zero
        (self.size / 2 + self.skip) / self.skip
    }

    fn canonical_radius(&self) -> usize {
        self.size / 2
    }

    fn sample_period(&self) -> usize {
        self.skip
    }

    fn local_maximums(&self) -> bool {
        true
    }

    fn local_minimums(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "fast-hessian"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_intensity_shape_follows_skip() {
        let img = Image::<f32>::new(37, 25);
        let mut alg = FastHessianBoxIntensity::new(9, 2).unwrap();
        alg.process(img.view()).unwrap();
        assert_eq!((alg.intensity().width(), alg.intensity().height()), (18, 12));
        assert_eq!(alg.ignore_border(), 3);
        assert!(alg.candidates(Extremum::Maximum).is_none());
    }

    #[test]
    fn test_box_intensity_reuses_buffer_on_smaller_input() {
        let mut alg = FastHessianBoxIntensity::new(9, 1).unwrap();
        let mut big = Image::<f32>::new(40, 40);
        big.fill(5.0);
        alg.process(big.view()).unwrap();
        assert!(alg.intensity().pixels().any(|(_, _, v)| v != 0.0));

        let small = Image::<f32>::new(20, 10);
        alg.process(small.view()).unwrap();
        let map = alg.intensity();
        assert_eq!((map.width(), map.height()), (20, 10));
        assert!(map.pixels().all(|(_, _, v)| v == 0.0));
    }

    #[test]
    fn test_boxed_trait_object_forwards() {
        let mut alg: Box<dyn FeatureIntensity + Send> = Box::new(FastHessianBoxIntensity::new(15, 1).unwrap());
        alg.process(Image::<f32>::new(30, 30).view()).unwrap();
        assert_eq!(alg.name(), "fast-hessian");
        assert_eq!(alg.canonical_radius(), 7);
        assert!(alg.local_maximums() && !alg.local_minimums());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert_eq!(FastHessianBoxIntensity::new(9, 0).unwrap_err(), DetectError::InvalidSkip(0));
        assert!(FastHessianBoxIntensity::new(1, 1).is_err());
    }
}
