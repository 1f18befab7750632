//! Multi-octave Fast-Hessian interest point detection.
//!
//! Each octave evaluates `scales_per_octave` box sizes on a shared integral
//! image, sampled every `skip` pixels. A point is accepted when it is a local
//! maximum inside its own level and strictly exceeds the 3x3 neighbourhoods
//! of the levels directly above and below it. Between octaves the sample
//! period, the size increment and the starting size all double.

use hessian_core::{Candidate, Image, ImageView, IntegralImage, Pixel, ScalePoint};
use log::{debug, trace};
use rayon::prelude::*;

use crate::config::FastHessianConfig;
use crate::error::{DetectError, DetectResult};
use crate::extract::{CandidateList, NonMaxExtractor};
use crate::fast_hessian;
use crate::refinement::PeakRefinement;
use crate::types::Extremum;

/// Scale assigned to a box filter of side `size`
#[inline]
pub fn size_to_scale(size: f32) -> f32 {
    1.2 * size / 9.0
}

/// Box size at fractional level offset `peak` in `[-0.5, 0.5]` from the level
/// of side `size`, interpolated towards the neighbour on that side.
fn interpolate_size(below: usize, size: usize, above: usize, peak: f32) -> f32 {
    let step = if peak < 0.0 { size - below } else { above - size };
    size as f32 + peak * step as f32
}

/// True when `value` is strictly larger than every cell of the 3x3 block
/// centred on `(x, y)`.
fn exceeds_neighbourhood(map: ImageView<'_, f32>, value: f32, x: usize, y: usize) -> bool {
    let x1 = (x + 1).min(map.width() - 1);
    let y1 = (y + 1).min(map.height() - 1);
    for j in y.saturating_sub(1)..=y1 {
        let row = map.row(j);
        if row[x.saturating_sub(1)..=x1].iter().any(|&v| v >= value) {
            return false;
        }
    }
    true
}

struct OctaveWorkspace {
    levels: Vec<Image<f32>>,
    extractor: NonMaxExtractor,
    found: CandidateList,
    passed: CandidateList,
    points: Vec<ScalePoint>,
}

impl OctaveWorkspace {
    fn run(&mut self, config: &FastHessianConfig, integral: ImageView<'_, f32>) -> DetectResult<()> {
        self.points.clear();
        let (width, height) = (integral.width(), integral.height());
        if width == 0 || height == 0 {
            return Err(DetectError::InvalidImageSize { width, height });
        }

        for octave in 0..config.octaves {
            let sizes = config.octave_sizes(octave);
            let skip = config.octave_skip(octave);
            let largest = sizes[sizes.len() - 1];
            if largest > width || largest > height {
                debug!("octave {}: kernel {} exceeds {}x{}, stopping", octave, largest, width, height);
                break;
            }
            let before = self.points.len();
            self.octave(config, integral, &sizes, skip)?;
            debug!(
                "octave {}: sizes {:?}, skip {}, {} points",
                octave,
                sizes,
                skip,
                self.points.len() - before
            );
        }
        Ok(())
    }

    fn octave(
        &mut self,
        config: &FastHessianConfig,
        integral: ImageView<'_, f32>,
        sizes: &[usize],
        skip: usize,
    ) -> DetectResult<()> {
        let (w, h) = (integral.width() / skip, integral.height() / skip);
        if self.levels.len() < sizes.len() {
            self.levels.resize_with(sizes.len(), || Image::new(0, 0));
        }

        self.levels[..sizes.len()]
            .par_iter_mut()
            .zip(sizes.par_iter())
            .try_for_each(|(level, &size)| {
                level.reshape(w, h);
                fast_hessian::intensity(integral, skip, size, &mut level.view_mut())
            })?;

        for index in 1..sizes.len() - 1 {
            self.level(config, sizes, index, skip)?;
        }
        Ok(())
    }

    fn level(&mut self, config: &FastHessianConfig, sizes: &[usize], index: usize, skip: usize) -> DetectResult<()> {
        let below = self.levels[index - 1].view();
        let here = self.levels[index].view();
        let above = self.levels[index + 1].view();
        let (size_down, size, size_up) = (sizes[index - 1], sizes[index], sizes[index + 1]);

        // responses near the edge are biased by the zero padding
        let border = size / (2 * skip) + 1;
        self.extractor.set_ignore_border(border);
        self.found.reset();
        match self.extractor.process(here, Extremum::Maximum, &mut self.found) {
            Ok(()) => {}
            Err(DetectError::IgnoreBorderTooLarge { .. }) => {
                trace!("size {}: border {} leaves no room", size, border);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let margin = border + self.extractor.radius();
        let (w, h) = (here.width(), here.height());
        self.passed.reset();
        for c in self.found.iter() {
            if c.x < margin || c.y < margin || c.x + margin >= w || c.y + margin >= h {
                continue;
            }
            if exceeds_neighbourhood(below, c.intensity, c.x, c.y)
                && exceeds_neighbourhood(above, c.intensity, c.x, c.y)
            {
                self.passed.push(*c);
            }
        }
        if let Some(n) = config.max_features_per_scale {
            self.passed.retain_best(n, Extremum::Maximum);
        }

        for &Candidate { x, y, intensity } in self.passed.iter() {
            let peak_x = PeakRefinement::poly_peak(here.get(x - 1, y), intensity, here.get(x + 1, y));
            let peak_y = PeakRefinement::poly_peak(here.get(x, y - 1), intensity, here.get(x, y + 1));
            let peak_s = PeakRefinement::poly_peak(below.get(x, y), intensity, above.get(x, y));

            let interp_size = interpolate_size(size_down, size, size_up, peak_s);
            self.points.push(ScalePoint::new(
                (x as f32 + peak_x) * skip as f32,
                (y as f32 + peak_y) * skip as f32,
                size_to_scale(interp_size),
                intensity,
            ));
        }
        trace!("size {}: {} local maximums, {} in scale space", size, self.found.len(), self.passed.len());
        Ok(())
    }
}

/// SURF-style multi-scale blob detector built on the Fast-Hessian response.
pub struct FastHessianDetector {
    config: FastHessianConfig,
    integral: IntegralImage,
    work: OctaveWorkspace,
}

impl FastHessianDetector {
    pub fn new(config: FastHessianConfig) -> DetectResult<Self> {
        config.validate()?;
        let extractor = NonMaxExtractor::new(config.extract_radius, config.threshold)?;
        Ok(Self {
            config,
            integral: IntegralImage::new(),
            work: OctaveWorkspace {
                levels: Vec::new(),
                extractor,
                found: CandidateList::new(),
                passed: CandidateList::new(),
                points: Vec::new(),
            },
        })
    }

    /// Detect interest points in `image`. Locations are in input pixels.
    pub fn detect<T: Pixel>(&mut self, image: ImageView<'_, T>) -> DetectResult<&[ScalePoint]> {
        self.integral.update(image);
        self.work.run(&self.config, self.integral.view())?;
        Ok(&self.work.points)
    }

    /// Detect interest points from a precomputed integral image.
    pub fn detect_integral(&mut self, integral: ImageView<'_, f32>) -> DetectResult<&[ScalePoint]> {
        self.work.run(&self.config, integral)?;
        Ok(&self.work.points)
    }

    /// Points found by the last call to `detect`.
    pub fn points(&self) -> &[ScalePoint] {
        &self.work.points
    }

    pub fn config(&self) -> &FastHessianConfig {
        &self.config
    }
}
