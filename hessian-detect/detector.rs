use hessian_core::{Candidate, ImageView};
use log::trace;

use crate::error::{DetectError, DetectResult};
use crate::extract::{CandidateList, NonMaxExtractor};
use crate::intensity::FeatureIntensity;
use crate::types::Extremum;

/// Runs an intensity algorithm and extracts its local extrema.
///
/// Maximums and minimums are kept in separate lists. Both are cleared at the
/// start of every [`process`](GeneralFeatureDetector::process) call.
#[derive(Debug, Clone)]
pub struct GeneralFeatureDetector<I> {
    intensity: I,
    extractor: NonMaxExtractor,
    max_features: Option<usize>,
    extra_border: usize,
    maximums: CandidateList,
    minimums: CandidateList,
}

impl<I: FeatureIntensity> GeneralFeatureDetector<I> {
    /// Creates a new detector with validation
    pub fn new(intensity: I, radius: usize, threshold: f32, max_features: Option<usize>) -> DetectResult<Self> {
        Ok(Self {
            intensity,
            extractor: NonMaxExtractor::new(radius, threshold)?,
            max_features,
            extra_border: 0,
            maximums: CandidateList::new(),
            minimums: CandidateList::new(),
        })
    }

    /// Ignore `border` additional cells along each edge on top of the
    /// algorithm's own ignore border.
    pub fn with_extra_border(mut self, border: usize) -> Self {
        self.extra_border = border;
        self
    }

    pub fn process(&mut self, image: ImageView<'_, f32>) -> DetectResult<()> {
        self.maximums.reset();
        self.minimums.reset();

        if image.width() == 0 || image.height() == 0 {
            return Err(DetectError::InvalidImageSize { width: image.width(), height: image.height() });
        }

        self.intensity.process(image)?;
        let border = self.ignore_border();
        self.extractor.set_ignore_border(border);
        let map = self.intensity.intensity();

        if self.intensity.local_maximums() {
            Self::extract(&self.intensity, &self.extractor, map, Extremum::Maximum, &mut self.maximums)?;
            if let Some(n) = self.max_features {
                self.maximums.retain_best(n, Extremum::Maximum);
            }
        }
        if self.intensity.local_minimums() {
            Self::extract(&self.intensity, &self.extractor, map, Extremum::Minimum, &mut self.minimums)?;
            if let Some(n) = self.max_features {
                self.minimums.retain_best(n, Extremum::Minimum);
            }
        }

        trace!(
            "{}: {}x{} map, {} maximums, {} minimums",
            self.intensity.name(),
            map.width(),
            map.height(),
            self.maximums.len(),
            self.minimums.len()
        );
        Ok(())
    }

    fn extract(
        intensity: &I,
        extractor: &NonMaxExtractor,
        map: ImageView<'_, f32>,
        kind: Extremum,
        found: &mut CandidateList,
    ) -> DetectResult<()> {
        match intensity.candidates(kind) {
            Some(candidates) => extractor.process_candidates(map, candidates, kind, found),
            None => extractor.process(map, kind, found),
        }
    }

    pub fn maximums(&self) -> &[Candidate] {
        self.maximums.as_slice()
    }

    pub fn minimums(&self) -> &[Candidate] {
        self.minimums.as_slice()
    }

    /// Intensity map of the last processed image.
    pub fn intensity(&self) -> ImageView<'_, f32> {
        self.intensity.intensity()
    }

    pub fn algorithm(&self) -> &I {
        &self.intensity
    }

    /// Total border, in intensity cells, excluded from extraction.
    pub fn ignore_border(&self) -> usize {
        self.intensity.ignore_border() + self.extra_border
    }

    pub fn radius(&self) -> usize {
        self.extractor.radius()
    }

    pub fn threshold(&self) -> f32 {
        self.extractor.threshold()
    }

    pub fn set_threshold(&mut self, threshold: f32) -> DetectResult<()> {
        self.extractor.set_threshold(threshold)
    }

    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    pub fn set_max_features(&mut self, max_features: Option<usize>) {
        self.max_features = max_features;
    }

    pub fn canonical_radius(&self) -> usize {
        self.intensity.canonical_radius()
    }
}
