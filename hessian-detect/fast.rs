use hessian_core::{Candidate, Image, ImageView};
use rayon::prelude::*;

use crate::error::{DetectError, DetectResult};
use crate::extract::CandidateList;
use crate::intensity::FeatureIntensity;
use crate::types::{CornerType, Extremum};
use crate::utils::has_consecutive_bits;

/// FAST circle offsets, in circular order
pub const FAST_OFFSETS: [(i32, i32); 16] = [
    (0, -3), (1, -3), (2, -2), (3, -1),
    (3, 0), (3, 1), (2, 2), (1, 3),
    (0, 3), (-1, 3), (-2, 2), (-3, 1),
    (-3, 0), (-3, -1), (-2, -2), (-1, -3),
];

/// FAST segment-test corners.
///
/// A pixel is a corner when at least `min_arc` contiguous pixels on the
/// radius-3 circle are all brighter than `centre + threshold` (positive
/// intensity) or all darker than `centre - threshold` (negative intensity).
/// The magnitude is the summed excess over the threshold along the circle.
/// Every detected pixel is also reported as a candidate, so extraction only
/// has to look at those.
#[derive(Debug, Clone)]
pub struct FastCornerIntensity {
    threshold: f32,
    min_arc: usize,
    map: Image<f32>,
    bright: CandidateList,
    dark: CandidateList,
}

impl FastCornerIntensity {
    pub fn new(threshold: f32, min_arc: usize) -> DetectResult<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(DetectError::InvalidThreshold(threshold));
        }
        if !(9..=12).contains(&min_arc) {
            return Err(DetectError::InvalidArcLength(min_arc));
        }
        Ok(Self {
            threshold,
            min_arc,
            map: Image::new(0, 0),
            bright: CandidateList::new(),
            dark: CandidateList::new(),
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn min_arc(&self) -> usize {
        self.min_arc
    }

    /// Classifies one pixel; returns the corner type and its signed score.
    fn segment_test(&self, image: ImageView<'_, f32>, x: usize, y: usize) -> (CornerType, f32) {
        let centre = image.get(x, y);
        let upper = centre + self.threshold;
        let lower = centre - self.threshold;

        let mut bright_mask = 0u16;
        let mut dark_mask = 0u16;
        let mut bright_sum = 0.0f32;
        let mut dark_sum = 0.0f32;

        for (i, &(dx, dy)) in FAST_OFFSETS.iter().enumerate() {
            let px = (x as i32 + dx) as usize;
            let py = (y as i32 + dy) as usize;
            let v = image.get(px, py);
            if v > upper {
                bright_mask |= 1 << i;
                bright_sum += v - upper;
            } else if v < lower {
                dark_mask |= 1 << i;
                dark_sum += lower - v;
            }
        }

        if has_consecutive_bits(bright_mask, self.min_arc) {
            (CornerType::Bright, bright_sum)
        } else if has_consecutive_bits(dark_mask, self.min_arc) {
            (CornerType::Dark, -dark_sum)
        } else {
            (CornerType::None, 0.0)
        }
    }
}

impl FeatureIntensity for FastCornerIntensity {
    fn process(&mut self, image: ImageView<'_, f32>) -> DetectResult<()> {
        let (w, h) = (image.width(), image.height());
        self.map.reshape(w, h);
        self.map.fill(0.0);
        self.bright.reset();
        self.dark.reset();
        if w < 7 || h < 7 {
            return Ok(());
        }

        let this = &*self;
        let rows: Vec<Vec<(usize, CornerType, f32)>> = (3..h - 3)
            .into_par_iter()
            .map(|y| {
                (3..w - 3)
                    .filter_map(|x| match this.segment_test(image, x, y) {
                        (CornerType::None, _) => None,
                        (kind, score) => Some((x, kind, score)),
                    })
                    .collect()
            })
            .collect();

        for (row, y) in rows.into_iter().zip(3..) {
            for (x, kind, score) in row {
                self.map.set(x, y, score);
                let c = Candidate::new(x, y, score);
                match kind {
                    CornerType::Bright => self.bright.push(c),
                    CornerType::Dark => self.dark.push(c),
                    CornerType::None => {}
                }
            }
        }
        Ok(())
    }

    fn intensity(&self) -> ImageView<'_, f32> {
        self.map.view()
    }

    fn candidates(&self, kind: Extremum) -> Option<&[Candidate]> {
        Some(match kind {
            Extremum::Maximum => self.bright.as_slice(),
            Extremum::Minimum => self.dark.as_slice(),
        })
    }

    fn ignore_border(&self) -> usize {
        3
    }

    fn canonical_radius(&self) -> usize {
        3
    }

    fn local_maximums(&self) -> bool {
        true
    }

    fn local_minimums(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "fast"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_corner_image(width: usize, height: usize, bright: bool) -> Image<f32> {
        let (bg, fg) = if bright { (50.0, 255.0) } else { (200.0, 10.0) };
        let mut img = Image::new(width, height);
        img.fill(bg);
        let (cx, cy) = (width / 2, height / 2);
        for y in cy - 2..=cy + 2 {
            for x in cx - 2..=cx + 2 {
                img.set(x, y, fg);
            }
        }
        img
    }

    #[test]
    fn test_uniform_image_has_no_corners() {
        let mut img = Image::new(20, 20);
        img.fill(128.0);
        let mut alg = FastCornerIntensity::new(20.0, 9).unwrap();
        alg.process(img.view()).unwrap();
        assert!(alg.candidates(Extremum::Maximum).unwrap().is_empty());
        assert!(alg.candidates(Extremum::Minimum).unwrap().is_empty());
        assert!(alg.intensity().pixels().all(|(_, _, v)| v == 0.0));
    }

    #[test]
    fn test_square_corner_sees_darker_arc() {
        let img = create_corner_image(21, 21, true);
        let mut alg = FastCornerIntensity::new(20.0, 9).unwrap();
        alg.process(img.view()).unwrap();

        // 11 of the 16 circle pixels around (8, 8) fall on the background
        let dark = alg.candidates(Extremum::Minimum).unwrap();
        assert!(dark.iter().any(|c| (c.x, c.y) == (8, 8)), "{:?}", dark);
        assert!(dark.iter().all(|c| c.intensity < 0.0));
        assert!(alg.intensity().get(8, 8) < 0.0);
    }

    #[test]
    fn test_polarity_flips_with_contrast() {
        let img = create_corner_image(21, 21, false);
        let mut alg = FastCornerIntensity::new(20.0, 9).unwrap();
        alg.process(img.view()).unwrap();

        let bright = alg.candidates(Extremum::Maximum).unwrap();
        assert!(bright.iter().any(|c| (c.x, c.y) == (8, 8)));
        assert!(bright.iter().all(|c| c.intensity > 0.0));
    }

    #[test]
    fn test_small_image_is_ignored() {
        let img = create_corner_image(6, 6, true);
        let mut alg = FastCornerIntensity::new(10.0, 9).unwrap();
        alg.process(img.view()).unwrap();
        assert_eq!(alg.intensity().width(), 6);
        assert!(alg.candidates(Extremum::Minimum).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(FastCornerIntensity::new(-1.0, 9).unwrap_err(), DetectError::InvalidThreshold(-1.0));
        assert_eq!(FastCornerIntensity::new(10.0, 8).unwrap_err(), DetectError::InvalidArcLength(8));
        assert!(FastCornerIntensity::new(10.0, 13).is_err());
    }
}
