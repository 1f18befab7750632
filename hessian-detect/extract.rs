//! Non-maximum suppression over intensity maps.

use hessian_core::{Candidate, ImageView};

use crate::error::{DetectError, DetectResult};
use crate::types::Extremum;

/// Growable list of candidates that keeps its allocation across frames.
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    points: Vec<Candidate>,
}

impl CandidateList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { points: Vec::with_capacity(capacity) }
    }

    /// Empties the list without releasing memory.
    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.points.push(candidate);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.points.iter()
    }

    /// Keeps the `max` strongest candidates in discovery order.
    ///
    /// Strength is the intensity for maxima and its negation for minima;
    /// ties go to the candidate found first.
    pub fn retain_best(&mut self, max: usize, kind: Extremum) {
        if self.points.len() <= max {
            return;
        }

        let mut order: Vec<usize> = (0..self.points.len()).collect();
        let points = &self.points;
        order.sort_by(|&a, &b| {
            let (va, vb) = (points[a].intensity, points[b].intensity);
            let strongest_first = match kind {
                Extremum::Maximum => vb.total_cmp(&va),
                Extremum::Minimum => va.total_cmp(&vb),
            };
            strongest_first.then(a.cmp(&b))
        });
        order.truncate(max);
        order.sort_unstable();

        let kept: Vec<Candidate> = order.into_iter().map(|i| self.points[i]).collect();
        self.points = kept;
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Sum of the 4-connected neighbours of `(x, y)` that lie inside the map.
pub fn support(map: ImageView<'_, f32>, x: usize, y: usize) -> f32 {
    let (w, h) = (map.width(), map.height());
    let mut total = 0.0;
    if x > 0 {
        total += map.get(x - 1, y);
    }
    if x + 1 < w {
        total += map.get(x + 1, y);
    }
    if y > 0 {
        total += map.get(x, y - 1);
    }
    if y + 1 < h {
        total += map.get(x, y + 1);
    }
    total
}

/// Finds strict local extrema in a square window of side `2 * radius + 1`.
///
/// A cell is kept when it passes the threshold (`>= threshold` for maxima,
/// `<= -threshold` for minima) and beats every other cell of its window that
/// lies inside the map. Cells within `ignore_border` of an edge are never
/// reported.
///
/// An equal neighbour is beaten only when the cell's [`support`] is strictly
/// better, so a plateau peaks at its most enclosed cell. Cells that tie on
/// both suppress each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonMaxExtractor {
    radius: usize,
    threshold: f32,
    ignore_border: usize,
}

impl NonMaxExtractor {
    pub fn new(radius: usize, threshold: f32) -> DetectResult<Self> {
        if !threshold.is_finite() {
            return Err(DetectError::InvalidThreshold(threshold));
        }
        Ok(Self { radius, threshold, ignore_border: 0 })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn ignore_border(&self) -> usize {
        self.ignore_border
    }

    pub fn set_threshold(&mut self, threshold: f32) -> DetectResult<()> {
        if !threshold.is_finite() {
            return Err(DetectError::InvalidThreshold(threshold));
        }
        self.threshold = threshold;
        Ok(())
    }

    pub fn set_radius(&mut self, radius: usize) {
        self.radius = radius;
    }

    pub fn set_ignore_border(&mut self, border: usize) {
        self.ignore_border = border;
    }

    fn check_border(&self, map: ImageView<'_, f32>) -> DetectResult<()> {
        let (w, h) = (map.width(), map.height());
        if 2 * self.ignore_border >= w.min(h) {
            return Err(DetectError::IgnoreBorderTooLarge { border: self.ignore_border, width: w, height: h });
        }
        Ok(())
    }

    fn is_extremum(&self, map: ImageView<'_, f32>, x: usize, y: usize, kind: Extremum) -> bool {
        let value = map.get(x, y);
        if !kind.passes(value, self.threshold) {
            return false;
        }
        let mut own_support = None;

        let x0 = x.saturating_sub(self.radius);
        let y0 = y.saturating_sub(self.radius);
        let x1 = (x + self.radius).min(map.width() - 1);
        let y1 = (y + self.radius).min(map.height() - 1);

        for j in y0..=y1 {
            let row = map.row(j);
            for (i, &other) in row.iter().enumerate().take(x1 + 1).skip(x0) {
                if (i == x && j == y) || kind.beats(value, other) {
                    continue;
                }
                if other == value {
                    let own = *own_support.get_or_insert_with(|| support(map, x, y));
                    if kind.beats(own, support(map, i, j)) {
                        continue;
                    }
                }
                return false;
            }
        }
        true
    }

    /// Scans every cell outside the ignored border.
    ///
    /// `found` is not cleared; results are appended in row-major order.
    pub fn process(&self, map: ImageView<'_, f32>, kind: Extremum, found: &mut CandidateList) -> DetectResult<()> {
        self.check_border(map)?;
        let b = self.ignore_border;
        for y in b..map.height() - b {
            for x in b..map.width() - b {
                if self.is_extremum(map, x, y, kind) {
                    found.push(Candidate::new(x, y, map.get(x, y)));
                }
            }
        }
        Ok(())
    }

    /// Like [`process`](NonMaxExtractor::process) but only inspects the given
    /// locations, in the order supplied.
    pub fn process_candidates(
        &self,
        map: ImageView<'_, f32>,
        candidates: &[Candidate],
        kind: Extremum,
        found: &mut CandidateList,
    ) -> DetectResult<()> {
        self.check_border(map)?;
        let b = self.ignore_border;
        let (w, h) = (map.width(), map.height());
        for c in candidates {
            let inside = c.x >= b && c.y >= b && c.x + b < w && c.y + b < h;
            if inside && self.is_extremum(map, c.x, c.y, kind) {
                found.push(Candidate::new(c.x, c.y, map.get(c.x, c.y)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hessian_core::Image;
    use proptest::prelude::*;

    fn map_from(width: usize, values: &[f32]) -> Image<f32> {
        Image::from_vec(width, values.len() / width, values.to_vec()).unwrap()
    }

    #[test]
    fn test_single_peak() {
        let mut map = Image::new(9, 9);
        map.set(4, 4, 5.0);
        let nms = NonMaxExtractor::new(2, 1.0).unwrap();
        let mut found = CandidateList::new();
        nms.process(map.view(), Extremum::Maximum, &mut found).unwrap();
        assert_eq!(found.as_slice(), &[Candidate::new(4, 4, 5.0)]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut map = Image::new(5, 5);
        map.set(2, 2, 1.0);
        let mut found = CandidateList::new();
        NonMaxExtractor::new(1, 1.0).unwrap().process(map.view(), Extremum::Maximum, &mut found).unwrap();
        assert_eq!(found.len(), 1);

        found.reset();
        NonMaxExtractor::new(1, 1.5).unwrap().process(map.view(), Extremum::Maximum, &mut found).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_plateau_peaks_at_enclosed_cell() {
        let mut map = Image::new(9, 9);
        for (x, y) in [(4, 4), (3, 4), (5, 4), (4, 3), (4, 5)] {
            map.set(x, y, 6.0);
        }
        for radius in 1..=3 {
            let mut found = CandidateList::new();
            NonMaxExtractor::new(radius, 0.0).unwrap().process(map.view(), Extremum::Maximum, &mut found).unwrap();
            assert_eq!(found.as_slice(), &[Candidate::new(4, 4, 6.0)], "radius {}", radius);
        }

        let mut map = Image::new(9, 9);
        for (x, y) in [(4, 4), (3, 4), (5, 4), (4, 3), (4, 5)] {
            map.set(x, y, -6.0);
        }
        let mut found = CandidateList::new();
        NonMaxExtractor::new(1, 1.0).unwrap().process(map.view(), Extremum::Minimum, &mut found).unwrap();
        assert_eq!(found.as_slice(), &[Candidate::new(4, 4, -6.0)]);
    }

    #[test]
    fn test_plateau_suppresses_itself() {
        let mut map = Image::new(6, 6);
        map.set(2, 2, 3.0);
        map.set(3, 2, 3.0);
        let mut found = CandidateList::new();
        NonMaxExtractor::new(1, 0.5).unwrap().process(map.view(), Extremum::Maximum, &mut found).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_minimums_use_negated_threshold() {
        #[rustfmt::skip]
        let map = map_from(5, &[
            0.0, 0.0,  0.0, 0.0, 0.0,
            0.0, 0.0,  0.0, 0.0, 0.0,
            0.0, 0.0, -4.0, 0.0, 0.0,
            0.0, 0.0,  0.0, 0.0, 0.0,
            0.0, 0.0,  0.0, 0.0, 0.0,
        ]);
        let mut found = CandidateList::new();
        let nms = NonMaxExtractor::new(1, 2.0).unwrap();
        nms.process(map.view(), Extremum::Minimum, &mut found).unwrap();
        assert_eq!(found.as_slice(), &[Candidate::new(2, 2, -4.0)]);

        found.reset();
        nms.process(map.view(), Extremum::Maximum, &mut found).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_window_clipped_at_image_edge() {
        let mut map = Image::new(4, 4);
        map.set(0, 0, 2.0);
        let mut found = CandidateList::new();
        NonMaxExtractor::new(3, 1.0).unwrap().process(map.view(), Extremum::Maximum, &mut found).unwrap();
        assert_eq!(found.as_slice(), &[Candidate::new(0, 0, 2.0)]);
    }

    #[test]
    fn test_ignore_border() {
        let mut map = Image::new(8, 8);
        map.set(1, 4, 9.0);
        map.set(4, 4, 2.0);
        let mut nms = NonMaxExtractor::new(1, 1.0).unwrap();
        nms.set_ignore_border(2);
        let mut found = CandidateList::new();
        nms.process(map.view(), Extremum::Maximum, &mut found).unwrap();
        assert_eq!(found.as_slice(), &[Candidate::new(4, 4, 2.0)]);

        nms.set_ignore_border(4);
        assert!(matches!(
            nms.process(map.view(), Extremum::Maximum, &mut found),
            Err(DetectError::IgnoreBorderTooLarge { border: 4, .. })
        ));
    }

    #[test]
    fn test_candidates_only_inspects_given_points() {
        let mut map = Image::new(10, 10);
        map.set(2, 2, 5.0);
        map.set(7, 7, 6.0);
        let nms = NonMaxExtractor::new(1, 1.0).unwrap();
        let mut found = CandidateList::new();
        nms.process_candidates(map.view(), &[Candidate::new(7, 7, 0.0)], Extremum::Maximum, &mut found)
            .unwrap();
        assert_eq!(found.as_slice(), &[Candidate::new(7, 7, 6.0)]);
    }

    #[test]
    fn test_retain_best_keeps_discovery_order() {
        let mut list = CandidateList::new();
        for (i, v) in [3.0, 9.0, 1.0, 7.0, 9.0].into_iter().enumerate() {
            list.push(Candidate::new(i, 0, v));
        }
        list.retain_best(3, Extremum::Maximum);
        let xs: Vec<usize> = list.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![1, 3, 4]);

        let mut list = CandidateList::new();
        for (i, v) in [-3.0, -9.0, -1.0].into_iter().enumerate() {
            list.push(Candidate::new(i, 0, v));
        }
        list.retain_best(1, Extremum::Minimum);
        assert_eq!(list.as_slice(), &[Candidate::new(1, 0, -9.0)]);
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        assert!(NonMaxExtractor::new(1, f32::NAN).is_err());
        let mut nms = NonMaxExtractor::new(1, 0.0).unwrap();
        assert_eq!(nms.set_threshold(f32::INFINITY), Err(DetectError::InvalidThreshold(f32::INFINITY)));
    }

    proptest! {
        #[test]
        fn prop_maxima_are_separated(
            values in proptest::collection::vec(-10i32..10, 144),
            radius in 1usize..4,
        ) {
            let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
            let map = Image::from_vec(12, 12, data).unwrap();
            let nms = NonMaxExtractor::new(radius, 0.0).unwrap();
            let mut found = CandidateList::new();
            nms.process(map.view(), Extremum::Maximum, &mut found).unwrap();

            for (i, a) in found.iter().enumerate() {
                prop_assert!(a.intensity >= 0.0);
                for b in found.iter().skip(i + 1) {
                    let dx = a.x.abs_diff(b.x);
                    let dy = a.y.abs_diff(b.y);
                    prop_assert!(dx > radius || dy > radius);
                }
            }
        }
    }
}
