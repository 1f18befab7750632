use hessian_core::{Image, ImageView};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::derivative;
use crate::error::DetectResult;
use crate::intensity::FeatureIntensity;

/// Blob response computed from pixel-level second derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BlobKind {
    /// `Dxx * Dyy - Dxy^2`, positive for bright and dark blobs alike
    Determinant,
    /// `Dxx + Dyy`, negative on bright blobs and positive on dark ones
    Trace,
}

#[derive(Debug, Clone)]
pub struct HessianBlobIntensity {
    kind: BlobKind,
    deriv_xx: Image<f32>,
    deriv_yy: Image<f32>,
    deriv_xy: Image<f32>,
    map: Image<f32>,
}

impl HessianBlobIntensity {
    pub fn new(kind: BlobKind) -> Self {
        Self {
            kind,
            deriv_xx: Image::new(0, 0),
            deriv_yy: Image::new(0, 0),
            deriv_xy: Image::new(0, 0),
            map: Image::new(0, 0),
        }
    }

    pub fn kind(&self) -> BlobKind {
        self.kind
    }
}

impl FeatureIntensity for HessianBlobIntensity {
    fn process(&mut self, image: ImageView<'_, f32>) -> DetectResult<()> {
        derivative::hessian_three(image, &mut self.deriv_xx, &mut self.deriv_yy, &mut self.deriv_xy);
        self.map.reshape(image.width(), image.height());

        for y in 0..image.height() {
            let xx = self.deriv_xx.row(y);
            let yy = self.deriv_yy.row(y);
            let xy = self.deriv_xy.row(y);
            let out = self.map.row_mut(y);
            for x in 0..out.len() {
                out[x] = match self.kind {
                    BlobKind::Determinant => xx[x] * yy[x] - xy[x] * xy[x],
                    BlobKind::Trace => xx[x] + yy[x],
                };
            }
        }
        Ok(())
    }

    fn intensity(&self) -> ImageView<'_, f32> {
        self.map.view()
    }

    fn ignore_border(&self) -> usize {
        1
    }

    fn canonical_radius(&self) -> usize {
        1
    }

    fn local_maximums(&self) -> bool {
        true
    }

    fn local_minimums(&self) -> bool {
        self.kind == BlobKind::Trace
    }

    fn name(&self) -> &'static str {
        match self.kind {
            BlobKind::Determinant => "hessian-determinant",
            BlobKind::Trace => "laplacian",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(w: usize, h: usize, x: usize, y: usize, value: f32) -> Image<f32> {
        let mut img = Image::new(w, h);
        img.set(x, y, value);
        img
    }

    #[test]
    fn test_trace_of_bright_dot_is_negative() {
        let img = dot(7, 7, 3, 3, 10.0);
        let mut alg = HessianBlobIntensity::new(BlobKind::Trace);
        alg.process(img.view()).unwrap();
        assert_eq!(alg.intensity().get(3, 3), -40.0);
        assert_eq!(alg.intensity().get(2, 3), 10.0);
        assert!(alg.local_minimums());
    }

    #[test]
    fn test_determinant_of_bright_dot_is_positive() {
        let img = dot(7, 7, 3, 3, 10.0);
        let mut alg = HessianBlobIntensity::new(BlobKind::Determinant);
        alg.process(img.view()).unwrap();
        assert_eq!(alg.intensity().get(3, 3), 400.0);
        assert!(!alg.local_minimums());
        assert_eq!(alg.name(), "hessian-determinant");
    }

    #[test]
    fn test_every_cell_overwritten() {
        let mut alg = HessianBlobIntensity::new(BlobKind::Trace);
        alg.process(dot(9, 9, 4, 4, 50.0).view()).unwrap();
        alg.process(Image::new(9, 9).view()).unwrap();
        assert!(alg.intensity().pixels().all(|(_, _, v)| v == 0.0));
    }
}
