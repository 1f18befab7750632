use hessian_core::{Image, ImageView, IntegralImage};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::derivative;
use crate::error::{DetectError, DetectResult};
use crate::intensity::FeatureIntensity;

/// Corner response computed from the gradient structure tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CornerKind {
    /// `det(M) - k * trace(M)^2`
    Harris { k: f32 },
    /// Smallest eigenvalue of `M`
    ShiTomasi,
}

impl CornerKind {
    fn response(self, sxx: f32, syy: f32, sxy: f32) -> f32 {
        match self {
            CornerKind::Harris { k } => {
                let det = sxx * syy - sxy * sxy;
                let trace = sxx + syy;
                det - k * trace * trace
            }
            CornerKind::ShiTomasi => {
                let half_trace = 0.5 * (sxx + syy);
                let half_diff = 0.5 * (sxx - syy);
                half_trace - (half_diff * half_diff + sxy * sxy).sqrt()
            }
        }
    }
}

/// Harris or Shi-Tomasi corner intensity.
///
/// Gradient products are summed over a `(2 * radius + 1)` square window using
/// integral images, so the cost per pixel does not depend on the radius.
#[derive(Debug, Clone)]
pub struct CornerIntensity {
    kind: CornerKind,
    radius: usize,
    deriv_x: Image<f32>,
    deriv_y: Image<f32>,
    product: Image<f32>,
    sum_xx: IntegralImage,
    sum_yy: IntegralImage,
    sum_xy: IntegralImage,
    map: Image<f32>,
}

impl CornerIntensity {
    pub fn new(kind: CornerKind, radius: usize) -> DetectResult<Self> {
        if let CornerKind::Harris { k } = kind {
            if !(k > 0.0 && k < 0.25) {
                return Err(DetectError::InvalidHarrisK(k));
            }
        }
        Ok(Self {
            kind,
            radius,
            deriv_x: Image::new(0, 0),
            deriv_y: Image::new(0, 0),
            product: Image::new(0, 0),
            sum_xx: IntegralImage::new(),
            sum_yy: IntegralImage::new(),
            sum_xy: IntegralImage::new(),
            map: Image::new(0, 0),
        })
    }

    pub fn harris(k: f32, radius: usize) -> DetectResult<Self> {
        Self::new(CornerKind::Harris { k }, radius)
    }

    pub fn shi_tomasi(radius: usize) -> DetectResult<Self> {
        Self::new(CornerKind::ShiTomasi, radius)
    }

    pub fn kind(&self) -> CornerKind {
        self.kind
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    fn integrate_product(
        deriv_a: &Image<f32>,
        deriv_b: &Image<f32>,
        product: &mut Image<f32>,
        sums: &mut IntegralImage,
    ) {
        product.reshape(deriv_a.width(), deriv_a.height());
        for y in 0..deriv_a.height() {
            let out = product.row_mut(y);
            for ((p, a), b) in out.iter_mut().zip(deriv_a.row(y)).zip(deriv_b.row(y)) {
                *p = a * b;
            }
        }
        sums.update(product.view());
    }
}

impl FeatureIntensity for CornerIntensity {
    fn process(&mut self, image: ImageView<'_, f32>) -> DetectResult<()> {
        derivative::sobel_xy(image, &mut self.deriv_x, &mut self.deriv_y);
        Self::integrate_product(&self.deriv_x, &self.deriv_x, &mut self.product, &mut self.sum_xx);
        Self::integrate_product(&self.deriv_y, &self.deriv_y, &mut self.product, &mut self.sum_yy);
        Self::integrate_product(&self.deriv_x, &self.deriv_y, &mut self.product, &mut self.sum_xy);

        let (w, h) = (image.width(), image.height());
        self.map.reshape(w, h);
        self.map.fill(0.0);

        let border = self.ignore_border();
        if w <= 2 * border || h <= 2 * border {
            return Ok(());
        }

        let r = self.radius as isize;
        for y in border..h - border {
            let yy = y as isize;
            for x in border..w - border {
                let xx = x as isize;
                let (x0, y0, x1, y1) = (xx - r - 1, yy - r - 1, xx + r, yy + r);
                let sxx = self.sum_xx.block(x0, y0, x1, y1);
                let syy = self.sum_yy.block(x0, y0, x1, y1);
                let sxy = self.sum_xy.block(x0, y0, x1, y1);
                self.map.set(x, y, self.kind.response(sxx, syy, sxy));
            }
        }
        Ok(())
    }

    fn intensity(&self) -> ImageView<'_, f32> {
        self.map.view()
    }

    fn ignore_border(&self) -> usize {
        // sobel leaves a one pixel ring of zeros
        self.radius + 1
    }

    fn canonical_radius(&self) -> usize {
        self.radius
    }

    fn local_maximums(&self) -> bool {
        true
    }

    fn local_minimums(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        match self.kind {
            CornerKind::Harris { .. } => "harris",
            CornerKind::ShiTomasi => "shi-tomasi",
        }
    }
}
