//! Fast-Hessian blob intensity computed from an integral image.
//!
//! The determinant of the Hessian is approximated with box filters of side
//! `size` and sampled every `skip` pixels. Intensity cell `(x, y)` is centred
//! on integral-image pixel `(x * skip, y * skip)`.
//!
//! [`naive`] evaluates the sparse kernels with bounds-checked block sums for
//! every cell. [`border`] does the same only for the band of cells whose
//! kernels may leave the image, and [`inner`] fills the rest with unchecked
//! index arithmetic. [`intensity`] runs both and produces the same map as
//! [`naive`].

use hessian_core::{BoxGeometry, HessianKernels, ImageView, ImageViewMut, convolve_sparse};

use crate::error::{DetectError, DetectResult};

/// Weight that compensates for the box approximation of Dxy.
pub const DXY_WEIGHT: f32 = 0.81;

#[inline]
fn determinant(dxx: f32, dyy: f32, dxy: f32, norm: f32) -> f32 {
    let dxx = dxx * norm;
    let dyy = dyy * norm;
    let dxy = dxy * norm;
    dxx * dyy - DXY_WEIGHT * dxy * dxy
}

/// Width, in intensity cells, of the band handled by [`border`].
///
/// The band is the smallest multiple of `skip` source pixels that is strictly
/// wider than `size / 2 + 1`, so every inner cell's kernel starts at integral
/// column/row 1 or later.
pub fn border_width(size: usize, skip: usize) -> usize {
    let (_, band) = border_band(size, skip);
    band / skip
}

/// Returns `(lost, band)` where `band` is the border in source pixels and
/// `lost` is how far past the kernel footprint the first inner centre sits.
fn border_band(size: usize, skip: usize) -> (usize, usize) {
    let radius = size / 2;
    let band = radius + 1 + (skip - (radius + 1) % skip);
    (band - radius - 1, band)
}

fn check_arguments(
    integral: ImageView<'_, f32>,
    skip: usize,
    size: usize,
    intensity: &ImageViewMut<'_, f32>,
) -> DetectResult<BoxGeometry> {
    if skip == 0 {
        return Err(DetectError::InvalidSkip(skip));
    }
    let geometry = BoxGeometry::new(size)?;

    let (w, h) = (intensity.width(), intensity.height());
    let x_ok = w == 0 || (w - 1) * skip < integral.width();
    let y_ok = h == 0 || (h - 1) * skip < integral.height();
    if !x_ok || !y_ok {
        return Err(DetectError::SampleGridOutOfBounds {
            width: w,
            height: h,
            skip,
            source_width: integral.width(),
            source_height: integral.height(),
        });
    }
    Ok(geometry)
}

#[inline]
fn evaluate(integral: ImageView<'_, f32>, kernels: &HessianKernels, norm: f32, x: isize, y: isize) -> f32 {
    let dxx = convolve_sparse(integral, &kernels.xx, x, y);
    let dyy = convolve_sparse(integral, &kernels.yy, x, y);
    let dxy = convolve_sparse(integral, &kernels.xy, x, y);
    determinant(dxx, dyy, dxy, norm)
}

/// Reference implementation: evaluates every cell with bounds-checked kernels.
pub fn naive(
    integral: ImageView<'_, f32>,
    skip: usize,
    size: usize,
    intensity: &mut ImageViewMut<'_, f32>,
) -> DetectResult<()> {
    let geometry = check_arguments(integral, skip, size, intensity)?;
    let kernels = HessianKernels::new(size)?;
    let norm = geometry.norm();

    for y in 0..intensity.height() {
        let yy = (y * skip) as isize;
        let row = intensity.row_mut(y);
        for (x, out) in row.iter_mut().enumerate() {
            *out = evaluate(integral, &kernels, norm, (x * skip) as isize, yy);
        }
    }
    Ok(())
}

/// Writes every cell outside the region covered by [`inner`].
///
/// When the map is too small to have an inner region this writes every cell.
pub fn border(
    integral: ImageView<'_, f32>,
    skip: usize,
    size: usize,
    intensity: &mut ImageViewMut<'_, f32>,
) -> DetectResult<()> {
    let geometry = check_arguments(integral, skip, size, intensity)?;
    let kernels = HessianKernels::new(size)?;
    let norm = geometry.norm();

    let band = border_width(size, skip);
    let (w, h) = (intensity.width(), intensity.height());
    let has_inner_cols = w > 2 * band;

    for y in 0..h {
        let yy = (y * skip) as isize;
        let full_row = !has_inner_cols || y < band || y + band >= h;
        let row = intensity.row_mut(y);
        if full_row {
            for (x, out) in row.iter_mut().enumerate() {
                *out = evaluate(integral, &kernels, norm, (x * skip) as isize, yy);
            }
        } else {
            for x in (0..band).chain(w - band..w) {
                row[x] = evaluate(integral, &kernels, norm, (x * skip) as isize, yy);
            }
        }
    }
    Ok(())
}

/// Writes cells `[border, w - border) x [border, h - border)` using direct
/// integral-image indexing. Cells outside that region are untouched.
pub fn inner(
    integral: ImageView<'_, f32>,
    skip: usize,
    size: usize,
    intensity: &mut ImageViewMut<'_, f32>,
) -> DetectResult<()> {
    let g = check_arguments(integral, skip, size, intensity)?;
    let norm = g.norm();

    let band = border_width(size, skip);
    let (lost, _) = border_band(size, skip);
    let (w, h) = (intensity.width(), intensity.height());
    if w <= 2 * band || h <= 2 * band {
        return Ok(());
    }

    let s = g.block_small;
    let large = g.block_large;
    let r1 = g.radius_feature;
    let r2 = g.radius_skinny;

    let stride = integral.stride();
    let data = integral.data();
    let base = integral.start_index();

    let row_off1 = s * stride;
    let row_off2 = 2 * row_off1;
    let row_off3 = 3 * row_off1;
    let block_w2 = 2 * s;
    let block_w3 = 3 * s;
    let x3 = s + 1;
    let x4 = x3 + s;

    for y in band..h - band {
        let yy = y * skip;

        // top-left integral pixel of each block family for the first inner column
        let top = base + (yy - r2 - 1) * stride + lost;
        let bottom = top + large * stride;
        let left = base + (yy - r1 - 1) * stride + (r1 - r2) + lost;
        let right = left + large;
        let y1 = base + (yy - s - 1) * stride + (r1 - s) + lost;
        let y2 = y1 + s * stride;
        let y3 = y2 + stride;
        let y4 = y3 + s * stride;

        let row = intensity.row_mut(y);
        for (i, out) in row[band..w - band].iter_mut().enumerate() {
            let o = i * skip;
            let (t, b) = (top + o, bottom + o);
            let (l, r) = (left + o, right + o);
            let (p1, p2, p3, p4) = (y1 + o, y2 + o, y3 + o, y4 + o);

            let mut dxx = data[b + block_w3] - data[t + block_w3] - data[b] + data[t];
            dxx -= 3.0 * (data[b + block_w2] - data[t + block_w2] - data[b + s] + data[t + s]);

            let mut dyy = data[r + row_off3] - data[l + row_off3] - data[r] + data[l];
            dyy -= 3.0 * (data[r + row_off2] - data[l + row_off2] - data[r + row_off1] + data[l + row_off1]);

            let dxy = (data[p2 + s] - data[p1 + s] - data[p2] + data[p1])
                - (data[p2 + x4] - data[p1 + x4] - data[p2 + x3] + data[p1 + x3])
                + (data[p4 + x4] - data[p3 + x4] - data[p4 + x3] + data[p3 + x3])
                - (data[p4 + s] - data[p3 + s] - data[p4] + data[p3]);

            *out = determinant(dxx, dyy, dxy, norm);
        }
    }
    Ok(())
}

/// Full intensity map: [`border`] followed by [`inner`].
pub fn intensity(
    integral: ImageView<'_, f32>,
    skip: usize,
    size: usize,
    intensity: &mut ImageViewMut<'_, f32>,
) -> DetectResult<()> {
    border(integral, skip, size, intensity)?;
    inner(integral, skip, size, intensity)
}
