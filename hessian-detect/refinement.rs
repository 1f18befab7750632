use hessian_core::ImageView;

/// Sub-sample peak localisation on intensity maps
pub struct PeakRefinement;

impl PeakRefinement {
    /// Offset of the vertex of the parabola through `(-1, lower)`,
    /// `(0, middle)` and `(1, upper)`. Returns 0 when the samples are collinear.
    pub fn poly_peak(lower: f32, middle: f32, upper: f32) -> f32 {
        let a = 0.5 * lower - middle + 0.5 * upper;
        let b = 0.5 * upper - 0.5 * lower;
        if a == 0.0 {
            return 0.0;
        }
        -b / (2.0 * a)
    }

    /// Refine a peak at `(x, y)` to sub-pixel accuracy using quadratic surface
    /// fitting over its 3x3 neighbourhood. Returns the refined location.
    pub fn refine_subpixel(map: ImageView<'_, f32>, x: usize, y: usize) -> (f32, f32) {
        let (fx, fy) = (x as f32, y as f32);

        // Ensure we have enough border for 3x3 sampling
        if x < 1 || y < 1 || x + 1 >= map.width() || y + 1 >= map.height() {
            return (fx, fy);
        }

        let s = |dx: usize, dy: usize| map.get(x + dx - 1, y + dy - 1);

        let dx = (s(2, 1) - s(0, 1)) / 2.0;
        let dy = (s(1, 2) - s(1, 0)) / 2.0;
        let dxx = s(2, 1) - 2.0 * s(1, 1) + s(0, 1);
        let dyy = s(1, 2) - 2.0 * s(1, 1) + s(1, 0);
        let dxy = (s(2, 2) - s(0, 2) - s(2, 0) + s(0, 0)) / 4.0;

        let det = dxx * dyy - dxy * dxy;
        if det.abs() < 1e-6 {
            // Degenerate case - keep the integer location
            return (fx, fy);
        }

        // one Newton step, clamped to the pixel
        let offset_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
        let offset_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);

        (fx + offset_x, fy + offset_y)
    }

    /// Bilinear interpolation for fractional coordinates, clamped to the image.
    pub fn bilinear_interpolate(img: ImageView<'_, f32>, x: f32, y: f32) -> f32 {
        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return 0.0;
        }

        let x = x.clamp(0.0, (width - 1) as f32);
        let y = y.clamp(0.0, (height - 1) as f32);
        let x1 = x.floor() as usize;
        let y1 = y.floor() as usize;
        let x2 = (x1 + 1).min(width - 1);
        let y2 = (y1 + 1).min(height - 1);

        let fx = x - x1 as f32;
        let fy = y - y1 as f32;

        let interpolated_top = img.get(x1, y1) * (1.0 - fx) + img.get(x2, y1) * fx;
        let interpolated_bottom = img.get(x1, y2) * (1.0 - fx) + img.get(x2, y2) * fx;

        interpolated_top * (1.0 - fy) + interpolated_bottom * fy
    }
}
