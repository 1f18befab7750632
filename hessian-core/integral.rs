use crate::image::{Image, ImageView, Pixel};
use crate::kernel::IntegralKernel;

/// Writes the integral image of `input` into `output`, reshaping it to the
/// input's dimensions.
///
/// `output(x, y)` is the sum of all input samples in `[0, x] x [0, y]`.
pub fn transform<T: Pixel>(input: ImageView<'_, T>, output: &mut Image<f32>) {
    let (w, h) = (input.width(), input.height());
    output.reshape(w, h);
    if w == 0 || h == 0 {
        return;
    }

    let mut total = 0.0f32;
    for (dst, src) in output.row_mut(0).iter_mut().zip(input.row(0)) {
        total += src.to_f32();
        *dst = total;
    }

    // after reshape stride == width, so rows are contiguous
    let sums = output.data_mut();
    for y in 1..h {
        let (above, rest) = sums.split_at_mut(y * w);
        let prev = &above[(y - 1) * w..];
        let mut total = 0.0f32;
        for ((dst, src), up) in rest[..w].iter_mut().zip(input.row(y)).zip(prev) {
            total += src.to_f32();
            *dst = up + total;
        }
    }
}

/// Sum of the source samples inside `(x0, x1] x (y0, y1]`.
///
/// Corners left of or above the image read as zero and corners past the
/// right/bottom edge are clamped to the last column/row, so the query never
/// touches memory outside the integral image.
pub fn block_zero(integral: ImageView<'_, f32>, x0: isize, y0: isize, x1: isize, y1: isize) -> f32 {
    let max_x = integral.width() as isize - 1;
    let max_y = integral.height() as isize - 1;

    let x0 = x0.min(max_x);
    let y0 = y0.min(max_y);
    let x1 = x1.min(max_x);
    let y1 = y1.min(max_y);

    let at = |x: isize, y: isize| {
        if x >= 0 && y >= 0 {
            integral.get(x as usize, y as usize)
        } else {
            0.0
        }
    };

    at(x1, y1) - at(x1, y0) - at(x0, y1) + at(x0, y0)
}

/// Weighted sum of the kernel's rectangles centred on `(x, y)`.
pub fn convolve_sparse(integral: ImageView<'_, f32>, kernel: &IntegralKernel, x: isize, y: isize) -> f32 {
    let mut total = 0.0f32;
    for block in kernel.blocks() {
        let r = block.rect;
        total += block_zero(integral, x + r.x0, y + r.y0, x + r.x1, y + r.y1) * block.weight as f32;
    }
    total
}

/// Owned integral image that is recomputed in place.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    sums: Image<f32>,
}

impl Default for IntegralImage {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegralImage {
    pub fn new() -> Self {
        Self { sums: Image::new(0, 0) }
    }

    pub fn from_image<T: Pixel>(input: ImageView<'_, T>) -> Self {
        let mut ii = Self::new();
        ii.update(input);
        ii
    }

    /// Recomputes the sums for a new source, reusing the allocation.
    pub fn update<T: Pixel>(&mut self, input: ImageView<'_, T>) {
        transform(input, &mut self.sums);
    }

    pub fn width(&self) -> usize {
        self.sums.width()
    }

    pub fn height(&self) -> usize {
        self.sums.height()
    }

    pub fn view(&self) -> ImageView<'_, f32> {
        self.sums.view()
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.sums.get(x, y)
    }

    /// See [`block_zero`].
    pub fn block(&self, x0: isize, y0: isize, x1: isize, y1: isize) -> f32 {
        block_zero(self.view(), x0, y0, x1, y1)
    }

    pub fn convolve(&self, kernel: &IntegralKernel, x: isize, y: isize) -> f32 {
        convolve_sparse(self.view(), kernel, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::HessianKernels;
    use proptest::prelude::*;

    fn pattern(width: usize, height: usize) -> Image<u8> {
        let data = (0..width * height).map(|i| ((i * 37 + 11) % 53) as u8).collect();
        Image::from_vec(width, height, data).unwrap()
    }

    fn brute_sum(img: &Image<u8>, x0: isize, y0: isize, x1: isize, y1: isize) -> f32 {
        let mut total = 0.0;
        for y in 0..img.height() as isize {
            for x in 0..img.width() as isize {
                if x > x0 && x <= x1 && y > y0 && y <= y1 {
                    total += img.get(x as usize, y as usize) as f32;
                }
            }
        }
        total
    }

    #[test]
    fn test_transform_values() {
        let img = Image::from_vec(3, 2, vec![1u8, 2, 3, 4, 5, 6]).unwrap();
        let ii = IntegralImage::from_image(img.view());
        assert_eq!(ii.view().row(0), &[1.0, 3.0, 6.0]);
        assert_eq!(ii.view().row(1), &[5.0, 12.0, 21.0]);
    }

    #[test]
    fn test_monotonic_for_non_negative_source() {
        let img = pattern(17, 13);
        let ii = IntegralImage::from_image(img.view());
        for y in 0..13 {
            for x in 0..17 {
                if x > 0 {
                    assert!(ii.get(x, y) >= ii.get(x - 1, y));
                }
                if y > 0 {
                    assert!(ii.get(x, y) >= ii.get(x, y - 1));
                }
            }
        }
    }

    #[test]
    fn test_transform_of_strided_sub_view() {
        let img = pattern(10, 8);
        let sub = img.sub_image(2, 3, 7, 8).unwrap();
        let mut out = Image::new(1, 1);
        transform(sub, &mut out);
        assert_eq!((out.width(), out.height()), (5, 5));

        let compact = sub.to_image();
        let expected = brute_sum(&compact, -1, -1, 4, 4);
        assert_eq!(out.get(4, 4), expected);
    }

    #[test]
    fn test_block_outside_is_zero_padded() {
        let img = pattern(6, 6);
        let ii = IntegralImage::from_image(img.view());
        // everything left/above the image contributes nothing
        assert_eq!(ii.block(-10, -10, -1, 5), 0.0);
        assert_eq!(ii.block(-4, -4, 2, 2), brute_sum(&img, -1, -1, 2, 2));
        // past the right/bottom edge is clamped
        assert_eq!(ii.block(1, 1, 40, 40), brute_sum(&img, 1, 1, 5, 5));
    }

    #[test]
    fn test_empty_image() {
        let img = Image::<u8>::new(0, 0);
        let ii = IntegralImage::from_image(img.view());
        assert_eq!(ii.block(-1, -1, 3, 3), 0.0);
    }

    #[test]
    fn test_derivative_kernels_vanish_on_constant_image() {
        let img = Image::from_vec(40, 40, vec![7u8; 1600]).unwrap();
        let ii = IntegralImage::from_image(img.view());
        for size in [9usize, 15, 21] {
            let k = HessianKernels::new(size).unwrap();
            assert_eq!(ii.convolve(&k.xx, 20, 20), 0.0);
            assert_eq!(ii.convolve(&k.yy, 20, 20), 0.0);
            assert_eq!(ii.convolve(&k.xy, 20, 20), 0.0);
        }
    }

    proptest! {
        #[test]
        fn prop_block_matches_brute_force(
            w in 1usize..20,
            h in 1usize..20,
            x0 in -3isize..22,
            y0 in -3isize..22,
            dx in 0isize..10,
            dy in 0isize..10,
        ) {
            let img = pattern(w, h);
            let ii = IntegralImage::from_image(img.view());
            let (x1, y1) = (x0 + dx, y0 + dy);
            let expected = brute_sum(&img, x0.min(w as isize - 1), y0.min(h as isize - 1), x1, y1);
            prop_assert_eq!(ii.block(x0, y0, x1, y1), expected);
        }
    }
}
