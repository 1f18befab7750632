use crate::error::{CoreError, CoreResult};

/// Sample types that can be stored in an [`Image`].
///
/// Algorithms are written once against this trait and monomorphised per
/// sample type.
pub trait Pixel: Copy + Default + Send + Sync + PartialOrd + std::fmt::Debug + 'static {
    fn to_f32(self) -> f32;
}

impl Pixel for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Pixel for u16 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Pixel for i16 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Pixel for i32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Pixel for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

/// Number of backing elements a `width x height` grid with `stride` needs
/// when it starts at `start_index`.
fn required_len(width: usize, height: usize, stride: usize, start_index: usize) -> usize {
    if width == 0 || height == 0 {
        start_index
    } else {
        start_index + (height - 1) * stride + width
    }
}

fn check_sub_bounds(
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    width: usize,
    height: usize,
) -> CoreResult<()> {
    if x0 > x1 || y0 > y1 || x1 > width || y1 > height {
        return Err(CoreError::SubImageOutOfBounds { x0, y0, x1, y1, width, height });
    }
    Ok(())
}

/// Row-major owned image with an explicit row stride.
///
/// The backing vector may be longer than `height * stride` after a
/// [`reshape`](Image::reshape) to a smaller size; only the declared
/// `width x height` region is meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
    stride: usize,
}

impl<T: Pixel> Image<T> {
    /// Zero-initialised image with `stride == width`.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![T::default(); width * height],
            width,
            height,
            stride: width,
        }
    }

    /// Zero-initialised image with row padding.
    pub fn new_with_stride(width: usize, height: usize, stride: usize) -> CoreResult<Self> {
        if stride < width {
            return Err(CoreError::InvalidStride { width, stride });
        }
        Ok(Self {
            data: vec![T::default(); height * stride],
            width,
            height,
            stride,
        })
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> CoreResult<Self> {
        Self::from_vec_with_stride(width, height, width, data)
    }

    pub fn from_vec_with_stride(
        width: usize,
        height: usize,
        stride: usize,
        data: Vec<T>,
    ) -> CoreResult<Self> {
        if stride < width {
            return Err(CoreError::InvalidStride { width, stride });
        }
        let expected = required_len(width, height, stride, 0);
        if data.len() < expected {
            return Err(CoreError::SizeMismatch { expected, actual: data.len() });
        }
        Ok(Self { data, width, height, stride })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Entire backing store, including any padding or unused tail.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.stride + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.stride + x] = value;
    }

    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    pub fn fill(&mut self, value: T) {
        for y in 0..self.height {
            self.row_mut(y).fill(value);
        }
    }

    /// Changes the logical shape. The backing store only grows when it is
    /// too small for the new shape; it never shrinks.
    pub fn reshape(&mut self, width: usize, height: usize) {
        let needed = width * height;
        if self.data.len() < needed {
            self.data.resize(needed, T::default());
        }
        self.width = width;
        self.height = height;
        self.stride = width;
    }

    pub fn view(&self) -> ImageView<'_, T> {
        ImageView {
            data: self.data.as_slice(),
            width: self.width,
            height: self.height,
            stride: self.stride,
            start_index: 0,
        }
    }

    pub fn view_mut(&mut self) -> ImageViewMut<'_, T> {
        ImageViewMut {
            data: self.data.as_mut_slice(),
            width: self.width,
            height: self.height,
            stride: self.stride,
            start_index: 0,
        }
    }

    /// Zero-copy view of `[x0, x1) x [y0, y1)`.
    pub fn sub_image(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> CoreResult<ImageView<'_, T>> {
        self.view().sub_view(x0, y0, x1, y1)
    }

    pub fn sub_image_mut(
        &mut self,
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
    ) -> CoreResult<ImageViewMut<'_, T>> {
        check_sub_bounds(x0, y0, x1, y1, self.width, self.height)?;
        let stride = self.stride;
        Ok(ImageViewMut {
            data: self.data.as_mut_slice(),
            width: x1 - x0,
            height: y1 - y0,
            stride,
            start_index: y0 * stride + x0,
        })
    }

    /// Iterates `(x, y, value)` in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.height).flat_map(move |y| self.row(y).iter().enumerate().map(move |(x, &v)| (x, y, v)))
    }
}

/// Borrowed, read-only window into a flat sample buffer.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
    start_index: usize,
}

impl<'a, T: Pixel> ImageView<'a, T> {
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        stride: usize,
        start_index: usize,
    ) -> CoreResult<Self> {
        if stride < width {
            return Err(CoreError::InvalidStride { width, stride });
        }
        let expected = required_len(width, height, stride, start_index);
        if data.len() < expected {
            return Err(CoreError::SizeMismatch { expected, actual: data.len() });
        }
        Ok(Self { data, width, height, stride, start_index })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Whole backing store; index it with [`ImageView::index`].
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        self.start_index + y * self.stride + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        debug_assert!(x < self.width && y < self.height);
        self.data[self.index(x, y)]
    }

    pub fn row(&self, y: usize) -> &'a [T] {
        let start = self.index(0, y);
        &self.data[start..start + self.width]
    }

    pub fn sub_view(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> CoreResult<ImageView<'a, T>> {
        check_sub_bounds(x0, y0, x1, y1, self.width, self.height)?;
        Ok(ImageView {
            data: self.data,
            width: x1 - x0,
            height: y1 - y0,
            stride: self.stride,
            start_index: self.index(x0, y0),
        })
    }

    /// Copies the view into a compact owned image.
    pub fn to_image(&self) -> Image<T> {
        let mut data = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            data.extend_from_slice(self.row(y));
        }
        Image {
            data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + 'a {
        let view = *self;
        (0..view.height).flat_map(move |y| view.row(y).iter().enumerate().map(move |(x, &v)| (x, y, v)))
    }
}

impl<'a, T: Pixel> From<&'a Image<T>> for ImageView<'a, T> {
    fn from(image: &'a Image<T>) -> Self {
        image.view()
    }
}

/// Borrowed, writable window into a flat sample buffer.
#[derive(Debug)]
pub struct ImageViewMut<'a, T> {
    data: &'a mut [T],
    width: usize,
    height: usize,
    stride: usize,
    start_index: usize,
}

impl<'a, T: Pixel> ImageViewMut<'a, T> {
    pub fn new(
        data: &'a mut [T],
        width: usize,
        height: usize,
        stride: usize,
        start_index: usize,
    ) -> CoreResult<Self> {
        if stride < width {
            return Err(CoreError::InvalidStride { width, stride });
        }
        let expected = required_len(width, height, stride, start_index);
        if data.len() < expected {
            return Err(CoreError::SizeMismatch { expected, actual: data.len() });
        }
        Ok(Self { data, width, height, stride, start_index })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn data(&self) -> &[T] {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        self.start_index + y * self.stride + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        debug_assert!(x < self.width && y < self.height);
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        debug_assert!(x < self.width && y < self.height);
        let i = self.index(x, y);
        self.data[i] = value;
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = self.index(0, y);
        &mut self.data[start..start + self.width]
    }

    pub fn fill(&mut self, value: T) {
        for y in 0..self.height {
            self.row_mut(y).fill(value);
        }
    }

    pub fn as_view(&self) -> ImageView<'_, T> {
        ImageView {
            data: &*self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
            start_index: self.start_index,
        }
    }

    /// Shorter-lived mutable view over the same window.
    pub fn reborrow(&mut self) -> ImageViewMut<'_, T> {
        ImageViewMut {
            data: &mut *self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
            start_index: self.start_index,
        }
    }

    pub fn sub_view_mut(
        &mut self,
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
    ) -> CoreResult<ImageViewMut<'_, T>> {
        check_sub_bounds(x0, y0, x1, y1, self.width, self.height)?;
        let start_index = self.index(x0, y0);
        Ok(ImageViewMut {
            data: &mut *self.data,
            width: x1 - x0,
            height: y1 - y0,
            stride: self.stride,
            start_index,
        })
    }
}

impl<'a, T: Pixel> From<&'a mut Image<T>> for ImageViewMut<'a, T> {
    fn from(image: &'a mut Image<T>) -> Self {
        image.view_mut()
    }
}

/// Converts any sample type into a compact `f32` image, reusing `dst`.
pub fn convert_to_f32<T: Pixel>(src: ImageView<'_, T>, dst: &mut Image<f32>) {
    dst.reshape(src.width(), src.height());
    for y in 0..src.height() {
        for (d, s) in dst.row_mut(y).iter_mut().zip(src.row(y)) {
            *d = s.to_f32();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> Image<f32> {
        let data = (0..width * height).map(|i| i as f32).collect();
        Image::from_vec(width, height, data).unwrap()
    }

    #[test]
    fn test_invalid_stride() {
        let result = Image::<u8>::new_with_stride(10, 5, 9);
        assert!(matches!(result, Err(CoreError::InvalidStride { width: 10, stride: 9 })));
    }

    #[test]
    fn test_from_vec_too_short() {
        let result = Image::from_vec(4, 4, vec![0u8; 15]);
        assert!(matches!(result, Err(CoreError::SizeMismatch { expected: 16, actual: 15 })));
    }

    #[test]
    fn test_padded_rows() {
        let mut img = Image::<u16>::new_with_stride(3, 2, 5).unwrap();
        img.set(2, 1, 7);
        assert_eq!(img.data()[5 + 2], 7);
        assert_eq!(img.row(1), &[0, 0, 7]);
    }

    #[test]
    fn test_sub_image_shares_storage() {
        let mut img = ramp(6, 5);
        {
            let mut sub = img.sub_image_mut(2, 1, 5, 4).unwrap();
            assert_eq!(sub.start_index(), 6 + 2);
            assert_eq!(sub.get(0, 0), 8.0);
            sub.set(1, 2, -1.0);
        }
        assert_eq!(img.get(3, 3), -1.0);

        let sub = img.sub_image(1, 1, 3, 3).unwrap();
        let nested = sub.sub_view(1, 1, 2, 2).unwrap();
        assert_eq!(nested.get(0, 0), img.get(2, 2));
        assert_eq!(nested.stride(), 6);
    }

    #[test]
    fn test_sub_image_out_of_bounds() {
        let img = ramp(4, 4);
        assert!(img.sub_image(0, 0, 5, 4).is_err());
        assert!(img.sub_image(3, 0, 2, 4).is_err());
        assert!(img.sub_image(0, 0, 4, 4).is_ok());
    }

    #[test]
    fn test_reshape_smaller_keeps_allocation() {
        let mut img = ramp(20, 20);
        let ptr = img.data().as_ptr();
        img.reshape(7, 3);
        assert_eq!((img.width(), img.height(), img.stride()), (7, 3, 7));
        assert_eq!(img.data().as_ptr(), ptr);
        assert_eq!(img.pixels().count(), 21);
    }

    #[test]
    fn test_reshape_larger_grows() {
        let mut img = Image::<f32>::new(2, 2);
        img.reshape(10, 9);
        assert!(img.data().len() >= 90);
        img.set(9, 8, 1.0);
        assert_eq!(img.get(9, 8), 1.0);
    }

    #[test]
    fn test_view_to_image_compacts() {
        let img = ramp(5, 4);
        let copy = img.sub_image(1, 1, 4, 3).unwrap().to_image();
        assert_eq!(copy.stride(), 3);
        assert_eq!(copy.row(0), &[6.0, 7.0, 8.0]);
        assert_eq!(copy.row(1), &[11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_view_new_checks_length() {
        let data = vec![0.0f32; 10];
        assert!(ImageView::new(&data, 3, 3, 4, 0).is_ok());
        assert!(ImageView::new(&data, 3, 3, 4, 1).is_err());
    }
}
