use crate::error::{CoreError, CoreResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rectangle relative to a kernel centre covering `(x0, x1] x (y0, y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlockRect {
    pub x0: isize,
    pub y0: isize,
    pub x1: isize,
    pub y1: isize,
}

impl BlockRect {
    pub fn new(x0: isize, y0: isize, x1: isize, y1: isize) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> isize {
        self.x1 - self.x0
    }

    pub fn height(&self) -> isize {
        self.y1 - self.y0
    }

    pub fn area(&self) -> isize {
        self.width() * self.height()
    }

    /// Same rectangle with the axes swapped.
    pub fn transpose(&self) -> Self {
        Self::new(self.y0, self.x0, self.y1, self.x1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightedBlock {
    pub rect: BlockRect,
    pub weight: i32,
}

/// Sub-block sizes of the box approximations to the second derivatives.
///
/// For a kernel of `size` the long blocks span `block_large` samples across,
/// the lobes are `block_small` samples wide and the whole footprint lies in
/// `[-radius_feature - 1, radius_feature]` along both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxGeometry {
    pub size: usize,
    pub block_small: usize,
    pub block_large: usize,
    pub radius_feature: usize,
    pub radius_skinny: usize,
}

impl BoxGeometry {
    pub fn new(size: usize) -> CoreResult<Self> {
        if size < 3 {
            return Err(CoreError::InvalidKernelSize(size));
        }
        let block_small = size / 3;
        let block_large = size - block_small - 1;
        Ok(Self {
            size,
            block_small,
            block_large,
            radius_feature: size / 2,
            radius_skinny: block_large / 2,
        })
    }

    /// Normalisation applied to every derivative response.
    pub fn norm(&self) -> f32 {
        1.0 / (self.size * self.size) as f32
    }
}

/// Sparse kernel made of weighted rectangles, evaluated with an integral image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntegralKernel {
    blocks: Vec<WeightedBlock>,
}

impl IntegralKernel {
    pub fn new(blocks: Vec<WeightedBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[WeightedBlock] {
        &self.blocks
    }

    /// Box approximation of d²/dx²: a full block with a -3 weighted middle lobe.
    pub fn deriv_xx(size: usize) -> CoreResult<Self> {
        let g = BoxGeometry::new(size)?;
        let s = g.block_small as isize;
        let left = -(g.radius_feature as isize) - 1;
        let top = -(g.radius_skinny as isize) - 1;
        let bottom = top + g.block_large as isize;

        Ok(Self::new(vec![
            WeightedBlock { rect: BlockRect::new(left, top, left + 3 * s, bottom), weight: 1 },
            WeightedBlock { rect: BlockRect::new(left + s, top, left + 2 * s, bottom), weight: -3 },
        ]))
    }

    /// Box approximation of d²/dy², the transpose of [`IntegralKernel::deriv_xx`].
    pub fn deriv_yy(size: usize) -> CoreResult<Self> {
        let xx = Self::deriv_xx(size)?;
        Ok(Self::new(
            xx.blocks
                .iter()
                .map(|b| WeightedBlock { rect: b.rect.transpose(), weight: b.weight })
                .collect(),
        ))
    }

    /// Box approximation of d²/dxdy: four square lobes around the centre.
    pub fn deriv_xy(size: usize) -> CoreResult<Self> {
        let g = BoxGeometry::new(size)?;
        let s = g.block_small as isize;

        Ok(Self::new(vec![
            WeightedBlock { rect: BlockRect::new(-s - 1, -s - 1, -1, -1), weight: 1 },
            WeightedBlock { rect: BlockRect::new(0, -s - 1, s, -1), weight: -1 },
            WeightedBlock { rect: BlockRect::new(0, 0, s, s), weight: 1 },
            WeightedBlock { rect: BlockRect::new(-s - 1, 0, -1, s), weight: -1 },
        ]))
    }

    /// Bounding box of all blocks as `(min x0, min y0, max x1, max y1)`.
    pub fn extent(&self) -> Option<BlockRect> {
        let first = self.blocks.first()?.rect;
        Some(self.blocks.iter().fold(first, |acc, b| {
            BlockRect::new(
                acc.x0.min(b.rect.x0),
                acc.y0.min(b.rect.y0),
                acc.x1.max(b.rect.x1),
                acc.y1.max(b.rect.y1),
            )
        }))
    }

    /// Sum of weight times area; zero for a derivative kernel.
    pub fn dc_gain(&self) -> isize {
        self.blocks.iter().map(|b| b.rect.area() * b.weight as isize).sum()
    }
}

/// The three second-derivative kernels for one box size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HessianKernels {
    pub geometry: BoxGeometry,
    pub xx: IntegralKernel,
    pub yy: IntegralKernel,
    pub xy: IntegralKernel,
}

impl HessianKernels {
    pub fn new(size: usize) -> CoreResult<Self> {
        Ok(Self {
            geometry: BoxGeometry::new(size)?,
            xx: IntegralKernel::deriv_xx(size)?,
            yy: IntegralKernel::deriv_yy(size)?,
            xy: IntegralKernel::deriv_xy(size)?,
        })
    }

    pub fn size(&self) -> usize {
        self.geometry.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_size_9() {
        let g = BoxGeometry::new(9).unwrap();
        assert_eq!(g.block_small, 3);
        assert_eq!(g.block_large, 5);
        assert_eq!(g.radius_feature, 4);
        assert_eq!(g.radius_skinny, 2);
    }

    #[test]
    fn test_rejects_tiny_kernels() {
        assert_eq!(BoxGeometry::new(2), Err(CoreError::InvalidKernelSize(2)));
        assert!(IntegralKernel::deriv_xy(0).is_err());
    }

    #[test]
    fn test_xx_layout_size_9() {
        let k = IntegralKernel::deriv_xx(9).unwrap();
        assert_eq!(k.blocks()[0].rect, BlockRect::new(-5, -3, 4, 2));
        assert_eq!(k.blocks()[1].rect, BlockRect::new(-2, -3, 1, 2));
        assert_eq!(k.blocks()[1].weight, -3);
    }

    #[test]
    fn test_yy_is_transpose_of_xx() {
        let xx = IntegralKernel::deriv_xx(15).unwrap();
        let yy = IntegralKernel::deriv_yy(15).unwrap();
        for (a, b) in xx.blocks().iter().zip(yy.blocks()) {
            assert_eq!(a.rect.transpose(), b.rect);
            assert_eq!(a.weight, b.weight);
        }
    }

    #[test]
    fn test_kernels_have_zero_dc_gain() {
        for size in 3..40 {
            let k = HessianKernels::new(size).unwrap();
            assert_eq!(k.xx.dc_gain(), 0, "xx size {}", size);
            assert_eq!(k.yy.dc_gain(), 0, "yy size {}", size);
            assert_eq!(k.xy.dc_gain(), 0, "xy size {}", size);
        }
    }

    #[test]
    fn test_footprint_within_feature_radius() {
        for size in 3..60 {
            let k = HessianKernels::new(size).unwrap();
            let r = k.geometry.radius_feature as isize;
            for kernel in [&k.xx, &k.yy, &k.xy] {
                let e = kernel.extent().unwrap();
                assert!(e.x0 >= -r - 1 && e.y0 >= -r - 1, "size {}", size);
                assert!(e.x1 <= r && e.y1 <= r, "size {}", size);
            }
        }
    }
}
