pub mod error;
pub mod image;
pub mod integral;
pub mod kernel;

pub use error::{CoreError, CoreResult};
pub use image::{Image, ImageView, ImageViewMut, Pixel, convert_to_f32};
pub use integral::{IntegralImage, block_zero, convolve_sparse};
pub use kernel::{BlockRect, BoxGeometry, HessianKernels, IntegralKernel, WeightedBlock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pixel location found by non-maximum suppression, in intensity-map coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Candidate {
    pub x: usize,
    pub y: usize,
    pub intensity: f32,
}

impl Candidate {
    pub fn new(x: usize, y: usize, intensity: f32) -> Self {
        Self { x, y, intensity }
    }
}

/// Interest point with sub-pixel location (input image pixels) and scale
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScalePoint {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub intensity: f32,
}

impl ScalePoint {
    pub fn new(x: f32, y: f32, scale: f32, intensity: f32) -> Self {
        Self { x, y, scale, intensity }
    }
}

/// Default worker count: one per logical CPU.
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
