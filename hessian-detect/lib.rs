//! Fast-Hessian blob detection and a general feature detector framework.
//!
//! Intensity algorithms implement [`FeatureIntensity`]; a
//! [`GeneralFeatureDetector`] runs one and extracts its local extrema. The
//! multi-octave [`FastHessianDetector`] and the [`PyramidFeatureDetector`]
//! build scale-tagged interest points on top of them.

pub mod blob;
pub mod builder;
pub mod config;
pub mod configured_detector;
pub mod corner;
pub mod derivative;
pub mod detector;
pub mod error;
pub mod extract;
pub mod fast;
pub mod fast_hessian;
pub mod intensity;
pub mod pyramid;
pub mod refinement;
pub mod scale_space;
pub mod types;
pub mod utils;

pub use blob::{BlobKind, HessianBlobIntensity};
pub use builder::DetectorBuilder;
pub use config::{DetectorConfig, FastHessianConfig, IntensityKind, PyramidConfig};
pub use configured_detector::ConfiguredDetector;
pub use corner::{CornerIntensity, CornerKind};
pub use detector::GeneralFeatureDetector;
pub use error::{DetectError, DetectResult};
pub use extract::{CandidateList, NonMaxExtractor};
pub use fast::FastCornerIntensity;
pub use intensity::{FastHessianBoxIntensity, FeatureIntensity};
pub use pyramid::{ImagePyramid, PyramidFeatureDetector};
pub use refinement::PeakRefinement;
pub use scale_space::{FastHessianDetector, size_to_scale};
pub use types::{Extremum, ScaleLevel};

pub use hessian_core::{Candidate, Image, ImageView, ScalePoint};

/// One-shot multi-octave Fast-Hessian detection with `config`.
pub fn detect_fast_hessian<T: hessian_core::Pixel>(
    image: ImageView<'_, T>,
    config: FastHessianConfig,
) -> DetectResult<Vec<ScalePoint>> {
    let mut detector = FastHessianDetector::new(config)?;
    Ok(detector.detect(image)?.to_vec())
}
