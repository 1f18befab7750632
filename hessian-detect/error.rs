use hessian_core::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    InvalidImageSize { width: usize, height: usize },
    InvalidSkip(usize),
    SampleGridOutOfBounds { width: usize, height: usize, skip: usize, source_width: usize, source_height: usize },
    IgnoreBorderTooLarge { border: usize, width: usize, height: usize },
    InvalidThreshold(f32),
    InvalidArcLength(usize),
    InvalidHarrisK(f32),
    InvalidScaleSpace(&'static str),
    InvalidPyramid(&'static str),
    Image(CoreError),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            DetectError::InvalidSkip(skip) => {
                write!(f, "Invalid sample period: {} (must be >= 1)", skip)
            }
            DetectError::SampleGridOutOfBounds { width, height, skip, source_width, source_height } => {
                write!(
                    f,
                    "Intensity map {}x{} with skip {} samples outside of {}x{} integral image",
                    width, height, skip, source_width, source_height
                )
            }
            DetectError::IgnoreBorderTooLarge { border, width, height } => {
                write!(f, "Ignore border {} leaves nothing to search in {}x{} image", border, width, height)
            }
            DetectError::InvalidThreshold(t) => {
                write!(f, "Invalid threshold: {} (must be finite)", t)
            }
            DetectError::InvalidArcLength(n) => {
                write!(f, "Invalid FAST arc length: {} (must be 9-12)", n)
            }
            DetectError::InvalidHarrisK(k) => {
                write!(f, "Invalid Harris k: {} (must be in (0, 0.25))", k)
            }
            DetectError::InvalidScaleSpace(reason) => {
                write!(f, "Invalid scale-space configuration: {}", reason)
            }
            DetectError::InvalidPyramid(reason) => {
                write!(f, "Invalid pyramid configuration: {}", reason)
            }
            DetectError::Image(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DetectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DetectError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoreError> for DetectError {
    fn from(e: CoreError) -> Self {
        DetectError::Image(e)
    }
}

pub type DetectResult<T> = Result<T, DetectError>;
