#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    InvalidStride { width: usize, stride: usize },
    SizeMismatch { expected: usize, actual: usize },
    SubImageOutOfBounds { x0: usize, y0: usize, x1: usize, y1: usize, width: usize, height: usize },
    InvalidKernelSize(usize),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidStride { width, stride } => {
                write!(f, "Invalid stride: {} (must be >= width {})", stride, width)
            }
            CoreError::SizeMismatch { expected, actual } => {
                write!(f, "Buffer length mismatch: expected at least {}, got {}", expected, actual)
            }
            CoreError::SubImageOutOfBounds { x0, y0, x1, y1, width, height } => {
                write!(
                    f,
                    "Sub-image ({},{})-({},{}) outside of {}x{} image",
                    x0, y0, x1, y1, width, height
                )
            }
            CoreError::InvalidKernelSize(size) => {
                write!(f, "Invalid box kernel size: {} (must be >= 3)", size)
            }
        }
    }
}

impl std::error::Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;
