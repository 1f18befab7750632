#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scale information for pyramid levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    pub scale: f32,
    pub width: usize,
    pub height: usize,
}

/// Which kind of extremum is searched for in an intensity map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Extremum {
    Maximum,
    Minimum,
}

impl Extremum {
    /// True when `value` beats `other` in this direction.
    #[inline]
    pub fn beats(self, value: f32, other: f32) -> bool {
        match self {
            Extremum::Maximum => value > other,
            Extremum::Minimum => value < other,
        }
    }

    /// True when `value` passes `threshold` in this direction.
    #[inline]
    pub fn passes(self, value: f32, threshold: f32) -> bool {
        match self {
            Extremum::Maximum => value >= threshold,
            Extremum::Minimum => value <= -threshold,
        }
    }
}

/// FAST pixel classification relative to the centre pixel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CornerType {
    Bright,
    Dark,
    None,
}
