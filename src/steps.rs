//! Validated step and burst counts.

use thiserror::Error;

/// A value that is not a non-negative whole number of steps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{given}` is not a valid step number")]
pub struct InvalidStepCount {
    pub given: String,
}

/// Number of steps or bursts to issue.
///
/// Built from integers, floats (truncated toward zero) or text via
/// `TryFrom`, so counts coming from scripts or config files are checked
/// before any line is driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepCount(u32);

impl StepCount {
    pub const fn new(count: u32) -> Self {
        Self(count)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<StepCount> for u32 {
    fn from(value: StepCount) -> Self {
        value.0
    }
}

macro_rules! step_count_from_int {
    ($($int:ty),*) => {
        $(
            impl TryFrom<$int> for StepCount {
                type Error = InvalidStepCount;

                fn try_from(value: $int) -> Result<Self, Self::Error> {
                    u32::try_from(value).map(StepCount).map_err(|_| InvalidStepCount {
                        given: value.to_string(),
                    })
                }
            }
        )*
    };
}

step_count_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl TryFrom<f64> for StepCount {
    type Error = InvalidStepCount;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let truncated = value.trunc();
        if value.is_finite() && truncated >= 0.0 && truncated <= u32::MAX as f64 {
            Ok(StepCount(truncated as u32))
        } else {
            Err(InvalidStepCount {
                given: value.to_string(),
            })
        }
    }
}

impl TryFrom<&str> for StepCount {
    type Error = InvalidStepCount;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value
            .trim()
            .parse::<u32>()
            .map(StepCount)
            .map_err(|_| InvalidStepCount {
                given: value.to_string(),
            })
    }
}
