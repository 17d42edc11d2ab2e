//! Step count conversion between directions.
//!
//! The piezo step width differs per direction: 100 steps `back` do not
//! cover the same distance as 100 steps `fwd`. The ratios here are
//! calibration data measured on the setup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::direction::{Direction, InvalidDirection};

const RATIO_RIGHT_TO_LEFT: f64 = 87. / 78.;
const RATIO_BACK_TO_FWD: f64 = 450. / 205.;

/// Multiplier per target direction, applied to a count measured along the
/// opposite direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct ConversionRatios {
    ratios: BTreeMap<Direction, f64>,
}

impl Default for ConversionRatios {
    fn default() -> Self {
        Self::new([
            (Direction::Left, RATIO_RIGHT_TO_LEFT),
            (Direction::Right, 1. / RATIO_RIGHT_TO_LEFT),
            (Direction::Fwd, RATIO_BACK_TO_FWD),
            // Same as right; back has never been calibrated separately.
            (Direction::Back, 1. / RATIO_RIGHT_TO_LEFT),
        ])
    }
}

impl TryFrom<BTreeMap<String, f64>> for ConversionRatios {
    type Error = InvalidDirection;

    fn try_from(value: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let ratios = value
            .into_iter()
            .map(|(name, ratio)| Ok((name.parse::<Direction>()?, ratio)))
            .collect::<Result<BTreeMap<_, _>, InvalidDirection>>()?;
        Ok(Self { ratios })
    }
}

impl From<ConversionRatios> for BTreeMap<String, f64> {
    fn from(value: ConversionRatios) -> Self {
        value
            .ratios
            .into_iter()
            .map(|(direction, ratio)| (direction.name().to_string(), ratio))
            .collect()
    }
}

impl ConversionRatios {
    pub fn new(ratios: impl IntoIterator<Item = (Direction, f64)>) -> Self {
        Self {
            ratios: ratios.into_iter().collect(),
        }
    }

    pub fn ratio(&self, target: Direction) -> Option<f64> {
        self.ratios.get(&target).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, f64)> + '_ {
        self.ratios.iter().map(|(d, r)| (*d, *r))
    }

    /// Convert `step_count` into the equivalent count towards `target`,
    /// truncating toward zero.
    pub fn convert_step_count(
        &self,
        target: Direction,
        step_count: i64,
    ) -> Result<i64, InvalidDirection> {
        let ratio = self.ratio(target).ok_or_else(|| InvalidDirection {
            given: target.name().to_string(),
        })?;
        Ok((step_count as f64 * ratio) as i64)
    }

    /// [`Self::convert_step_count`] over a sequence of counts.
    pub fn convert_step_vector(
        &self,
        target: Direction,
        step_counts: &[i64],
    ) -> Result<Vec<i64>, InvalidDirection> {
        step_counts
            .iter()
            .map(|count| self.convert_step_count(target, *count))
            .collect()
    }
}

/// Axis of the coarse-motion frame: x = fwd/back, y = left/right,
/// z = down/up. Positive values point fwd, left, down.
const AXES: [(Direction, Direction); 3] = [
    (Direction::Fwd, Direction::Back),
    (Direction::Left, Direction::Right),
    (Direction::Down, Direction::Up),
];

/// Displacement of `steps` towards `direction` as an `[x, y, z]` vector.
pub fn to_cartesian(direction: Direction, steps: u32) -> Result<[i64; 3], InvalidDirection> {
    let steps = i64::from(steps);
    let mut vector = [0; 3];
    for (axis, (positive, negative)) in AXES.iter().enumerate() {
        if direction == *positive {
            vector[axis] = steps;
            return Ok(vector);
        }
        if direction == *negative {
            vector[axis] = -steps;
            return Ok(vector);
        }
    }
    Err(InvalidDirection {
        given: direction.name().to_string(),
    })
}

/// Split an `[x, y, z]` displacement into one move per non-zero axis.
pub fn from_cartesian(vector: [i64; 3]) -> Vec<(Direction, u64)> {
    AXES.iter()
        .zip(vector)
        .filter(|(_, steps)| *steps != 0)
        .map(|((positive, negative), steps)| {
            if steps > 0 {
                (*positive, steps.unsigned_abs())
            } else {
                (*negative, steps.unsigned_abs())
            }
        })
        .collect()
}
