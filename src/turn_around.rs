//! Hysteresis correction for 180 degree direction changes.
//!
//! Reversing the coarse motion right after a move loses a few steps to
//! backlash. A turn-around replaces the plain reversal with a calibrated
//! burst sequence.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    daq::{Daq, Delay},
    direction::{Direction, InvalidDirection},
    error,
    stepper::StepperMotor,
};

/// A direction change that is malformed or has no calibrated sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("direction change `{given}` is not valid, try instead: {}", .available.join(", "))]
pub struct InvalidDirectionChange {
    pub given: String,
    pub available: Vec<String>,
}

/// A 180 degree reversal, written `<from>_to_<to>` (e.g. `fwd_to_back`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectionChange {
    from: Direction,
}

impl DirectionChange {
    /// The reversal starting from `from`.
    pub fn reversal_of(from: Direction) -> Result<Self, InvalidDirection> {
        match from.opposite() {
            Some(_) => Ok(Self { from }),
            None => Err(InvalidDirection {
                given: from.name().to_string(),
            }),
        }
    }

    pub fn origin(self) -> Direction {
        self.from
    }

    pub fn target(self) -> Direction {
        // Only directions with an opposite are accepted on construction.
        self.from.opposite().unwrap_or(Direction::Stop)
    }
}

impl fmt::Display for DirectionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_to_{}", self.origin(), self.target())
    }
}

impl FromStr for DirectionChange {
    type Err = InvalidDirectionChange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidDirectionChange {
            given: s.to_string(),
            available: Vec::new(),
        };
        let (from, to) = s.split_once("_to_").ok_or_else(invalid)?;
        let from: Direction = from.parse().map_err(|_| invalid())?;
        let to: Direction = to.parse().map_err(|_| invalid())?;
        match from.opposite() {
            Some(opposite) if opposite == to => Ok(Self { from }),
            _ => Err(invalid()),
        }
    }
}

/// One entry of a turn-around: issue `bursts` bursts towards `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstMove {
    pub direction: Direction,
    pub bursts: u32,
}

impl BurstMove {
    pub const fn new(direction: Direction, bursts: u32) -> Self {
        Self { direction, bursts }
    }
}

/// Calibrated burst sequence per direction change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<BurstMove>>",
    into = "BTreeMap<String, Vec<BurstMove>>"
)]
pub struct TurnSequences {
    sequences: BTreeMap<DirectionChange, Vec<BurstMove>>,
}

impl Default for TurnSequences {
    /// Calibration of the lab setup.
    fn default() -> Self {
        use Direction::{Back, Fwd};
        Self::new([
            (
                DirectionChange { from: Fwd },
                vec![BurstMove::new(Fwd, 100), BurstMove::new(Back, 55)],
            ),
            (
                DirectionChange { from: Back },
                vec![BurstMove::new(Back, 50), BurstMove::new(Fwd, 110)],
            ),
        ])
    }
}

impl TryFrom<BTreeMap<String, Vec<BurstMove>>> for TurnSequences {
    type Error = InvalidDirectionChange;

    fn try_from(value: BTreeMap<String, Vec<BurstMove>>) -> Result<Self, Self::Error> {
        let sequences = value
            .into_iter()
            .map(|(key, moves)| Ok((key.parse::<DirectionChange>()?, moves)))
            .collect::<Result<_, InvalidDirectionChange>>()?;
        Ok(Self { sequences })
    }
}

impl From<TurnSequences> for BTreeMap<String, Vec<BurstMove>> {
    fn from(value: TurnSequences) -> Self {
        value
            .sequences
            .into_iter()
            .map(|(change, moves)| (change.to_string(), moves))
            .collect()
    }
}

impl TurnSequences {
    pub fn new(sequences: impl IntoIterator<Item = (DirectionChange, Vec<BurstMove>)>) -> Self {
        Self {
            sequences: sequences.into_iter().collect(),
        }
    }

    pub fn get(&self, change: DirectionChange) -> Result<&[BurstMove], InvalidDirectionChange> {
        self.sequences
            .get(&change)
            .map(Vec::as_slice)
            .ok_or_else(|| self.invalid(change.to_string()))
    }

    /// Look up a sequence by its `<from>_to_<to>` name.
    pub fn get_by_name(&self, name: &str) -> Result<&[BurstMove], InvalidDirectionChange> {
        let change: DirectionChange = name.parse().map_err(|_| self.invalid(name.to_string()))?;
        self.get(change)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DirectionChange, &[BurstMove])> {
        self.sequences
            .iter()
            .map(|(change, moves)| (*change, moves.as_slice()))
    }

    fn invalid(&self, given: String) -> InvalidDirectionChange {
        InvalidDirectionChange {
            given,
            available: self.sequences.keys().map(ToString::to_string).collect(),
        }
    }
}

impl<D: Daq, T: Delay> StepperMotor<D, T> {
    /// Perform the calibrated u-turn for `change`.
    ///
    /// The sequence is issued as bursts, so the controller must already be
    /// in burst mode.
    pub fn turn_around(&mut self, change: DirectionChange) -> error::Result<(), D::Error> {
        let moves = self.turn_sequences().get(change)?.to_vec();
        info!(%change, ?moves, "turning around");
        for BurstMove { direction, bursts } in moves {
            self.walk_bursts(direction, bursts)?;
        }
        Ok(())
    }

    /// [`Self::turn_around`] by sequence name, e.g. `"fwd_to_back"`.
    pub fn turn_around_named(&mut self, name: &str) -> error::Result<(), D::Error> {
        let change: DirectionChange = name
            .parse()
            .map_err(|_| self.turn_sequences().invalid(name.to_string()))?;
        self.turn_around(change)
    }

    /// Perform the u-turn that reverses `direction`.
    pub fn turn_around_from(&mut self, direction: Direction) -> error::Result<(), D::Error> {
        let change = DirectionChange::reversal_of(direction)?;
        self.turn_around(change)
    }
}
