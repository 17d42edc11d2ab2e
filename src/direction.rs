//! Motion directions of the piezo controller and their line patterns.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter, IntoStaticStr};
use thiserror::Error;

use crate::daq::LogicLevel;

/// A direction name that does not belong to [`Direction`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("direction `{given}` is not valid, try instead: {}", Direction::names().join(", "))]
pub struct InvalidDirection {
    pub given: String,
}

/// Commands understood by the controller's three direction inputs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumCountMacro,
    Display,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Back,
    Down,
    Fwd,
    Up,
    /// All lines high, the controller idles.
    Stop,
}

impl Direction {
    /// The controller's wiring of each direction onto `bit0..bit2`.
    pub const fn default_levels(self) -> [LogicLevel; ControlLine::COUNT] {
        use LogicLevel::{High as H, Low as L};
        match self {
            Direction::Left => [H, L, H],
            Direction::Right => [H, H, L],
            Direction::Back => [L, H, L],
            Direction::Down => [H, L, L],
            Direction::Fwd => [L, L, H],
            Direction::Up => [L, H, H],
            Direction::Stop => [H, H, H],
        }
    }

    /// The 180 degree reversal of this direction. `Stop` has none.
    pub const fn opposite(self) -> Option<Direction> {
        match self {
            Direction::Fwd => Some(Direction::Back),
            Direction::Back => Some(Direction::Fwd),
            Direction::Right => Some(Direction::Left),
            Direction::Left => Some(Direction::Right),
            Direction::Up => Some(Direction::Down),
            Direction::Down => Some(Direction::Up),
            Direction::Stop => None,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn names() -> Vec<&'static str> {
        Direction::iter().map(Direction::name).collect()
    }
}

impl FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::iter()
            .find(|direction| direction.name() == s)
            .ok_or_else(|| InvalidDirection {
                given: s.to_string(),
            })
    }
}

impl TryFrom<&str> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The controller's direction input lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCountMacro, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ControlLine {
    Bit0,
    Bit1,
    Bit2,
}

impl ControlLine {
    /// Label of this line in the controller pin table.
    pub fn label(self) -> &'static str {
        self.into()
    }
}

/// Level of every control line for one direction, in line order.
pub type BitPattern = [(ControlLine, LogicLevel); ControlLine::COUNT];

/// Precomputed [`BitPattern`] for every [`Direction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionEncoder {
    patterns: [BitPattern; Direction::COUNT],
}

impl Default for DirectionEncoder {
    fn default() -> Self {
        Self::with_levels(Direction::default_levels)
    }
}

impl DirectionEncoder {
    /// Build the table from a custom level assignment, for controllers wired
    /// differently from the default.
    pub fn with_levels(levels: impl Fn(Direction) -> [LogicLevel; ControlLine::COUNT]) -> Self {
        let lines: [ControlLine; ControlLine::COUNT] =
            [ControlLine::Bit0, ControlLine::Bit1, ControlLine::Bit2];
        let mut patterns = [lines.map(|line| (line, LogicLevel::High)); Direction::COUNT];
        for direction in Direction::iter() {
            let levels = levels(direction);
            patterns[direction as usize] = core::array::from_fn(|bit| (lines[bit], levels[bit]));
        }
        Self { patterns }
    }

    pub fn encode(&self, direction: Direction) -> &BitPattern {
        &self.patterns[direction as usize]
    }
}
