//! Motion settings reported by the controller's front-panel LEDs.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::daq::LogicLevel;

/// How the controller turns a direction pulse into motion.
///
/// The setting can only be changed on the controller itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MotionSetting {
    /// Moves for as long as the pulse lasts.
    Continuous,
    /// Every pulse triggers one burst of steps.
    Burst,
    /// Every pulse triggers a single step.
    Single,
    /// None of the indicator lines is active.
    Auto,
}

/// The indicator lines, in the order they are polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, IntoStaticStr)]
pub enum StatusLine {
    #[strum(serialize = "LED_cont")]
    Continuous,
    #[strum(serialize = "LED_burst")]
    Burst,
    #[strum(serialize = "LED_single")]
    Single,
}

impl StatusLine {
    /// Label of this line in the controller pin table.
    pub fn label(self) -> &'static str {
        self.into()
    }

    pub const fn setting(self) -> MotionSetting {
        match self {
            StatusLine::Continuous => MotionSetting::Continuous,
            StatusLine::Burst => MotionSetting::Burst,
            StatusLine::Single => MotionSetting::Single,
        }
    }
}

/// Decide the setting from the polled lines. The LEDs are active low; the
/// first low line wins and no low line means [`MotionSetting::Auto`].
pub fn decode_setting(
    levels: impl IntoIterator<Item = (StatusLine, LogicLevel)>,
) -> MotionSetting {
    levels
        .into_iter()
        .find(|(_, level)| *level == LogicLevel::Low)
        .map(|(line, _)| line.setting())
        .unwrap_or(MotionSetting::Auto)
}
