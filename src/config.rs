//! Setup description for the stepper controller and the power supply.
//!
//! Every value has a default matching the lab setup, so a TOML file only has
//! to name what differs:
//!
//! ```toml
//! [stepper.timing]
//! burst_pulse_ms = 120
//!
//! [stepper.turn_sequences]
//! fwd_to_back = [
//!     { direction = "fwd", bursts = 100 },
//!     { direction = "back", bursts = 56 },
//! ]
//!
//! [stepper.conversion_ratios]
//! fwd = 2.2
//! ```
//!
//! Configuration is read once, when a controller is constructed.

use std::path::Path;

use fugit::MicrosDurationU32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    conversion::ConversionRatios,
    daq::Register,
    turn_around::TurnSequences,
    wiring::{DaqTerminal, WiringTable, setup},
};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Loading of any deserializable configuration from a TOML file.
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Complete lab setup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub stepper: StepperConfig,
    pub power_supply: PowerSupplyConfig,
}

impl LabConfig {
    /// Load from `path` and validate.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stepper.validate()?;
        self.power_supply.validate()
    }
}

/// Wiring from the piezo controller's DSUB9 plug to the DAQ, hop by hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperWiring {
    /// Controller function => DSUB9 pin.
    pub controller_pins: WiringTable,
    /// DSUB9 pin => cable colour.
    pub dsub9_pins: WiringTable,
    /// Cable colour => DAQ terminal label.
    pub cable_colors: WiringTable,
    /// DAQ terminal label => line.
    pub daq_terminals: WiringTable<DaqTerminal>,
}

impl Default for StepperWiring {
    fn default() -> Self {
        Self {
            controller_pins: setup::controller_pins(),
            dsub9_pins: setup::dsub9_pins(),
            cable_colors: setup::cable_colors(),
            daq_terminals: setup::u3_terminals(),
        }
    }
}

/// Longest duration, in milliseconds, that still fits a
/// [`MicrosDurationU32`].
pub const MAX_DURATION_MS: u32 = u32::MAX / 1000;

/// Pulse timing of the stepper controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseTiming {
    /// Pulse length that triggers exactly one burst.
    pub burst_pulse_ms: u32,
    /// Pause after every counted pulse.
    pub settle_ms: u32,
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            burst_pulse_ms: 150,
            settle_ms: 10,
        }
    }
}

impl PulseTiming {
    pub fn burst_pulse(&self) -> MicrosDurationU32 {
        MicrosDurationU32::millis(self.burst_pulse_ms)
    }

    pub fn settle(&self) -> MicrosDurationU32 {
        MicrosDurationU32::millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    pub wiring: StepperWiring,
    pub timing: PulseTiming,
    pub turn_sequences: TurnSequences,
    pub conversion_ratios: ConversionRatios,
}

impl StepperConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.burst_pulse_ms == 0 {
            return Err(ConfigError::ValidationError(
                "burst_pulse_ms must be greater than zero".to_string(),
            ));
        }
        for (name, ms) in [
            ("burst_pulse_ms", self.timing.burst_pulse_ms),
            ("settle_ms", self.timing.settle_ms),
        ] {
            if ms > MAX_DURATION_MS {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be at most {MAX_DURATION_MS}, got {ms}"
                )));
            }
        }
        for (change, moves) in self.turn_sequences.iter() {
            if moves.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "turn sequence {change} is empty"
                )));
            }
        }
        for (direction, ratio) in self.conversion_ratios.iter() {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "conversion ratio for {direction} must be positive, got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// Wiring and calibration of the analog power supply interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerSupplyConfig {
    /// Monitor output => DAQ terminal label.
    pub monitor_lines: WiringTable,
    /// Programming input => DAC label.
    pub program_lines: WiringTable,
    /// DAQ terminal label => line.
    pub daq_terminals: WiringTable<DaqTerminal>,
    /// DAC label => register.
    pub dac_registers: WiringTable<Register>,
    /// Number of low lines switched to analog input at start-up.
    pub analog_input_channels: u8,
    /// The programmed current undershoots the requested value by this
    /// fraction; it is added on top when programming.
    pub correction_factor: f64,
}

impl Default for PowerSupplyConfig {
    fn default() -> Self {
        Self {
            monitor_lines: setup::power_supply_monitors(),
            program_lines: setup::power_supply_programs(),
            daq_terminals: setup::u3_terminals(),
            dac_registers: setup::u3_dac_registers(),
            analog_input_channels: 7,
            correction_factor: 0.1,
        }
    }
}

impl PowerSupplyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analog_input_channels > 16 {
            return Err(ConfigError::ValidationError(format!(
                "analog_input_channels must be at most 16, got {}",
                self.analog_input_channels
            )));
        }
        if !self.correction_factor.is_finite() || self.correction_factor <= -1.0 {
            return Err(ConfigError::ValidationError(format!(
                "correction_factor must be greater than -1, got {}",
                self.correction_factor
            )));
        }
        Ok(())
    }
}
