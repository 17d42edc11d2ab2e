//! This crate drives lab instruments that hang off a LabJack U3/U6 style data-acquisition device.
//!
//! Supported instruments:
//! * Ferrovac piezo stepper controller, through three digital direction inputs and three
//!   status LED outputs ([`stepper::StepperMotor`]), including calibrated turn-arounds
//!   that correct the backlash of 180 degree direction changes.
//! * Delta Elektronika DC power supplies with an analog programming interface
//!   ([`power_supply::DeltaPowerSupply`]).
//!
//! The DAQ driver itself is not part of this crate. Instruments are generic over the
//! [`daq::Daq`] trait; errors of the driver are classified through `embedded_io::Error`.
//!
//! The physical wiring is described hop by hop (controller pin, cable colour, DAQ terminal)
//! and resolved once, when an instrument is constructed. All of it can be loaded from a TOML
//! file through [`config::LabConfig`].
//!
//! The motion setting of the stepper controller (continuous, burst, single) can only be
//! changed on its front panel. Counted moves check the setting first and fail without moving
//! if it does not match.

pub mod config;
pub mod conversion;
pub mod daq;
pub mod direction;
pub mod error;
pub mod mode;
pub mod power_supply;
pub mod stepper;
pub mod steps;
pub mod turn_around;
pub mod wiring;

#[cfg(test)]
mod mock_daq;
