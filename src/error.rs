//! Our error types for the DAQ-driven instruments.

use thiserror::Error;

use crate::{
    direction::InvalidDirection, mode::MotionSetting, steps::InvalidStepCount,
    turn_around::InvalidDirectionChange, wiring::WiringError,
};

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Errors of the stepper and power supply controllers, generic over the
/// error type of the DAQ driver.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("DAQ communication error")]
    DaqError(I),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Wiring(#[from] WiringError),
    #[error(transparent)]
    InvalidDirection(#[from] InvalidDirection),
    #[error(transparent)]
    InvalidDirectionChange(#[from] InvalidDirectionChange),
    #[error(transparent)]
    InvalidStepCount(#[from] InvalidStepCount),
    /// A current setpoint that is negative or not a number.
    #[error("invalid current setpoint: {0} A")]
    InvalidSetpoint(f64),
    /// The controller is not in the motion setting an operation needs.
    /// The setting has to be changed on the controller front panel.
    #[error("need to switch the controller motion setting to {expected}, it is set to {observed}")]
    ModeMismatch {
        expected: MotionSetting,
        observed: MotionSetting,
    },
}
