//! The boundary to the data-acquisition device and to the clock.
//!
//! Nothing in this crate talks USB. A [`Daq`] implementation wraps whatever
//! driver is used for the LabJack (or a simulator), and a [`Delay`]
//! implementation provides the blocking holds between pulse edges.

use fugit::MicrosDurationU32;

/// Numbered I/O line on the DAQ (FIO0 => `0`, ..., FIO7 => `7`).
pub type Channel = u8;

/// Modbus-style register address of an analog output (e.g. DAC0 => `5000`).
pub type Register = u16;

/// Level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogicLevel {
    /// Logic low, `0`.
    Low = 0,
    /// Logic high, `1`.
    High = 1,
}

impl From<LogicLevel> for bool {
    fn from(value: LogicLevel) -> Self {
        match value {
            LogicLevel::Low => false,
            LogicLevel::High => true,
        }
    }
}

impl From<bool> for LogicLevel {
    fn from(value: bool) -> Self {
        match value {
            true => LogicLevel::High,
            false => LogicLevel::Low,
        }
    }
}

impl From<LogicLevel> for u8 {
    fn from(value: LogicLevel) -> Self {
        value as u8
    }
}

/// Which of the low-numbered lines are switched to analog input.
///
/// The U3 takes one bit per flexible I/O line: the FIO byte covers lines
/// 0-7 and the EIO byte covers lines 8-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogInputMask {
    pub fio: u8,
    pub eio: u8,
}

impl AnalogInputMask {
    /// Enable the lowest `num_channels` lines as analog inputs.
    ///
    /// Values above 16 saturate to all lines.
    pub const fn lowest(num_channels: u8) -> Self {
        let bits: u32 = if num_channels >= 16 {
            0xFFFF
        } else {
            (1u32 << num_channels) - 1
        };
        Self {
            fio: (bits & 0xFF) as u8,
            eio: (bits >> 8) as u8,
        }
    }
}

/// The operations this crate needs from a DAQ device driver.
///
/// Implementations must issue [`Daq::batch_write_digital`] as a single
/// device transaction so that no intermediate line combination becomes
/// visible to the connected controller.
pub trait Daq: embedded_io::ErrorType {
    /// Switch the lines in `mask` to analog input.
    fn configure_analog_inputs(&mut self, mask: AnalogInputMask) -> Result<(), Self::Error>;

    /// Single-ended voltage read of `channel`, in volts.
    fn read_analog(&mut self, channel: Channel) -> Result<f64, Self::Error>;

    /// Set the analog output behind `register` to `value` volts.
    fn write_analog_register(&mut self, register: Register, value: f64)
    -> Result<(), Self::Error>;

    /// Current level of the digital input `channel`.
    fn read_digital_state(&mut self, channel: Channel) -> Result<LogicLevel, Self::Error>;

    /// Set all given lines in one transaction.
    fn batch_write_digital(&mut self, writes: &[(Channel, LogicLevel)])
    -> Result<(), Self::Error>;
}

/// Blocking delay used for pulse holds.
pub trait Delay {
    fn delay(&mut self, duration: MicrosDurationU32);
}

/// [`Delay`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay(&mut self, duration: MicrosDurationU32) {
        std::thread::sleep(std::time::Duration::from_micros(duration.to_micros() as u64));
    }
}
