//! Delta Elektronika DC power supply behind the DAQ's analog I/O.
//!
//! The supply exports its output voltage and current as monitor voltages
//! between 0 and its readout maximum, and takes the current setpoint as a
//! programming voltage on the same scale. Monitors are read on analog
//! inputs; the setpoint is written to a DAC register.

use strum_macros::{Display, EnumIter};
use tracing::{debug, info, trace};

use crate::{
    config::PowerSupplyConfig,
    daq::{AnalogInputMask, Channel, Daq, Register},
    error::{Error, Result},
    wiring::{WiringChain, WiringError},
};

const VOLTAGE_MONITOR: &str = "V_monitor";
const CURRENT_MONITOR: &str = "I_monitor";
const CURRENT_PROGRAM: &str = "I_program";

/// Full-scale values of a supply model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupplyRatings {
    /// Monitor/programming voltage at full scale, in volts.
    pub v_readout_max: f64,
    /// Output voltage at full scale, in volts.
    pub v_output_max: f64,
    /// Output current at full scale, in amps.
    pub i_output_max: f64,
}

impl Default for SupplyRatings {
    /// Default to no scaling.
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

impl SupplyRatings {
    pub const fn new(v_readout_max: f64, v_output_max: f64, i_output_max: f64) -> Self {
        Self {
            v_readout_max,
            v_output_max,
            i_output_max,
        }
    }

    /// Programming voltage for an output current of `current` amps.
    ///
    /// The supply delivers slightly less than programmed; `correction` is
    /// the relative amount added on top.
    pub fn convert_to_readout_voltage(&self, current: f64, correction: f64) -> f64 {
        current / self.i_output_max * self.v_readout_max * (1.0 + correction)
    }

    /// Output voltage for a voltage monitor reading.
    pub fn monitor_to_voltage(&self, monitor: f64) -> f64 {
        monitor / self.v_readout_max * self.v_output_max
    }

    /// Output current for a current monitor reading.
    pub fn monitor_to_current(&self, monitor: f64) -> f64 {
        monitor / self.v_readout_max * self.i_output_max
    }

    fn is_usable(&self) -> bool {
        [self.v_readout_max, self.v_output_max, self.i_output_max]
            .iter()
            .all(|value| value.is_finite() && *value > 0.0)
    }
}

/// Known supply models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum SupplyModel {
    /// Unscaled: monitor volts are reported as they are read.
    Generic,
    /// ES 030-10: 0-30 V, 0-10 A, 5 V analog interface.
    ES03010,
}

impl SupplyModel {
    pub const fn ratings(&self) -> SupplyRatings {
        match self {
            SupplyModel::Generic => SupplyRatings::new(1.0, 1.0, 1.0),
            SupplyModel::ES03010 => SupplyRatings::new(5.0, 30.0, 10.0),
        }
    }
}

/// Analog lines of the supply, resolved from the wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplyLines {
    pub voltage_monitor: Channel,
    pub current_monitor: Channel,
    pub current_program: Register,
}

impl SupplyLines {
    fn resolve(config: &PowerSupplyConfig) -> core::result::Result<Self, WiringError> {
        let monitors = WiringChain::new(&config.monitor_lines).resolve(&config.daq_terminals)?;
        let programs = WiringChain::new(&config.program_lines).resolve(&config.dac_registers)?;

        let current_program =
            programs
                .get(CURRENT_PROGRAM)
                .copied()
                .ok_or_else(|| WiringError::Unwired {
                    line: CURRENT_PROGRAM.to_string(),
                })?;

        Ok(Self {
            voltage_monitor: monitors.channel(VOLTAGE_MONITOR)?,
            current_monitor: monitors.channel(CURRENT_MONITOR)?,
            current_program,
        })
    }
}

pub struct DeltaPowerSupply<D: Daq> {
    daq: D,
    ratings: SupplyRatings,
    lines: SupplyLines,
    correction_factor: f64,
}

impl<D: Daq> DeltaPowerSupply<D> {
    /// Connect to a supply of a known model.
    pub fn for_model(daq: D, model: SupplyModel, config: &PowerSupplyConfig) -> Result<Self, D::Error> {
        debug!(%model, "power supply model");
        Self::new(daq, model.ratings(), config)
    }

    /// Connect to a supply with the given ratings and switch the monitor
    /// lines to analog input.
    pub fn new(mut daq: D, ratings: SupplyRatings, config: &PowerSupplyConfig) -> Result<Self, D::Error> {
        config
            .validate()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        if !ratings.is_usable() {
            return Err(Error::Configuration(format!(
                "supply ratings must be positive: {ratings:?}"
            )));
        }

        let lines = SupplyLines::resolve(config)?;
        debug!(?lines, ?ratings, "resolved power supply lines");

        daq.configure_analog_inputs(AnalogInputMask::lowest(config.analog_input_channels))
            .map_err(Error::DaqError)?;

        Ok(Self {
            daq,
            ratings,
            lines,
            correction_factor: config.correction_factor,
        })
    }

    pub fn ratings(&self) -> SupplyRatings {
        self.ratings
    }

    /// Replace the ratings, for models this crate does not know.
    pub fn set_ratings(&mut self, ratings: SupplyRatings) -> Result<(), D::Error> {
        if !ratings.is_usable() {
            return Err(Error::Configuration(format!(
                "supply ratings must be positive: {ratings:?}"
            )));
        }
        self.ratings = ratings;
        Ok(())
    }

    pub fn lines(&self) -> SupplyLines {
        self.lines
    }

    pub fn daq(&self) -> &D {
        &self.daq
    }

    pub fn daq_mut(&mut self) -> &mut D {
        &mut self.daq
    }

    pub fn release(self) -> D {
        self.daq
    }

    /// Raw voltage monitor reading, in volts.
    pub fn read_voltage_monitor(&mut self) -> Result<f64, D::Error> {
        let volts = self
            .daq
            .read_analog(self.lines.voltage_monitor)
            .map_err(Error::DaqError)?;
        trace!(volts, "voltage monitor");
        Ok(volts)
    }

    /// Raw current monitor reading, in volts.
    pub fn read_current_monitor(&mut self) -> Result<f64, D::Error> {
        let volts = self
            .daq
            .read_analog(self.lines.current_monitor)
            .map_err(Error::DaqError)?;
        trace!(volts, "current monitor");
        Ok(volts)
    }

    /// Output voltage, in volts.
    pub fn read_output_voltage(&mut self) -> Result<f64, D::Error> {
        let monitor = self.read_voltage_monitor()?;
        Ok(self.ratings.monitor_to_voltage(monitor))
    }

    /// Output current, in amps.
    pub fn read_output_current(&mut self) -> Result<f64, D::Error> {
        let monitor = self.read_current_monitor()?;
        Ok(self.ratings.monitor_to_current(monitor))
    }

    /// Program the output current to `amps`.
    pub fn set_current(&mut self, amps: f64) -> Result<(), D::Error> {
        if !amps.is_finite() || amps < 0.0 {
            return Err(Error::InvalidSetpoint(amps));
        }
        let volts = self
            .ratings
            .convert_to_readout_voltage(amps, self.correction_factor);
        info!(amps, volts, register = self.lines.current_program, "set current");
        self.daq
            .write_analog_register(self.lines.current_program, volts)
            .map_err(Error::DaqError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_daq::{MockDaq, MockEvent};
    use crate::wiring::DaqTerminal;
    use strum::IntoEnumIterator;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn supply() -> DeltaPowerSupply<MockDaq> {
        DeltaPowerSupply::for_model(
            MockDaq::new(),
            SupplyModel::ES03010,
            &PowerSupplyConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_construction_configures_analog_inputs() {
        let supply = supply();
        assert_eq!(
            supply.daq().events(),
            vec![MockEvent::ConfigureAnalog(AnalogInputMask { fio: 0x7F, eio: 0 })]
        );
        assert_eq!(
            supply.lines(),
            SupplyLines {
                voltage_monitor: 0,
                current_monitor: 1,
                current_program: 5000,
            }
        );
    }

    #[test]
    fn test_monitor_readings() {
        let mut supply = supply();
        supply.daq_mut().set_analog_input(0, 2.5);
        supply.daq_mut().set_analog_input(1, 1.0);
        supply.daq_mut().clear_events();

        assert_close(supply.read_voltage_monitor().unwrap(), 2.5);
        assert_close(supply.read_current_monitor().unwrap(), 1.0);
        assert_close(supply.read_output_voltage().unwrap(), 15.0);
        assert_close(supply.read_output_current().unwrap(), 2.0);

        assert_eq!(
            supply.daq().events(),
            vec![
                MockEvent::ReadAnalog(0),
                MockEvent::ReadAnalog(1),
                MockEvent::ReadAnalog(0),
                MockEvent::ReadAnalog(1),
            ]
        );
    }

    #[test]
    fn test_set_current() {
        let mut supply = supply();
        supply.daq_mut().clear_events();
        supply.set_current(2.0).unwrap();

        let events = supply.daq().events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            MockEvent::WriteRegister(register, volts) => {
                assert_eq!(*register, 5000);
                // 2 A of 10 A on a 5 V scale, plus 10 %.
                assert_close(*volts, 1.1);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_set_current_rejects_bad_setpoints() {
        let mut supply = supply();
        supply.daq_mut().clear_events();
        for amps in [-0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                supply.set_current(amps),
                Err(Error::InvalidSetpoint(_))
            ));
        }
        assert!(supply.daq().events().is_empty());
    }

    #[test]
    fn test_convert_to_readout_voltage() {
        let ratings = SupplyModel::ES03010.ratings();
        assert_close(ratings.convert_to_readout_voltage(10.0, 0.0), 5.0);
        assert_close(ratings.convert_to_readout_voltage(5.0, 0.1), 2.75);
        assert_close(ratings.convert_to_readout_voltage(0.0, 0.1), 0.0);

        let generic = SupplyRatings::default();
        assert_close(generic.convert_to_readout_voltage(0.3, 0.0), 0.3);
    }

    #[test]
    fn test_model_ratings() {
        for model in SupplyModel::iter() {
            assert!(model.ratings().is_usable(), "{model}");
        }
        assert_eq!(SupplyModel::Generic.ratings(), SupplyRatings::default());
        assert_eq!(
            SupplyModel::ES03010.ratings(),
            SupplyRatings::new(5.0, 30.0, 10.0)
        );
    }

    #[test]
    fn test_custom_ratings() {
        let mut supply = supply();
        supply.set_ratings(SupplyRatings::new(10.0, 60.0, 20.0)).unwrap();
        supply.daq_mut().set_analog_input(0, 5.0);
        assert_close(supply.read_output_voltage().unwrap(), 30.0);

        let err = supply
            .set_ratings(SupplyRatings::new(0.0, 60.0, 20.0))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(supply.ratings(), SupplyRatings::new(10.0, 60.0, 20.0));
    }

    #[test]
    fn test_configured_channel_count() {
        let config = PowerSupplyConfig {
            analog_input_channels: 10,
            ..PowerSupplyConfig::default()
        };
        let supply =
            DeltaPowerSupply::new(MockDaq::new(), SupplyRatings::default(), &config).unwrap();
        assert_eq!(
            supply.daq().events(),
            vec![MockEvent::ConfigureAnalog(AnalogInputMask {
                fio: 0xFF,
                eio: 0x03
            })]
        );
    }

    #[test]
    fn test_monitor_on_ground_is_unwired() {
        let mut config = PowerSupplyConfig::default();
        config.daq_terminals = [
            ("FIO0", DaqTerminal::Reserved("GND".to_string())),
            ("FIO1", DaqTerminal::Channel(1)),
        ]
        .into_iter()
        .collect();

        let result = DeltaPowerSupply::new(MockDaq::new(), SupplyRatings::default(), &config);
        match result {
            Err(Error::Wiring(WiringError::Unwired { line })) => assert_eq!(line, "V_monitor"),
            Err(other) => panic!("Unexpected error: {:?}", other),
            Ok(_) => panic!("Expected a wiring error"),
        }
    }

    #[test]
    fn test_missing_dac_register() {
        let mut config = PowerSupplyConfig::default();
        config.dac_registers = [("DAC1", 5002)].into_iter().collect();

        let result = DeltaPowerSupply::new(MockDaq::new(), SupplyRatings::default(), &config);
        assert!(matches!(
            result,
            Err(Error::Wiring(WiringError::Mismatch { table: 1, .. }))
        ));
    }

    #[test]
    fn test_daq_error_on_construction() {
        let mut daq = MockDaq::new();
        daq.fail_after(0);
        let result = DeltaPowerSupply::for_model(daq, SupplyModel::ES03010, &PowerSupplyConfig::default());
        assert!(matches!(result, Err(Error::DaqError(_))));
    }

    #[test]
    fn test_invalid_config() {
        let config = PowerSupplyConfig {
            correction_factor: f64::NAN,
            ..PowerSupplyConfig::default()
        };
        let result = DeltaPowerSupply::new(MockDaq::new(), SupplyRatings::default(), &config);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
