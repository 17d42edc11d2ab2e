//! We use this mocking module in unit tests to emulate a LabJack and the clock.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use fugit::MicrosDurationU32;

use crate::daq::{AnalogInputMask, Channel, Daq, Delay, LogicLevel, Register};

/// Everything the code under test did, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    ConfigureAnalog(AnalogInputMask),
    ReadAnalog(Channel),
    WriteRegister(Register, f64),
    ReadDigital(Channel),
    BatchWrite(Vec<(Channel, LogicLevel)>),
    Delay(MicrosDurationU32),
}

#[derive(Debug)]
pub enum MockDaqError {
    /// Simulated timeout error
    Timeout,
    /// Generic simulated error for testing
    SimulatedError,
}

impl core::fmt::Display for MockDaqError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for MockDaqError {}

impl embedded_io::Error for MockDaqError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockDaqError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockDaqError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

/// Our mock type used to emulate the DAQ.
pub struct MockDaq {
    log: Rc<RefCell<Vec<MockEvent>>>,
    /// Levels returned by digital reads; unset lines read high.
    digital_inputs: HashMap<Channel, LogicLevel>,
    /// Voltages returned by analog reads; unset channels read 0 V.
    analog_inputs: HashMap<Channel, f64>,
    /// Fail every operation once this many have succeeded.
    fail_after: Option<usize>,
    operations: usize,
}

impl embedded_io::ErrorType for MockDaq {
    type Error = MockDaqError;
}

impl MockDaq {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            digital_inputs: HashMap::new(),
            analog_inputs: HashMap::new(),
            fail_after: None,
            operations: 0,
        }
    }

    /// A delay that records into the same event log.
    pub fn delay(&self) -> MockDelay {
        MockDelay {
            log: Rc::clone(&self.log),
        }
    }

    pub fn set_digital_input(&mut self, channel: Channel, level: LogicLevel) {
        self.digital_inputs.insert(channel, level);
    }

    pub fn set_analog_input(&mut self, channel: Channel, volts: f64) {
        self.analog_inputs.insert(channel, volts);
    }

    pub fn fail_after(&mut self, operations: usize) {
        self.fail_after = Some(operations);
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.log.borrow().clone()
    }

    pub fn clear_events(&mut self) {
        self.log.borrow_mut().clear();
    }

    /// Only the batched digital writes, in order.
    pub fn batch_writes(&self) -> Vec<Vec<(Channel, LogicLevel)>> {
        self.log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                MockEvent::BatchWrite(writes) => Some(writes.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, event: MockEvent) -> Result<(), MockDaqError> {
        if self.fail_after.is_some_and(|limit| self.operations >= limit) {
            return Err(MockDaqError::SimulatedError);
        }
        self.operations += 1;
        self.log.borrow_mut().push(event);
        Ok(())
    }
}

impl Daq for MockDaq {
    fn configure_analog_inputs(&mut self, mask: AnalogInputMask) -> Result<(), Self::Error> {
        self.record(MockEvent::ConfigureAnalog(mask))
    }

    fn read_analog(&mut self, channel: Channel) -> Result<f64, Self::Error> {
        self.record(MockEvent::ReadAnalog(channel))?;
        Ok(self.analog_inputs.get(&channel).copied().unwrap_or(0.0))
    }

    fn write_analog_register(&mut self, register: Register, value: f64) -> Result<(), Self::Error> {
        self.record(MockEvent::WriteRegister(register, value))
    }

    fn read_digital_state(&mut self, channel: Channel) -> Result<LogicLevel, Self::Error> {
        self.record(MockEvent::ReadDigital(channel))?;
        Ok(self
            .digital_inputs
            .get(&channel)
            .copied()
            .unwrap_or(LogicLevel::High))
    }

    fn batch_write_digital(&mut self, writes: &[(Channel, LogicLevel)]) -> Result<(), Self::Error> {
        self.record(MockEvent::BatchWrite(writes.to_vec()))
    }
}

/// Records requested delays instead of sleeping.
pub struct MockDelay {
    log: Rc<RefCell<Vec<MockEvent>>>,
}

impl Delay for MockDelay {
    fn delay(&mut self, duration: MicrosDurationU32) {
        self.log.borrow_mut().push(MockEvent::Delay(duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::Error;

    #[test]
    fn test_records_in_order() {
        let mut daq = MockDaq::new();
        let mut delay = daq.delay();

        daq.batch_write_digital(&[(0, LogicLevel::High)]).unwrap();
        delay.delay(MicrosDurationU32::millis(5));
        daq.read_digital_state(3).unwrap();

        assert_eq!(
            daq.events(),
            vec![
                MockEvent::BatchWrite(vec![(0, LogicLevel::High)]),
                MockEvent::Delay(MicrosDurationU32::millis(5)),
                MockEvent::ReadDigital(3),
            ]
        );
    }

    #[test]
    fn test_inputs() {
        let mut daq = MockDaq::new();
        assert_eq!(daq.read_digital_state(5).unwrap(), LogicLevel::High);
        daq.set_digital_input(5, LogicLevel::Low);
        assert_eq!(daq.read_digital_state(5).unwrap(), LogicLevel::Low);

        assert_eq!(daq.read_analog(0).unwrap(), 0.0);
        daq.set_analog_input(0, 2.5);
        assert_eq!(daq.read_analog(0).unwrap(), 2.5);
    }

    #[test]
    fn test_fail_after() {
        let mut daq = MockDaq::new();
        daq.fail_after(1);
        assert!(daq.read_analog(0).is_ok());
        let err = daq.read_analog(0).unwrap_err();
        assert!(matches!(err, MockDaqError::SimulatedError));
        assert_eq!(daq.events().len(), 1);
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(MockDaqError::Timeout.kind(), embedded_io::ErrorKind::TimedOut));
        assert!(matches!(MockDaqError::SimulatedError.kind(), embedded_io::ErrorKind::Other));
    }

    #[test]
    fn test_clear_events() {
        let mut daq = MockDaq::new();
        daq.configure_analog_inputs(AnalogInputMask::lowest(2)).unwrap();
        daq.clear_events();
        assert!(daq.events().is_empty());
        assert!(daq.batch_writes().is_empty());
    }
}
