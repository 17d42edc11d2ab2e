//! Ferrovac piezo stepper controller driven through DAQ digital lines.
//!
//! The controller has three direction inputs (`bit0..bit2`) and three
//! status LEDs (continuous, burst, single) on its DSUB9 output plug. A
//! movement is triggered by a stop => direction => stop pulse on the inputs;
//! what the pulse does depends on the motion setting selected on the
//! controller front panel.

use fugit::MicrosDurationU32;
use strum::EnumCount;
use tracing::{debug, info, trace, warn};

use crate::{
    config::{PulseTiming, StepperConfig},
    conversion::ConversionRatios,
    daq::{Channel, Daq, Delay, LogicLevel, StdDelay},
    direction::{ControlLine, Direction, DirectionEncoder},
    error::{Error, Result},
    mode::{MotionSetting, StatusLine, decode_setting},
    steps::{InvalidStepCount, StepCount},
    turn_around::TurnSequences,
    wiring::{DaqTerminal, WiringChain, WiringError, WiringTable},
};

/// Pulse length used by [`StepperMotor::walk`] callers that have no better
/// value.
pub const DEFAULT_WALK_DURATION: MicrosDurationU32 = MicrosDurationU32::millis(100);

/// Pulse length per single step.
pub const DEFAULT_STEP_DURATION: MicrosDurationU32 = MicrosDurationU32::millis(10);

/// DAQ channels of the controller's inputs and status LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerLines {
    control: [Channel; ControlLine::COUNT],
    status: [(StatusLine, Channel); 3],
}

impl ControllerLines {
    /// Pick the controller lines out of a resolved pin table.
    pub fn from_pins(pins: &WiringTable<DaqTerminal>) -> core::result::Result<Self, WiringError> {
        let bit = |line: ControlLine| pins.channel(line.label());
        let led = |line: StatusLine| pins.channel(line.label()).map(|channel| (line, channel));

        Ok(Self {
            control: [
                bit(ControlLine::Bit0)?,
                bit(ControlLine::Bit1)?,
                bit(ControlLine::Bit2)?,
            ],
            status: [
                led(StatusLine::Continuous)?,
                led(StatusLine::Burst)?,
                led(StatusLine::Single)?,
            ],
        })
    }

    pub fn control_channel(&self, line: ControlLine) -> Channel {
        self.control[line as usize]
    }

    /// Status lines in polling order.
    pub fn status_channels(&self) -> &[(StatusLine, Channel)] {
        &self.status
    }
}

/// You can create a StepperMotor using any DAQ which implements [`Daq`].
///
/// All operations block until the pulse sequence is complete. There is no
/// way to abort a running sequence. The motor owns its DAQ handle; use one
/// instance per physical controller.
pub struct StepperMotor<D: Daq, T: Delay = StdDelay> {
    daq: D,
    delay: T,
    lines: ControllerLines,
    encoder: DirectionEncoder,
    timing: PulseTiming,
    turn_sequences: TurnSequences,
    ratios: ConversionRatios,
}

impl<D: Daq> StepperMotor<D, StdDelay> {
    /// Create a motor with the lab's default wiring and calibration.
    pub fn with_defaults(daq: D) -> Result<Self, D::Error> {
        Self::new(daq, StdDelay, &StepperConfig::default())
    }
}

impl<D: Daq, T: Delay> StepperMotor<D, T> {
    /// Create a new StepperMotor, resolving the configured wiring to DAQ
    /// channels.
    pub fn new(daq: D, delay: T, config: &StepperConfig) -> Result<Self, D::Error> {
        config
            .validate()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        let wiring = &config.wiring;
        let pins = WiringChain::new(&wiring.controller_pins)
            .then(&wiring.dsub9_pins)?
            .then(&wiring.cable_colors)?
            .resolve(&wiring.daq_terminals)?;
        let lines = ControllerLines::from_pins(&pins)?;
        debug!(?lines, "resolved controller lines");

        Ok(Self {
            daq,
            delay,
            lines,
            encoder: DirectionEncoder::default(),
            timing: config.timing,
            turn_sequences: config.turn_sequences.clone(),
            ratios: config.conversion_ratios.clone(),
        })
    }

    /// Replace the direction table, for controllers with a different input
    /// coding.
    pub fn with_encoder(mut self, encoder: DirectionEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn lines(&self) -> &ControllerLines {
        &self.lines
    }

    pub fn encoder(&self) -> &DirectionEncoder {
        &self.encoder
    }

    pub fn turn_sequences(&self) -> &TurnSequences {
        &self.turn_sequences
    }

    pub fn conversion_ratios(&self) -> &ConversionRatios {
        &self.ratios
    }

    pub fn daq(&self) -> &D {
        &self.daq
    }

    pub fn daq_mut(&mut self) -> &mut D {
        &mut self.daq
    }

    /// Give back the DAQ and the delay.
    pub fn release(self) -> (D, T) {
        (self.daq, self.delay)
    }

    /// The writes that put `direction` on the control lines.
    pub fn channel_pattern(&self, direction: Direction) -> [(Channel, LogicLevel); ControlLine::COUNT] {
        let pattern = *self.encoder.encode(direction);
        pattern.map(|(line, level)| (self.lines.control_channel(line), level))
    }

    /// Read the motion setting from the controller's status LEDs.
    ///
    /// The setting can only be changed on the controller itself.
    pub fn current_mode(&mut self) -> Result<MotionSetting, D::Error> {
        let mut levels = [(StatusLine::Continuous, LogicLevel::High); 3];
        for (slot, (line, channel)) in levels.iter_mut().zip(self.lines.status) {
            let level = self
                .daq
                .read_digital_state(channel)
                .map_err(Error::DaqError)?;
            *slot = (line, level);
        }

        let setting = decode_setting(levels);
        if setting == MotionSetting::Auto {
            // May also be a disconnected status cable.
            warn!(?levels, "no motion setting LED active, reporting auto");
        }
        Ok(setting)
    }

    /// Fail unless the controller is set to `expected`.
    pub fn require_mode(&mut self, expected: MotionSetting) -> Result<(), D::Error> {
        let observed = self.current_mode()?;
        if observed != expected {
            warn!(%expected, %observed, "controller motion setting mismatch");
            return Err(Error::ModeMismatch { expected, observed });
        }
        Ok(())
    }

    /// Put the direction pattern on the control lines, all lines in one
    /// write.
    fn set_direction(&mut self, direction: Direction) -> Result<(), D::Error> {
        let writes = self.channel_pattern(direction);
        trace!(%direction, ?writes, "set direction lines");
        self.daq
            .batch_write_digital(&writes)
            .map_err(Error::DaqError)
    }

    /// Send one stop => `direction` => stop pulse.
    ///
    /// In continuous mode `duration` is how long the motor moves; in single
    /// or burst mode every pulse triggers one step or burst regardless of
    /// its length.
    pub fn walk(&mut self, direction: Direction, duration: MicrosDurationU32) -> Result<(), D::Error> {
        debug!(%direction, duration_us = duration.to_micros(), "walk");
        let half = duration / 2;
        self.set_direction(Direction::Stop)?;
        self.set_direction(direction)?;
        self.delay.delay(half);
        self.set_direction(Direction::Stop)?;
        self.delay.delay(half);
        Ok(())
    }

    /// Walk `n_steps` single steps towards `direction`.
    ///
    /// The controller must be in single mode. `duration_per_step` only has
    /// to be long enough for the controller to register every pulse.
    pub fn walk_steps(
        &mut self,
        direction: Direction,
        n_steps: impl TryInto<StepCount, Error = InvalidStepCount>,
        duration_per_step: MicrosDurationU32,
    ) -> Result<(), D::Error> {
        let steps = n_steps.try_into()?;
        self.require_mode(MotionSetting::Single)?;
        info!(%direction, steps = steps.get(), "walking steps");
        self.repeat_walk(direction, steps, duration_per_step)
    }

    /// Walk `n_bursts` bursts towards `direction`.
    ///
    /// The controller must be in burst mode. Bursts need a defined pulse
    /// length, so it comes from the configured timing.
    pub fn walk_bursts(
        &mut self,
        direction: Direction,
        n_bursts: impl TryInto<StepCount, Error = InvalidStepCount>,
    ) -> Result<(), D::Error> {
        let bursts = n_bursts.try_into()?;
        self.require_mode(MotionSetting::Burst)?;
        info!(%direction, bursts = bursts.get(), "walking bursts");
        self.repeat_walk(direction, bursts, self.timing.burst_pulse())
    }

    fn repeat_walk(
        &mut self,
        direction: Direction,
        count: StepCount,
        duration: MicrosDurationU32,
    ) -> Result<(), D::Error> {
        let settle = self.timing.settle();
        for _ in 0..count.get() {
            self.walk(direction, duration)?;
            self.delay.delay(settle);
        }
        Ok(())
    }

    /// Convert a step count measured along the opposite direction into the
    /// equivalent count towards `target`.
    pub fn convert_step_count(&self, target: Direction, step_count: i64) -> Result<i64, D::Error> {
        Ok(self.ratios.convert_step_count(target, step_count)?)
    }

    /// [`Self::convert_step_count`] over a sequence of counts.
    pub fn convert_step_vector(
        &self,
        target: Direction,
        step_counts: &[i64],
    ) -> Result<Vec<i64>, D::Error> {
        Ok(self.ratios.convert_step_vector(target, step_counts)?)
    }
}
