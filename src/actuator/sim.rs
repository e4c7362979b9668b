// In-process simulated Talon SRX
//
// Records every bus call so tests can assert on the exact configuration
// sequence, and moves its sensor toward closed-loop targets so the runtime has
// something to drive without hardware.

use tracing::debug;

use super::transport::{
    CanPort, ControlMode, FeedbackDevice, GainTerm, Result, StatusFrame, TalonTransport,
    TransportError,
};

/// Default slew (sensor units per `set`) before a cruise velocity is configured
const DEFAULT_SLEW: i32 = 50;

/// Calls into the simulated controller, in the order they were made
#[derive(Debug, Clone, PartialEq)]
pub enum TalonCall {
    SetSensorPhase(bool),
    ConfigSelectedFeedbackSensor {
        device: FeedbackDevice,
        loop_idx: u8,
        timeout_ms: u32,
    },
    SetInverted(bool),
    ConfigNominalOutputForward(f64),
    ConfigNominalOutputReverse(f64),
    ConfigPeakOutputForward(f64),
    ConfigPeakOutputReverse(f64),
    ConfigAllowableClosedloopError {
        error: u32,
        loop_idx: u8,
    },
    ConfigGain {
        term: GainTerm,
        slot: u8,
        value: f64,
    },
    SetStatusFramePeriod {
        frame: StatusFrame,
        period_ms: u8,
    },
    SelectProfileSlot {
        slot: u8,
        loop_idx: u8,
    },
    ConfigMotionCruiseVelocity(i32),
    ConfigMotionAcceleration(i32),
    Set {
        mode: ControlMode,
        value: f64,
    },
}

/// Simulated motor controller
#[derive(Debug, Clone)]
pub struct SimTalon {
    port: CanPort,
    calls: Vec<TalonCall>,
    mode: ControlMode,
    sensor_position: i32,
    cruise_velocity: i32,
    unsupported_sensors: Vec<FeedbackDevice>,
}

impl SimTalon {
    pub fn new(port: CanPort) -> Self {
        Self {
            port,
            calls: Vec::new(),
            mode: ControlMode::Disabled,
            sensor_position: 0,
            cruise_velocity: 0,
            unsupported_sensors: Vec::new(),
        }
    }

    /// Open a simulated controller, failing if `port` is listed as absent
    pub fn open(port: CanPort, absent: &[CanPort]) -> Result<Self> {
        if absent.contains(&port) {
            return Err(TransportError::Unreachable { port });
        }
        Ok(Self::new(port))
    }

    /// Reject `device` when it is selected as the feedback sensor
    pub fn with_unsupported_sensor(mut self, device: FeedbackDevice) -> Self {
        self.unsupported_sensors.push(device);
        self
    }

    pub fn with_sensor_position(mut self, position: i32) -> Self {
        self.sensor_position = position;
        self
    }

    pub fn port(&self) -> CanPort {
        self.port
    }

    pub fn calls(&self) -> &[TalonCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Values passed to `set`, oldest first
    pub fn set_values(&self) -> Vec<(ControlMode, f64)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                TalonCall::Set { mode, value } => Some((*mode, *value)),
                _ => None,
            })
            .collect()
    }

    /// Force the reported mode, as another owner of the controller would
    pub fn force_mode(&mut self, mode: ControlMode) {
        self.mode = mode;
    }

    pub fn set_sensor_position(&mut self, position: i32) {
        self.sensor_position = position;
    }

    /// Move the sensor one step toward `target`
    fn slew_toward(&mut self, target: f64) {
        let step = if self.cruise_velocity > 0 {
            self.cruise_velocity
        } else {
            DEFAULT_SLEW
        };
        let target = target.round() as i32;
        let delta = (target - self.sensor_position).clamp(-step, step);
        self.sensor_position += delta;
    }
}

impl TalonTransport for SimTalon {
    fn set_sensor_phase(&mut self, phase: bool) -> Result<()> {
        self.calls.push(TalonCall::SetSensorPhase(phase));
        Ok(())
    }

    fn config_selected_feedback_sensor(
        &mut self,
        device: FeedbackDevice,
        loop_idx: u8,
        timeout_ms: u32,
    ) -> Result<()> {
        self.calls.push(TalonCall::ConfigSelectedFeedbackSensor {
            device,
            loop_idx,
            timeout_ms,
        });
        if self.unsupported_sensors.contains(&device) {
            return Err(TransportError::UnsupportedSensor(device));
        }
        Ok(())
    }

    fn set_inverted(&mut self, inverted: bool) -> Result<()> {
        self.calls.push(TalonCall::SetInverted(inverted));
        Ok(())
    }

    fn config_nominal_output_forward(&mut self, percent: f64, _timeout_ms: u32) -> Result<()> {
        self.calls.push(TalonCall::ConfigNominalOutputForward(percent));
        Ok(())
    }

    fn config_nominal_output_reverse(&mut self, percent: f64, _timeout_ms: u32) -> Result<()> {
        self.calls.push(TalonCall::ConfigNominalOutputReverse(percent));
        Ok(())
    }

    fn config_peak_output_forward(&mut self, percent: f64, _timeout_ms: u32) -> Result<()> {
        self.calls.push(TalonCall::ConfigPeakOutputForward(percent));
        Ok(())
    }

    fn config_peak_output_reverse(&mut self, percent: f64, _timeout_ms: u32) -> Result<()> {
        self.calls.push(TalonCall::ConfigPeakOutputReverse(percent));
        Ok(())
    }

    fn config_allowable_closedloop_error(
        &mut self,
        error: u32,
        loop_idx: u8,
        _timeout_ms: u32,
    ) -> Result<()> {
        self.calls
            .push(TalonCall::ConfigAllowableClosedloopError { error, loop_idx });
        Ok(())
    }

    fn config_gain(
        &mut self,
        term: GainTerm,
        slot: u8,
        value: f64,
        _timeout_ms: u32,
    ) -> Result<()> {
        self.calls.push(TalonCall::ConfigGain { term, slot, value });
        Ok(())
    }

    fn set_status_frame_period(
        &mut self,
        frame: StatusFrame,
        period_ms: u8,
        _timeout_ms: u32,
    ) -> Result<()> {
        self.calls
            .push(TalonCall::SetStatusFramePeriod { frame, period_ms });
        Ok(())
    }

    fn select_profile_slot(&mut self, slot: u8, loop_idx: u8) -> Result<()> {
        self.calls
            .push(TalonCall::SelectProfileSlot { slot, loop_idx });
        Ok(())
    }

    fn config_motion_cruise_velocity(&mut self, native: i32, _timeout_ms: u32) -> Result<()> {
        self.calls.push(TalonCall::ConfigMotionCruiseVelocity(native));
        self.cruise_velocity = native.abs();
        Ok(())
    }

    fn config_motion_acceleration(&mut self, native: i32, _timeout_ms: u32) -> Result<()> {
        self.calls.push(TalonCall::ConfigMotionAcceleration(native));
        Ok(())
    }

    fn set(&mut self, mode: ControlMode, value: f64) {
        debug!("Sim {} set {:?} = {}", self.port, mode, value);
        self.calls.push(TalonCall::Set { mode, value });
        self.mode = mode;
        if matches!(mode, ControlMode::Position | ControlMode::MotionMagic) {
            self.slew_toward(value);
        }
    }

    fn control_mode(&self) -> ControlMode {
        self.mode
    }

    fn selected_sensor_position(&self, _loop_idx: u8) -> i32 {
        self.sensor_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_absent_port_fails() {
        let err = SimTalon::open(CanPort(4), &[CanPort(4)]).unwrap_err();
        assert_eq!(err, TransportError::Unreachable { port: CanPort(4) });
        assert!(SimTalon::open(CanPort(3), &[CanPort(4)]).is_ok());
    }

    #[test]
    fn test_set_switches_mode() {
        let mut sim = SimTalon::new(CanPort(1));
        assert_eq!(sim.control_mode(), ControlMode::Disabled);
        sim.set(ControlMode::Position, 10.0);
        assert_eq!(sim.control_mode(), ControlMode::Position);
        assert_eq!(sim.set_values(), vec![(ControlMode::Position, 10.0)]);
    }

    #[test]
    fn test_slew_is_limited_by_cruise_velocity() {
        let mut sim = SimTalon::new(CanPort(1));
        sim.config_motion_cruise_velocity(60, 10).unwrap();
        sim.set(ControlMode::MotionMagic, 1000.0);
        assert_eq!(sim.selected_sensor_position(0), 60);
        sim.set(ControlMode::MotionMagic, 1000.0);
        assert_eq!(sim.selected_sensor_position(0), 120);
        sim.set(ControlMode::MotionMagic, 100.0);
        assert_eq!(sim.selected_sensor_position(0), 100);
    }

    #[test]
    fn test_percent_output_does_not_move_sensor() {
        let mut sim = SimTalon::new(CanPort(1)).with_sensor_position(42);
        sim.set(ControlMode::PercentOutput, 0.5);
        assert_eq!(sim.selected_sensor_position(0), 42);
    }

    #[test]
    fn test_unsupported_sensor_rejected() {
        let mut sim = SimTalon::new(CanPort(1)).with_unsupported_sensor(FeedbackDevice::Analog);
        let err = sim
            .config_selected_feedback_sensor(FeedbackDevice::Analog, 0, 10)
            .unwrap_err();
        assert_eq!(err, TransportError::UnsupportedSensor(FeedbackDevice::Analog));
    }
}
