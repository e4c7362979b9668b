// Talon SRX bus/firmware contract
//
// Everything the channel needs from a motor controller: one-time configuration
// calls, a mode-tagged set, and readback of the live mode and sensor position.
// A real CAN binding and the in-process simulator both implement this trait.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CAN device id of a motor controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanPort(pub u8);

impl CanPort {
    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for CanPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CAN {}", self.0)
    }
}

/// Closed-loop law currently running in the controller firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    PercentOutput,
    Position,
    Velocity,
    Current,
    Follower,
    MotionProfile,
    MotionMagic,
    #[default]
    Disabled,
}

/// Feedback sensor wired to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackDevice {
    #[default]
    None,
    QuadEncoder,
    Analog,
    Tachometer,
    PulseWidthEncodedPosition,
    CtreMagEncoderRelative,
    CtreMagEncoderAbsolute,
}

/// Status frames whose update period the channel tunes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFrame {
    /// Status 13: closed-loop PIDF0 telemetry
    BasePidf0,
    /// Status 10: motion magic trajectory telemetry
    MotionMagic,
}

/// Closed-loop gain terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainTerm {
    F,
    P,
    I,
    D,
}

/// Error types for controller communication
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Motor controller at {port} is not reachable")]
    Unreachable { port: CanPort },

    #[error("Feedback sensor {0:?} is not supported by this controller")]
    UnsupportedSensor(FeedbackDevice),

    #[error("Timed out after {timeout_ms}ms waiting for {port}")]
    Timeout { port: CanPort, timeout_ms: u32 },

    #[error("Motor controller at {port} rejected configuration: {reason}")]
    Rejected { port: CanPort, reason: String },
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Bus-level access to one Talon-class motor controller.
///
/// Configuration calls carry the timeout (ms) the firmware should wait for an
/// acknowledgement. `set`, `control_mode` and `selected_sensor_position` are
/// fire-and-forget / last-known-value and never fail.
pub trait TalonTransport {
    fn set_sensor_phase(&mut self, phase: bool) -> Result<()>;

    fn config_selected_feedback_sensor(
        &mut self,
        device: FeedbackDevice,
        loop_idx: u8,
        timeout_ms: u32,
    ) -> Result<()>;

    fn set_inverted(&mut self, inverted: bool) -> Result<()>;

    fn config_nominal_output_forward(&mut self, percent: f64, timeout_ms: u32) -> Result<()>;
    fn config_nominal_output_reverse(&mut self, percent: f64, timeout_ms: u32) -> Result<()>;
    fn config_peak_output_forward(&mut self, percent: f64, timeout_ms: u32) -> Result<()>;
    fn config_peak_output_reverse(&mut self, percent: f64, timeout_ms: u32) -> Result<()>;

    fn config_allowable_closedloop_error(
        &mut self,
        error: u32,
        loop_idx: u8,
        timeout_ms: u32,
    ) -> Result<()>;

    fn config_gain(
        &mut self,
        term: GainTerm,
        slot: u8,
        value: f64,
        timeout_ms: u32,
    ) -> Result<()>;

    fn set_status_frame_period(
        &mut self,
        frame: StatusFrame,
        period_ms: u8,
        timeout_ms: u32,
    ) -> Result<()>;

    fn select_profile_slot(&mut self, slot: u8, loop_idx: u8) -> Result<()>;

    /// Cruise velocity in native units (sensor units per 100ms)
    fn config_motion_cruise_velocity(&mut self, native: i32, timeout_ms: u32) -> Result<()>;

    /// Acceleration in native units (sensor units per 100ms per second)
    fn config_motion_acceleration(&mut self, native: i32, timeout_ms: u32) -> Result<()>;

    /// Switch to `mode` (if needed) and command `value`
    fn set(&mut self, mode: ControlMode, value: f64);

    /// Mode the firmware reports as currently active
    fn control_mode(&self) -> ControlMode;

    /// Last reported sensor position on `loop_idx`, in sensor units
    fn selected_sensor_position(&self, loop_idx: u8) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_disabled() {
        assert_eq!(ControlMode::default(), ControlMode::Disabled);
        assert_eq!(FeedbackDevice::default(), FeedbackDevice::None);
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        let json = serde_json::to_string(&ControlMode::MotionMagic).unwrap();
        assert_eq!(json, "\"motion_magic\"");
        let device: FeedbackDevice = serde_json::from_str("\"ctre_mag_encoder_relative\"").unwrap();
        assert_eq!(device, FeedbackDevice::CtreMagEncoderRelative);
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Unreachable { port: CanPort(3) };
        assert_eq!(err.to_string(), "Motor controller at CAN 3 is not reachable");
    }
}
