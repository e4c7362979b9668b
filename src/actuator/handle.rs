// Mode-scoped write capability issued by an ActuatorChannel

use serde::{Deserialize, Serialize};

use super::channel::ActuatorChannel;
use super::transport::{CanPort, ControlMode, TalonTransport};
use crate::config::PidConstants;

/// Inclusive range of values a handle accepts
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputRange {
    pub min: f64,
    pub max: f64,
}

impl OutputRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Map a normalized input in [-1, 1] linearly onto this range
    ///
    /// Inputs outside [-1, 1] are clamped first.
    pub fn scale_normalized(&self, input: f64) -> f64 {
        let t = (input.clamp(-1.0, 1.0) + 1.0) / 2.0;
        self.min + t * (self.max - self.min)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Write rejected because the controller runs a different mode than the handle's
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error(
    "{port} is in {actual:?} mode but this handle drives {expected:?}; \
     ensure the controller is only commanded from one place"
)]
pub struct ModeFault {
    pub port: CanPort,
    pub expected: ControlMode,
    pub actual: ControlMode,
}

/// Handle for writing setpoints to one controller in one control mode.
///
/// A handle is only a token: it never caches whether it is still the live
/// owner, so every write goes back through the channel's mode check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlModeHandle {
    mode: ControlMode,
    output_range: OutputRange,
    gains: PidConstants,
}

impl ControlModeHandle {
    pub(crate) fn new(mode: ControlMode, output_range: OutputRange, gains: PidConstants) -> Self {
        Self {
            mode,
            output_range,
            gains,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn output_range(&self) -> OutputRange {
        self.output_range
    }

    pub fn gains(&self) -> PidConstants {
        self.gains
    }

    /// Write `value` (native sensor units) through `channel`
    pub fn write<T: TalonTransport>(
        &self,
        channel: &mut ActuatorChannel<T>,
        value: f64,
    ) -> Result<(), ModeFault> {
        channel.write(self, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_normalized_endpoints() {
        let range = OutputRange::new(0.0, 4096.0);
        assert_eq!(range.scale_normalized(-1.0), 0.0);
        assert_eq!(range.scale_normalized(0.0), 2048.0);
        assert_eq!(range.scale_normalized(1.0), 4096.0);
    }

    #[test]
    fn test_scale_normalized_clamps() {
        let range = OutputRange::new(0.0, 100.0);
        assert_eq!(range.scale_normalized(-3.0), 0.0);
        assert_eq!(range.scale_normalized(7.5), 100.0);
        assert!(range.contains(range.scale_normalized(0.3)));
    }

    #[test]
    fn test_mode_fault_message() {
        let fault = ModeFault {
            port: CanPort(3),
            expected: ControlMode::Position,
            actual: ControlMode::MotionMagic,
        };
        let msg = fault.to_string();
        assert!(msg.contains("CAN 3"));
        assert!(msg.contains("MotionMagic"));
        assert!(msg.contains("Position"));
    }
}
