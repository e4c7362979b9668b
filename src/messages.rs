// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::actuator::ControlMode;

// Raw flight-stick state (driver, HID port 0)
// Axes are in [-1, 1], throttle included
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickState {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub throttle: f64,
    pub trigger: bool,
    pub thumb: bool,
}

// Raw gamepad state (manipulator, HID port 1)
// Stick axes in [-1, 1], triggers in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadState {
    pub left_x: f64,
    pub left_y: f64,
    pub left_trigger: f64,
    pub right_trigger: f64,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub left_bumper: bool,
    pub right_bumper: bool,
    pub back: bool,
    pub start: bool,
    pub dpad_up: bool,
    pub dpad_down: bool,
}

// Controller snapshot from teleop -> runtime
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerFrame {
    pub driver: JoystickState,
    pub manipulator: GamepadState,
}

// Rumble feedback from runtime -> teleop
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RumbleCommand {
    /// Rumble strength in [0, 1]
    pub strength: f64,
}

/// Actuator state published every tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorTelemetry {
    pub port: u8,
    /// Mode the controller reports, None if the channel is not attached
    pub mode: Option<ControlMode>,
    /// Last setpoint written, in sensor units
    pub target: Option<f64>,
    pub sensor_position: f64,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    InputStale,
    ModeFault,
    ActuatorFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_frame_deserializes() {
        let frame: ControllerFrame =
            serde_json::from_str(r#"{"manipulator": {"left_y": -0.5, "a": true}}"#).unwrap();
        assert_eq!(frame.manipulator.left_y, -0.5);
        assert!(frame.manipulator.a);
        assert_eq!(frame.driver, JoystickState::default());
    }

    #[test]
    fn test_health_serializes_snake_case() {
        let json = serde_json::to_string(&RuntimeHealth::InputStale).unwrap();
        assert_eq!(json, "\"input_stale\"");
    }

    #[test]
    fn test_telemetry_serializes_mode() {
        let telemetry = ActuatorTelemetry {
            port: 3,
            mode: Some(ControlMode::MotionMagic),
            target: Some(100.0),
            sensor_position: 60.0,
        };
        let json = serde_json::to_value(telemetry).unwrap();
        assert_eq!(json["mode"], "motion_magic");
        assert_eq!(json["target"], 100.0);
    }
}
