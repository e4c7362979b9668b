// Timeouts, topics, actuator configuration
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::actuator::{CanPort, ChannelSettings, FeedbackDevice, TalonProfile};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Input timeout for watchdog
pub const INPUT_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_CONTROLS: &str = "talon/cmd/controls"; // controller frames
pub const TOPIC_RT_ACTUATOR: &str = "talon/rt/actuator"; // actuator telemetry
pub const TOPIC_RT_RUMBLE: &str = "talon/rt/rumble"; // controller feedback
pub const TOPIC_HEALTH: &str = "talon/state/health"; // health status

// Shortest loop period, whatever rate is configured
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

// CAN id of the driven Talon
pub const DEFAULT_PORT: u8 = 3;

/// Closed-loop gains, passed to the controller unmodified
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConstants {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub f: f64,
}

impl PidConstants {
    pub fn new(p: f64, i: f64, d: f64, f: f64) -> Self {
        Self { p, i, d, f }
    }
}

/// Which firmware constant set to configure the controller with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    #[default]
    Current,
    Legacy,
}

impl From<ProfileKind> for TalonProfile {
    fn from(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Current => TalonProfile::CURRENT,
            ProfileKind::Legacy => TalonProfile::LEGACY,
        }
    }
}

/// Error types for loading the runtime configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime configuration; every field falls back to its default when missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub port: u8,
    pub channel: ChannelSettings,
    pub profile: ProfileKind,
    pub position_gains: PidConstants,
    pub motion_gains: PidConstants,
    /// Sensor units/sec
    pub cruise_velocity: i32,
    /// Sensor units/sec^2
    pub acceleration: i32,
    pub loop_hz: u64,
    pub input_timeout_ms: u64,
    /// Joystick deadband applied to drive axes
    pub deadband: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            channel: ChannelSettings {
                output_inverted: false,
                sensor_phase: false,
                selected_sensor: FeedbackDevice::CtreMagEncoderRelative,
                sensor_range: 4096.0,
            },
            profile: ProfileKind::Current,
            position_gains: PidConstants::new(0.8, 0.0, 0.0, 0.0),
            motion_gains: PidConstants::new(1.0, 0.0, 0.0, 0.2),
            cruise_velocity: 600,
            acceleration: 300,
            loop_hz: LOOP_HZ,
            input_timeout_ms: INPUT_TIMEOUT.as_millis() as u64,
            deadband: crate::controls::DEFAULT_DEADBAND,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn can_port(&self) -> CanPort {
        CanPort(self.port)
    }

    pub fn talon_profile(&self) -> TalonProfile {
        self.profile.into()
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    /// Loop period, never shorter than 1ms
    pub fn tick_period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.loop_hz.max(1)).max(MIN_TICK_PERIOD)
    }
}
