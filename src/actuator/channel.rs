// Guarded output channel for one Talon SRX
//
// Applies the fixed configuration sequence once at attach time, issues
// mode-scoped handles, and checks the controller's live mode before every
// write so two owners of the same motor show up as a fault instead of a
// silently overwritten setpoint.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::handle::{ControlModeHandle, ModeFault, OutputRange};
use super::transport::{
    self, CanPort, ControlMode, FeedbackDevice, GainTerm, StatusFrame, TalonTransport,
    TransportError,
};
use crate::config::PidConstants;

/// Status frame period used while running motion magic
const MOTION_STATUS_PERIOD_MS: u8 = 10;

/// Timeout and loop-index constants for a controller firmware generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TalonProfile {
    pub timeout_ms: u32,
    pub magic_profile_slot: u8,
    pub magic_loop_idx: u8,
    pub default_loop_idx: u8,
    pub position_loop_idx: u8,
}

impl TalonProfile {
    /// Short config timeouts, motion magic on its own loop
    pub const CURRENT: Self = Self {
        timeout_ms: 10,
        magic_profile_slot: 0,
        magic_loop_idx: 1,
        default_loop_idx: 0,
        position_loop_idx: 0,
    };

    /// Long blocking config timeouts, everything on loop 0
    pub const LEGACY: Self = Self {
        timeout_ms: 5000,
        magic_profile_slot: 0,
        magic_loop_idx: 0,
        default_loop_idx: 0,
        position_loop_idx: 0,
    };
}

impl Default for TalonProfile {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Static configuration of a channel, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Invert motor output (applies to every control mode)
    pub output_inverted: bool,
    /// Invert the sensor reading relative to output direction
    pub sensor_phase: bool,
    pub selected_sensor: FeedbackDevice,
    /// Sensor units spanning the input domain
    pub sensor_range: f64,
}

/// Error types for bringing a channel up
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InitError {
    #[error("Failed to open motor controller: {0}")]
    Open(#[source] TransportError),

    #[error("Failed to {step}: {source}")]
    Configure {
        step: &'static str,
        source: TransportError,
    },

    #[error("Channel on {port} was already initialized")]
    AlreadyInitialized { port: CanPort },
}

/// Attach state of the underlying controller
pub enum ChannelState<T> {
    Unattached,
    Attached(T),
    /// Init failed; the channel stays inert for the rest of its life
    Failed,
}

type InitHook<T> = Box<dyn FnOnce(&mut T) -> transport::Result<()>>;

/// Convert a caller velocity/acceleration to firmware per-100ms units
///
/// Truncates toward zero: `to_native_units(105) == 10`, `to_native_units(-15) == -1`.
pub fn to_native_units(value: i32) -> i32 {
    value / 10
}

/// One motor controller on the CAN bus
pub struct ActuatorChannel<T: TalonTransport> {
    port: CanPort,
    settings: ChannelSettings,
    profile: TalonProfile,
    initial_config: Option<InitHook<T>>,
    state: ChannelState<T>,
}

impl<T: TalonTransport> ActuatorChannel<T> {
    pub fn new(settings: ChannelSettings, port: CanPort) -> Self {
        Self {
            port,
            settings,
            profile: TalonProfile::default(),
            initial_config: None,
            state: ChannelState::Unattached,
        }
    }

    /// Output-only channel: sensor not inverted, no feedback device, zero range
    pub fn output_only(output_inverted: bool, port: CanPort) -> Self {
        Self::new(
            ChannelSettings {
                output_inverted,
                ..ChannelSettings::default()
            },
            port,
        )
    }

    pub fn with_profile(mut self, profile: TalonProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Extra configuration run once, after the fixed init sequence
    pub fn with_initial_config<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut T) -> transport::Result<()> + 'static,
    {
        self.initial_config = Some(Box::new(hook));
        self
    }

    /// Open the controller at this channel's port and initialize it
    ///
    /// On any failure the channel becomes permanently inert; the error is
    /// returned only so the caller can report it.
    pub fn attach<F>(&mut self, open: F) -> Result<(), InitError>
    where
        F: FnOnce(CanPort) -> transport::Result<T>,
    {
        if !matches!(self.state, ChannelState::Unattached) {
            return Err(InitError::AlreadyInitialized { port: self.port });
        }

        info!("Attaching Talon on {}", self.port);
        match open(self.port) {
            Ok(transport) => self.init(transport),
            Err(e) => {
                warn!("Could not open Talon on {}: {}", self.port, e);
                self.fail_init();
                Err(InitError::Open(e))
            }
        }
    }

    /// Run the one-time configuration sequence against an opened controller
    pub fn init(&mut self, mut transport: T) -> Result<(), InitError> {
        if !matches!(self.state, ChannelState::Unattached) {
            return Err(InitError::AlreadyInitialized { port: self.port });
        }

        match self.configure(&mut transport) {
            Ok(()) => {
                info!(
                    "Talon on {} initialized (sensor {:?}, inverted={})",
                    self.port, self.settings.selected_sensor, self.settings.output_inverted
                );
                self.state = ChannelState::Attached(transport);
                Ok(())
            }
            Err(e) => {
                warn!("Talon on {} failed to initialize: {}", self.port, e);
                self.fail_init();
                Err(e)
            }
        }
    }

    /// Mark the channel as permanently failed
    pub fn fail_init(&mut self) {
        warn!("Talon on {} is inert; reads return 0", self.port);
        self.state = ChannelState::Failed;
    }

    fn configure(&mut self, talon: &mut T) -> Result<(), InitError> {
        let timeout = self.profile.timeout_ms;
        let settings = self.settings;

        talon
            .set_sensor_phase(settings.sensor_phase)
            .map_err(step("set sensor phase"))?;
        talon
            .config_selected_feedback_sensor(
                settings.selected_sensor,
                self.profile.default_loop_idx,
                timeout,
            )
            .map_err(step("select feedback sensor"))?;
        talon
            .set_inverted(settings.output_inverted)
            .map_err(step("set output inversion"))?;

        // Normalized output: no deadband floor, full range both ways
        talon
            .config_nominal_output_forward(0.0, timeout)
            .map_err(step("clamp nominal forward output"))?;
        talon
            .config_nominal_output_reverse(0.0, timeout)
            .map_err(step("clamp nominal reverse output"))?;
        talon
            .config_peak_output_forward(1.0, timeout)
            .map_err(step("clamp peak forward output"))?;
        talon
            .config_peak_output_reverse(-1.0, timeout)
            .map_err(step("clamp peak reverse output"))?;

        if let Some(hook) = self.initial_config.take() {
            debug!("Applying initial config hook on {}", self.port);
            hook(talon).map_err(step("apply initial config"))?;
        }
        Ok(())
    }

    /// Selected sensor position in sensor units, or 0.0 if not attached
    pub fn read_sensor_position(&self) -> f64 {
        match &self.state {
            ChannelState::Attached(talon) => {
                talon.selected_sensor_position(self.profile.default_loop_idx) as f64
            }
            _ => 0.0,
        }
    }

    /// Configure closed-loop position control and return its handle
    pub fn position_handle(&mut self, gains: PidConstants) -> ControlModeHandle {
        let port = self.port;
        let profile = self.profile;
        if let ChannelState::Attached(talon) = &mut self.state {
            debug!("Configuring position control on {}: {:?}", port, gains);
            let loop_idx = profile.position_loop_idx;
            // Always servo
            log_config_error(
                port,
                "allowable closed-loop error",
                talon.config_allowable_closedloop_error(0, loop_idx, profile.timeout_ms),
            );
            apply_gains(talon, port, loop_idx, gains, profile.timeout_ms);
        }
        ControlModeHandle::new(ControlMode::Position, self.output_range(), gains)
    }

    /// Configure motion magic and return its handle
    ///
    /// `cruise_velocity` is in sensor units/sec and `acceleration` in sensor
    /// units/sec^2; both are converted with [`to_native_units`].
    pub fn motion_handle(
        &mut self,
        cruise_velocity: i32,
        acceleration: i32,
        gains: PidConstants,
    ) -> ControlModeHandle {
        let port = self.port;
        let profile = self.profile;
        if let ChannelState::Attached(talon) = &mut self.state {
            let cruise_native = to_native_units(cruise_velocity);
            let accel_native = to_native_units(acceleration);
            debug!(
                "Configuring motion magic on {}: cruise={} accel={} (native), {:?}",
                port, cruise_native, accel_native, gains
            );
            let timeout = profile.timeout_ms;

            for frame in [StatusFrame::BasePidf0, StatusFrame::MotionMagic] {
                log_config_error(
                    port,
                    "status frame period",
                    talon.set_status_frame_period(frame, MOTION_STATUS_PERIOD_MS, timeout),
                );
            }
            log_config_error(
                port,
                "profile slot",
                talon.select_profile_slot(profile.magic_profile_slot, profile.magic_loop_idx),
            );
            apply_gains(talon, port, profile.magic_loop_idx, gains, timeout);
            log_config_error(
                port,
                "cruise velocity",
                talon.config_motion_cruise_velocity(cruise_native, timeout),
            );
            log_config_error(
                port,
                "acceleration",
                talon.config_motion_acceleration(accel_native, timeout),
            );
        }
        ControlModeHandle::new(ControlMode::MotionMagic, self.output_range(), gains)
    }

    /// Forward `value` in the handle's mode if that mode is live on the controller
    ///
    /// The live mode is read fresh on every call. Writes to an unattached or
    /// failed channel are dropped.
    pub fn write(&mut self, handle: &ControlModeHandle, value: f64) -> Result<(), ModeFault> {
        let port = self.port;
        match &mut self.state {
            ChannelState::Attached(talon) => {
                let actual = talon.control_mode();
                if actual != handle.mode() {
                    return Err(ModeFault {
                        port,
                        expected: handle.mode(),
                        actual,
                    });
                }
                if !handle.output_range().contains(value) {
                    debug!(
                        "Setpoint {} on {} is outside {:?}",
                        value,
                        port,
                        handle.output_range()
                    );
                }
                talon.set(handle.mode(), value);
                Ok(())
            }
            _ => {
                debug!("Dropping write of {} to inert channel on {}", value, port);
                Ok(())
            }
        }
    }

    /// Hand the controller to `mode`, bypassing the mode check
    pub fn engage(&mut self, mode: ControlMode, value: f64) {
        if let ChannelState::Attached(talon) = &mut self.state {
            info!("Engaging {:?} on {} at {}", mode, self.port, value);
            talon.set(mode, value);
        }
    }

    pub fn disable(&mut self) {
        self.engage(ControlMode::Disabled, 0.0);
    }

    /// Live mode reported by the controller, if attached
    pub fn active_mode(&self) -> Option<ControlMode> {
        self.transport().map(|t| t.control_mode())
    }

    pub fn output_range(&self) -> OutputRange {
        OutputRange::new(0.0, self.settings.sensor_range)
    }

    pub fn port(&self) -> CanPort {
        self.port
    }

    pub fn settings(&self) -> ChannelSettings {
        self.settings
    }

    pub fn profile(&self) -> TalonProfile {
        self.profile
    }

    pub fn sensor_range(&self) -> f64 {
        self.settings.sensor_range
    }

    pub fn state(&self) -> &ChannelState<T> {
        &self.state
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, ChannelState::Attached(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, ChannelState::Failed)
    }

    pub fn transport(&self) -> Option<&T> {
        match &self.state {
            ChannelState::Attached(talon) => Some(talon),
            _ => None,
        }
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            ChannelState::Attached(talon) => Some(talon),
            _ => None,
        }
    }
}

impl<T: TalonTransport> Drop for ActuatorChannel<T> {
    fn drop(&mut self) {
        // Leave the motor unpowered when the channel goes away
        if let ChannelState::Attached(talon) = &mut self.state {
            debug!("Disabling Talon on {} on drop", self.port);
            talon.set(ControlMode::Disabled, 0.0);
        }
    }
}

fn step(step: &'static str) -> impl FnOnce(TransportError) -> InitError {
    move |source| InitError::Configure { step, source }
}

fn log_config_error(port: CanPort, what: &str, result: transport::Result<()>) {
    if let Err(e) = result {
        warn!("Failed to configure {} on {}: {}", what, port, e);
    }
}

/// Gains go out in F, P, I, D order
fn apply_gains<T: TalonTransport>(
    talon: &mut T,
    port: CanPort,
    slot: u8,
    gains: PidConstants,
    timeout_ms: u32,
) {
    let terms = [
        (GainTerm::F, gains.f),
        (GainTerm::P, gains.p),
        (GainTerm::I, gains.i),
        (GainTerm::D, gains.d),
    ];
    for (term, value) in terms {
        log_config_error(port, "gain", talon.config_gain(term, slot, value, timeout_ms));
    }
}
