// 50 Hz control loop with input watchdog
// Controller frames come in over zenoh, go through the control board, and drive
// one Talon through its mode handles. If teleop stops sending, the watchdog
// disables the motor instead of holding the last setpoint forever.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

use crate::actuator::{
    transport, ActuatorChannel, CanPort, ControlModeHandle, SimTalon, TalonTransport,
};
use crate::config::{
    RuntimeConfig, TOPIC_CMD_CONTROLS, TOPIC_HEALTH, TOPIC_RT_ACTUATOR, TOPIC_RT_RUMBLE,
};
use crate::controls::ControlBoard;
use crate::messages::{ActuatorTelemetry, ControllerFrame, RuntimeHealth};

pub struct Runtime<T: TalonTransport> {
    channel: ActuatorChannel<T>,
    board: ControlBoard,
    position: ControlModeHandle,
    motion: ControlModeHandle,
    selected: ControlModeHandle,
    /// Whether the selected mode has been handed to the controller
    engaged: bool,
    frame_received_at: Option<Instant>,
    input_timeout: Duration,
    target: Option<f64>,
    health: RuntimeHealth,
}

impl<T: TalonTransport> Runtime<T> {
    /// Configure both control modes on an (attempted) attached channel
    pub fn new(mut channel: ActuatorChannel<T>, config: &RuntimeConfig) -> Self {
        let position = channel.position_handle(config.position_gains);
        let motion = channel.motion_handle(
            config.cruise_velocity,
            config.acceleration,
            config.motion_gains,
        );
        let health = if channel.is_attached() {
            RuntimeHealth::InputStale // Start stale until first frame
        } else {
            RuntimeHealth::ActuatorFailed
        };

        Self {
            channel,
            board: ControlBoard::with_deadband(config.deadband),
            position,
            motion,
            selected: motion,
            engaged: false,
            frame_received_at: None,
            input_timeout: config.input_timeout(),
            target: None,
            health,
        }
    }

    /// Process an incoming controller frame
    ///
    /// A latches position mode, B latches motion magic.
    pub fn on_frame(&mut self, frame: ControllerFrame, now: Instant) {
        self.board.update(frame);
        self.frame_received_at = Some(now);

        if self.board.a_button() {
            self.select(self.position);
        } else if self.board.b_button() {
            self.select(self.motion);
        }
    }

    fn select(&mut self, handle: ControlModeHandle) {
        info!("Operator selected {:?}", handle.mode());
        self.selected = handle;
        // Re-engage even if unchanged: recovers from a mode fault
        self.engaged = false;
    }

    /// Run one control tick and report the actuator state
    pub fn step(&mut self, now: Instant) -> ActuatorTelemetry {
        if !self.channel.is_attached() {
            self.health = RuntimeHealth::ActuatorFailed;
            self.target = None;
            return self.telemetry();
        }

        let input_age = self
            .frame_received_at
            .map(|at| now.saturating_duration_since(at));
        let fresh = matches!(input_age, Some(age) if age <= self.input_timeout);

        if !fresh {
            // Watchdog triggered - disable the motor once
            if self.engaged {
                warn!("Controller input stale ({:?} old), disabling motor", input_age);
                self.channel.disable();
                self.engaged = false;
            }
            self.health = RuntimeHealth::InputStale;
            self.target = None;
            self.board.set_rumble(false);
            return self.telemetry();
        }

        if !self.engaged {
            // Take over from wherever the mechanism is now
            let hold = self.channel.read_sensor_position();
            self.channel.engage(self.selected.mode(), hold);
            self.engaged = true;
        }

        let target = self
            .selected
            .output_range()
            .scale_normalized(self.board.left_stick_y_axis());
        match self.selected.write(&mut self.channel, target) {
            Ok(()) => {
                self.health = RuntimeHealth::Ok;
                self.target = Some(target);
                self.board.set_rumble(false);
            }
            Err(fault) => {
                if self.health != RuntimeHealth::ModeFault {
                    warn!("Skipping frame: {}", fault);
                }
                self.health = RuntimeHealth::ModeFault;
                self.board.set_rumble(true);
            }
        }
        self.telemetry()
    }

    fn telemetry(&self) -> ActuatorTelemetry {
        ActuatorTelemetry {
            port: self.channel.port().index(),
            mode: self.channel.active_mode(),
            target: self.target,
            sensor_position: self.channel.read_sensor_position(),
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn board(&self) -> &ControlBoard {
        &self.board
    }

    pub fn channel(&self) -> &ActuatorChannel<T> {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut ActuatorChannel<T> {
        &mut self.channel
    }

    pub fn selected_handle(&self) -> ControlModeHandle {
        self.selected
    }
}

/// Run against the simulated Talon
pub async fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("No CAN binding configured, driving a simulated Talon");
    run_with(config, |port| SimTalon::open(port, &[])).await
}

/// Run the loop against whatever transport `open` produces
pub async fn run_with<T, F>(
    config: RuntimeConfig,
    open: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    T: TalonTransport,
    F: FnOnce(CanPort) -> transport::Result<T>,
{
    let mut channel = ActuatorChannel::new(config.channel, config.can_port())
        .with_profile(config.talon_profile());
    if let Err(e) = channel.attach(open) {
        // Absorbed: the loop keeps running and reports the channel as failed
        warn!("Actuator unavailable: {}", e);
    }
    let mut runtime = Runtime::new(channel, &config);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_CONTROLS).await?;
    let pub_actuator = session.declare_publisher(TOPIC_RT_ACTUATOR).await?;
    let pub_rumble = session.declare_publisher(TOPIC_RT_RUMBLE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut tick = interval(config.tick_period());

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        config.loop_hz,
        config.input_timeout_ms
    );
    info!("Subscribed to: {}", TOPIC_CMD_CONTROLS);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_RT_ACTUATOR, TOPIC_RT_RUMBLE, TOPIC_HEALTH
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }

        // 1. Drain all pending frames (non-blocking), each one advances the latches
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<ControllerFrame>(&payload) {
                Ok(frame) => runtime.on_frame(frame, Instant::now()),
                Err(e) => warn!("Failed to parse controller frame: {}", e),
            }
        }

        // 2. Drive the actuator (includes watchdog and mode guard)
        let telemetry = runtime.step(Instant::now());

        // 3. Publish telemetry, controller feedback and health
        pub_actuator.put(serde_json::to_string(&telemetry)?).await?;
        pub_rumble
            .put(serde_json::to_string(&runtime.board().rumble())?)
            .await?;
        pub_health
            .put(serde_json::to_string(&runtime.health())?)
            .await?;
    }

    // Dropping the runtime disables the motor
    drop(runtime);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{ControlMode, TalonCall};
    use crate::messages::GamepadState;

    fn config() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    fn runtime() -> Runtime<SimTalon> {
        let config = config();
        let mut channel = ActuatorChannel::new(config.channel, config.can_port());
        channel.attach(|p| Ok(SimTalon::new(p))).unwrap();
        Runtime::new(channel, &config)
    }

    fn stick(left_y: f64) -> ControllerFrame {
        ControllerFrame {
            manipulator: GamepadState {
                left_y,
                ..GamepadState::default()
            },
            ..ControllerFrame::default()
        }
    }

    fn press(a: bool, b: bool, left_y: f64) -> ControllerFrame {
        ControllerFrame {
            manipulator: GamepadState {
                a,
                b,
                left_y,
                ..GamepadState::default()
            },
            ..ControllerFrame::default()
        }
    }

    fn sim(rt: &Runtime<SimTalon>) -> &SimTalon {
        rt.channel().transport().unwrap()
    }

    #[test]
    fn test_stale_until_first_frame() {
        let mut rt = runtime();
        let telemetry = rt.step(Instant::now());
        assert_eq!(rt.health(), RuntimeHealth::InputStale);
        assert_eq!(telemetry.target, None);
        assert!(sim(&rt).set_values().is_empty());
    }

    #[test]
    fn test_defaults_to_motion_magic_and_engages_at_sensor() {
        let mut rt = runtime();
        rt.channel_mut()
            .transport_mut()
            .unwrap()
            .set_sensor_position(500);
        let now = Instant::now();
        rt.on_frame(stick(1.0), now);
        let telemetry = rt.step(now);

        assert_eq!(rt.health(), RuntimeHealth::Ok);
        assert_eq!(telemetry.mode, Some(ControlMode::MotionMagic));
        assert_eq!(telemetry.target, Some(4096.0));
        let sets = sim(&rt).set_values();
        assert_eq!(sets[0], (ControlMode::MotionMagic, 500.0));
        assert_eq!(sets[1], (ControlMode::MotionMagic, 4096.0));
    }

    #[test]
    fn test_a_button_switches_to_position() {
        let mut rt = runtime();
        let now = Instant::now();
        rt.on_frame(press(true, false, -1.0), now);
        let telemetry = rt.step(now);
        assert_eq!(rt.selected_handle().mode(), ControlMode::Position);
        assert_eq!(telemetry.mode, Some(ControlMode::Position));
        assert_eq!(telemetry.target, Some(0.0));
    }

    #[test]
    fn test_foreign_mode_change_faults_until_reselected() {
        let mut rt = runtime();
        let now = Instant::now();
        rt.on_frame(stick(0.0), now);
        rt.step(now);
        assert_eq!(rt.health(), RuntimeHealth::Ok);

        // Someone else takes the controller
        rt.channel_mut()
            .transport_mut()
            .unwrap()
            .force_mode(ControlMode::PercentOutput);
        rt.channel_mut().transport_mut().unwrap().clear_calls();
        rt.on_frame(stick(0.5), now);
        rt.step(now);
        assert_eq!(rt.health(), RuntimeHealth::ModeFault);
        assert_eq!(rt.board().rumble().strength, 1.0);
        assert!(sim(&rt).set_values().is_empty());

        // Operator re-selects motion magic
        rt.on_frame(press(false, true, 0.5), now);
        rt.step(now);
        assert_eq!(rt.health(), RuntimeHealth::Ok);
        assert_eq!(rt.board().rumble().strength, 0.0);
    }

    #[test]
    fn test_watchdog_disables_once() {
        let mut rt = runtime();
        let start = Instant::now();
        rt.on_frame(stick(0.0), start);
        rt.step(start);

        let late = start + Duration::from_millis(300);
        rt.step(late);
        rt.step(late + Duration::from_millis(20));
        assert_eq!(rt.health(), RuntimeHealth::InputStale);

        let disables = sim(&rt)
            .calls()
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    TalonCall::Set {
                        mode: ControlMode::Disabled,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(disables, 1);
    }

    #[test]
    fn test_failed_channel_reports_failed() {
        let config = config();
        let mut channel = ActuatorChannel::new(config.channel, config.can_port());
        let _ = channel.attach(|p| SimTalon::open(p, &[p]));
        let mut rt = Runtime::new(channel, &config);
        assert_eq!(rt.health(), RuntimeHealth::ActuatorFailed);

        let now = Instant::now();
        rt.on_frame(stick(1.0), now);
        let telemetry = rt.step(now);
        assert_eq!(rt.health(), RuntimeHealth::ActuatorFailed);
        assert_eq!(telemetry.mode, None);
        assert_eq!(telemetry.sensor_position, 0.0);
    }
}
