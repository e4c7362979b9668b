// Named, conditioned view over the driver and manipulator controllers

use super::input::{apply_deadband, Latch};
use crate::messages::{ControllerFrame, RumbleCommand};

/// Deadband applied to the driver's stick axes
pub const DEFAULT_DEADBAND: f64 = 0.075;

pub const TURN_SENSITIVITY: f64 = 1.0;
pub const SPIN_SENSITIVITY: f64 = 1.0;

/// Rising-edge state of every latched button for the current poll
#[derive(Debug, Clone, Copy, Default)]
struct LatchedButtons {
    drive_mode: bool,
    a: bool,
    b: bool,
    x: bool,
    y: bool,
    left_bumper: bool,
    right_bumper: bool,
    back: bool,
    start: bool,
    dpad_up: bool,
    dpad_down: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct ButtonLatches {
    drive_mode: Latch,
    a: Latch,
    b: Latch,
    x: Latch,
    y: Latch,
    left_bumper: Latch,
    right_bumper: Latch,
    back: Latch,
    start: Latch,
    dpad_up: Latch,
    dpad_down: Latch,
}

/// Robot control inputs, built once at startup and passed to whoever needs them
///
/// Call [`ControlBoard::update`] once per control-loop tick with the newest
/// controller frame; latched buttons report true for exactly one tick per press.
#[derive(Debug, Clone)]
pub struct ControlBoard {
    deadband: f64,
    frame: ControllerFrame,
    latches: ButtonLatches,
    latched: LatchedButtons,
    rumble: bool,
}

impl Default for ControlBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBoard {
    pub fn new() -> Self {
        Self::with_deadband(DEFAULT_DEADBAND)
    }

    pub fn with_deadband(deadband: f64) -> Self {
        Self {
            deadband,
            frame: ControllerFrame::default(),
            latches: ButtonLatches::default(),
            latched: LatchedButtons::default(),
            rumble: false,
        }
    }

    /// Take a new controller snapshot and advance the button latches
    pub fn update(&mut self, frame: ControllerFrame) {
        let driver = &frame.driver;
        let manip = &frame.manipulator;
        let l = &mut self.latches;
        self.latched = LatchedButtons {
            drive_mode: l.drive_mode.update(driver.thumb),
            a: l.a.update(manip.a),
            b: l.b.update(manip.b),
            x: l.x.update(manip.x),
            y: l.y.update(manip.y),
            left_bumper: l.left_bumper.update(manip.left_bumper),
            right_bumper: l.right_bumper.update(manip.right_bumper),
            back: l.back.update(manip.back),
            start: l.start.update(manip.start),
            dpad_up: l.dpad_up.update(manip.dpad_up),
            dpad_down: l.dpad_down.update(manip.dpad_down),
        };
        self.frame = frame;
    }

    // === Driver (flight stick) ===

    /// Forward is positive
    pub fn drive_y_axis(&self) -> f64 {
        -apply_deadband(self.frame.driver.y, self.deadband)
    }

    /// Scaled by [`TURN_SENSITIVITY`]
    pub fn drive_x_axis(&self) -> f64 {
        apply_deadband(self.frame.driver.x, self.deadband) * TURN_SENSITIVITY
    }

    /// Scaled by [`SPIN_SENSITIVITY`]
    pub fn drive_yaw(&self) -> f64 {
        apply_deadband(self.frame.driver.yaw, self.deadband) * SPIN_SENSITIVITY
    }

    pub fn drive_trim(&self) -> f64 {
        self.frame.driver.throttle
    }

    pub fn drive_mode_btn(&self) -> bool {
        self.latched.drive_mode
    }

    /// Held, not latched
    pub fn drive_modifier_btn(&self) -> bool {
        self.frame.driver.trigger
    }

    // === Manipulator (gamepad) ===

    pub fn a_button(&self) -> bool {
        self.latched.a
    }

    pub fn b_button(&self) -> bool {
        self.latched.b
    }

    pub fn x_button(&self) -> bool {
        self.latched.x
    }

    pub fn y_button(&self) -> bool {
        self.latched.y
    }

    pub fn left_bumper(&self) -> bool {
        self.latched.left_bumper
    }

    pub fn right_bumper(&self) -> bool {
        self.latched.right_bumper
    }

    pub fn back_button(&self) -> bool {
        self.latched.back
    }

    pub fn start_button(&self) -> bool {
        self.latched.start
    }

    pub fn up_dpad(&self) -> bool {
        self.latched.dpad_up
    }

    pub fn down_dpad(&self) -> bool {
        self.latched.dpad_down
    }

    pub fn left_trigger(&self) -> f64 {
        self.frame.manipulator.left_trigger
    }

    pub fn right_trigger(&self) -> f64 {
        self.frame.manipulator.right_trigger
    }

    pub fn left_stick_x_axis(&self) -> f64 {
        self.frame.manipulator.left_x
    }

    pub fn left_stick_y_axis(&self) -> f64 {
        self.frame.manipulator.left_y
    }

    // === Feedback ===

    pub fn set_rumble(&mut self, on: bool) {
        self.rumble = on;
    }

    pub fn rumble(&self) -> RumbleCommand {
        RumbleCommand {
            strength: if self.rumble { 1.0 } else { 0.0 },
        }
    }
}
