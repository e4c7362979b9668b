// Control-board facade over the driver and manipulator controllers
//
// Provides:
// - Deadband and rising-edge latch conditioning
// - ControlBoard: named axes/buttons and rumble output

mod board;
pub mod input;

pub use board::{ControlBoard, DEFAULT_DEADBAND, SPIN_SENSITIVITY, TURN_SENSITIVITY};
pub use input::{apply_deadband, Latch};
