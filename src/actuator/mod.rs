// Talon SRX actuator output channel
//
// Provides:
// - The bus/firmware contract a motor controller binding implements
// - A channel that configures the controller once and guards every write
//   against the controller's live control mode
// - An in-process simulated controller

mod channel;
mod handle;
pub mod sim;
pub mod transport;

pub use channel::{
    to_native_units, ActuatorChannel, ChannelSettings, ChannelState, InitError, TalonProfile,
};
pub use handle::{ControlModeHandle, ModeFault, OutputRange};
pub use sim::{SimTalon, TalonCall};
pub use transport::{
    CanPort, ControlMode, FeedbackDevice, GainTerm, StatusFrame, TalonTransport, TransportError,
};
