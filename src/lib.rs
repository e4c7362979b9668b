pub mod actuator;
pub mod config;
pub mod controls;
pub mod messages;
pub mod runtime;
