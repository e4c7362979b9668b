// Channel walkthrough: attach a simulated Talon and exercise both handles
//
// Nothing here touches hardware. It prints every bus call the channel makes,
// then shows a write being rejected after the mode is changed underneath it.
//
// Usage: cargo run --example channel_walkthrough -- [can id]

use talon_zenoh_runtime::actuator::{
    ActuatorChannel, CanPort, ChannelSettings, ControlMode, FeedbackDevice, SimTalon,
};
use talon_zenoh_runtime::config::PidConstants;

fn print_calls(channel: &mut ActuatorChannel<SimTalon>) {
    if let Some(sim) = channel.transport_mut() {
        for call in sim.calls() {
            println!("    {:?}", call);
        }
        sim.clear_calls();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    // Get CAN id from args or use default
    let port = match std::env::args().nth(1) {
        Some(arg) => CanPort(arg.parse()?),
        None => CanPort(3),
    };

    println!("Simulated Talon on {}", port);
    println!();

    let settings = ChannelSettings {
        output_inverted: false,
        sensor_phase: true,
        selected_sensor: FeedbackDevice::CtreMagEncoderRelative,
        sensor_range: 4096.0,
    };
    let mut channel = ActuatorChannel::new(settings, port);

    println!("Step 1: Attaching...");
    channel.attach(|p| SimTalon::open(p, &[]))?;
    print_calls(&mut channel);
    println!();

    println!("Step 2: Position handle");
    let position = channel.position_handle(PidConstants::new(0.8, 0.0, 0.0, 0.0));
    print_calls(&mut channel);
    println!();

    println!("Step 3: Motion magic handle (cruise 600/s, accel 300/s^2)");
    let motion = channel.motion_handle(600, 300, PidConstants::new(1.0, 0.0, 0.0, 0.0));
    print_calls(&mut channel);
    println!();

    println!("Step 4: Engage motion magic and drive to 1000");
    channel.engage(ControlMode::MotionMagic, channel.read_sensor_position());
    for _ in 0..5 {
        motion.write(&mut channel, 1000.0)?;
        println!("    sensor = {}", channel.read_sensor_position());
    }
    println!();

    println!("Step 5: Write through the stale position handle");
    match position.write(&mut channel, 0.0) {
        Ok(()) => println!("    ✗ write accepted (unexpected)"),
        Err(fault) => println!("    ✓ rejected: {}", fault),
    }
    println!();

    println!("Step 6: Simulate an unreachable controller");
    let mut missing = ActuatorChannel::<SimTalon>::output_only(false, CanPort(62));
    if let Err(e) = missing.attach(|p| SimTalon::open(p, &[p])) {
        println!("    attach failed: {}", e);
    }
    println!("    sensor reads {}", missing.read_sensor_position());

    Ok(())
}
