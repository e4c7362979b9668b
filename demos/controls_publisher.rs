// Keyboard gamepad: W/S move the left stick, X centers it, A/B select mode, Q quits
//
// Usage: cargo run --example controls_publisher
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use talon_zenoh_runtime::config::TOPIC_CMD_CONTROLS;
use talon_zenoh_runtime::messages::{ControllerFrame, GamepadState};

const STICK_STEP: f64 = 0.1;
const BUTTON_HOLD_MS: u64 = 100; // Release a button after this much time with no repeat

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_CONTROLS).await?;

    info!("Controls: W/S=stick up/down, X=center, A=position mode, B=motion magic, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Persistent stick state
    let mut left_y: f64 = 0.0;
    let mut a_pressed_at: Option<Instant> = None;
    let mut b_pressed_at: Option<Instant> = None;

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('w') if pressed => {
                        left_y = (left_y + STICK_STEP).min(1.0);
                        info!("Stick: {:.1}", left_y);
                    }
                    KeyCode::Char('s') if pressed => {
                        left_y = (left_y - STICK_STEP).max(-1.0);
                        info!("Stick: {:.1}", left_y);
                    }
                    KeyCode::Char('x') if pressed => {
                        left_y = 0.0;
                        info!("Stick: centered");
                    }

                    // Mode buttons, held while the key repeats
                    KeyCode::Char('a') if pressed => a_pressed_at = Some(Instant::now()),
                    KeyCode::Char('b') if pressed => b_pressed_at = Some(Instant::now()),

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        let held = |at: Option<Instant>| {
            at.is_some_and(|t| t.elapsed() < Duration::from_millis(BUTTON_HOLD_MS))
        };

        // Always publish at ~50Hz so the runtime watchdog stays fed
        let frame = ControllerFrame {
            manipulator: GamepadState {
                left_y,
                a: held(a_pressed_at),
                b: held(b_pressed_at),
                ..GamepadState::default()
            },
            ..ControllerFrame::default()
        };
        publisher.put(serde_json::to_string(&frame)?).await?;
    }

    Ok(())
}
