//! Example: Adjust brightness, then revert to the session snapshot.
//!
//! Run with: `RUST_LOG=debug cargo run --example revert_session`

use std::sync::Arc;

use lucent_core::{BrightnessController, BrightnessMode, ControllerError, MockGateway};

fn main() -> Result<(), ControllerError> {
    // Initialize logging (optional)
    env_logger::init();

    let gateway = Arc::new(MockGateway::new(120, BrightnessMode::Manual));
    let mut controller = BrightnessController::start(gateway.clone())?;
    println!("Session started: {:?}", controller.snapshot());

    // Drag the slider to the middle of a 0-100 scale
    controller.set_level_from_ui(50)?;
    println!("Before notification: {:?}", controller.display());

    gateway.deliver_pending();
    if let Some(display) = controller.process_notifications() {
        println!("Confirmed: level={}, mode={}", display.level, display.mode);
    }

    // Someone else flips auto-brightness on
    gateway.external_set_mode(BrightnessMode::Automatic);
    gateway.deliver_pending();
    if let Some(display) = controller.process_notifications() {
        println!("External change: level={}, mode={}", display.level, display.mode);
    }

    // Revert
    controller.revert()?;
    gateway.deliver_pending();
    if let Some(display) = controller.process_notifications() {
        println!("Reverted: level={}, mode={}", display.level, display.mode);
    }

    // Without write authority nothing is written
    gateway.revoke_write_authority();
    match controller.set_level(200) {
        Ok(()) => println!("Unexpectedly allowed"),
        Err(e) => eprintln!("Error: {}", e),
    }

    controller.end();
    Ok(())
}
