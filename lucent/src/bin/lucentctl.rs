//! Command line brightness control.
//!
//! Every command runs a short session: the intent is forwarded to the
//! settings store and the state printed is the one the store confirmed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use lucent_core::{
    BrightnessController, Config, ControllerError, DisplayState, FileSettingsGateway, UiScale,
};

/// How long to wait for the store to confirm a write.
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(1);

/// Appended to a state the store has not confirmed.
const UNCONFIRMED: &str = "(unconfirmed)";

/// View and adjust screen brightness. Values are on the UI scale (0-100 by
/// default) unless overridden using -r/--raw.
#[derive(Parser)]
#[command(version, about)]
struct Lucentctl {
    /// Configuration file. Defaults to the user, then the system configuration.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use canonical brightness levels instead of the UI scale.
    #[arg(short, long, global = true)]
    raw: bool,

    #[command(subcommand)]
    cmd: SubCmd,
}

#[derive(Copy, Clone, Debug, Subcommand)]
enum SubCmd {
    /// Print the current brightness as "x/y mode".
    Get,
    /// Switch to manual mode and set the brightness.
    Set {
        /// New brightness value.
        value: u32,
    },
    /// Turn automatic brightness on.
    Auto,
    /// Turn automatic brightness off.
    Manual,
    /// Print every change until interrupted.
    Watch,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Lucentctl::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("can't load configuration from {}", path.display()))?,
        None => Config::load_default().context("can't load configuration")?,
    };

    let gateway = Arc::new(FileSettingsGateway::from_config(&config.settings));
    let settings_dir = gateway.dir().to_path_buf();
    let mut controller = BrightnessController::with_limits(gateway, config.range, config.scale)
        .context("can't open brightness session")?;
    let scale = controller.scale();

    let result = match args.cmd {
        SubCmd::Get => {
            print_state(&controller.display(), &scale, args.raw);
            return Ok(());
        }
        SubCmd::Watch => {
            print_state(&controller.display(), &scale, args.raw);
            loop {
                if let Some(display) = controller.wait_for_change(Duration::from_secs(60)) {
                    print_state(&display, &scale, args.raw);
                }
            }
        }
        SubCmd::Set { value } => {
            if args.raw {
                let value = i32::try_from(value).context("brightness level out of range")?;
                controller.set_level(value)
            } else {
                if value > scale.ui_max {
                    bail!("brightness {value} is above the maximum of {}", scale.ui_max);
                }
                controller.set_level_from_ui(value)
            }
        }
        SubCmd::Auto => controller.set_automatic(true),
        SubCmd::Manual => controller.set_automatic(false),
    };

    match result {
        Ok(()) => {}
        Err(ControllerError::PermissionDenied) => bail!(
            "write access to {} is required; grant it and run the command again",
            settings_dir.display()
        ),
        Err(e) => return Err(e).context("can't change brightness"),
    }

    let Some(display) = controller.wait_for_change(CONFIRM_TIMEOUT) else {
        // The store's value may not reflect this write yet.
        let current = controller.handle_change();
        println!("{} {UNCONFIRMED}", format_state(&current, &scale, args.raw));
        bail!("settings store did not confirm the change within {CONFIRM_TIMEOUT:?}");
    };
    print_state(&display, &scale, args.raw);

    controller.end();
    Ok(())
}

fn print_state(display: &DisplayState, scale: &UiScale, raw: bool) {
    println!("{}", format_state(display, scale, raw));
}

fn format_state(display: &DisplayState, scale: &UiScale, raw: bool) -> String {
    if raw {
        format!("{}/{} {}", display.level, scale.canonical_max, display.mode)
    } else {
        format!("{}/{} {}", scale.to_ui(display.level), scale.ui_max, display.mode)
    }
}
