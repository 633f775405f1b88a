//! # Cape Runtime Binary
//!
//! Brings up the cape runtime core, wires termination signals to the
//! lifecycle manager, and runs the button monitor loop: the pause button
//! toggles RUNNING ↔ PAUSED, the mode button samples the barometer, and
//! the green LED mirrors the RUNNING state.
//!
//! # Usage
//!
//! ```bash
//! # Run with the simulation driver (default)
//! cape_runtime
//!
//! # Run with a board configuration file
//! cape_runtime --config /etc/cape/board.toml
//!
//! # Verbose logging
//! cape_runtime -v
//! ```

#![deny(warnings)]

use std::path::PathBuf;
use std::time::Duration;

use cape_common::config::{load_board_config, BoardConfig, PeripheralConfig};
use cape_common::peripheral::{ButtonEvent, ButtonId, LedColor, PeripheralId, Value};
use cape_common::state::OperatingState;
use cape_runtime::drivers::register_all_drivers;
use cape_runtime::{CapeCore, DriverRegistry, LifecycleManager};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Cape runtime - operating-state machine and peripheral registry for the cape
#[derive(Parser, Debug)]
#[command(name = "cape_runtime")]
#[command(version)]
#[command(about = "Robotics cape runtime core")]
#[command(long_about = None)]
struct Args {
    /// Path to the board configuration file (board.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Board driver to load (overrides the config file)
    #[arg(short, long)]
    driver: Option<String>,

    /// Button poll interval in milliseconds (overrides the config file)
    #[arg(long)]
    poll_interval_ms: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Cape runtime startup failed: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Cape runtime v{} starting...", env!("CARGO_PKG_VERSION"));

    // Board configuration: file if given, defaults otherwise, CLI on top.
    let mut board_config = match &args.config {
        Some(path) => load_board_config(path)?,
        None => BoardConfig::default(),
    };
    if let Some(driver) = args.driver {
        board_config.driver = driver;
    }
    if let Some(interval) = args.poll_interval_ms {
        board_config.poll_interval_ms = interval;
    }
    board_config.validate()?;

    // Build the driver catalog and create the configured driver.
    let mut driver_registry = DriverRegistry::new();
    register_all_drivers(&mut driver_registry)?;
    info!(
        "Available drivers: {:?}, using '{}'",
        driver_registry.names(),
        board_config.driver
    );
    let driver = driver_registry.create(&board_config.driver)?;

    let cape = CapeCore::init(driver)?;
    LifecycleManager::install_signal_handler(cape.lifecycle())?;

    // Claim the board surface and initialize the barometer.
    let green = cape.claim(PeripheralId::Led(LedColor::Green))?;
    let red = cape.claim(PeripheralId::Led(LedColor::Red))?;
    let pause_button = cape.claim(PeripheralId::Button(ButtonId::Pause))?;
    let mode_button = cape.claim(PeripheralId::Button(ButtonId::Mode))?;
    let barometer = cape.claim(PeripheralId::Barometer)?;
    cape.apply_config(
        &barometer,
        PeripheralConfig::Barometer(board_config.barometer_config()?),
    )?;

    monitor_loop(
        &cape,
        Duration::from_millis(board_config.poll_interval_ms as u64),
        &pause_button,
        &mode_button,
        &green,
        &red,
        &barometer,
    );

    // Idempotent with the signal path and with CapeCore's Drop.
    cape.shutdown();
    info!("Cape runtime shutdown complete");
    Ok(())
}

/// Poll the buttons until the state machine reaches EXITING.
fn monitor_loop(
    cape: &CapeCore,
    poll_interval: Duration,
    pause_button: &cape_runtime::Handle,
    mode_button: &cape_runtime::Handle,
    green: &cape_runtime::Handle,
    red: &cape_runtime::Handle,
    barometer: &cape_runtime::Handle,
) {
    let mut pause_was_pressed = false;
    let mut mode_was_pressed = false;

    loop {
        let state = cape.state();
        if state == OperatingState::Exiting {
            break;
        }

        // Pause button: rising edge toggles RUNNING <-> PAUSED.
        let Some(pressed) = read_button(cape, pause_button) else {
            break;
        };
        if pressed && !pause_was_pressed {
            let target = match state {
                OperatingState::Running => OperatingState::Paused,
                _ => OperatingState::Running,
            };
            // A shutdown racing this toggle makes the edge illegal; the
            // loop exits on the next state read.
            if let Err(e) = cape.set_state(target) {
                warn!("Pause toggle rejected: {e}");
            }
        }
        pause_was_pressed = pressed;

        // Mode button: rising edge samples the barometer.
        let Some(pressed) = read_button(cape, mode_button) else {
            break;
        };
        if pressed && !mode_was_pressed {
            match cape.read(barometer) {
                Ok(Value::Pressure(reading)) => info!(
                    "Barometer: {:.1} Pa, {:.1} degC",
                    reading.pressure_pa, reading.temperature_c
                ),
                Ok(other) => warn!("Unexpected barometer value: {other:?}"),
                Err(e) => warn!("Barometer read failed: {e}"),
            }
        }
        mode_was_pressed = pressed;

        // LEDs mirror the state; actuation is only legal while RUNNING.
        if cape.state() == OperatingState::Running {
            for (led, level) in [(green, true), (red, false)] {
                if let Err(e) = cape.write(led, Value::Level(level)) {
                    warn!("LED mirror write failed: {e}");
                }
            }
        }

        std::thread::sleep(poll_interval);
    }
}

/// Read a button, reducing the event to its pressed flag.
///
/// Returns `None` once the gate rejects reads (shutdown has begun) or the
/// claim is gone; the caller stops polling.
fn read_button(cape: &CapeCore, handle: &cape_runtime::Handle) -> Option<bool> {
    match cape.read(handle) {
        Ok(Value::Button(ButtonEvent { pressed, .. })) => Some(pressed),
        Ok(other) => {
            warn!("Unexpected button value: {other:?}");
            Some(false)
        }
        Err(_) => None,
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
