//! roomba-oi - telemetry monitor
//!
//! Opens the configured serial port, wakes the Open Interface, streams the
//! configured sensor preset and logs telemetry and hazards until Ctrl-C.
//! On shutdown the stream is stopped and the wheels are halted.

use roomba_oi::error::{Error, Result};
use roomba_oi::transport::SerialTransport;
use roomba_oi::{AppConfig, Roomba, StreamState, Telemetry};
use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_CONFIG_PATH: &str = "/etc/roomba-oi.toml";

/// Interval between telemetry summaries
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Parse config path from command line arguments.
///
/// Supports:
/// - `roomba-oi <path>` (positional)
/// - `roomba-oi --config <path>` (flag-based)
/// - `roomba-oi -c <path>` (short flag)
///
/// Defaults to `/etc/roomba-oi.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    DEFAULT_CONFIG_PATH.to_string()
}

/// Missing default file means built-in defaults; an explicit path must exist
fn load_config(path: &str) -> Result<AppConfig> {
    if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
        return Ok(AppConfig::default());
    }
    AppConfig::from_file(path)
}

/// Hazard summary, `None` when nothing is triggered
fn hazards(t: &Telemetry) -> Option<String> {
    let mut found = Vec::new();
    if t.has_cliff_detection() {
        found.push("cliff");
    }
    if t.has_bump_detection() {
        found.push("bump");
    }
    if t.has_wheel_drop() {
        found.push("wheel drop");
    }
    if t.has_overcurrent() {
        found.push("overcurrent");
    }
    if found.is_empty() {
        None
    } else {
        Some(found.join(", "))
    }
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = load_config(&config_path)?;

    // RUST_LOG wins over the config file
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("roomba-oi v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_path);

    let preset = config.preset()?;
    log::info!(
        "Port {} at {} baud, streaming preset '{}' {:?}",
        config.serial.port,
        config.serial.baud_rate,
        preset.name,
        preset.ids
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let transport = SerialTransport::new(config.serial.port.clone());
    let mut roomba = Roomba::from_app_config(transport, &config);
    roomba.initialize(config.serial.baud_rate)?;
    roomba.start_preset(&preset)?;

    let poll_interval = config.streaming.poll_interval();
    let stale_after = config.streaming.stale_after();
    let mut last_hazard: Option<String> = None;
    let mut was_stale = false;
    let mut last_report = Instant::now();

    while running.load(Ordering::Relaxed) {
        if let Err(e) = roomba.poll() {
            if !e.is_transient() {
                log::warn!("Poll failed: {}", e);
            }
        }

        let telemetry = roomba.telemetry();
        let hazard = hazards(telemetry);
        if hazard != last_hazard {
            match &hazard {
                Some(h) => log::warn!("Hazard: {}", h),
                None => log::info!("Hazards cleared"),
            }
            last_hazard = hazard;
        }

        let stale = !telemetry.is_fresh(stale_after);
        if stale && !was_stale {
            log::warn!(
                "Telemetry stale ({} failed polls)",
                telemetry.failed_attempts
            );
        } else if !stale && was_stale {
            log::info!("Telemetry recovered");
        }
        was_stale = stale;

        if last_report.elapsed() >= REPORT_INTERVAL {
            let stats = roomba.statistics();
            log::info!(
                "Mode {:?}, battery {}% ({} mV, {} mA), charging {:?} | tx {} B, rx {} B, errors {}",
                telemetry.mode,
                telemetry.battery_percentage(),
                telemetry.voltage,
                telemetry.current,
                telemetry.charging_state,
                stats.bytes_sent,
                stats.bytes_received,
                stats.error_count
            );
            last_report = Instant::now();
        }

        thread::sleep(poll_interval);
    }

    if roomba.stream_state() != StreamState::Idle {
        log::info!("Stopping sensor stream");
    }
    roomba.shutdown()?;
    log::info!("roomba-oi stopped");
    Ok(())
}
