//! Configuration for the Roomba OI engine and monitor
//!
//! Loads configuration from a TOML file. Every section has defaults, so a
//! file only needs the keys that differ:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [streaming]
//! preset = "safety"
//! ```

use crate::error::{Error, Result};
use crate::oi::constants::{
    baud_code, BAUD_SWITCH_DELAY_MS, COMMAND_DELAY_MS, DEFAULT_BAUD, MAX_VELOCITY, POWER_ON_DELAY_MS,
    QUERY_SETTLE_MS, REFRESH_DELAY_MS, RESPONSE_TIMEOUT_MS,
};
use crate::oi::presets::Preset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub timing: TimingConfig,
    pub robot: RobotConfig,
    pub streaming: StreamingConfig,
    pub logging: LoggingConfig,
}

/// UART connection to the robot
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    /// Must be one of the OI baud codes (300 - 115200)
    pub baud_rate: u32,
}

/// Protocol delays and deadlines
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait after opening the port before the start sequence
    pub settle_delay_ms: u64,
    /// Gap between start-sequence commands
    pub command_delay_ms: u64,
    /// Deadline for a one-shot query response
    pub response_timeout_ms: u64,
    /// Wait after a query before the first read
    pub query_settle_ms: u64,
    /// Wait after BAUD before re-opening at the new rate
    pub baud_switch_ms: u64,
}

/// Movement defaults used by the convenience commands
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RobotConfig {
    /// mm/s used by the fixed-speed straight moves
    pub default_velocity: i16,
    /// mm/s, clamp for convenience moves
    pub max_velocity: i16,
    /// mm/s used by in-place turns
    pub turn_velocity: i16,
    /// Enter Safe rather than Full mode on initialize
    pub safety_enabled: bool,
}

/// Telemetry stream used by the monitor
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Name of a sensor preset
    pub preset: String,
    pub poll_interval_ms: u64,
    /// Telemetry older than this is reported as stale
    pub stale_after_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: POWER_ON_DELAY_MS,
            command_delay_ms: COMMAND_DELAY_MS,
            response_timeout_ms: RESPONSE_TIMEOUT_MS,
            query_settle_ms: QUERY_SETTLE_MS,
            baud_switch_ms: BAUD_SWITCH_DELAY_MS,
        }
    }
}

impl TimingConfig {
    /// No delays; for scripted transports
    pub fn immediate() -> Self {
        Self {
            settle_delay_ms: 0,
            command_delay_ms: 0,
            response_timeout_ms: 20,
            query_settle_ms: 0,
            baud_switch_ms: 0,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn query_settle(&self) -> Duration {
        Duration::from_millis(self.query_settle_ms)
    }

    pub fn baud_switch(&self) -> Duration {
        Duration::from_millis(self.baud_switch_ms)
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            default_velocity: 500,
            max_velocity: MAX_VELOCITY,
            turn_velocity: 200,
            safety_enabled: true,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            preset: "basic".to_string(),
            poll_interval_ms: REFRESH_DELAY_MS,
            stale_after_ms: 1000,
        }
    }
}

impl StreamingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use roomba_oi::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("roomba.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Resolve the configured stream preset
    pub fn preset(&self) -> Result<Preset> {
        Preset::by_name(&self.streaming.preset).ok_or_else(|| {
            Error::Config(format!("unknown sensor preset '{}'", self.streaming.preset))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if baud_code(self.serial.baud_rate).is_none() {
            return Err(Error::Config(format!(
                "unsupported baud rate {}",
                self.serial.baud_rate
            )));
        }

        let robot = &self.robot;
        for (name, v) in [
            ("default_velocity", robot.default_velocity),
            ("max_velocity", robot.max_velocity),
            ("turn_velocity", robot.turn_velocity),
        ] {
            if !(0..=MAX_VELOCITY).contains(&v) {
                return Err(Error::Config(format!(
                    "robot.{} = {} (0-{} mm/s)",
                    name, v, MAX_VELOCITY
                )));
            }
        }
        if robot.default_velocity > robot.max_velocity || robot.turn_velocity > robot.max_velocity
        {
            return Err(Error::Config(
                "robot velocities must not exceed max_velocity".into(),
            ));
        }

        self.preset()?;
        if self.streaming.poll_interval_ms == 0 {
            return Err(Error::Config("streaming.poll_interval_ms must be > 0".into()));
        }
        Ok(())
    }
}
