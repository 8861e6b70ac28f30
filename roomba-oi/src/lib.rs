//! roomba-oi - iRobot Roomba Open Interface engine
//!
//! Encodes OI commands, decodes one-shot query responses and streamed
//! sensor frames, and tracks session state over any byte [`Transport`].
//!
//! ## Features
//!
//! - `serial` (default): [`transport::SerialTransport`] backed by `serialport`
//!
//! The [`MockTransport`](transport::MockTransport) is always available for
//! hardware-free testing.

pub mod config;
pub mod core;
pub mod error;
pub mod legacy;
pub mod oi;
pub mod roomba;
pub mod telemetry;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use core::types::{
    ChargingState, LedFlags, MotorFlags, Note, OiMode, Schedule, Song, Statistics,
};
pub use error::{Error, Result, ResultCode};
pub use legacy::LegacyRoomba;
pub use oi::presets::{self, Preset};
pub use oi::stream::StreamState;
pub use roomba::Roomba;
pub use telemetry::Telemetry;
pub use transport::Transport;
