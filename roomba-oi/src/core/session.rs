//! Controller-owned session context
//!
//! Holds the transport handle, communication counters and the most recent
//! result code. All writes to the robot go through [`Session::send`] so the
//! counters stay exact.

use super::types::{OiMode, Statistics};
use crate::error::{Error, Result, ResultCode};
use crate::oi::packet::TxPacket;
use crate::transport::Transport;
use std::time::{Duration, Instant};

pub struct Session<T: Transport> {
    transport: T,
    stats: Statistics,
    last_error: ResultCode,
    initialized: bool,
    /// Mode most recently requested by software
    mode: OiMode,
    baud_rate: u32,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            stats: Statistics::default(),
            last_error: ResultCode::Success,
            initialized: false,
            mode: OiMode::Off,
            baud_rate: 0,
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn set_initialized(&mut self, baud_rate: u32, mode: OiMode) {
        self.initialized = true;
        self.baud_rate = baud_rate;
        self.mode = mode;
    }

    pub(crate) fn clear_initialized(&mut self) {
        self.initialized = false;
        self.mode = OiMode::Off;
    }

    pub fn require_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    pub fn mode(&self) -> OiMode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: OiMode) {
        if self.mode != mode {
            log::debug!("Requested OI mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub(crate) fn set_baud_rate(&mut self, baud_rate: u32) {
        self.baud_rate = baud_rate;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    pub fn reset_statistics(&mut self) {
        self.stats = Statistics::default();
    }

    pub fn last_error(&self) -> ResultCode {
        self.last_error
    }

    /// Record an operation outcome: failures update `last_error`, and all
    /// but transient timeouts count towards `error_count`
    pub fn record<R>(&mut self, result: &Result<R>) {
        if let Err(e) = result {
            self.record_error(e);
        }
    }

    pub(crate) fn record_error(&mut self, err: &Error) {
        let code = err.code();
        self.last_error = code;
        if code != ResultCode::Timeout {
            self.stats.error_count += 1;
        }
    }

    // ========================================================================
    // I/O
    // ========================================================================

    /// Write one encoded command frame
    pub fn send(&mut self, packet: &TxPacket) -> Result<()> {
        self.write_frame(packet.as_bytes())
    }

    /// Write raw frame bytes; a failed or short write is a communication error
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        if frame.is_empty() {
            return Err(Error::InvalidParameter("empty command frame".into()));
        }
        let written = match self.transport.write(frame) {
            Ok(n) => n,
            Err(e) => {
                return Err(Error::Communication(format!(
                    "write of opcode {} failed: {}",
                    frame[0], e
                )))
            }
        };
        self.stats.bytes_sent += written as u64;
        if written < frame.len() {
            return Err(Error::Communication(format!(
                "short write: {} of {} bytes",
                written,
                frame.len()
            )));
        }
        self.stats.commands_sent += 1;
        log::trace!("TX {:02X?}", frame);
        Ok(())
    }

    /// Non-blocking read of whatever the transport has buffered
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let n = self
            .transport
            .read(buffer)
            .map_err(|e| Error::Communication(format!("read failed: {}", e)))?;
        self.stats.bytes_received += n as u64;
        Ok(n)
    }

    /// Bytes the transport has buffered
    pub fn available(&mut self) -> Result<usize> {
        self.transport
            .available()
            .map_err(|e| Error::Communication(format!("read failed: {}", e)))
    }

    /// Fill `buffer` completely, polling until `deadline`
    pub fn read_exact_until(&mut self, buffer: &mut [u8], deadline: Instant) -> Result<usize> {
        let mut filled = 0;
        while filled < buffer.len() {
            let n = self.read(&mut buffer[filled..])?;
            filled += n;
            if filled == buffer.len() {
                break;
            }
            if Instant::now() >= deadline {
                break;
            }
            if n == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(filled)
    }

    /// Discard stale input, returns bytes dropped
    pub fn drain_input(&mut self) -> Result<usize> {
        let mut scratch = [0u8; 64];
        let mut total = 0;
        loop {
            let n = self.read(&mut scratch)?;
            if n == 0 {
                return Ok(total);
            }
            total += n;
        }
    }
}
