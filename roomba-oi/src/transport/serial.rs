//! Serial transport implementation

use super::Transport;
use crate::error::{Error, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// UART connection to the robot's mini-DIN port
pub struct SerialTransport {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Create an unopened transport for `path` (e.g. "/dev/ttyUSB0")
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            port: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(Error::NotInitialized)
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, baud_rate: u32) -> Result<()> {
        if let Some(port) = self.port.as_mut() {
            port.set_baud_rate(baud_rate)?;
            log::info!("Serial port {} switched to {} baud", self.path, baud_rate);
            return Ok(());
        }

        // OI is 8N1 without flow control
        let port = serialport::new(&self.path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_micros(100))
            .open()?;

        log::info!("Opened serial port: {} at {} baud", self.path, baud_rate);
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            log::info!("Closed serial port: {}", self.path);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port()?.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.port()?.write(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        self.port()?.flush()?;
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.port()?.bytes_to_read()? as usize)
    }
}
