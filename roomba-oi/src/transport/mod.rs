//! Transport layer for I/O abstraction
//!
//! The engine only needs a byte pipe that can be opened at a given UART rate,
//! written to, and drained without blocking. [`SerialTransport`] is the real
//! implementation; [`MockTransport`] scripts the device side for tests.

use crate::error::Result;

#[cfg(feature = "serial")]
mod serial;
#[cfg(feature = "serial")]
pub use serial::SerialTransport;

mod mock;
pub use mock::MockTransport;

/// Byte channel to the robot
pub trait Transport: Send {
    /// Open (or re-open) the channel at `baud_rate`
    fn open(&mut self, baud_rate: u32) -> Result<()>;

    /// Release the channel; further I/O fails until reopened
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Read whatever is already buffered, returns number of bytes read
    ///
    /// Must not block beyond a few hundred microseconds; `Ok(0)` means no
    /// data yet.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Bytes waiting to be read
    fn available(&mut self) -> Result<usize> {
        Ok(0)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, baud_rate: u32) -> Result<()> {
        (**self).open(baud_rate)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        (**self).read(buffer)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }
}
