//! Mock transport for testing
//!
//! Clones share one inner state, so a test keeps a handle while the
//! controller owns another and can script the device side:
//!
//! ```
//! use roomba_oi::transport::{MockTransport, Transport};
//!
//! let device = MockTransport::new();
//! device.respond_to(&[142, 35], &[2]);
//!
//! let mut port = device.clone();
//! port.open(115200).unwrap();
//! port.write(&[142, 35]).unwrap();
//! let mut buf = [0u8; 4];
//! assert_eq!(port.read(&mut buf).unwrap(), 1);
//! ```

use super::Transport;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Mock transport for unit testing
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    /// (request frame, canned response) pairs, matched on every write
    replies: Vec<(Vec<u8>, Vec<u8>)>,
    /// Max bytes handed out per read call, 0 = unlimited
    read_chunk: usize,
    baud_rate: Option<u32>,
    open_count: usize,
    fail_open: bool,
    fail_writes: bool,
    short_writes: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Queue `response` for reading whenever exactly `request` is written
    pub fn respond_to(&self, request: &[u8], response: &[u8]) {
        self.inner
            .lock()
            .replies
            .push((request.to_vec(), response.to_vec()));
    }

    pub fn clear_replies(&self) {
        self.inner.lock().replies.clear();
    }

    /// All bytes written since the last clear
    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().write_buffer.clone()
    }

    pub fn clear_written(&self) {
        self.inner.lock().write_buffer.clear();
    }

    pub fn clear_read(&self) {
        self.inner.lock().read_buffer.clear();
    }

    pub fn pending_read(&self) -> usize {
        self.inner.lock().read_buffer.len()
    }

    /// Limit each `read` to `n` bytes to simulate a slow line
    pub fn set_read_chunk(&self, n: usize) {
        self.inner.lock().read_chunk = n;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.inner.lock().fail_open = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Accept only the first byte of every write
    pub fn set_short_writes(&self, short: bool) {
        self.inner.lock().short_writes = short;
    }

    /// Rate passed to the most recent successful `open`
    pub fn baud_rate(&self) -> Option<u32> {
        self.inner.lock().baud_rate
    }

    pub fn open_count(&self) -> usize {
        self.inner.lock().open_count
    }
}

impl Transport for MockTransport {
    fn open(&mut self, baud_rate: u32) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_open {
            return Err(Error::Communication("mock port unavailable".into()));
        }
        inner.baud_rate = Some(baud_rate);
        inner.open_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.inner.lock().baud_rate = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.lock().baud_rate.is_some()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let mut available = inner.read_buffer.len().min(buffer.len());
        if inner.read_chunk > 0 {
            available = available.min(inner.read_chunk);
        }
        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..available)) {
            *slot = byte;
        }
        Ok(available)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        let accepted = if inner.short_writes {
            data.len().min(1)
        } else {
            data.len()
        };
        inner.write_buffer.extend_from_slice(&data[..accepted]);

        let response = inner
            .replies
            .iter()
            .find(|(request, _)| request.as_slice() == data)
            .map(|(_, response)| response.clone());
        if let Some(response) = response {
            inner.read_buffer.extend(response);
        }
        Ok(accepted)
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.inner.lock().read_buffer.len())
    }
}
