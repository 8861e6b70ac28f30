//! Stream lifecycle and frame reassembly
//!
//! Frame format: `[0x13] [LEN] [ID DATA...]* [CHECKSUM]`
//!
//! ```text
//!            start              pause
//!   IDLE ─────────────> STREAMING ─────> PAUSED
//!    ^                      ^   <─────     │
//!    │       reset          │    resume    │
//!    └──────────────────────┴──────────────┘
//! ```
//!
//! Bytes arrive in whatever chunks the transport hands out. They are appended
//! to a ring buffer, the header is located, and a frame is handed to the
//! decoder once all `LEN + 3` bytes are present. A length byte that does not
//! match the requested id list marks a false header; the parser steps one
//! byte past it and searches again.

use super::constants::{
    MAX_POLL_BACKLOG, MAX_SENSOR_LIST, MAX_STREAM_PAYLOAD, STREAM_BUFFER_SIZE, STREAM_HEADER,
};
use super::packet::TxPacket;
use super::ring_buffer::RingBuffer;
use super::sensors;
use crate::core::session::Session;
use crate::error::{Error, Result};
use crate::telemetry::Telemetry;
use crate::transport::Transport;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
    Paused,
}

pub struct StreamManager {
    state: StreamState,
    ids: Vec<u8>,
    /// Full frame length for `ids`, header through checksum
    frame_len: usize,
    buffer: RingBuffer<STREAM_BUFFER_SIZE>,
    last_update: Option<Instant>,
    frames_decoded: u64,
    frames_dropped: u64,
}

impl StreamManager {
    pub fn new() -> Self {
        Self {
            state: StreamState::Idle,
            ids: Vec::new(),
            frame_len: 0,
            buffer: RingBuffer::new(),
            last_update: None,
            frames_decoded: 0,
            frames_dropped: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != StreamState::Idle
    }

    /// Ids of the running stream, empty when idle
    pub fn ids(&self) -> &[u8] {
        &self.ids
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Request a stream of `ids`; replaces any running stream
    pub fn start<T: Transport>(&mut self, session: &mut Session<T>, ids: &[u8]) -> Result<()> {
        if ids.is_empty() {
            return Err(Error::InvalidParameter("empty stream list".into()));
        }
        if ids.len() > MAX_SENSOR_LIST {
            return Err(Error::InvalidParameter(format!(
                "{} stream ids (max {})",
                ids.len(),
                MAX_SENSOR_LIST
            )));
        }
        if let Some(&unknown) = ids.iter().find(|&&id| sensors::payload_width(id).is_none()) {
            return Err(Error::InvalidParameter(format!(
                "unknown packet id {}",
                unknown
            )));
        }

        let mut pkt = TxPacket::new();
        pkt.set_stream(ids)?;
        let frame_len = sensors::stream_frame_len(ids)?;
        session.send(&pkt)?;

        self.ids.clear();
        self.ids.extend_from_slice(ids);
        self.frame_len = frame_len;
        self.buffer.clear();
        self.last_update = None;
        self.state = StreamState::Streaming;
        log::info!(
            "Streaming {} packet ids ({} byte frames): {:?}",
            ids.len(),
            frame_len,
            ids
        );
        Ok(())
    }

    /// Suspend emission; buffered partial data is kept
    pub fn pause<T: Transport>(&mut self, session: &mut Session<T>) -> Result<()> {
        if self.state != StreamState::Streaming {
            return Err(Error::NotInitialized);
        }
        let mut pkt = TxPacket::new();
        pkt.set_pause_resume_stream(false);
        session.send(&pkt)?;
        self.state = StreamState::Paused;
        log::debug!("Stream paused ({} bytes buffered)", self.buffer.len());
        Ok(())
    }

    pub fn resume<T: Transport>(&mut self, session: &mut Session<T>) -> Result<()> {
        match self.state {
            StreamState::Idle => Err(Error::NotInitialized),
            StreamState::Streaming => Ok(()),
            StreamState::Paused => {
                let mut pkt = TxPacket::new();
                pkt.set_pause_resume_stream(true);
                session.send(&pkt)?;
                self.state = StreamState::Streaming;
                log::debug!("Stream resumed");
                Ok(())
            }
        }
    }

    /// Stop the stream and forget all buffered state
    ///
    /// Local state is cleared even if the stop command cannot be written.
    pub fn reset<T: Transport>(&mut self, session: &mut Session<T>) -> Result<()> {
        let mut pkt = TxPacket::new();
        pkt.set_stream_stop();
        let sent = session.send(&pkt);
        self.clear();
        log::info!("Stream reset");
        sent
    }

    /// Drop all state without touching the transport
    pub fn clear(&mut self) {
        self.state = StreamState::Idle;
        self.ids.clear();
        self.frame_len = 0;
        self.buffer.clear();
        self.last_update = None;
    }

    // ========================================================================
    // Polling
    // ========================================================================

    /// Pull available bytes and decode every complete frame into `telemetry`
    ///
    /// Reading and decoding alternate, so a backlog larger than the ring is
    /// worked through frame by frame. Returns the outcome of the newest frame
    /// handled this call, or `Timeout` when no complete frame was present.
    /// Failures of older frames in the same batch are recorded on `session`
    /// directly. A backlog beyond `MAX_POLL_BACKLOG` bytes is discarded with
    /// `BufferOverflow`; telemetry keeps the newest frame decoded before that.
    pub fn poll<T: Transport>(
        &mut self,
        session: &mut Session<T>,
        telemetry: &mut Telemetry,
    ) -> Result<()> {
        if self.state != StreamState::Streaming {
            return Err(Error::NotInitialized);
        }

        let mut outcome: Option<Result<()>> = None;
        let mut consumed = 0;
        loop {
            let n = self.fill(session)?;
            consumed += n;
            let backlogged = self.buffer.len() == self.buffer.capacity();
            self.drain_frames(session, telemetry, &mut outcome);
            if n == 0 || !backlogged {
                break;
            }
            if consumed >= MAX_POLL_BACKLOG {
                let dropped = self.buffer.len() + session.drain_input()?;
                log::warn!("Stream backlog overflow, discarding {} bytes", dropped);
                self.buffer.clear();
                self.frames_dropped += 1;
                telemetry.record_failure();
                if let Some(Err(previous)) = outcome {
                    session.record_error(&previous);
                }
                return Err(Error::BufferOverflow(format!(
                    "stream backlog of {} bytes",
                    dropped
                )));
            }
        }

        outcome.unwrap_or_else(|| {
            telemetry.record_failure();
            Err(Error::Timeout)
        })
    }

    /// Read until the transport is empty or the ring is full
    fn fill<T: Transport>(&mut self, session: &mut Session<T>) -> Result<usize> {
        let mut chunk = [0u8; 64];
        let mut total = 0;
        loop {
            let room = self.buffer.capacity() - self.buffer.len();
            if room == 0 {
                return Ok(total);
            }
            let take = room.min(chunk.len());
            let n = session.read(&mut chunk[..take])?;
            if n == 0 {
                return Ok(total);
            }
            self.buffer.extend(&chunk[..n]);
            total += n;
        }
    }

    fn drain_frames<T: Transport>(
        &mut self,
        session: &mut Session<T>,
        telemetry: &mut Telemetry,
        outcome: &mut Option<Result<()>>,
    ) {
        let mut frame = [0u8; MAX_STREAM_PAYLOAD + 3];
        while let Some(len) = self.next_frame() {
            let frame = &mut frame[..len];
            if !self.buffer.copy_to(0, frame) {
                return;
            }

            let result = sensors::decode_frame(frame, telemetry);
            match &result {
                Ok(()) => {
                    self.buffer.advance(len);
                    self.frames_decoded += 1;
                    self.last_update = telemetry.last_successful_refresh;
                }
                Err(Error::Checksum { .. }) => {
                    // the length byte may be the corrupted one
                    self.buffer.advance(1);
                    self.frames_dropped += 1;
                }
                Err(e) => {
                    log::warn!("Dropping stream frame: {}", e);
                    self.buffer.advance(len);
                    self.frames_dropped += 1;
                }
            }

            if let Some(Err(previous)) = outcome.replace(result) {
                session.record_error(&previous);
            }
        }
    }

    /// Align the ring on a plausible header; `Some(len)` once a whole frame is buffered
    ///
    /// A corrupted header or length byte fails this match, so such a frame is
    /// skipped here and never reaches the checksum: the poll reports
    /// `Timeout`, not `Checksum`.
    fn next_frame(&mut self) -> Option<usize> {
        loop {
            let Some(start) = self.buffer.find_byte(STREAM_HEADER) else {
                self.buffer.clear();
                return None;
            };
            self.buffer.advance(start);

            let declared = self.buffer.get(1)? as usize;
            if declared + 3 != self.frame_len {
                self.buffer.advance(1);
                continue;
            }
            if self.buffer.len() < self.frame_len {
                return None;
            }
            return Some(self.frame_len);
        }
    }
}

impl Default for StreamManager {
    fn default() -> Self {
        Self::new()
    }
}
