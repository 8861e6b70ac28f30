//! Outgoing command frames
//!
//! `TxPacket` is a single reusable buffer that every command is encoded into:
//!
//! ```ignore
//! let mut pkt = TxPacket::new();
//! pkt.set_drive(200, RADIUS_STRAIGHT as i16)?;
//! transport.write(pkt.as_bytes())?;
//! pkt.set_safe();
//! transport.write(pkt.as_bytes())?;
//! ```
//!
//! Setters that take arguments validate them before touching the buffer. On
//! error the packet is left empty so a stale command can never be resent.

use super::constants::*;
use super::sensors;
use crate::core::types::{LedFlags, MotorFlags, Schedule, Song};
use crate::error::{Error, Result};

/// Largest command frame: SONG with 16 notes (3 + 32 bytes) or a full
/// 60-entry STREAM / QUERY_LIST request (2 + 60 bytes)
pub const MAX_FRAME_SIZE: usize = 2 + MAX_SENSOR_LIST;

/// Reusable TX buffer for all Open Interface commands
pub struct TxPacket {
    data: [u8; MAX_FRAME_SIZE],
    len: usize,
}

impl TxPacket {
    pub const fn new() -> Self {
        Self {
            data: [0u8; MAX_FRAME_SIZE],
            len: 0,
        }
    }

    /// Encoded frame bytes (empty after a rejected setter)
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn opcode(&self) -> Option<u8> {
        self.as_bytes().first().copied()
    }

    #[inline]
    fn opcode_only(&mut self, opcode: u8) {
        self.data[0] = opcode;
        self.len = 1;
    }

    #[inline]
    fn with_args(&mut self, opcode: u8, args: &[u8]) {
        self.data[0] = opcode;
        self.data[1..=args.len()].copy_from_slice(args);
        self.len = 1 + args.len();
    }

    fn reject(&mut self, err: Error) -> Result<()> {
        self.len = 0;
        Err(err)
    }

    /// Arbitrary opcode plus arguments
    pub fn set_raw(&mut self, opcode: u8, args: &[u8]) -> Result<()> {
        if 1 + args.len() > MAX_FRAME_SIZE {
            return self.reject(Error::BufferOverflow(format!(
                "command frame of {} bytes (max {})",
                1 + args.len(),
                MAX_FRAME_SIZE
            )));
        }
        self.with_args(opcode, args);
        Ok(())
    }

    // ========================================================================
    // Mode Commands
    // ========================================================================

    #[inline]
    pub fn set_start(&mut self) {
        self.opcode_only(CMD_START);
    }

    #[inline]
    pub fn set_safe(&mut self) {
        self.opcode_only(CMD_SAFE);
    }

    #[inline]
    pub fn set_full(&mut self) {
        self.opcode_only(CMD_FULL);
    }

    #[inline]
    pub fn set_power_down(&mut self) {
        self.opcode_only(CMD_POWER);
    }

    /// BAUD (129) with the code for `rate`
    pub fn set_baud(&mut self, rate: u32) -> Result<()> {
        let Some(code) = baud_code(rate) else {
            return self.reject(Error::InvalidParameter(format!(
                "unsupported baud rate {}",
                rate
            )));
        };
        self.with_args(CMD_BAUD, &[code]);
        Ok(())
    }

    // ========================================================================
    // Cleaning Commands
    // ========================================================================

    #[inline]
    pub fn set_clean(&mut self) {
        self.opcode_only(CMD_CLEAN);
    }

    #[inline]
    pub fn set_max_clean(&mut self) {
        self.opcode_only(CMD_MAX_CLEAN);
    }

    #[inline]
    pub fn set_spot(&mut self) {
        self.opcode_only(CMD_SPOT);
    }

    #[inline]
    pub fn set_seek_dock(&mut self) {
        self.opcode_only(CMD_SEEK_DOCK);
    }

    pub fn set_schedule(&mut self, schedule: &Schedule) {
        let mut args = [0u8; 15];
        args[0] = schedule.enabled_days();
        for day in 0..7u8 {
            let (hour, minute) = schedule.time(day).unwrap_or((0, 0));
            args[1 + 2 * day as usize] = hour;
            args[2 + 2 * day as usize] = minute;
        }
        self.with_args(CMD_SCHEDULE, &args);
    }

    pub fn set_day_time(&mut self, day: u8, hour: u8, minute: u8) -> Result<()> {
        if let Err(e) = crate::core::types::validate_day_time(day, hour, minute) {
            return self.reject(e);
        }
        self.with_args(CMD_SET_DAY_TIME, &[day, hour, minute]);
        Ok(())
    }

    // ========================================================================
    // Motion Commands
    // ========================================================================

    /// DRIVE (137): velocity and radius as big-endian two's complement
    ///
    /// Velocity -500..=500 mm/s. Radius -2000..=2000 mm, or one of the
    /// straight sentinels (0x8000, 0x7FFF); -1/1 turn in place CW/CCW.
    pub fn set_drive(&mut self, velocity: i16, radius: i16) -> Result<()> {
        if !(-MAX_VELOCITY..=MAX_VELOCITY).contains(&velocity) {
            return self.reject(Error::InvalidParameter(format!(
                "velocity {} mm/s (limit ±{})",
                velocity, MAX_VELOCITY
            )));
        }
        if !is_legal_radius(radius) {
            return self.reject(Error::InvalidParameter(format!(
                "radius {} mm (limit ±{})",
                radius, MAX_RADIUS
            )));
        }
        let v = velocity.to_be_bytes();
        let r = radius.to_be_bytes();
        self.with_args(CMD_DRIVE, &[v[0], v[1], r[0], r[1]]);
        Ok(())
    }

    /// DRIVE_DIRECT (145): per-wheel velocity, right first
    pub fn set_drive_direct(&mut self, right: i16, left: i16) -> Result<()> {
        for v in [right, left] {
            if !(-MAX_VELOCITY..=MAX_VELOCITY).contains(&v) {
                return self.reject(Error::InvalidParameter(format!(
                    "wheel velocity {} mm/s (limit ±{})",
                    v, MAX_VELOCITY
                )));
            }
        }
        let r = right.to_be_bytes();
        let l = left.to_be_bytes();
        self.with_args(CMD_DRIVE_DIRECT, &[r[0], r[1], l[0], l[1]]);
        Ok(())
    }

    /// DRIVE_PWM (146): per-wheel duty cycle, right first
    pub fn set_drive_pwm(&mut self, right: i16, left: i16) -> Result<()> {
        for p in [right, left] {
            if !(-MAX_PWM..=MAX_PWM).contains(&p) {
                return self.reject(Error::InvalidParameter(format!(
                    "wheel PWM {} (limit ±{})",
                    p, MAX_PWM
                )));
            }
        }
        let r = right.to_be_bytes();
        let l = left.to_be_bytes();
        self.with_args(CMD_DRIVE_PWM, &[r[0], r[1], l[0], l[1]]);
        Ok(())
    }

    // ========================================================================
    // Actuator Commands
    // ========================================================================

    #[inline]
    pub fn set_motors(&mut self, flags: MotorFlags) {
        self.with_args(CMD_MOTORS, &[flags.bits()]);
    }

    /// PWM_MOTORS (144): main/side brush -127..=127, vacuum 0..=127
    pub fn set_pwm_motors(&mut self, main_brush: i8, side_brush: i8, vacuum: u8) -> Result<()> {
        if main_brush < -MAX_BRUSH_PWM || side_brush < -MAX_BRUSH_PWM || vacuum > MAX_VACUUM_PWM {
            return self.reject(Error::InvalidParameter(format!(
                "motor PWM main={} side={} vacuum={}",
                main_brush, side_brush, vacuum
            )));
        }
        self.with_args(
            CMD_PWM_MOTORS,
            &[main_brush as u8, side_brush as u8, vacuum],
        );
        Ok(())
    }

    /// LEDS (139): indicator bits, power LED color (0 green .. 255 red) and intensity
    #[inline]
    pub fn set_leds(&mut self, leds: LedFlags, power_color: u8, power_intensity: u8) {
        self.with_args(CMD_LEDS, &[leds.bits(), power_color, power_intensity]);
    }

    #[inline]
    pub fn set_scheduling_leds(&mut self, weekdays: u8, schedule: u8) {
        self.with_args(CMD_SCHEDULING_LEDS, &[weekdays, schedule]);
    }

    #[inline]
    pub fn set_digit_leds_raw(&mut self, digits: [u8; 4]) {
        self.with_args(CMD_DIGIT_LEDS_RAW, &digits);
    }

    // ========================================================================
    // Audio Commands
    // ========================================================================

    /// SONG (140): slot, length, then (note, duration) pairs
    pub fn set_song(&mut self, song: &Song) -> Result<()> {
        if let Err(e) = song.validate() {
            return self.reject(e);
        }
        self.data[0] = CMD_SONG;
        self.data[1] = song.number;
        self.data[2] = song.notes().len() as u8;
        for (i, note) in song.notes().iter().enumerate() {
            self.data[3 + 2 * i] = note.number;
            self.data[4 + 2 * i] = note.duration;
        }
        self.len = 3 + 2 * song.notes().len();
        Ok(())
    }

    pub fn set_play(&mut self, number: u8) -> Result<()> {
        if number > MAX_SONGS {
            return self.reject(Error::InvalidParameter(format!(
                "song number {} (max {})",
                number, MAX_SONGS
            )));
        }
        self.with_args(CMD_PLAY, &[number]);
        Ok(())
    }

    // ========================================================================
    // Input Commands
    // ========================================================================

    /// SENSORS (142) for one packet or group id
    pub fn set_sensors(&mut self, id: u8) -> Result<()> {
        if sensors::payload_width(id).is_none() {
            return self.reject(Error::InvalidParameter(format!("unknown packet id {}", id)));
        }
        self.with_args(CMD_SENSORS, &[id]);
        Ok(())
    }

    /// QUERY_LIST (149): count then ids
    pub fn set_query_list(&mut self, ids: &[u8]) -> Result<()> {
        self.set_id_list(CMD_QUERY_LIST, ids, false)
    }

    /// STREAM (148): count then ids
    ///
    /// The resulting frame (one id byte per entry plus data) must fit in a
    /// single 15 ms emission slot.
    pub fn set_stream(&mut self, ids: &[u8]) -> Result<()> {
        self.set_id_list(CMD_STREAM, ids, true)
    }

    /// Stream stop is STREAM with an empty list
    #[inline]
    pub fn set_stream_stop(&mut self) {
        self.with_args(CMD_STREAM, &[0]);
    }

    #[inline]
    pub fn set_pause_resume_stream(&mut self, resume: bool) {
        self.with_args(CMD_PAUSE_RESUME_STREAM, &[resume as u8]);
    }

    fn set_id_list(&mut self, opcode: u8, ids: &[u8], streamed: bool) -> Result<()> {
        if ids.is_empty() {
            return self.reject(Error::InvalidParameter("empty packet id list".into()));
        }
        if ids.len() > MAX_SENSOR_LIST {
            return self.reject(Error::BufferOverflow(format!(
                "{} packet ids (max {})",
                ids.len(),
                MAX_SENSOR_LIST
            )));
        }
        let mut payload = 0usize;
        for &id in ids {
            let Some(width) = sensors::payload_width(id) else {
                return self.reject(Error::InvalidParameter(format!(
                    "unknown packet id {}",
                    id
                )));
            };
            payload += width + usize::from(streamed);
        }
        if streamed && payload > MAX_STREAM_PAYLOAD {
            return self.reject(Error::BufferOverflow(format!(
                "stream payload {} bytes (max {})",
                payload, MAX_STREAM_PAYLOAD
            )));
        }
        self.data[0] = opcode;
        self.data[1] = ids.len() as u8;
        self.data[2..2 + ids.len()].copy_from_slice(ids);
        self.len = 2 + ids.len();
        Ok(())
    }
}

impl Default for TxPacket {
    fn default() -> Self {
        Self::new()
    }
}

/// Radius accepted by DRIVE: bounded range or a straight sentinel
pub fn is_legal_radius(radius: i16) -> bool {
    (-MAX_RADIUS..=MAX_RADIUS).contains(&radius)
        || radius as u16 == RADIUS_STRAIGHT
        || radius as u16 == RADIUS_STRAIGHT_ALT
}

/// Decode the (velocity, radius) pair of an encoded DRIVE frame
pub fn parse_drive(frame: &[u8]) -> Option<(i16, i16)> {
    match frame {
        [CMD_DRIVE, v0, v1, r0, r1] => Some((
            i16::from_be_bytes([*v0, *v1]),
            i16::from_be_bytes([*r0, *r1]),
        )),
        _ => None,
    }
}
