//! Sensor packet table and telemetry decoder
//!
//! Two wire shapes carry sensor data:
//!
//! - **Query response** (SENSORS / QUERY_LIST): raw values back to back in the
//!   requested order, no header, no checksum.
//! - **Stream frame** (STREAM): `[0x13][len][id, data...]*[checksum]`, where
//!   every byte of the frame sums to zero modulo 256.
//!
//! Values are big-endian. Decoding always targets a scratch copy of the
//! telemetry aggregate that replaces the caller's only when the whole
//! response validated, so a bad frame never leaves half-updated fields.

use super::constants::STREAM_HEADER;
use crate::error::{Error, Result};
use crate::telemetry::Telemetry;
use std::ops::RangeInclusive;
use std::time::Instant;

/// Width and decode rule for one sensor packet id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketDescriptor {
    pub id: u8,
    pub name: &'static str,
    /// 1 or 2 bytes
    pub width: usize,
    /// Sign-extend (two's complement) when true
    pub signed: bool,
}

const fn u8p(id: u8, name: &'static str) -> PacketDescriptor {
    PacketDescriptor {
        id,
        name,
        width: 1,
        signed: false,
    }
}

const fn i8p(id: u8, name: &'static str) -> PacketDescriptor {
    PacketDescriptor {
        id,
        name,
        width: 1,
        signed: true,
    }
}

const fn u16p(id: u8, name: &'static str) -> PacketDescriptor {
    PacketDescriptor {
        id,
        name,
        width: 2,
        signed: false,
    }
}

const fn i16p(id: u8, name: &'static str) -> PacketDescriptor {
    PacketDescriptor {
        id,
        name,
        width: 2,
        signed: true,
    }
}

pub const FIRST_PACKET_ID: u8 = 7;
pub const LAST_PACKET_ID: u8 = 58;

/// Packets 7..=58, indexed by `id - FIRST_PACKET_ID`
static PACKETS: [PacketDescriptor; 52] = [
    u8p(7, "bumps_wheel_drops"),
    u8p(8, "wall"),
    u8p(9, "cliff_left"),
    u8p(10, "cliff_front_left"),
    u8p(11, "cliff_front_right"),
    u8p(12, "cliff_right"),
    u8p(13, "virtual_wall"),
    u8p(14, "wheel_overcurrents"),
    u8p(15, "dirt_detect"),
    u8p(16, "unused_16"),
    u8p(17, "ir_omni"),
    u8p(18, "buttons"),
    i16p(19, "distance"),
    i16p(20, "angle"),
    u8p(21, "charging_state"),
    u16p(22, "voltage"),
    i16p(23, "current"),
    i8p(24, "temperature"),
    u16p(25, "battery_charge"),
    u16p(26, "battery_capacity"),
    u16p(27, "wall_signal"),
    u16p(28, "cliff_left_signal"),
    u16p(29, "cliff_front_left_signal"),
    u16p(30, "cliff_front_right_signal"),
    u16p(31, "cliff_right_signal"),
    u8p(32, "unused_32"),
    u16p(33, "unused_33"),
    u8p(34, "charging_sources"),
    u8p(35, "oi_mode"),
    u8p(36, "song_number"),
    u8p(37, "song_playing"),
    u8p(38, "stream_packet_count"),
    i16p(39, "requested_velocity"),
    i16p(40, "requested_radius"),
    i16p(41, "requested_right_velocity"),
    i16p(42, "requested_left_velocity"),
    u16p(43, "left_encoder_counts"),
    u16p(44, "right_encoder_counts"),
    u8p(45, "light_bumper"),
    u16p(46, "light_bump_left_signal"),
    u16p(47, "light_bump_front_left_signal"),
    u16p(48, "light_bump_center_left_signal"),
    u16p(49, "light_bump_center_right_signal"),
    u16p(50, "light_bump_front_right_signal"),
    u16p(51, "light_bump_right_signal"),
    u8p(52, "ir_left"),
    u8p(53, "ir_right"),
    i16p(54, "left_motor_current"),
    i16p(55, "right_motor_current"),
    i16p(56, "main_brush_motor_current"),
    i16p(57, "side_brush_motor_current"),
    u8p(58, "stasis"),
];

/// Descriptor for a single (non-group) packet id
pub fn descriptor(id: u8) -> Option<&'static PacketDescriptor> {
    if (FIRST_PACKET_ID..=LAST_PACKET_ID).contains(&id) {
        Some(&PACKETS[(id - FIRST_PACKET_ID) as usize])
    } else {
        None
    }
}

/// Member ids of a packet group
pub fn group_members(id: u8) -> Option<RangeInclusive<u8>> {
    match id {
        0 => Some(7..=26),
        1 => Some(7..=16),
        2 => Some(17..=20),
        3 => Some(21..=26),
        4 => Some(27..=34),
        5 => Some(35..=42),
        6 => Some(7..=42),
        100 => Some(7..=58),
        101 => Some(43..=58),
        106 => Some(46..=51),
        107 => Some(54..=58),
        _ => None,
    }
}

/// Data bytes carried for a packet or group id, `None` when unknown
pub fn payload_width(id: u8) -> Option<usize> {
    if let Some(desc) = descriptor(id) {
        return Some(desc.width);
    }
    group_members(id).map(|members| {
        members
            .filter_map(descriptor)
            .map(|desc| desc.width)
            .sum()
    })
}

/// Total bytes of a query response for `ids`
pub fn query_response_len(ids: &[u8]) -> Result<usize> {
    ids.iter().try_fold(0usize, |acc, &id| {
        payload_width(id)
            .map(|w| acc + w)
            .ok_or(Error::UnknownPacket(id))
    })
}

/// Total bytes of a stream frame carrying `ids` (header through checksum)
pub fn stream_frame_len(ids: &[u8]) -> Result<usize> {
    let payload = query_response_len(ids)? + ids.len();
    Ok(payload + super::constants::STREAM_FRAME_OVERHEAD)
}

/// Read one value per its descriptor, sign-extending signed packets
#[inline]
pub fn read_value(desc: &PacketDescriptor, bytes: &[u8]) -> i32 {
    match (desc.width, desc.signed) {
        (1, false) => bytes[0] as i32,
        (1, true) => bytes[0] as i8 as i32,
        (_, false) => u16::from_be_bytes([bytes[0], bytes[1]]) as i32,
        (_, true) => i16::from_be_bytes([bytes[0], bytes[1]]) as i32,
    }
}

/// Decode the data of one packet or group id into `target`
///
/// Returns the bytes consumed. Errors if `id` is unknown or `data` is short.
fn decode_packet(id: u8, data: &[u8], target: &mut Telemetry) -> Result<usize> {
    if let Some(desc) = descriptor(id) {
        if data.len() < desc.width {
            return Err(Error::Communication(format!(
                "packet {} truncated ({} of {} bytes)",
                id,
                data.len(),
                desc.width
            )));
        }
        target.apply(id, read_value(desc, data));
        return Ok(desc.width);
    }

    let members = group_members(id).ok_or(Error::UnknownPacket(id))?;
    let mut offset = 0;
    for member in members {
        offset += decode_packet(member, &data[offset..], target)?;
    }
    Ok(offset)
}

/// Modulo-256 sum of a byte slice
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Build a valid stream frame from `(id, data)` records
pub fn encode_frame(records: &[(u8, &[u8])]) -> Vec<u8> {
    let payload_len: usize = records.iter().map(|(_, d)| 1 + d.len()).sum();
    let mut frame = Vec::with_capacity(payload_len + 3);
    frame.push(STREAM_HEADER);
    frame.push(payload_len as u8);
    for (id, data) in records {
        frame.push(*id);
        frame.extend_from_slice(data);
    }
    let sum = checksum(&frame);
    frame.push(0u8.wrapping_sub(sum));
    frame
}

fn commit(target: &mut Telemetry, mut scratch: Telemetry, now: Instant) {
    scratch.last_successful_refresh = Some(now);
    scratch.failed_attempts = 0;
    *target = scratch;
}

/// Decode a query response for `ids` into `target`
///
/// A response shorter than the ids require is reported as `Timeout`; the
/// aggregate keeps its values and only the failure counter moves.
pub fn decode_query(ids: &[u8], data: &[u8], target: &mut Telemetry) -> Result<()> {
    let expected = query_response_len(ids)?;
    if data.len() < expected {
        target.record_failure();
        log::debug!(
            "Query response truncated: {} of {} bytes",
            data.len(),
            expected
        );
        return Err(Error::Timeout);
    }

    let mut scratch = target.clone();
    let mut offset = 0;
    for &id in ids {
        offset += decode_packet(id, &data[offset..], &mut scratch)?;
    }
    commit(target, scratch, Instant::now());
    Ok(())
}

/// Validate and decode one complete stream frame into `target`
///
/// Checks run in order: checksum, header, length byte, then the
/// `(id, data)` walk. Any failure discards the frame whole.
pub fn decode_frame(frame: &[u8], target: &mut Telemetry) -> Result<()> {
    match demux_frame(frame, target) {
        Ok(scratch) => {
            commit(target, scratch, Instant::now());
            Ok(())
        }
        Err(e) => {
            target.record_failure();
            Err(e)
        }
    }
}

fn demux_frame(frame: &[u8], target: &Telemetry) -> Result<Telemetry> {
    if frame.len() < 3 {
        return Err(Error::Communication(format!(
            "stream frame of {} bytes",
            frame.len()
        )));
    }

    let sum = checksum(frame);
    if sum != 0 {
        let actual = frame[frame.len() - 1];
        let expected = actual.wrapping_sub(sum);
        log::warn!(
            "Stream checksum mismatch: expected {:#04x}, got {:#04x}",
            expected,
            actual
        );
        return Err(Error::Checksum { expected, actual });
    }

    if frame[0] != STREAM_HEADER {
        return Err(Error::Communication(format!(
            "stream header {:#04x}",
            frame[0]
        )));
    }
    let payload_len = frame[1] as usize;
    if payload_len != frame.len() - 3 {
        return Err(Error::Communication(format!(
            "stream length byte {} for {} payload bytes",
            payload_len,
            frame.len() - 3
        )));
    }

    let payload = &frame[2..2 + payload_len];
    let mut scratch = target.clone();
    let mut offset = 0;
    while offset < payload.len() {
        let id = payload[offset];
        offset += 1;
        offset += decode_packet(id, &payload[offset..], &mut scratch)?;
    }
    Ok(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ChargingState, OiMode};

    #[test]
    fn test_table_is_dense() {
        for id in FIRST_PACKET_ID..=LAST_PACKET_ID {
            let desc = descriptor(id).unwrap();
            assert_eq!(desc.id, id);
            assert!(desc.width == 1 || desc.width == 2);
        }
        assert!(descriptor(6).is_none());
        assert!(descriptor(59).is_none());
    }

    #[test]
    fn test_group_sizes() {
        let expected = [
            (0u8, 26usize),
            (1, 10),
            (2, 6),
            (3, 10),
            (4, 14),
            (5, 12),
            (6, 52),
            (100, 80),
            (101, 28),
            (106, 12),
            (107, 9),
        ];
        for (group, size) in expected {
            assert_eq!(payload_width(group), Some(size), "group {}", group);
        }
        assert_eq!(payload_width(99), None);
    }

    #[test]
    fn test_voltage_and_temperature_frame() {
        let frame = encode_frame(&[(22, &[0x3E, 0x80]), (24, &[0xFE])]);
        assert_eq!(checksum(&frame), 0);

        let mut t = Telemetry::default();
        decode_frame(&frame, &mut t).unwrap();
        assert_eq!(t.voltage, 16000);
        assert_eq!(t.temperature, -2);
        assert!(t.last_successful_refresh.is_some());
        assert_eq!(t.failed_attempts, 0);
    }

    #[test]
    fn test_any_single_bit_flip_is_rejected() {
        let frame = encode_frame(&[(22, &[0x3E, 0x80]), (24, &[0xFE]), (35, &[2])]);
        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;

                let mut t = Telemetry::default();
                let before = t.clone();
                let err = decode_frame(&corrupted, &mut t).unwrap_err();
                assert!(matches!(err, Error::Checksum { .. }));
                assert_eq!(t.voltage, before.voltage);
                assert_eq!(t.mode, before.mode);
                assert_eq!(t.failed_attempts, 1);
            }
        }
    }

    #[test]
    fn test_unknown_id_mid_frame() {
        let frame = encode_frame(&[(22, &[0x3E, 0x80]), (99, &[0x00])]);
        let mut t = Telemetry::default();
        let err = decode_frame(&frame, &mut t).unwrap_err();
        assert!(matches!(err, Error::UnknownPacket(99)));
        assert_eq!(err.code(), crate::error::ResultCode::CommunicationError);
        // first record must not leak into the aggregate
        assert_eq!(t.voltage, 0);
    }

    #[test]
    fn test_bad_length_byte() {
        let mut frame = encode_frame(&[(35, &[2])]);
        // keep the sum at zero while lying about the length
        frame[1] += 1;
        let last = frame.len() - 1;
        frame[last] = frame[last].wrapping_sub(1);
        let mut t = Telemetry::default();
        assert!(matches!(
            decode_frame(&frame, &mut t),
            Err(Error::Communication(_))
        ));
    }

    #[test]
    fn test_query_response() {
        let mut t = Telemetry::default();
        decode_query(&[21, 35, 23], &[2, 3, 0xFF, 0x38], &mut t).unwrap();
        assert_eq!(t.charging_state, ChargingState::FullCharging);
        assert_eq!(t.mode, OiMode::Full);
        assert_eq!(t.current, -200);
    }

    #[test]
    fn test_truncated_query_is_timeout() {
        let mut t = Telemetry::default();
        t.voltage = 15000;
        assert!(matches!(
            decode_query(&[22, 24], &[0x3E, 0x80], &mut t),
            Err(Error::Timeout)
        ));
        assert_eq!(t.voltage, 15000);
        assert_eq!(t.failed_attempts, 1);
    }

    #[test]
    fn test_group_query() {
        // group 3: charging state, voltage, current, temperature, charge, capacity
        let data = [1, 0x3A, 0x98, 0xFC, 0x18, 25, 0x0B, 0xB8, 0x0B, 0xB8];
        let mut t = Telemetry::default();
        decode_query(&[3], &data, &mut t).unwrap();
        assert_eq!(t.charging_state, ChargingState::ReconditioningCharging);
        assert_eq!(t.voltage, 15000);
        assert_eq!(t.current, -1000);
        assert_eq!(t.temperature, 25);
        assert_eq!(t.battery_charge, 3000);
        assert_eq!(t.battery_capacity, 3000);
        assert_eq!(t.battery_percentage(), 100);
    }

    #[test]
    fn test_stream_frame_len() {
        assert_eq!(stream_frame_len(&[22, 24]).unwrap(), 3 + 2 + 2 + 1);
        assert!(matches!(
            stream_frame_len(&[22, 250]),
            Err(Error::UnknownPacket(250))
        ));
    }
}
