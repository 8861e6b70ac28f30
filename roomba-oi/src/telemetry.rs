//! Telemetry aggregate
//!
//! One record holding every decodable sensor field. The decoder fills a copy
//! and swaps it in only after a whole response validated, so readers never
//! see a mix of old and new values from a single frame.

use crate::core::types::{ChargingState, OiMode};
use std::time::{Duration, Instant};

/// Every sensor field the Open Interface can report, plus refresh bookkeeping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    /// Time of the last fully validated update
    pub last_successful_refresh: Option<Instant>,
    /// Failed refreshes since the last success
    pub failed_attempts: u32,

    // Bumps and wheel drops (7)
    pub bump_right: bool,
    pub bump_left: bool,
    pub wheel_drop_right: bool,
    pub wheel_drop_left: bool,

    // Wall and cliffs (8-13)
    pub wall: bool,
    pub cliff_left: bool,
    pub cliff_front_left: bool,
    pub cliff_front_right: bool,
    pub cliff_right: bool,
    pub virtual_wall: bool,

    // Overcurrents (14)
    pub side_brush_overcurrent: bool,
    pub vacuum_overcurrent: bool,
    pub main_brush_overcurrent: bool,
    pub wheel_right_overcurrent: bool,
    pub wheel_left_overcurrent: bool,

    pub dirt_detect: u8,
    pub ir_omni: u8,
    pub ir_left: u8,
    pub ir_right: u8,

    // Buttons (18)
    pub clean_button: bool,
    pub spot_button: bool,
    pub dock_button: bool,
    pub minute_button: bool,
    pub hour_button: bool,
    pub day_button: bool,
    pub schedule_button: bool,
    pub clock_button: bool,

    /// mm travelled since the previous request
    pub distance: i16,
    /// Degrees turned since the previous request
    pub angle: i16,

    // Battery (21-26)
    pub charging_state: ChargingState,
    /// mV
    pub voltage: u16,
    /// mA, negative when discharging
    pub current: i16,
    /// °C
    pub temperature: i8,
    /// mAh
    pub battery_charge: u16,
    /// mAh
    pub battery_capacity: u16,

    // Signal strengths (27-31, 46-51)
    pub wall_signal: u16,
    pub cliff_left_signal: u16,
    pub cliff_front_left_signal: u16,
    pub cliff_front_right_signal: u16,
    pub cliff_right_signal: u16,
    pub light_bump_left_signal: u16,
    pub light_bump_front_left_signal: u16,
    pub light_bump_center_left_signal: u16,
    pub light_bump_center_right_signal: u16,
    pub light_bump_front_right_signal: u16,
    pub light_bump_right_signal: u16,

    // Charging sources (34)
    pub internal_charger_available: bool,
    pub home_base_charger_available: bool,

    // OI state (35-38)
    pub mode: OiMode,
    pub song_number: u8,
    pub song_playing: bool,
    pub stream_packet_count: u8,

    // Requested motion (39-42), mm/s and mm
    pub velocity: i16,
    pub radius: i16,
    pub right_velocity: i16,
    pub left_velocity: i16,

    pub left_encoder_counts: u16,
    pub right_encoder_counts: u16,

    // Light bumper (45)
    pub light_bumper_left: bool,
    pub light_bumper_front_left: bool,
    pub light_bumper_center_left: bool,
    pub light_bumper_center_right: bool,
    pub light_bumper_front_right: bool,
    pub light_bumper_right: bool,

    // Motor currents (54-57), mA
    pub left_motor_current: i16,
    pub right_motor_current: i16,
    pub main_brush_motor_current: i16,
    pub side_brush_motor_current: i16,

    // Stasis (58)
    pub stasis_toggling: bool,
    pub stasis_disabled: bool,
}

/// Battery snapshot (packets 21-26)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryInfo {
    pub charging_state: ChargingState,
    pub voltage: u16,
    pub current: i16,
    pub temperature: i8,
    pub charge: u16,
    pub capacity: u16,
    pub percentage: u8,
}

/// Cliff sensors (packets 9-12)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CliffSensors {
    pub left: bool,
    pub front_left: bool,
    pub front_right: bool,
    pub right: bool,
}

impl CliffSensors {
    pub fn any(&self) -> bool {
        self.left || self.front_left || self.front_right || self.right
    }
}

/// Bumpers and wheel drops (packet 7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BumpsAndDrops {
    pub bump_left: bool,
    pub bump_right: bool,
    pub wheel_drop_left: bool,
    pub wheel_drop_right: bool,
}

#[inline]
fn bit(value: i32, n: u8) -> bool {
    value & (1 << n) != 0
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one decoded packet value (already sign-extended)
    ///
    /// Values are truncated to the field width; unused packets are ignored.
    pub(crate) fn apply(&mut self, id: u8, value: i32) {
        match id {
            7 => {
                self.bump_right = bit(value, 0);
                self.bump_left = bit(value, 1);
                self.wheel_drop_right = bit(value, 2);
                self.wheel_drop_left = bit(value, 3);
            }
            8 => self.wall = value != 0,
            9 => self.cliff_left = value != 0,
            10 => self.cliff_front_left = value != 0,
            11 => self.cliff_front_right = value != 0,
            12 => self.cliff_right = value != 0,
            13 => self.virtual_wall = value != 0,
            14 => {
                self.side_brush_overcurrent = bit(value, 0);
                self.vacuum_overcurrent = bit(value, 1);
                self.main_brush_overcurrent = bit(value, 2);
                self.wheel_right_overcurrent = bit(value, 3);
                self.wheel_left_overcurrent = bit(value, 4);
            }
            15 => self.dirt_detect = value as u8,
            17 => self.ir_omni = value as u8,
            18 => {
                self.clean_button = bit(value, 0);
                self.spot_button = bit(value, 1);
                self.dock_button = bit(value, 2);
                self.minute_button = bit(value, 3);
                self.hour_button = bit(value, 4);
                self.day_button = bit(value, 5);
                self.schedule_button = bit(value, 6);
                self.clock_button = bit(value, 7);
            }
            19 => self.distance = value as i16,
            20 => self.angle = value as i16,
            21 => self.charging_state = ChargingState::from_raw(value as u8),
            22 => self.voltage = value as u16,
            23 => self.current = value as i16,
            24 => self.temperature = value as i8,
            25 => self.battery_charge = value as u16,
            26 => self.battery_capacity = value as u16,
            27 => self.wall_signal = value as u16,
            28 => self.cliff_left_signal = value as u16,
            29 => self.cliff_front_left_signal = value as u16,
            30 => self.cliff_front_right_signal = value as u16,
            31 => self.cliff_right_signal = value as u16,
            34 => {
                self.internal_charger_available = bit(value, 0);
                self.home_base_charger_available = bit(value, 1);
            }
            35 => self.mode = OiMode::from_raw(value as u8),
            36 => self.song_number = value as u8,
            37 => self.song_playing = value != 0,
            38 => self.stream_packet_count = value as u8,
            39 => self.velocity = value as i16,
            40 => self.radius = value as i16,
            41 => self.right_velocity = value as i16,
            42 => self.left_velocity = value as i16,
            43 => self.left_encoder_counts = value as u16,
            44 => self.right_encoder_counts = value as u16,
            45 => {
                self.light_bumper_left = bit(value, 0);
                self.light_bumper_front_left = bit(value, 1);
                self.light_bumper_center_left = bit(value, 2);
                self.light_bumper_center_right = bit(value, 3);
                self.light_bumper_front_right = bit(value, 4);
                self.light_bumper_right = bit(value, 5);
            }
            46 => self.light_bump_left_signal = value as u16,
            47 => self.light_bump_front_left_signal = value as u16,
            48 => self.light_bump_center_left_signal = value as u16,
            49 => self.light_bump_center_right_signal = value as u16,
            50 => self.light_bump_front_right_signal = value as u16,
            51 => self.light_bump_right_signal = value as u16,
            52 => self.ir_left = value as u8,
            53 => self.ir_right = value as u8,
            54 => self.left_motor_current = value as i16,
            55 => self.right_motor_current = value as i16,
            56 => self.main_brush_motor_current = value as i16,
            57 => self.side_brush_motor_current = value as i16,
            58 => {
                self.stasis_toggling = bit(value, 0);
                self.stasis_disabled = bit(value, 1);
            }
            // 16, 32, 33 are unused
            _ => {}
        }
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
    }

    /// Clear every field and the refresh bookkeeping
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn battery(&self) -> BatteryInfo {
        BatteryInfo {
            charging_state: self.charging_state,
            voltage: self.voltage,
            current: self.current,
            temperature: self.temperature,
            charge: self.battery_charge,
            capacity: self.battery_capacity,
            percentage: self.battery_percentage(),
        }
    }

    pub fn cliffs(&self) -> CliffSensors {
        CliffSensors {
            left: self.cliff_left,
            front_left: self.cliff_front_left,
            front_right: self.cliff_front_right,
            right: self.cliff_right,
        }
    }

    pub fn bumps_and_drops(&self) -> BumpsAndDrops {
        BumpsAndDrops {
            bump_left: self.bump_left,
            bump_right: self.bump_right,
            wheel_drop_left: self.wheel_drop_left,
            wheel_drop_right: self.wheel_drop_right,
        }
    }

    // ========================================================================
    // Freshness
    // ========================================================================

    /// Time since the last successful refresh, `None` if never refreshed
    pub fn age(&self) -> Option<Duration> {
        self.age_at(Instant::now())
    }

    pub fn age_at(&self, now: Instant) -> Option<Duration> {
        self.last_successful_refresh
            .map(|t| now.saturating_duration_since(t))
    }

    /// True iff `now - last_successful_refresh <= max_age`
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.is_fresh_at(Instant::now(), max_age)
    }

    pub fn is_fresh_at(&self, now: Instant, max_age: Duration) -> bool {
        self.age_at(now).is_some_and(|age| age <= max_age)
    }

    // ========================================================================
    // Hazard summaries
    // ========================================================================

    pub fn has_cliff_detection(&self) -> bool {
        self.cliff_left || self.cliff_front_left || self.cliff_front_right || self.cliff_right
    }

    pub fn has_bump_detection(&self) -> bool {
        self.bump_left || self.bump_right
    }

    pub fn has_wheel_drop(&self) -> bool {
        self.wheel_drop_left || self.wheel_drop_right
    }

    pub fn has_overcurrent(&self) -> bool {
        self.wheel_left_overcurrent
            || self.wheel_right_overcurrent
            || self.main_brush_overcurrent
            || self.side_brush_overcurrent
            || self.vacuum_overcurrent
    }

    /// `round(100 * charge / capacity)` clamped to 0..=100, 0 when capacity is unknown
    pub fn battery_percentage(&self) -> u8 {
        if self.battery_capacity == 0 {
            return 0;
        }
        let pct = (100.0 * self.battery_charge as f64 / self.battery_capacity as f64).round();
        pct.clamp(0.0, 100.0) as u8
    }
}
