//! Value types shared by the encoder, decoder and controller

use crate::error::{Error, Result};
use crate::oi::constants::{
    LED_CHECK_ROBOT, LED_DEBRIS, LED_DOCK, LED_SPOT, MAX_NOTE, MAX_SONGS, MAX_SONG_NOTES,
    MIN_NOTE, MOTOR_MAIN_BRUSH, MOTOR_MAIN_BRUSH_OPPOSITE, MOTOR_SIDE_BRUSH,
    MOTOR_SIDE_BRUSH_OPPOSITE, MOTOR_VACUUM,
};

// ============================================================================
// Device state enums
// ============================================================================

/// Open Interface mode as reported by packet 35
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum OiMode {
    #[default]
    Off = 0,
    Passive = 1,
    Safe = 2,
    Full = 3,
}

impl OiMode {
    /// Decode a raw packet 35 value; out-of-range values map to `Off`
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => OiMode::Passive,
            2 => OiMode::Safe,
            3 => OiMode::Full,
            _ => OiMode::Off,
        }
    }
}

/// Battery charging state as reported by packet 21
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChargingState {
    #[default]
    NotCharging = 0,
    ReconditioningCharging = 1,
    FullCharging = 2,
    TrickleCharging = 3,
    Waiting = 4,
    ChargingFault = 5,
}

impl ChargingState {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ChargingState::ReconditioningCharging,
            2 => ChargingState::FullCharging,
            3 => ChargingState::TrickleCharging,
            4 => ChargingState::Waiting,
            5 => ChargingState::ChargingFault,
            _ => ChargingState::NotCharging,
        }
    }

    pub fn is_charging(self) -> bool {
        matches!(
            self,
            ChargingState::ReconditioningCharging
                | ChargingState::FullCharging
                | ChargingState::TrickleCharging
        )
    }
}

// ============================================================================
// Session statistics
// ============================================================================

/// Communication counters, monotonic until explicitly reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub commands_sent: u64,
    pub error_count: u64,
}

// ============================================================================
// Actuator flags
// ============================================================================

/// Cleaning motor selection for the MOTORS command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorFlags {
    pub side_brush: bool,
    pub vacuum: bool,
    pub main_brush: bool,
    /// Run the side brush clockwise
    pub side_brush_opposite: bool,
    /// Run the main brush outward
    pub main_brush_opposite: bool,
}

impl MotorFlags {
    pub const ALL: MotorFlags = MotorFlags {
        side_brush: true,
        vacuum: true,
        main_brush: true,
        side_brush_opposite: false,
        main_brush_opposite: false,
    };

    pub fn bits(self) -> u8 {
        let mut bits = 0;
        if self.side_brush {
            bits |= MOTOR_SIDE_BRUSH;
        }
        if self.vacuum {
            bits |= MOTOR_VACUUM;
        }
        if self.main_brush {
            bits |= MOTOR_MAIN_BRUSH;
        }
        if self.side_brush_opposite {
            bits |= MOTOR_SIDE_BRUSH_OPPOSITE;
        }
        if self.main_brush_opposite {
            bits |= MOTOR_MAIN_BRUSH_OPPOSITE;
        }
        bits
    }
}

/// Indicator LEDs for the LEDS command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedFlags {
    pub debris: bool,
    pub spot: bool,
    pub dock: bool,
    pub check_robot: bool,
}

impl LedFlags {
    pub fn bits(self) -> u8 {
        let mut bits = 0;
        if self.debris {
            bits |= LED_DEBRIS;
        }
        if self.spot {
            bits |= LED_SPOT;
        }
        if self.dock {
            bits |= LED_DOCK;
        }
        if self.check_robot {
            bits |= LED_CHECK_ROBOT;
        }
        bits
    }
}

// ============================================================================
// Songs
// ============================================================================

/// One note: MIDI number 31..=127, duration in 1/64 s
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub number: u8,
    pub duration: u8,
}

impl Note {
    pub const fn new(number: u8, duration: u8) -> Self {
        Self { number, duration }
    }

    pub fn is_valid(&self) -> bool {
        (MIN_NOTE..=MAX_NOTE).contains(&self.number) && self.duration > 0
    }
}

impl Default for Note {
    fn default() -> Self {
        // middle C, half a second
        Self::new(60, 32)
    }
}

/// Song stored in one of the device's five slots
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Song {
    pub number: u8,
    notes: Vec<Note>,
}

impl Song {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            notes: Vec::with_capacity(MAX_SONG_NOTES),
        }
    }

    /// Build a song from notes, validating slot, length and every note
    pub fn with_notes(number: u8, notes: &[Note]) -> Result<Self> {
        let mut song = Self::new(number);
        for &note in notes {
            song.add_note(note)?;
        }
        song.validate()?;
        Ok(song)
    }

    pub fn add_note(&mut self, note: Note) -> Result<()> {
        if self.notes.len() >= MAX_SONG_NOTES {
            return Err(Error::InvalidParameter(format!(
                "song holds at most {} notes",
                MAX_SONG_NOTES
            )));
        }
        if !note.is_valid() {
            return Err(Error::InvalidParameter(format!(
                "note {} / duration {} out of range",
                note.number, note.duration
            )));
        }
        self.notes.push(note);
        Ok(())
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn validate(&self) -> Result<()> {
        if self.number > MAX_SONGS {
            return Err(Error::InvalidParameter(format!(
                "song number {} (max {})",
                self.number, MAX_SONGS
            )));
        }
        if self.notes.is_empty() || self.notes.len() > MAX_SONG_NOTES {
            return Err(Error::InvalidParameter(format!(
                "song length {} (1-{})",
                self.notes.len(),
                MAX_SONG_NOTES
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// Weekly cleaning schedule; day 0 is Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schedule {
    enabled_days: u8,
    times: [(u8, u8); 7],
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `day` at `hour:minute`
    pub fn set_day(&mut self, day: u8, hour: u8, minute: u8) -> Result<()> {
        validate_day_time(day, hour, minute)?;
        self.times[day as usize] = (hour, minute);
        self.enabled_days |= 1 << day;
        Ok(())
    }

    pub fn disable_day(&mut self, day: u8) {
        if day <= 6 {
            self.enabled_days &= !(1 << day);
        }
    }

    pub fn is_day_enabled(&self, day: u8) -> bool {
        day <= 6 && self.enabled_days & (1 << day) != 0
    }

    pub fn enabled_days(&self) -> u8 {
        self.enabled_days
    }

    pub fn time(&self, day: u8) -> Option<(u8, u8)> {
        self.times.get(day as usize).copied()
    }
}

/// Day 0..=6, hour 0..=23, minute 0..=59
pub fn validate_day_time(day: u8, hour: u8, minute: u8) -> Result<()> {
    if day > 6 || hour >= 24 || minute >= 60 {
        return Err(Error::InvalidParameter(format!(
            "day/time {} {:02}:{:02}",
            day, hour, minute
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_raw() {
        assert_eq!(OiMode::from_raw(2), OiMode::Safe);
        assert_eq!(OiMode::from_raw(9), OiMode::Off);
        assert_eq!(ChargingState::from_raw(5), ChargingState::ChargingFault);
        assert!(ChargingState::TrickleCharging.is_charging());
        assert!(!ChargingState::Waiting.is_charging());
    }

    #[test]
    fn test_flag_bits() {
        assert_eq!(MotorFlags::ALL.bits(), 0x07);
        let flags = MotorFlags {
            main_brush: true,
            main_brush_opposite: true,
            ..Default::default()
        };
        assert_eq!(flags.bits(), 0x14);
        let leds = LedFlags {
            check_robot: true,
            debris: true,
            ..Default::default()
        };
        assert_eq!(leds.bits(), 0x09);
    }

    #[test]
    fn test_song_validation() {
        assert!(Song::with_notes(0, &[Note::new(60, 32)]).is_ok());
        assert!(Song::with_notes(5, &[Note::new(60, 32)]).is_err());
        assert!(Song::with_notes(0, &[]).is_err());
        assert!(Song::with_notes(0, &[Note::new(30, 32)]).is_err());
        assert!(Song::with_notes(0, &[Note::new(60, 0)]).is_err());

        let mut song = Song::new(1);
        for _ in 0..16 {
            song.add_note(Note::default()).unwrap();
        }
        assert!(song.add_note(Note::default()).is_err());
    }

    #[test]
    fn test_schedule() {
        let mut schedule = Schedule::new();
        schedule.set_day(1, 9, 30).unwrap();
        schedule.set_day(6, 23, 59).unwrap();
        assert!(schedule.is_day_enabled(1));
        assert!(!schedule.is_day_enabled(0));
        assert_eq!(schedule.enabled_days(), 0b0100_0010);
        assert_eq!(schedule.time(1), Some((9, 30)));

        assert!(schedule.set_day(7, 0, 0).is_err());
        assert!(schedule.set_day(0, 24, 0).is_err());
        assert!(schedule.set_day(0, 0, 60).is_err());

        schedule.disable_day(1);
        assert!(!schedule.is_day_enabled(1));
    }
}
