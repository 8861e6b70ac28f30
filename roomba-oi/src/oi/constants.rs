//! Constants for the Roomba Open Interface (500/600 series)

// Getting started
pub const CMD_START: u8 = 128; // Enter Passive mode
pub const CMD_BAUD: u8 = 129; // Change UART rate (1 byte baud code)
pub const CMD_SAFE: u8 = 131;
pub const CMD_FULL: u8 = 132;

// Cleaning
pub const CMD_POWER: u8 = 133; // Power down, OI drops to Passive
pub const CMD_SPOT: u8 = 134;
pub const CMD_CLEAN: u8 = 135;
pub const CMD_MAX_CLEAN: u8 = 136;
pub const CMD_SEEK_DOCK: u8 = 143;
pub const CMD_SCHEDULE: u8 = 167; // days bitmask + 7 x (hour, minute)
pub const CMD_SET_DAY_TIME: u8 = 168; // day, hour, minute

// Actuators
pub const CMD_DRIVE: u8 = 137; // velocity(i16 BE) radius(i16 BE)
pub const CMD_MOTORS: u8 = 138; // motor bitmask
pub const CMD_LEDS: u8 = 139; // led bits, power color, power intensity
pub const CMD_SONG: u8 = 140; // song number, length, (note, duration)*
pub const CMD_PLAY: u8 = 141; // song number
pub const CMD_PWM_MOTORS: u8 = 144; // main(i8) side(i8) vacuum(u8)
pub const CMD_DRIVE_DIRECT: u8 = 145; // right(i16 BE) left(i16 BE) mm/s
pub const CMD_DRIVE_PWM: u8 = 146; // right(i16 BE) left(i16 BE) PWM
pub const CMD_SCHEDULING_LEDS: u8 = 162; // weekday bits, schedule bits
pub const CMD_DIGIT_LEDS_RAW: u8 = 163; // 4 segment bytes

// Input
pub const CMD_SENSORS: u8 = 142; // single packet id
pub const CMD_QUERY_LIST: u8 = 149; // count, ids
pub const CMD_STREAM: u8 = 148; // count, ids
pub const CMD_PAUSE_RESUME_STREAM: u8 = 150; // 0 = pause, 1 = resume

// Stream frame
pub const STREAM_HEADER: u8 = 0x13; // 19
/// header(1) + length(1) + checksum(1)
pub const STREAM_FRAME_OVERHEAD: usize = 3;
/// Largest (id, data) payload the device emits in one 15 ms slot at 115200 baud
pub const MAX_STREAM_PAYLOAD: usize = 100;
/// Most identifiers accepted in one stream or query-list request
pub const MAX_SENSOR_LIST: usize = 60;
/// Ring buffer capacity for reassembly (two full frames)
pub const STREAM_BUFFER_SIZE: usize = 2 * (MAX_STREAM_PAYLOAD + STREAM_FRAME_OVERHEAD);
/// Bytes one poll may work through before the rest is dropped as backlog
pub const MAX_POLL_BACKLOG: usize = 4 * STREAM_BUFFER_SIZE;

// Drive limits
pub const MAX_VELOCITY: i16 = 500; // mm/s
pub const MAX_RADIUS: i16 = 2000; // mm
pub const MAX_PWM: i16 = 255;
pub const RADIUS_STRAIGHT: u16 = 0x8000;
pub const RADIUS_STRAIGHT_ALT: u16 = 0x7FFF;
pub const RADIUS_TURN_CW: i16 = -1;
pub const RADIUS_TURN_CCW: i16 = 1;

// Motor bits (CMD_MOTORS)
pub const MOTOR_SIDE_BRUSH: u8 = 0x01;
pub const MOTOR_VACUUM: u8 = 0x02;
pub const MOTOR_MAIN_BRUSH: u8 = 0x04;
pub const MOTOR_SIDE_BRUSH_OPPOSITE: u8 = 0x08;
pub const MOTOR_MAIN_BRUSH_OPPOSITE: u8 = 0x10;

// PWM motor limits (CMD_PWM_MOTORS)
pub const MAX_BRUSH_PWM: i8 = 127;
pub const MAX_VACUUM_PWM: u8 = 127;

// LED bits (CMD_LEDS)
pub const LED_DEBRIS: u8 = 0x01;
pub const LED_SPOT: u8 = 0x02;
pub const LED_DOCK: u8 = 0x04;
pub const LED_CHECK_ROBOT: u8 = 0x08;

// Songs
pub const MAX_SONGS: u8 = 4; // slots 0..=4
pub const MAX_SONG_NOTES: usize = 16;
pub const MIN_NOTE: u8 = 31;
pub const MAX_NOTE: u8 = 127;
pub const REST_NOTE: u8 = MIN_NOTE; // lowest note, near silent
pub const BEEP_NOTE: u8 = 72; // C5
pub const BEEP_DURATION: u8 = 16; // 1/4 s
pub const BEEP_SONG: u8 = MAX_SONGS; // reserved slot for beeps
pub const MAX_BEEPS: u8 = 8;

// Timing (ms)
pub const POWER_ON_DELAY_MS: u64 = 2000;
pub const COMMAND_DELAY_MS: u64 = 150;
pub const RESPONSE_TIMEOUT_MS: u64 = 100;
pub const QUERY_SETTLE_MS: u64 = 15;
pub const REFRESH_DELAY_MS: u64 = 40;
pub const BAUD_SWITCH_DELAY_MS: u64 = 100; // OI listens at the new rate after this

// Serial
pub const DEFAULT_BAUD: u32 = 19200;

/// Supported UART rates, indexed by their BAUD command code
pub const BAUD_RATES: [u32; 12] = [
    300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 28800, 38400, 57600, 115200,
];

/// BAUD command code for a rate, if supported
pub fn baud_code(rate: u32) -> Option<u8> {
    BAUD_RATES
        .iter()
        .position(|&r| r == rate)
        .map(|code| code as u8)
}

// Liveness probe used by initialize (OI mode, 1 byte)
pub const PACKET_OI_MODE: u8 = 35;
