//! Roomba controller
//!
//! [`Roomba`] owns the transport (through a [`Session`]), the stream manager
//! and the telemetry aggregate, and exposes the full Open Interface operation
//! set. Every public operation returns `Result`; failures are also recorded
//! in the session (`last_error`, `error_count`).
//!
//! ```no_run
//! use roomba_oi::transport::SerialTransport;
//! use roomba_oi::{presets, Roomba};
//!
//! let mut roomba = Roomba::new(SerialTransport::new("/dev/ttyUSB0"));
//! roomba.initialize(115200)?;
//! roomba.start_stream(presets::SAFETY.ids)?;
//! loop {
//!     if roomba.poll().is_ok() && roomba.telemetry().has_cliff_detection() {
//!         roomba.stop()?;
//!     }
//! }
//! # Ok::<(), roomba_oi::Error>(())
//! ```

use crate::config::{AppConfig, RobotConfig, TimingConfig};
use crate::core::session::Session;
use crate::core::types::{
    ChargingState, LedFlags, MotorFlags, Note, OiMode, Schedule, Song, Statistics,
};
use crate::error::{Error, Result, ResultCode};
use crate::oi::constants::*;
use crate::oi::packet::{MAX_FRAME_SIZE, TxPacket};
use crate::oi::presets::{self, Preset};
use crate::oi::sensors;
use crate::oi::stream::{StreamManager, StreamState};
use crate::telemetry::{BatteryInfo, BumpsAndDrops, CliffSensors, Telemetry};
use crate::transport::Transport;
use std::thread;
use std::time::{Duration, Instant};

pub struct Roomba<T: Transport> {
    session: Session<T>,
    stream: StreamManager,
    telemetry: Telemetry,
    timing: TimingConfig,
    robot: RobotConfig,
    /// Last indicator LEDs sent, reused by `set_power_led`
    leds: LedFlags,
    pkt: TxPacket,
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

impl<T: Transport> Roomba<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, TimingConfig::default(), RobotConfig::default())
    }

    pub fn with_config(transport: T, timing: TimingConfig, robot: RobotConfig) -> Self {
        Self {
            session: Session::new(transport),
            stream: StreamManager::new(),
            telemetry: Telemetry::default(),
            timing,
            robot,
            leds: LedFlags::default(),
            pkt: TxPacket::new(),
        }
    }

    pub fn from_app_config(transport: T, config: &AppConfig) -> Self {
        Self::with_config(transport, config.timing.clone(), config.robot.clone())
    }

    /// Record the outcome of a public operation
    fn tracked<R>(&mut self, result: Result<R>) -> Result<R> {
        self.session.record(&result);
        result
    }

    fn command<F>(&mut self, encode: F) -> Result<()>
    where
        F: FnOnce(&mut TxPacket) -> Result<()>,
    {
        let result = self.try_command(encode);
        self.tracked(result)
    }

    fn try_command<F>(&mut self, encode: F) -> Result<()>
    where
        F: FnOnce(&mut TxPacket) -> Result<()>,
    {
        self.session.require_initialized()?;
        encode(&mut self.pkt)?;
        self.session.send(&self.pkt)
    }

    fn mode_command<F>(&mut self, encode: F, mode: OiMode) -> Result<()>
    where
        F: FnOnce(&mut TxPacket),
    {
        self.command(|p| {
            encode(p);
            Ok(())
        })?;
        self.session.set_mode(mode);
        Ok(())
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Open the transport, wake the OI and confirm the robot answers
    ///
    /// Sequence: open at `baud_rate`, settle delay, START, SAFE (or FULL when
    /// safety is disabled), drop stale input, then query the OI mode with a
    /// bounded deadline. On failure nothing is marked initialized and the
    /// telemetry aggregate is untouched. Calling again once initialized is a
    /// no-op.
    pub fn initialize(&mut self, baud_rate: u32) -> Result<()> {
        if self.session.is_initialized() {
            log::debug!("Already initialized");
            return Ok(());
        }
        let result = self.try_initialize(baud_rate);
        if let Err(e) = &result {
            log::error!("Initialization failed: {}", e);
            if let Err(close_err) = self.session.transport_mut().close() {
                log::warn!("Closing transport after failed init: {}", close_err);
            }
        }
        self.tracked(result)
    }

    fn try_initialize(&mut self, baud_rate: u32) -> Result<()> {
        if baud_code(baud_rate).is_none() {
            return Err(Error::InvalidParameter(format!(
                "unsupported baud rate {}",
                baud_rate
            )));
        }
        self.session.transport_mut().open(baud_rate)?;
        log::info!("Waiting {:?} for the OI to settle", self.timing.settle_delay());
        pause(self.timing.settle_delay());

        self.pkt.set_start();
        self.session.send(&self.pkt)?;
        pause(self.timing.command_delay());

        let mode = if self.robot.safety_enabled {
            self.pkt.set_safe();
            OiMode::Safe
        } else {
            self.pkt.set_full();
            OiMode::Full
        };
        self.session.send(&self.pkt)?;
        pause(self.timing.command_delay());

        let stale = self.session.drain_input()?;
        if stale > 0 {
            log::debug!("Dropped {} stale bytes before liveness check", stale);
        }

        // liveness: the robot must answer a one-byte mode query
        let mut probe = self.telemetry.clone();
        self.exchange(&[PACKET_OI_MODE], &mut probe, |p| p.set_sensors(PACKET_OI_MODE))?;
        self.telemetry = probe;

        self.session.set_initialized(baud_rate, mode);
        log::info!(
            "Roomba initialized at {} baud, requested {:?}, device reports {:?}",
            baud_rate,
            mode,
            self.telemetry.mode
        );
        Ok(())
    }

    /// Stop any stream and the wheels, then release the transport
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.session.is_initialized() {
            return Ok(());
        }
        let mut result = Ok(());
        if self.stream.is_active() {
            result = self.stream.reset(&mut self.session);
        }
        let stopped = self.try_command(|p| p.set_drive(0, 0));
        result = result.and(stopped);
        if let Err(e) = self.session.transport_mut().close() {
            result = result.and(Err(e));
        }
        self.session.clear_initialized();
        log::info!("Roomba session closed");
        self.tracked(result)
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    /// Mode last requested by software; see `telemetry().mode` for the device's view
    pub fn requested_mode(&self) -> OiMode {
        self.session.mode()
    }

    pub fn baud_rate(&self) -> u32 {
        self.session.baud_rate()
    }

    pub fn statistics(&self) -> Statistics {
        self.session.statistics()
    }

    pub fn reset_statistics(&mut self) {
        self.session.reset_statistics();
    }

    pub fn last_error(&self) -> ResultCode {
        self.session.last_error()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn robot_config(&self) -> &RobotConfig {
        &self.robot
    }

    pub fn transport(&self) -> &T {
        self.session.transport()
    }

    /// Give up the controller and hand back the transport as-is
    pub fn into_transport(self) -> T {
        self.session.into_transport()
    }

    /// Write an arbitrary opcode and arguments
    pub fn send_command(&mut self, opcode: u8, args: &[u8]) -> Result<()> {
        if 1 + args.len() > MAX_FRAME_SIZE {
            let err = Err(Error::BufferOverflow(format!(
                "command frame of {} bytes (max {})",
                1 + args.len(),
                MAX_FRAME_SIZE
            )));
            return self.tracked(err);
        }
        self.command(|p| p.set_raw(opcode, args))
    }

    // ========================================================================
    // Modes
    // ========================================================================

    pub fn start(&mut self) -> Result<()> {
        self.mode_command(TxPacket::set_start, OiMode::Passive)
    }

    pub fn safe(&mut self) -> Result<()> {
        self.mode_command(TxPacket::set_safe, OiMode::Safe)
    }

    pub fn full(&mut self) -> Result<()> {
        self.mode_command(TxPacket::set_full, OiMode::Full)
    }

    pub fn power_down(&mut self) -> Result<()> {
        self.mode_command(TxPacket::set_power_down, OiMode::Passive)
    }

    pub fn clean(&mut self) -> Result<()> {
        self.mode_command(TxPacket::set_clean, OiMode::Passive)
    }

    pub fn max_clean(&mut self) -> Result<()> {
        self.mode_command(TxPacket::set_max_clean, OiMode::Passive)
    }

    pub fn spot(&mut self) -> Result<()> {
        self.mode_command(TxPacket::set_spot, OiMode::Passive)
    }

    pub fn seek_dock(&mut self) -> Result<()> {
        self.mode_command(TxPacket::set_seek_dock, OiMode::Passive)
    }

    /// Switch the robot's UART rate, then re-open the transport to match
    pub fn change_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        self.command(|p| p.set_baud(baud_rate))?;
        pause(self.timing.baud_switch());
        let reopened = self.session.transport_mut().open(baud_rate);
        if reopened.is_ok() {
            self.session.set_baud_rate(baud_rate);
            log::info!("Baud rate changed to {}", baud_rate);
        }
        self.tracked(reopened)
    }

    // ========================================================================
    // Motion
    // ========================================================================

    /// Velocity in mm/s (±500), radius in mm (±2000, straight sentinels, ±1 in place)
    pub fn drive(&mut self, velocity: i16, radius: i16) -> Result<()> {
        self.command(|p| p.set_drive(velocity, radius))
    }

    /// Per-wheel velocity in mm/s (±500)
    pub fn drive_direct(&mut self, right: i16, left: i16) -> Result<()> {
        self.command(|p| p.set_drive_direct(right, left))
    }

    /// Per-wheel PWM (±255)
    pub fn drive_pwm(&mut self, right: i16, left: i16) -> Result<()> {
        self.command(|p| p.set_drive_pwm(right, left))
    }

    fn clamp_speed(&self, velocity: i16) -> i16 {
        velocity
            .saturating_abs()
            .min(self.robot.max_velocity)
            .min(MAX_VELOCITY)
    }

    pub fn move_forward(&mut self, velocity: i16) -> Result<()> {
        let v = self.clamp_speed(velocity);
        self.drive(v, RADIUS_STRAIGHT as i16)
    }

    pub fn move_backward(&mut self, velocity: i16) -> Result<()> {
        let v = self.clamp_speed(velocity);
        self.drive(-v, RADIUS_STRAIGHT as i16)
    }

    /// Rotate counter-clockwise in place
    pub fn turn_left(&mut self, velocity: i16) -> Result<()> {
        let v = self.clamp_speed(velocity);
        self.drive(v, RADIUS_TURN_CCW)
    }

    /// Rotate clockwise in place
    pub fn turn_right(&mut self, velocity: i16) -> Result<()> {
        let v = self.clamp_speed(velocity);
        self.drive(v, RADIUS_TURN_CW)
    }

    pub fn turn_left_radius(&mut self, velocity: i16, radius: i16) -> Result<()> {
        let v = self.clamp_speed(velocity);
        let r = radius.saturating_abs().min(MAX_RADIUS);
        self.drive(v, r)
    }

    pub fn turn_right_radius(&mut self, velocity: i16, radius: i16) -> Result<()> {
        let v = self.clamp_speed(velocity);
        let r = radius.saturating_abs().min(MAX_RADIUS);
        self.drive(v, -r)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.drive(0, 0)
    }

    // ========================================================================
    // Actuators
    // ========================================================================

    pub fn set_motors(&mut self, flags: MotorFlags) -> Result<()> {
        self.command(|p| {
            p.set_motors(flags);
            Ok(())
        })
    }

    /// Main/side brush -127..=127, vacuum 0..=127
    pub fn set_motors_pwm(&mut self, main_brush: i8, side_brush: i8, vacuum: u8) -> Result<()> {
        self.command(|p| p.set_pwm_motors(main_brush, side_brush, vacuum))
    }

    pub fn set_leds(&mut self, leds: LedFlags, power_color: u8, power_intensity: u8) -> Result<()> {
        self.command(|p| {
            p.set_leds(leds, power_color, power_intensity);
            Ok(())
        })?;
        self.leds = leds;
        Ok(())
    }

    /// Power LED only; indicator LEDs keep their last state
    pub fn set_power_led(&mut self, color: u8, intensity: u8) -> Result<()> {
        let leds = self.leds;
        self.set_leds(leds, color, intensity)
    }

    pub fn set_scheduling_leds(&mut self, weekdays: u8, schedule: u8) -> Result<()> {
        self.command(|p| {
            p.set_scheduling_leds(weekdays, schedule);
            Ok(())
        })
    }

    pub fn set_digit_leds_raw(&mut self, digits: [u8; 4]) -> Result<()> {
        self.command(|p| {
            p.set_digit_leds_raw(digits);
            Ok(())
        })
    }

    // ========================================================================
    // Audio
    // ========================================================================

    pub fn define_song(&mut self, song: &Song) -> Result<()> {
        self.command(|p| p.set_song(song))
    }

    pub fn play_song(&mut self, number: u8) -> Result<()> {
        self.command(|p| p.set_play(number))
    }

    /// Single note, stored in the reserved beep slot
    pub fn beep(&mut self, note: u8, duration: u8) -> Result<()> {
        let song = Song::with_notes(BEEP_SONG, &[Note::new(note, duration)]);
        let song = self.tracked(song)?;
        self.define_song(&song)?;
        self.play_song(BEEP_SONG)
    }

    /// `count` beeps separated by `gap` (1/64 s) of the lowest note
    pub fn beep_sequence(&mut self, count: u8, note: u8, duration: u8, gap: u8) -> Result<()> {
        let song = self.tracked(beep_song(count, note, duration, gap))?;
        self.define_song(&song)?;
        self.play_song(BEEP_SONG)
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    pub fn set_schedule(&mut self, schedule: &Schedule) -> Result<()> {
        self.command(|p| {
            p.set_schedule(schedule);
            Ok(())
        })
    }

    /// Set the robot clock; day 0 is Sunday
    pub fn set_day_time(&mut self, day: u8, hour: u8, minute: u8) -> Result<()> {
        self.command(|p| p.set_day_time(day, hour, minute))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// One-shot read of a single packet or group
    pub fn query_sensor(&mut self, id: u8) -> Result<()> {
        let result = self.try_query(&[id], |p| p.set_sensors(id));
        self.tracked(result)
    }

    /// One-shot read of several packets, decoded in order
    pub fn query_list(&mut self, ids: &[u8]) -> Result<()> {
        let result = self.try_query(ids, |p| p.set_query_list(ids));
        self.tracked(result)
    }

    pub fn query_preset(&mut self, preset: &Preset) -> Result<()> {
        self.query_list(preset.ids)
    }

    pub fn battery_info(&mut self) -> Result<BatteryInfo> {
        self.query_preset(&presets::BATTERY)?;
        Ok(self.telemetry.battery())
    }

    pub fn cliff_sensors(&mut self) -> Result<CliffSensors> {
        self.query_list(&[9, 10, 11, 12])?;
        Ok(self.telemetry.cliffs())
    }

    pub fn bumps_and_drops(&mut self) -> Result<BumpsAndDrops> {
        self.query_sensor(7)?;
        Ok(self.telemetry.bumps_and_drops())
    }

    /// Mode as reported by the device
    pub fn oi_mode(&mut self) -> Result<OiMode> {
        self.query_sensor(PACKET_OI_MODE)?;
        Ok(self.telemetry.mode)
    }

    pub fn charging_state(&mut self) -> Result<ChargingState> {
        self.query_sensor(21)?;
        Ok(self.telemetry.charging_state)
    }

    fn try_query<F>(&mut self, ids: &[u8], encode: F) -> Result<()>
    where
        F: FnOnce(&mut TxPacket) -> Result<()>,
    {
        self.session.require_initialized()?;
        if self.stream.is_active() {
            return Err(Error::InvalidParameter(
                "query while a sensor stream is active".into(),
            ));
        }
        let mut telemetry = std::mem::take(&mut self.telemetry);
        let result = self.exchange(ids, &mut telemetry, encode);
        self.telemetry = telemetry;
        result
    }

    /// Send a query and decode its flat response within the response deadline
    fn exchange<F>(&mut self, ids: &[u8], target: &mut Telemetry, encode: F) -> Result<()>
    where
        F: FnOnce(&mut TxPacket) -> Result<()>,
    {
        let expected = sensors::query_response_len(ids).map_err(|e| match e {
            Error::UnknownPacket(id) => Error::InvalidParameter(format!("unknown packet id {}", id)),
            other => other,
        })?;
        encode(&mut self.pkt)?;
        self.session.send(&self.pkt)?;
        pause(self.timing.query_settle());

        let mut response = vec![0u8; expected];
        let deadline = Instant::now() + self.timing.response_timeout();
        let got = self.session.read_exact_until(&mut response, deadline)?;
        sensors::decode_query(ids, &response[..got], target)
    }

    // ========================================================================
    // Streaming
    // ========================================================================

    pub fn start_stream(&mut self, ids: &[u8]) -> Result<()> {
        let result = self
            .session
            .require_initialized()
            .and_then(|_| self.stream.start(&mut self.session, ids));
        self.tracked(result)
    }

    pub fn start_preset(&mut self, preset: &Preset) -> Result<()> {
        self.start_stream(preset.ids)
    }

    pub fn pause_stream(&mut self) -> Result<()> {
        let result = self
            .session
            .require_initialized()
            .and_then(|_| self.stream.pause(&mut self.session));
        self.tracked(result)
    }

    pub fn resume_stream(&mut self) -> Result<()> {
        let result = self
            .session
            .require_initialized()
            .and_then(|_| self.stream.resume(&mut self.session));
        self.tracked(result)
    }

    pub fn reset_stream(&mut self) -> Result<()> {
        let result = self
            .session
            .require_initialized()
            .and_then(|_| self.stream.reset(&mut self.session));
        self.tracked(result)
    }

    pub fn stream_state(&self) -> StreamState {
        self.stream.state()
    }

    pub fn stream_ids(&self) -> &[u8] {
        self.stream.ids()
    }

    /// Pull streamed bytes and refresh telemetry from any complete frame
    pub fn poll(&mut self) -> Result<()> {
        let result = self.stream.poll(&mut self.session, &mut self.telemetry);
        self.tracked(result)
    }

    /// Poll, then copy the aggregate into `out` (only changed on success)
    pub fn update_telemetry(&mut self, out: &mut Telemetry) -> ResultCode {
        let result = self.poll();
        if result.is_ok() {
            out.clone_from(&self.telemetry);
        } else {
            out.failed_attempts = self.telemetry.failed_attempts;
        }
        ResultCode::from(&result)
    }
}

fn beep_song(count: u8, note: u8, duration: u8, gap: u8) -> Result<Song> {
    if count == 0 || count > MAX_BEEPS {
        return Err(Error::InvalidParameter(format!(
            "beep count {} (1-{})",
            count, MAX_BEEPS
        )));
    }
    let mut song = Song::new(BEEP_SONG);
    for i in 0..count {
        song.add_note(Note::new(note, duration))?;
        if i + 1 < count {
            song.add_note(Note::new(REST_NOTE, gap))?;
        }
    }
    Ok(song)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn ready() -> (MockTransport, Roomba<MockTransport>) {
        let mock = MockTransport::new();
        mock.respond_to(&[CMD_SENSORS, PACKET_OI_MODE], &[2]);
        let mut roomba =
            Roomba::with_config(mock.clone(), TimingConfig::immediate(), RobotConfig::default());
        roomba.initialize(115200).unwrap();
        mock.clear_written();
        (mock, roomba)
    }

    #[test]
    fn test_initialize_sequence() {
        let mock = MockTransport::new();
        mock.respond_to(&[142, 35], &[2]);
        mock.inject_read(&[0xAA, 0xBB]);
        let mut roomba =
            Roomba::with_config(mock.clone(), TimingConfig::immediate(), RobotConfig::default());

        roomba.initialize(115200).unwrap();
        assert!(roomba.is_initialized());
        assert_eq!(mock.written(), vec![128, 131, 142, 35]);
        assert_eq!(mock.baud_rate(), Some(115200));
        assert_eq!(roomba.requested_mode(), OiMode::Safe);
        assert_eq!(roomba.telemetry().mode, OiMode::Safe);

        roomba.initialize(115200).unwrap();
        assert_eq!(mock.open_count(), 1);
    }

    #[test]
    fn test_initialize_full_when_safety_disabled() {
        let mock = MockTransport::new();
        mock.respond_to(&[142, 35], &[3]);
        let robot = RobotConfig {
            safety_enabled: false,
            ..Default::default()
        };
        let mut roomba = Roomba::with_config(mock.clone(), TimingConfig::immediate(), robot);
        roomba.initialize(19200).unwrap();
        assert_eq!(mock.written(), vec![128, 132, 142, 35]);
        assert_eq!(roomba.requested_mode(), OiMode::Full);
    }

    #[test]
    fn test_commands_require_initialize() {
        let mock = MockTransport::new();
        let mut roomba = Roomba::new(mock.clone());
        assert!(matches!(roomba.drive(100, 0), Err(Error::NotInitialized)));
        assert!(matches!(roomba.safe(), Err(Error::NotInitialized)));
        assert_eq!(roomba.last_error(), ResultCode::NotInitialized);
        assert_eq!(roomba.statistics().error_count, 2);
        assert!(mock.written().is_empty());
    }

    #[test]
    fn test_mode_tracking() {
        let (mock, mut roomba) = ready();
        roomba.full().unwrap();
        assert_eq!(roomba.requested_mode(), OiMode::Full);
        roomba.seek_dock().unwrap();
        assert_eq!(roomba.requested_mode(), OiMode::Passive);
        assert_eq!(mock.written(), vec![132, 143]);
    }

    #[test]
    fn test_convenience_moves_clamp() {
        let (mock, mut roomba) = ready();
        roomba.move_forward(900).unwrap();
        roomba.move_backward(200).unwrap();
        roomba.turn_left(-100).unwrap();
        roomba.turn_right_radius(100, 5000).unwrap();
        roomba.stop().unwrap();

        let w = mock.written();
        let frames: Vec<(i16, i16)> = w
            .chunks(5)
            .map(|f| crate::oi::packet::parse_drive(f).unwrap())
            .collect();
        assert_eq!(
            frames,
            vec![
                (500, RADIUS_STRAIGHT as i16),
                (-200, RADIUS_STRAIGHT as i16),
                (100, 1),
                (100, -2000),
                (0, 0)
            ]
        );
    }

    #[test]
    fn test_drive_validation_records_error() {
        let (mock, mut roomba) = ready();
        assert!(matches!(
            roomba.drive(600, 0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(mock.written().is_empty());
        assert_eq!(roomba.last_error(), ResultCode::InvalidParameter);
    }

    #[test]
    fn test_send_command_errors() {
        let (mock, mut roomba) = ready();
        assert!(matches!(
            roomba.send_command(140, &[0u8; 80]),
            Err(Error::BufferOverflow(_))
        ));
        assert!(mock.written().is_empty());

        mock.set_short_writes(true);
        assert!(matches!(
            roomba.send_command(139, &[0, 0, 255]),
            Err(Error::Communication(_))
        ));
        assert_eq!(roomba.last_error(), ResultCode::CommunicationError);
    }

    #[test]
    fn test_beep_sequence() {
        let (mock, mut roomba) = ready();
        roomba.beep_sequence(2, 72, 16, 8).unwrap();
        assert_eq!(
            mock.written(),
            vec![140, BEEP_SONG, 3, 72, 16, REST_NOTE, 8, 72, 16, 141, BEEP_SONG]
        );
        assert!(roomba.beep_sequence(9, 72, 16, 8).is_err());
    }

    #[test]
    fn test_power_led_keeps_indicators() {
        let (mock, mut roomba) = ready();
        let leds = LedFlags {
            spot: true,
            ..Default::default()
        };
        roomba.set_leds(leds, 0, 128).unwrap();
        roomba.set_power_led(255, 255).unwrap();
        assert_eq!(mock.written(), vec![139, 0x02, 0, 128, 139, 0x02, 255, 255]);
    }

    #[test]
    fn test_change_baud_rate() {
        let (mock, mut roomba) = ready();
        roomba.change_baud_rate(19200).unwrap();
        assert_eq!(mock.written(), vec![129, 7]);
        assert_eq!(mock.baud_rate(), Some(19200));
        assert_eq!(roomba.baud_rate(), 19200);
        assert!(roomba.change_baud_rate(1000).is_err());
    }

    #[test]
    fn test_failed_shutdown_counts_once() {
        let (mock, mut roomba) = ready();
        mock.set_fail_writes(true);
        assert!(matches!(roomba.shutdown(), Err(Error::Communication(_))));
        assert_eq!(roomba.statistics().error_count, 1);
        assert_eq!(roomba.last_error(), ResultCode::CommunicationError);
        assert!(!roomba.is_initialized());
    }

    #[test]
    fn test_query_rejected_while_streaming() {
        let (mock, mut roomba) = ready();
        roomba.start_stream(&[22]).unwrap();
        mock.clear_written();
        assert!(matches!(
            roomba.query_sensor(22),
            Err(Error::InvalidParameter(_))
        ));
        assert!(mock.written().is_empty());
    }

    #[test]
    fn test_battery_info() {
        let (mock, mut roomba) = ready();
        // voltage, current, charge, capacity, temperature, charging state
        mock.respond_to(
            &[149, 6, 22, 23, 25, 26, 24, 21],
            &[0x3A, 0x98, 0xFE, 0x0C, 0x05, 0xDC, 0x0B, 0xB8, 0x1E, 0x00],
        );
        let info = roomba.battery_info().unwrap();
        assert_eq!(info.voltage, 15000);
        assert_eq!(info.current, -500);
        assert_eq!(info.charge, 1500);
        assert_eq!(info.capacity, 3000);
        assert_eq!(info.temperature, 30);
        assert_eq!(info.percentage, 50);
    }

    #[test]
    fn test_shutdown() {
        let (mock, mut roomba) = ready();
        roomba.start_stream(&[7]).unwrap();
        mock.clear_written();
        roomba.shutdown().unwrap();
        assert_eq!(mock.written(), vec![148, 0, 137, 0, 0, 0, 0]);
        assert!(!roomba.is_initialized());
        assert!(!roomba.transport().is_open());
    }
}
