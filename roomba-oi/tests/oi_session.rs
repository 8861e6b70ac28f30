//! End-to-end controller tests against a scripted mock robot

use roomba_oi::config::{AppConfig, RobotConfig, TimingConfig};
use roomba_oi::oi::sensors::encode_frame;
use roomba_oi::transport::{MockTransport, Transport};
use roomba_oi::{presets, Error, OiMode, ResultCode, Roomba, StreamState, Telemetry};

/// Voltage 16000 mV, temperature -2 C
const VOLT_TEMP: [(u8, &[u8]); 2] = [(22, &[0x3E, 0x80]), (24, &[0xFE])];

fn robot() -> (MockTransport, Roomba<MockTransport>) {
    let mock = MockTransport::new();
    mock.respond_to(&[142, 35], &[2]);
    let roomba =
        Roomba::with_config(mock.clone(), TimingConfig::immediate(), RobotConfig::default());
    (mock, roomba)
}

fn ready() -> (MockTransport, Roomba<MockTransport>) {
    let (mock, mut roomba) = robot();
    roomba.initialize(19200).unwrap();
    mock.clear_written();
    (mock, roomba)
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn initialize_counts_start_sequence() {
    let (mock, mut roomba) = robot();
    roomba.initialize(19200).unwrap();

    assert!(roomba.is_initialized());
    assert_eq!(roomba.baud_rate(), 19200);
    assert_eq!(roomba.telemetry().mode, OiMode::Safe);
    assert!(roomba.telemetry().last_successful_refresh.is_some());

    let stats = roomba.statistics();
    assert_eq!(stats.commands_sent, 3);
    assert_eq!(stats.bytes_sent, 4);
    assert_eq!(stats.bytes_received, 1);
    assert_eq!(stats.error_count, 0);
    assert_eq!(mock.written(), vec![128, 131, 142, 35]);
}

#[test]
fn initialize_without_reply_leaves_state_untouched() {
    let mock = MockTransport::new();
    let mut roomba =
        Roomba::with_config(mock.clone(), TimingConfig::immediate(), RobotConfig::default());

    assert!(matches!(roomba.initialize(19200), Err(Error::Timeout)));
    assert!(!roomba.is_initialized());
    assert_eq!(roomba.requested_mode(), OiMode::Off);
    assert_eq!(*roomba.telemetry(), Telemetry::default());
    assert!(!roomba.transport().is_open());
    assert_eq!(roomba.last_error(), ResultCode::Timeout);

    // not retried automatically; the caller can try again
    mock.respond_to(&[142, 35], &[2]);
    roomba.initialize(19200).unwrap();
    assert!(roomba.is_initialized());
}

#[test]
fn initialize_reports_open_failure() {
    let (mock, mut roomba) = robot();
    mock.set_fail_open(true);
    assert!(matches!(
        roomba.initialize(19200),
        Err(Error::Communication(_))
    ));
    assert_eq!(roomba.last_error(), ResultCode::CommunicationError);
    assert_eq!(roomba.statistics().error_count, 1);
    assert!(mock.written().is_empty());
}

#[test]
fn initialize_rejects_unsupported_baud() {
    let (mock, mut roomba) = robot();
    assert!(matches!(
        roomba.initialize(12345),
        Err(Error::InvalidParameter(_))
    ));
    assert_eq!(mock.open_count(), 0);
}

#[test]
fn operations_before_initialize() {
    let (mock, mut roomba) = robot();
    assert!(matches!(roomba.start_stream(&[7]), Err(Error::NotInitialized)));
    assert!(matches!(roomba.query_sensor(7), Err(Error::NotInitialized)));
    assert!(matches!(roomba.beep(72, 16), Err(Error::NotInitialized)));
    assert!(matches!(roomba.poll(), Err(Error::NotInitialized)));
    assert_eq!(roomba.last_error(), ResultCode::NotInitialized);
    assert!(mock.written().is_empty());
}

// ============================================================================
// Streaming
// ============================================================================

#[test]
fn stream_lifecycle() {
    let (mock, mut roomba) = ready();

    assert!(matches!(
        roomba.start_stream(&[]),
        Err(Error::InvalidParameter(_))
    ));
    assert_eq!(roomba.stream_state(), StreamState::Idle);
    assert!(mock.written().is_empty());

    roomba.start_preset(&presets::SAFETY).unwrap();
    assert_eq!(roomba.stream_state(), StreamState::Streaming);
    assert_eq!(roomba.stream_ids(), presets::SAFETY.ids);
    assert_eq!(mock.written(), vec![148, 8, 7, 9, 10, 11, 12, 14, 13, 8]);

    roomba.pause_stream().unwrap();
    assert_eq!(roomba.stream_state(), StreamState::Paused);
    roomba.resume_stream().unwrap();
    assert_eq!(roomba.stream_state(), StreamState::Streaming);

    mock.clear_written();
    roomba.reset_stream().unwrap();
    assert_eq!(roomba.stream_state(), StreamState::Idle);
    assert_eq!(mock.written(), vec![148, 0]);
}

#[test]
fn oversized_stream_request() {
    let (mock, mut roomba) = ready();
    // group 100 alone is 80 bytes; twice overflows one emission slot
    assert!(matches!(
        roomba.start_stream(&[100, 100]),
        Err(Error::BufferOverflow(_))
    ));
    assert_eq!(roomba.last_error(), ResultCode::BufferOverflow);
    assert_eq!(roomba.stream_state(), StreamState::Idle);
    assert!(mock.written().is_empty());
}

#[test]
fn split_frame_matches_whole_delivery() {
    let frame = encode_frame(&VOLT_TEMP);

    let (whole_mock, mut whole) = ready();
    whole.start_stream(&[22, 24]).unwrap();
    whole_mock.inject_read(&frame);
    whole.poll().unwrap();

    for split in 1..frame.len() {
        let (mock, mut roomba) = ready();
        roomba.start_stream(&[22, 24]).unwrap();

        mock.inject_read(&frame[..split]);
        assert!(matches!(roomba.poll(), Err(Error::Timeout)), "split {}", split);
        assert_eq!(roomba.telemetry().voltage, 0);

        mock.inject_read(&frame[split..]);
        roomba.poll().unwrap();
        let t = roomba.telemetry();
        assert_eq!(t.voltage, 16000);
        assert_eq!(t.temperature, -2);
        assert_eq!(t.failed_attempts, 0);
        assert_eq!(t.voltage, whole.telemetry().voltage);
        assert_eq!(t.temperature, whole.telemetry().temperature);
    }
}

#[test]
fn slow_line_reassembles() {
    let (mock, mut roomba) = ready();
    roomba.start_stream(&[22, 24]).unwrap();
    mock.set_read_chunk(3);
    mock.inject_read(&encode_frame(&VOLT_TEMP));
    roomba.poll().unwrap();
    assert_eq!(roomba.telemetry().voltage, 16000);
}

#[test]
fn backlog_of_whole_frames_decodes_newest() {
    let (mock, mut roomba) = ready();
    roomba.start_stream(&[100]).unwrap();

    // three 84-byte frames queued between polls, more than the ring holds
    let mut data = [0u8; 80];
    for voltage in [14000u16, 15000, 16000] {
        data[17..19].copy_from_slice(&voltage.to_be_bytes());
        mock.inject_read(&encode_frame(&[(100, &data)]));
    }
    roomba.poll().unwrap();
    assert_eq!(roomba.telemetry().voltage, 16000);
    assert_eq!(roomba.telemetry().failed_attempts, 0);
    assert_eq!(mock.pending_read(), 0);
}

#[test]
fn corrupted_frame_is_absorbed() {
    let (mock, mut roomba) = ready();
    roomba.start_stream(&[22, 24]).unwrap();

    let mut bad = encode_frame(&VOLT_TEMP);
    bad[3] ^= 0x01;
    mock.inject_read(&bad);
    assert!(matches!(roomba.poll(), Err(Error::Checksum { .. })));
    assert_eq!(roomba.telemetry().voltage, 0);
    assert_eq!(roomba.telemetry().failed_attempts, 1);
    assert_eq!(roomba.last_error(), ResultCode::ChecksumError);

    mock.inject_read(&encode_frame(&VOLT_TEMP));
    roomba.poll().unwrap();
    assert_eq!(roomba.telemetry().voltage, 16000);
    assert_eq!(roomba.telemetry().failed_attempts, 0);
}

#[test]
fn update_telemetry_copies_only_on_success() {
    let (mock, mut roomba) = ready();
    roomba.start_stream(&[22, 24]).unwrap();

    let mut out = Telemetry::default();
    assert_eq!(roomba.update_telemetry(&mut out), ResultCode::Timeout);
    assert_eq!(out.voltage, 0);

    mock.inject_read(&encode_frame(&VOLT_TEMP));
    assert_eq!(roomba.update_telemetry(&mut out), ResultCode::Success);
    assert_eq!(out.voltage, 16000);
    assert_eq!(out.temperature, -2);
}

// ============================================================================
// Queries and commands
// ============================================================================

#[test]
fn group_query_decodes_members() {
    let (mock, mut roomba) = ready();
    // group 3: charging state, voltage, current, temperature, charge, capacity
    mock.respond_to(
        &[142, 3],
        &[1, 0x3E, 0x80, 0x00, 0x64, 0x19, 0x0B, 0xB8, 0x0B, 0xB8],
    );
    roomba.query_sensor(3).unwrap();

    let t = roomba.telemetry();
    assert!(t.charging_state.is_charging());
    assert_eq!(t.voltage, 16000);
    assert_eq!(t.current, 100);
    assert_eq!(t.temperature, 25);
    assert_eq!(t.battery_percentage(), 100);
}

#[test]
fn truncated_query_times_out() {
    let (mock, mut roomba) = ready();
    mock.respond_to(&[142, 22], &[0x3E]);
    let before = roomba.telemetry().clone();

    assert!(matches!(roomba.query_sensor(22), Err(Error::Timeout)));
    let after = roomba.telemetry();
    assert_eq!(after.voltage, before.voltage);
    assert_eq!(after.last_successful_refresh, before.last_successful_refresh);
    assert_eq!(after.failed_attempts, before.failed_attempts + 1);
    assert_eq!(roomba.statistics().error_count, 0);
}

#[test]
fn unknown_query_id_sends_nothing() {
    let (mock, mut roomba) = ready();
    assert!(matches!(
        roomba.query_list(&[7, 99]),
        Err(Error::InvalidParameter(_))
    ));
    assert!(mock.written().is_empty());
}

#[test]
fn send_command_failures() {
    let (mock, mut roomba) = ready();
    roomba.reset_statistics();

    assert!(matches!(
        roomba.send_command(164, &[0u8; 64]),
        Err(Error::BufferOverflow(_))
    ));
    assert_eq!(roomba.statistics().bytes_sent, 0);

    mock.set_fail_writes(true);
    assert!(matches!(
        roomba.send_command(135, &[]),
        Err(Error::Communication(_))
    ));

    mock.set_fail_writes(false);
    roomba.send_command(135, &[]).unwrap();
    let stats = roomba.statistics();
    assert_eq!(stats.commands_sent, 1);
    assert_eq!(stats.bytes_sent, 1);
    assert_eq!(stats.error_count, 2);
}

#[test]
fn drive_round_trips_legal_pairs() {
    let (mock, mut roomba) = ready();
    let pairs = [
        (0, 0),
        (500, 2000),
        (-500, -2000),
        (200, 1),
        (200, -1),
        (-123, 0x7FFF),
        (250, i16::MIN),
    ];
    for (v, r) in pairs {
        mock.clear_written();
        roomba.drive(v, r).unwrap();
        assert_eq!(
            roomba_oi::oi::packet::parse_drive(&mock.written()),
            Some((v, r))
        );
    }
}

#[test]
fn shutdown_stops_stream_and_wheels() {
    let (mock, mut roomba) = ready();
    roomba.start_stream(&[7]).unwrap();
    roomba.move_forward(200).unwrap();
    mock.clear_written();

    roomba.shutdown().unwrap();
    assert_eq!(mock.written(), vec![148, 0, 137, 0, 0, 0, 0]);
    assert!(!roomba.is_initialized());
    assert!(matches!(roomba.stop(), Err(Error::NotInitialized)));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roomba.toml");

    let mut config = AppConfig::default();
    config.serial.port = "/dev/ttyAMA0".to_string();
    config.serial.baud_rate = 115200;
    config.streaming.preset = "navigation".to_string();
    config.robot.safety_enabled = false;
    config.to_file(&path).unwrap();

    let loaded = AppConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.preset().unwrap().ids, presets::NAVIGATION.ids);
}

#[test]
fn config_drives_controller() {
    let mut config = AppConfig::default();
    config.timing = TimingConfig::immediate();
    config.robot.max_velocity = 300;
    config.robot.default_velocity = 300;
    config.robot.turn_velocity = 100;
    config.robot.safety_enabled = false;

    let mock = MockTransport::new();
    mock.respond_to(&[142, 35], &[3]);
    let mut roomba = Roomba::from_app_config(mock.clone(), &config);
    roomba.initialize(config.serial.baud_rate).unwrap();
    assert_eq!(roomba.requested_mode(), OiMode::Full);

    mock.clear_written();
    roomba.move_forward(500).unwrap();
    assert_eq!(
        roomba_oi::oi::packet::parse_drive(&mock.written()),
        Some((300, i16::MIN))
    );
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AppConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::Io(_))));
}
