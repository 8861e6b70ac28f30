//! Raw OI stream dumper
//!
//! Wakes the robot, requests a sensor stream and prints every received chunk
//! in hex, marking `0x13` headers whose length byte matches the requested
//! frame. Useful for checking wiring and baud rate before running the
//! monitor.
//!
//! ```text
//! cargo run --example stream_dump -- /dev/ttyUSB0 19200 7 22 24
//! ```

use roomba_oi::oi::constants::STREAM_HEADER;
use roomba_oi::oi::sensors;
use roomba_oi::transport::{SerialTransport, Transport};
use roomba_oi::{presets, Roomba};
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port = args.get(1).map(String::as_str).unwrap_or("/dev/ttyUSB0");
    let baud: u32 = match args.get(2) {
        Some(b) => b.parse()?,
        None => 19200,
    };
    let ids: Vec<u8> = if args.len() > 3 {
        args[3..]
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<u8>, _>>()?
    } else {
        presets::BASIC.ids.to_vec()
    };

    let frame_len = sensors::stream_frame_len(&ids)?;
    log::info!("=== OI Stream Dumper ===");
    log::info!("Port {} at {} baud, ids {:?}", port, baud, ids);
    log::info!("Expecting {}-byte frames, length byte {}", frame_len, frame_len - 3);

    let mut roomba = Roomba::new(SerialTransport::new(port));
    roomba.initialize(baud)?;
    roomba.start_stream(&ids)?;
    // Take the port back so the dump sees every byte unparsed
    let mut transport = roomba.into_transport();

    let start = Instant::now();
    let duration = Duration::from_secs(10);
    let mut buffer = [0u8; 256];
    let mut total_bytes = 0;
    let mut header_count = 0;

    while start.elapsed() < duration {
        let n = transport.read(&mut buffer)?;
        if n == 0 {
            std::thread::sleep(Duration::from_millis(5));
            continue;
        }
        total_bytes += n;

        let hex_line: String = buffer[..n]
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        println!("[{:06}] {} bytes: {}", total_bytes, n, hex_line);

        for i in 0..n.saturating_sub(1) {
            if buffer[i] == STREAM_HEADER && buffer[i + 1] as usize + 3 == frame_len {
                header_count += 1;
                println!("  --> Header at offset {}", i);
            }
        }
    }

    // STREAM with an empty list stops the robot sending
    transport.write(&[148, 0])?;
    transport.close()?;

    log::info!("");
    log::info!("Total bytes: {}", total_bytes);
    log::info!("Headers found: {}", header_count);
    log::info!(
        "Expected ~{} frames (one per 15 ms)",
        duration.as_millis() / 15
    );
    Ok(())
}
