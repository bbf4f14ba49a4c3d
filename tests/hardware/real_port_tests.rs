//! Tests requiring real serial ports.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! # A device (or loopback adapter) and one end of a virtual null-modem pair
//! export TEST_HW_PORT=COM5               # or /dev/ttyUSB0 on Linux
//! export TEST_SW_PORT=COM8               # sniffer side of the pair
//! export TEST_PEER_PORT=COM9             # where host software would attach
//! export TEST_BAUD=9600                  # optional, default: 9600
//!
//! cargo test --features hardware-tests -- --ignored
//! ```
//!
//! The relay test needs TX and RX of the device port tied together, so
//! anything written from the peer end comes straight back.

use crate::common::wait_until_async;
use serial_sniffer::clock::SystemClock;
use serial_sniffer::port::{PortConfiguration, SerialPortAdapter, SyncSerialPort, SystemPortOpener};
use serial_sniffer::relay::{Direction, RelaySettings, ShutdownSignal, Sniffer};
use serial_sniffer::trace::RecordingSink;
use std::env;
use std::sync::Arc;
use std::time::Duration;

fn test_baud() -> u32 {
    env::var("TEST_BAUD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9600)
}

fn port_config() -> PortConfiguration {
    PortConfiguration {
        baud_rate: test_baud(),
        ..PortConfiguration::default()
    }
}

/// Skip test if the named port variables are not set.
fn ports_from_env(vars: &[&str]) -> Option<Vec<String>> {
    let ports: Option<Vec<String>> = vars.iter().map(|v| env::var(v).ok()).collect();
    if ports.is_none() {
        println!("Skipping hardware test: set {}", vars.join(", "));
    }
    ports
}

#[test]
#[ignore]
fn test_real_port_open_and_poll() {
    let Some(ports) = ports_from_env(&["TEST_HW_PORT"]) else {
        return;
    };

    let port = SyncSerialPort::open(&ports[0], &port_config()).expect("device port opens");
    assert_eq!(port.name(), ports[0]);
    // Polling an idle port must not block or fail
    port.bytes_available().expect("bytes_available on idle port");
}

#[tokio::test]
#[ignore]
async fn test_relay_through_loopback_device() {
    let Some(ports) = ports_from_env(&["TEST_HW_PORT", "TEST_SW_PORT", "TEST_PEER_PORT"]) else {
        return;
    };

    let mut settings = RelaySettings::new(&ports[0], &ports[1]);
    settings.port = port_config();
    let sink = Arc::new(RecordingSink::new());
    let sniffer = Sniffer::open(
        &SystemPortOpener,
        &settings,
        sink.clone(),
        Arc::new(SystemClock),
        ShutdownSignal::new(),
    )
    .expect("both ports open");
    let shutdown = sniffer.shutdown_signal();
    let relay = tokio::spawn(sniffer.run());

    let mut peer = SyncSerialPort::open(&ports[2], &port_config()).expect("peer port opens");
    let pattern = b"\x55\xaa sniffer loopback \x00\xff";
    peer.write_bytes(pattern).expect("write pattern");

    let seen = wait_until_async(Duration::from_secs(5), || {
        sink.bytes_for(Direction::HardwareToSoftware).len() >= pattern.len()
    })
    .await;
    shutdown.trigger();
    relay.await.unwrap().expect("relay shuts down cleanly");

    assert!(seen, "loopback bytes never came back through the relay");
    assert_eq!(sink.bytes_for(Direction::SoftwareToHardware), pattern);
    assert_eq!(sink.bytes_for(Direction::HardwareToSoftware), pattern);
}
