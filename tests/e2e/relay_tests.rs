//! Relay E2E tests: open -> drive traffic -> shut down
//!
//! These tests verify:
//! - Bytes reach the other endpoint unmodified and in order
//! - Both directions flow at the same time
//! - Every relayed byte is traced with the right direction
//! - Each endpoint is only touched by its own worker
//! - A failing endpoint stops the whole relay with its own exit code
//! - Tiny queues apply backpressure without losing bytes

use crate::common::{wait_until_async, Rig};
use pretty_assertions::assert_eq;
use serial_sniffer::error::{AppError, EXIT_HARDWARE_FAULT, EXIT_SOFTWARE_FAULT};
use serial_sniffer::port::PortError;
use serial_sniffer::relay::{Direction, EndpointRole, RelayError, RelayReport};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_hardware_bytes_reach_software_in_order() {
    let rig = Rig::new();
    let relay = tokio::spawn(rig.open().expect("both mock ports open").run());

    rig.hardware.enqueue_read(&[0x01, 0x02, 0x03]);
    assert!(wait_until_async(WAIT, || rig.software.written_bytes().len() == 3).await);

    rig.shutdown.trigger();
    let report = relay.await.unwrap().expect("clean shutdown");

    assert_eq!(rig.software.written_bytes(), vec![0x01, 0x02, 0x03]);
    assert!(rig.hardware.written_bytes().is_empty());
    assert_eq!(report.hardware.bytes_captured, 3);
    assert_eq!(report.software.bytes_delivered, 3);
}

#[tokio::test]
async fn test_full_duplex_traffic() {
    let rig = Rig::new();
    let relay = tokio::spawn(rig.open().unwrap().run());

    let request = b"READ 0x10\r\n".to_vec();
    let response: Vec<u8> = (0u8..=255).collect();

    rig.software.enqueue_read(&request);
    rig.hardware.enqueue_read(&response);

    assert!(
        wait_until_async(WAIT, || {
            rig.hardware.written_bytes().len() == request.len()
                && rig.software.written_bytes().len() == response.len()
        })
        .await
    );

    rig.shutdown.trigger();
    relay.await.unwrap().unwrap();

    assert_eq!(rig.hardware.written_bytes(), request);
    assert_eq!(rig.software.written_bytes(), response);
}

#[tokio::test]
async fn test_trace_matches_relayed_bytes() {
    let rig = Rig::new();
    let relay = tokio::spawn(rig.open().unwrap().run());

    rig.hardware.enqueue_read(b"\x02STATUS\x03");
    rig.software.enqueue_read(b"\x06");
    assert!(
        wait_until_async(WAIT, || {
            rig.software.written_bytes().len() == 8 && rig.hardware.written_bytes().len() == 1
        })
        .await
    );

    rig.shutdown.trigger();
    relay.await.unwrap().unwrap();

    assert_eq!(
        rig.sink.bytes_for(Direction::HardwareToSoftware),
        rig.software.written_bytes()
    );
    assert_eq!(
        rig.sink.bytes_for(Direction::SoftwareToHardware),
        rig.hardware.written_bytes()
    );
    assert!(rig.sink.records().iter().all(|r| !r.chunk.is_empty()));
}

#[tokio::test]
async fn test_each_endpoint_has_a_single_owner() {
    let rig = Rig::new();
    let relay = tokio::spawn(rig.open().unwrap().run());

    rig.hardware.enqueue_read(&[0xa1, 0xa2]);
    rig.software.enqueue_read(&[0xb1]);
    assert!(
        wait_until_async(WAIT, || {
            rig.software.written_bytes().len() == 2 && rig.hardware.written_bytes().len() == 1
        })
        .await
    );

    rig.shutdown.trigger();
    relay.await.unwrap().unwrap();

    assert_eq!(rig.hardware.accessor_count(), 1);
    assert_eq!(rig.software.accessor_count(), 1);
    // Nothing captured on a side is ever written back to that side
    assert_eq!(rig.hardware.written_bytes(), vec![0xb1]);
    assert_eq!(rig.software.written_bytes(), vec![0xa1, 0xa2]);
}

#[tokio::test]
async fn test_hardware_disconnect_stops_both_workers() {
    let rig = Rig::new();
    let sniffer = rig.open().unwrap();
    let relay = tokio::spawn(sniffer.run());

    rig.hardware.enqueue_read(&[0x01]);
    assert!(wait_until_async(WAIT, || rig.software.written_bytes() == vec![0x01]).await);

    rig.hardware.disconnect();
    let err = tokio::time::timeout(WAIT, relay)
        .await
        .expect("relay stops after a fault")
        .unwrap()
        .unwrap_err();

    assert!(matches!(
        err,
        RelayError::Read {
            role: EndpointRole::Hardware,
            source: PortError::Disconnected(_),
            ..
        }
    ));
    assert!(rig.shutdown.is_triggered());
    assert_eq!(AppError::from(err).exit_code(), EXIT_HARDWARE_FAULT);
}

#[tokio::test]
async fn test_software_write_fault_is_reported_against_software() {
    let mut rig = Rig::new();
    rig.settings.worker.retry.max_attempts = 2;
    let relay = tokio::spawn(rig.open().unwrap().run());

    rig.software.inject_write_timeouts(5);
    rig.hardware.enqueue_read(&[0x42]);

    let err = tokio::time::timeout(WAIT, relay)
        .await
        .expect("relay stops after a fault")
        .unwrap()
        .unwrap_err();

    assert!(matches!(
        err,
        RelayError::Write {
            role: EndpointRole::Software,
            ..
        }
    ));
    assert_eq!(AppError::from(err).exit_code(), EXIT_SOFTWARE_FAULT);
}

#[tokio::test]
async fn test_transient_faults_do_not_lose_bytes() {
    let rig = Rig::new();
    let relay = tokio::spawn(rig.open().unwrap().run());

    rig.hardware.inject_read_timeouts(1);
    rig.software.inject_write_timeouts(2);
    rig.hardware.enqueue_read(b"retry me");

    assert!(wait_until_async(WAIT, || rig.software.written_bytes().len() == 8).await);
    rig.shutdown.trigger();
    relay.await.unwrap().unwrap();

    assert_eq!(rig.software.written_bytes(), b"retry me");
}

#[tokio::test]
async fn test_tiny_queue_applies_backpressure_without_loss() {
    let mut rig = Rig::new();
    rig.settings.channel_capacity = 1;
    rig.settings.worker.read_buffer_size = 1;
    rig.software.set_max_write_len(Some(3));
    let relay = tokio::spawn(rig.open().unwrap().run());

    let upstream: Vec<u8> = (0..400u16).map(|i| (i % 251) as u8).collect();
    let downstream: Vec<u8> = (0..300u16).map(|i| (i * 7 % 256) as u8).collect();
    rig.hardware.enqueue_read(&upstream);
    rig.software.enqueue_read(&downstream);

    assert!(
        wait_until_async(WAIT, || {
            rig.software.written_bytes().len() == upstream.len()
                && rig.hardware.written_bytes().len() == downstream.len()
        })
        .await
    );

    rig.shutdown.trigger();
    let report = relay.await.unwrap().unwrap();

    assert_eq!(rig.software.written_bytes(), upstream);
    assert_eq!(rig.hardware.written_bytes(), downstream);
    assert_eq!(report.hardware.chunks_captured, upstream.len() as u64);
    assert_eq!(report.software.bytes_captured, downstream.len() as u64);
}

#[tokio::test]
async fn test_idle_relay_shuts_down_cleanly() {
    let rig = Rig::new();
    let sniffer = rig.open().unwrap();
    let shutdown = sniffer.shutdown_signal();
    let relay = tokio::spawn(sniffer.run());

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.trigger();

    let report = tokio::time::timeout(WAIT, relay)
        .await
        .expect("workers observe shutdown")
        .unwrap()
        .unwrap();
    assert_eq!(report, RelayReport::default());
    assert!(rig.sink.records().is_empty());
}
