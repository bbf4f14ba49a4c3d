//! No-loss, no-duplication property tests.
//!
//! Arbitrary byte streams are pushed into both endpoints at once through a
//! relay with small queues and read buffers. Whatever each side sent must
//! arrive at the other side exactly once, in order, and be traced exactly
//! once.

use crate::common::{fast_worker_settings, run_worker_pair, wait_until};
use proptest::prelude::*;
use serial_sniffer::clock::SystemClock;
use serial_sniffer::port::MockSerialPort;
use serial_sniffer::relay::{Direction, ShutdownSignal, WorkerSettings};
use serial_sniffer::trace::RecordingSink;
use std::sync::Arc;
use std::time::Duration;

fn relay_both_ways(
    upstream: &[u8],
    downstream: &[u8],
    capacity: usize,
    read_buffer_size: usize,
    max_write_len: Option<usize>,
) -> (Vec<u8>, Vec<u8>, Arc<RecordingSink>) {
    let hardware = MockSerialPort::new("HW");
    let software = MockSerialPort::new("SW");
    software.set_max_write_len(max_write_len);
    let sink = Arc::new(RecordingSink::new());
    let settings = WorkerSettings {
        read_buffer_size,
        ..fast_worker_settings()
    };

    let (hw_result, sw_result) = run_worker_pair(
        hardware.clone(),
        software.clone(),
        sink.clone(),
        Arc::new(SystemClock),
        ShutdownSignal::new(),
        settings,
        capacity,
        || {
            hardware.enqueue_read(upstream);
            software.enqueue_read(downstream);
            wait_until(Duration::from_secs(10), || {
                software.written_bytes().len() >= upstream.len()
                    && hardware.written_bytes().len() >= downstream.len()
            });
        },
    );
    hw_result.expect("hardware worker stops cleanly");
    sw_result.expect("software worker stops cleanly");

    (software.written_bytes(), hardware.written_bytes(), sink)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_every_byte_arrives_once_in_order(
        upstream in proptest::collection::vec(any::<u8>(), 0..512),
        downstream in proptest::collection::vec(any::<u8>(), 0..512),
        capacity in 1usize..4,
        read_buffer_size in 1usize..64,
        max_write_len in proptest::option::of(1usize..16),
    ) {
        let (at_software, at_hardware, sink) =
            relay_both_ways(&upstream, &downstream, capacity, read_buffer_size, max_write_len);

        prop_assert_eq!(&at_software, &upstream);
        prop_assert_eq!(&at_hardware, &downstream);
        prop_assert_eq!(sink.bytes_for(Direction::HardwareToSoftware), upstream);
        prop_assert_eq!(sink.bytes_for(Direction::SoftwareToHardware), downstream);
    }
}

#[test]
fn test_silent_endpoints_relay_nothing() {
    let (at_software, at_hardware, sink) = relay_both_ways(&[], &[], 1, 1, None);

    assert!(at_software.is_empty());
    assert!(at_hardware.is_empty());
    assert!(sink.records().is_empty());
}

#[test]
fn test_large_burst_through_single_slot_queue() {
    let upstream: Vec<u8> = (0..8192u32).map(|i| (i % 256) as u8).collect();
    let (at_software, _, sink) = relay_both_ways(&upstream, &[], 1, 7, Some(5));

    assert_eq!(at_software, upstream);
    assert_eq!(sink.bytes_for(Direction::HardwareToSoftware), upstream);
}
