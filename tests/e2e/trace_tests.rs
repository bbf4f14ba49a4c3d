//! Trace rendering E2E tests: capture -> record -> terminal text
//!
//! Workers are stepped by hand against a manual clock so idle gaps are exact.
//! These tests verify:
//! - Captures accumulate on one line until a side goes quiet for longer than the gap
//! - Gap measurement is per side
//! - Colors follow direction, timestamps prefix each line

use crate::common::SharedBuffer;
use crossterm::style::Stylize;
use pretty_assertions::assert_eq;
use serial_sniffer::clock::{Clock, ManualClock};
use serial_sniffer::port::MockSerialPort;
use serial_sniffer::relay::{
    relay_channel, Direction, EndpointRole, PortWorker, RetryPolicy, ShutdownSignal,
    WorkerSettings,
};
use serial_sniffer::trace::{TerminalSink, TraceSink, TraceStyle};
use std::sync::Arc;
use std::time::Duration;

struct TraceRig {
    hardware: PortWorker,
    software: PortWorker,
    hw_port: MockSerialPort,
    sw_port: MockSerialPort,
    sink: Arc<TerminalSink<SharedBuffer>>,
    out: SharedBuffer,
    clock: Arc<ManualClock>,
}

impl TraceRig {
    fn new(style: TraceStyle) -> Self {
        let hw_port = MockSerialPort::new("HW");
        let sw_port = MockSerialPort::new("SW");
        let out = SharedBuffer::default();
        let sink = Arc::new(TerminalSink::new(out.clone(), style));
        let clock = Arc::new(ManualClock::new());
        let shutdown = ShutdownSignal::new();
        let settings = WorkerSettings {
            idle_gap: Duration::from_secs(2),
            poll_interval: Duration::ZERO,
            retry: RetryPolicy::none(),
            ..WorkerSettings::default()
        };
        let (hw_relay, sw_relay) = relay_channel(16);

        let hardware = PortWorker::new(
            EndpointRole::Hardware,
            Box::new(hw_port.clone()),
            hw_relay,
            sink.clone(),
            clock.clone(),
            shutdown.clone(),
            settings,
        );
        let software = PortWorker::new(
            EndpointRole::Software,
            Box::new(sw_port.clone()),
            sw_relay,
            sink.clone(),
            clock.clone(),
            shutdown,
            settings,
        );

        Self {
            hardware,
            software,
            hw_port,
            sw_port,
            sink,
            out,
            clock,
        }
    }

    fn from_device(&mut self, bytes: &[u8]) {
        self.hw_port.enqueue_read(bytes);
        self.hardware.step().unwrap();
        self.software.step().unwrap();
    }

    fn from_software(&mut self, bytes: &[u8]) {
        self.sw_port.enqueue_read(bytes);
        self.software.step().unwrap();
        self.hardware.step().unwrap();
    }

    fn wait(&self, millis: u64) {
        self.clock.advance(Duration::from_millis(millis));
    }

    fn finish(&self) -> String {
        self.sink.finish().unwrap();
        self.out.contents()
    }
}

fn plain() -> TraceStyle {
    TraceStyle {
        color: false,
        timestamps: false,
    }
}

#[test]
fn test_gap_longer_than_threshold_starts_a_new_line() {
    let mut rig = TraceRig::new(plain());

    rig.from_device(&[0x01, 0x02]);
    rig.wait(2500);
    rig.from_device(&[0x03]);

    assert_eq!(rig.finish(), "0102\n03\n");
}

#[test]
fn test_short_gap_continues_the_line() {
    let mut rig = TraceRig::new(plain());

    rig.from_device(&[0x01]);
    rig.wait(500);
    rig.from_device(&[0x02]);
    rig.wait(2000);
    rig.from_device(&[0x03]);

    assert_eq!(rig.finish(), "010203\n");
}

#[test]
fn test_gaps_are_measured_per_side() {
    let mut rig = TraceRig::new(plain());

    rig.from_device(&[0x01, 0x02]);
    rig.wait(500);
    rig.from_software(&[0x0a]);
    rig.wait(1500);
    rig.from_software(&[0x0b]);
    // Device quiet for 3s, software for 1s
    rig.wait(1000);
    rig.from_device(&[0x03]);
    rig.wait(500);
    rig.from_software(&[0x0c]);

    assert_eq!(rig.finish(), "01020a0b\n030c\n");
    assert_eq!(rig.sw_port.written_bytes(), vec![0x01, 0x02, 0x03]);
    assert_eq!(rig.hw_port.written_bytes(), vec![0x0a, 0x0b, 0x0c]);
}

#[test]
fn test_first_capture_after_long_startup_quiet_adds_no_blank_line() {
    let mut rig = TraceRig::new(plain());

    rig.wait(5000);
    rig.from_device(&[0xff]);

    assert_eq!(rig.finish(), "ff\n");
}

#[test]
fn test_colors_follow_direction() {
    let mut rig = TraceRig::new(TraceStyle {
        color: true,
        timestamps: false,
    });

    rig.from_device(&[0x01]);
    rig.from_software(&[0x02]);

    let expected = format!(
        "{}{}\n",
        "01".with(TraceStyle::color_for(Direction::HardwareToSoftware)),
        "02".with(TraceStyle::color_for(Direction::SoftwareToHardware)),
    );
    assert_eq!(rig.finish(), expected);
}

#[test]
fn test_timestamps_prefix_each_line() {
    let mut rig = TraceRig::new(TraceStyle {
        color: false,
        timestamps: true,
    });

    let first = rig.clock.wall().format("%H:%M:%S%.3f").to_string();
    rig.from_device(&[0x01]);
    rig.from_device(&[0x02]);
    rig.wait(3000);
    let second = rig.clock.wall().format("%H:%M:%S%.3f").to_string();
    rig.from_device(&[0x03]);

    assert_eq!(rig.finish(), format!("[{first}] 0102\n[{second}] 03\n"));
}

#[test]
fn test_empty_session_prints_nothing() {
    let mut rig = TraceRig::new(plain());
    rig.hardware.step().unwrap();
    rig.software.step().unwrap();

    assert_eq!(rig.finish(), "");
}
