//! 遥测集成测试：真实 UDP 数据报经会话到达调用方

mod common;

use common::{MockDevice, send_datagram, sequential_frame};
use crossbeam_channel::unbounded;
use hdrive_sdk::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn connected_session(device: &MockDevice) -> (DriveSession, u16) {
    let session = DriveSession::new(device.session_config()).unwrap();
    session.connect().unwrap();
    let port = session.telemetry_local_port().unwrap();
    (session, port)
}

#[test]
fn test_latest_is_none_before_first_datagram() {
    let device = MockDevice::start(300);
    let (session, _port) = connected_session(&device);
    assert!(session.latest_telemetry().is_none());
    assert_eq!(session.telemetry_state(), TelemetryState::Running);
}

#[test]
fn test_frame_fields_follow_wire_order() {
    let device = MockDevice::start(300);
    let (session, port) = connected_session(&device);

    send_datagram(port, &sequential_frame(1000).to_bytes());
    assert!(common::wait_until(|| session.latest_telemetry().is_some()));

    let frame = session.latest_telemetry().unwrap();
    assert_eq!(frame.time_us, 1000);
    assert_eq!(frame.position, 1001);
    assert_eq!(frame.temperature, 1009);
    assert_eq!(frame.homing_completed, 1022);
    assert_eq!(frame.slave_positions, [1023, 1024, 1025, 1026, 1027, 1028, 1029, 1030]);
    assert_eq!(frame.active_slaves, 1031);
    assert_eq!(frame.can_status, 1032);
    assert_eq!(frame.raw[32], 1032);
}

#[test]
fn test_wrong_size_datagram_is_dropped() {
    let device = MockDevice::start(300);
    let (session, port) = connected_session(&device);

    send_datagram(port, &sequential_frame(7).to_bytes());
    assert!(common::wait_until(|| session.latest_telemetry().is_some()));

    send_datagram(port, &[0u8; 64]);
    send_datagram(port, &[0u8; 136]);
    assert!(common::wait_until(|| session.telemetry_metrics().packets_dropped == 2));

    let frame = session.latest_telemetry().unwrap();
    assert_eq!(frame.time_us, 7);
    assert_eq!(session.telemetry_metrics().packets_received, 1);
}

#[test]
fn test_observer_receives_frames() {
    let device = MockDevice::start(300);
    let session = DriveSession::new(device.session_config()).unwrap();

    // 连接之前注册
    let (tx, rx) = unbounded();
    session.on_telemetry(move |frame: &TelemetryFrame| {
        let _ = tx.send(frame.position);
    });
    session.connect().unwrap();
    let port = session.telemetry_local_port().unwrap();

    send_datagram(port, &sequential_frame(500).to_bytes());
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 501);
}

struct PanickingObserver {
    calls: Arc<AtomicUsize>,
}

impl TelemetryCallback for PanickingObserver {
    fn on_frame(&self, _frame: &TelemetryFrame) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("observer failure");
    }
}

#[test]
fn test_observer_panic_does_not_stop_telemetry() {
    let device = MockDevice::start(300);
    let (session, port) = connected_session(&device);
    let calls = Arc::new(AtomicUsize::new(0));
    session.on_telemetry(PanickingObserver {
        calls: calls.clone(),
    });

    send_datagram(port, &sequential_frame(1).to_bytes());
    assert!(common::wait_until(|| calls.load(Ordering::SeqCst) == 1));
    send_datagram(port, &sequential_frame(2).to_bytes());
    assert!(common::wait_until(|| calls.load(Ordering::SeqCst) == 2));

    assert!(common::wait_until(|| session
        .latest_telemetry()
        .is_some_and(|f| f.time_us == 2)));
    assert_eq!(session.telemetry_metrics().observer_failures, 2);
    assert_eq!(session.telemetry_state(), TelemetryState::Running);
}

#[test]
fn test_close_stops_telemetry_promptly() {
    let device = MockDevice::start(300);
    let (session, _port) = connected_session(&device);

    let start = std::time::Instant::now();
    session.close();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(session.telemetry_state(), TelemetryState::Stopped);
}
