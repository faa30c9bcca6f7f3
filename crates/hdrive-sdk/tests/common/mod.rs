//! 集成测试公共工具
#![allow(dead_code)]

pub mod mock_device;

pub use mock_device::MockDevice;

use hdrive_sdk::protocol::TelemetryFrame;
use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};

/// 轮询直到条件成立或超时（2 s）
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

/// 向本机 UDP 端口发送一个数据报
pub fn send_datagram(port: u16, bytes: &[u8]) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.send_to(bytes, ("127.0.0.1", port)).unwrap();
}

/// 构造遥测帧：`words[i] = base + i`
pub fn sequential_frame(base: i32) -> TelemetryFrame {
    let mut words = [0i32; 33];
    for (i, word) in words.iter_mut().enumerate() {
        *word = base + i as i32;
    }
    TelemetryFrame::from_words(words)
}
