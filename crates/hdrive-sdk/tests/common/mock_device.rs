//! 模拟 HDrive 驱动器
//!
//! TCP 对象表：应答 `objRead`，应用 `objWrite`，记录收到的每条命令。
//! 可以让接下来的 N 次读取直接断开连接，用于验证重连逻辑。

use hdrive_sdk::SessionConfig;
use hdrive_sdk::protocol::{
    FIRMWARE_VERSION_OBJECT, ObjectRef, ObjectRequest, decode_object_request,
    encode_object_response,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Default)]
struct DeviceState {
    objects: Mutex<HashMap<ObjectRef, i32>>,
    received: Mutex<Vec<String>>,
    drop_next_reads: AtomicUsize,
    connections: AtomicUsize,
    running: AtomicBool,
}

pub struct MockDevice {
    addr: SocketAddr,
    state: Arc<DeviceState>,
    accept_thread: Option<JoinHandle<()>>,
}

impl MockDevice {
    /// 启动模拟驱动器（监听 127.0.0.1 的随机端口）
    pub fn start(firmware_version: i32) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(DeviceState::default());
        state.running.store(true, Ordering::SeqCst);
        state
            .objects
            .lock()
            .insert(FIRMWARE_VERSION_OBJECT, firmware_version);

        let accept_state = state.clone();
        let accept_thread = thread::spawn(move || accept_loop(listener, accept_state));

        Self {
            addr,
            state,
            accept_thread: Some(accept_thread),
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// 连接本设备的会话配置（UDP 绑定系统分配端口，握手间隔为 0）
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tcp_port: self.port(),
            udp_port: Some(0),
            io_timeout_ms: 1000,
            config_settle_ms: 0,
            telemetry_poll_ms: 20,
            ..SessionConfig::new("127.0.0.1")
        }
    }

    pub fn set_object(&self, obj: ObjectRef, value: i32) {
        self.state.objects.lock().insert(obj, value);
    }

    pub fn object(&self, obj: ObjectRef) -> Option<i32> {
        self.state.objects.lock().get(&obj).copied()
    }

    /// 接下来 `count` 次读取不作应答，直接断开连接
    pub fn drop_next_reads(&self, count: usize) {
        self.state.drop_next_reads.store(count, Ordering::SeqCst);
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// 收到的全部命令（按到达顺序）
    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().clone()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }
}

fn accept_loop(listener: TcpListener, state: Arc<DeviceState>) {
    while state.running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false).unwrap();
                stream
                    .set_read_timeout(Some(Duration::from_millis(50)))
                    .unwrap();
                state.connections.fetch_add(1, Ordering::SeqCst);
                let conn_state = state.clone();
                thread::spawn(move || serve_connection(stream, conn_state));
            },
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(5));
            },
            Err(_) => break,
        }
    }
}

fn serve_connection(mut stream: TcpStream, state: Arc<DeviceState>) {
    let mut pending = String::new();
    let mut buf = [0u8; 1024];

    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                if !state.running.load(Ordering::SeqCst) {
                    return;
                }
                continue;
            },
            Err(_) => return,
        };
        pending.push_str(&String::from_utf8_lossy(&buf[..n]));

        while let Some(message) = take_message(&mut pending) {
            state.received.lock().push(message.clone());

            match decode_object_request(&message) {
                Some(ObjectRequest::Read(obj)) => {
                    let drop_this = state
                        .drop_next_reads
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok();
                    if drop_this {
                        return;
                    }
                    let value = state.objects.lock().get(&obj).copied().unwrap_or(0);
                    if stream.write_all(&encode_object_response(obj, value)).is_err() {
                        return;
                    }
                },
                Some(ObjectRequest::Write(obj, value)) => {
                    state.objects.lock().insert(obj, value);
                },
                None => {},
            }
        }
    }
}

/// 从累积文本中取出一条完整命令（`... />`，控制命令可能带结尾引号）
fn take_message(pending: &mut String) -> Option<String> {
    let mut end = pending.find("/>")? + 2;
    if pending[end..].starts_with('"') {
        end += 1;
    }
    let message: String = pending.drain(..end).collect();
    Some(message.trim().to_string())
}
