//! TCP 命令通道
//!
//! 一条 TCP 连接承载所有命令。驱动器按到达顺序处理命令，响应不带请求标识，
//! 因此同一时刻只允许一个命令在途：所有发送与"发送+接收"事务都在同一把锁内完成。
//!
//! # 对象读取
//!
//! 读请求发出后累积接收字节，直到出现完整的 `<r .../>` 响应。
//! 超时、对端关闭或 IO 错误视为一次失败尝试：释放锁、重连一次、重试一次；
//! 第二次仍失败则返回 [`DriverError::ReadFailed`]。
//!
//! # 对象写入
//!
//! 写请求没有响应。发送后在锁内等待一个短暂的稳定时间（默认 1 ms），
//! 避免下一条命令紧贴着到达驱动器。

use crate::error::DriverError;
use crate::metrics::{ChannelMetrics, ChannelMetricsSnapshot};
use crate::state::{AtomicConnectionState, ConnectionState};
use hdrive_net::{CommandTransport, NetError, TransportConnector};
use hdrive_protocol::{
    ControlCommand, ControlFraming, ObjectRef, decode_object_response, encode_control,
    encode_disable, encode_object_read, encode_object_write, find_object_response, response_object,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// 单次接收的块大小
const RECV_CHUNK: usize = 1024;

/// 命令通道配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// 单次读取尝试的总时限
    pub response_timeout: Duration,
    /// 写命令后的稳定时间
    pub write_settle: Duration,
    /// 控制命令外层引号
    pub framing: ControlFraming,
    /// 未找到响应分隔符时允许累积的最大字节数
    pub max_response_len: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(5),
            write_settle: Duration::from_millis(1),
            framing: ControlFraming::default(),
            max_response_len: 4096,
        }
    }
}

/// 串行化的 TCP 命令通道
///
/// 泛型参数 `C` 是连接器，生产环境为 [`hdrive_net::TcpConnector`]，测试可注入 Mock。
pub struct CommandChannel<C: TransportConnector> {
    connector: C,
    config: ChannelConfig,
    /// 当前连接；锁即"在途命令"互斥量
    transport: Mutex<Option<C::Transport>>,
    state: AtomicConnectionState,
    /// 调用方是否期望保持连接（`open` 置位，`close` 清除）
    wanted: AtomicBool,
    metrics: ChannelMetrics,
}

impl<C: TransportConnector> CommandChannel<C> {
    pub fn new(connector: C, config: ChannelConfig) -> Self {
        Self {
            connector,
            config,
            transport: Mutex::new(None),
            state: AtomicConnectionState::default(),
            wanted: AtomicBool::new(false),
            metrics: ChannelMetrics::new(),
        }
    }

    /// 建立连接（已连接时为空操作）
    ///
    /// # 错误
    /// - `DriverError::Connection`: 连接失败
    pub fn open(&self) -> Result<(), DriverError> {
        let mut guard = self.transport.lock();
        if guard.is_some() && self.is_connected() {
            return Ok(());
        }
        if let Some(mut stale) = guard.take() {
            stale.shutdown();
        }

        let transport = self.connector.connect().map_err(|source| DriverError::Connection {
            peer: self.connector.peer(),
            source,
        })?;
        *guard = Some(transport);
        self.state.set(ConnectionState::Connected);
        self.wanted.store(true, Ordering::Release);
        debug!("Command channel connected to {}", self.connector.peer());
        Ok(())
    }

    /// 发送一条原始命令（不等待响应）
    ///
    /// 发送失败会把通道标记为断开。
    pub fn send(&self, bytes: &[u8]) -> Result<(), DriverError> {
        let mut guard = self.transport.lock();
        self.send_locked(&mut guard, bytes)
    }

    /// 发送控制命令
    pub fn send_control(&self, cmd: &ControlCommand) -> Result<(), DriverError> {
        let bytes = encode_control(cmd, self.config.framing);
        trace!("Sending control: {}", String::from_utf8_lossy(&bytes));
        self.send(&bytes)
    }

    fn send_locked(
        &self,
        guard: &mut Option<C::Transport>,
        bytes: &[u8],
    ) -> Result<(), DriverError> {
        let transport = match guard.as_mut() {
            Some(transport) if self.is_connected() => transport,
            _ => return Err(DriverError::NotConnected),
        };

        match transport.send_all(bytes) {
            Ok(()) => {
                self.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(e) => {
                self.state.set(ConnectionState::Disconnected);
                self.metrics.send_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Send to {} failed, marking disconnected: {}", self.connector.peer(), e);
                Err(DriverError::Send(e))
            },
        }
    }

    /// 写对象（无响应）
    pub fn write_object(&self, obj: ObjectRef, value: i32) -> Result<(), DriverError> {
        let request = encode_object_write(obj, value);
        let mut guard = self.transport.lock();
        self.send_locked(&mut guard, &request)?;
        self.metrics.object_writes.fetch_add(1, Ordering::Relaxed);
        debug!("objWrite {} = {}", obj, value);

        // 持锁等待，下一条命令在稳定时间之后才能发出
        spin_sleep::sleep(self.config.write_settle);
        Ok(())
    }

    /// 读对象
    ///
    /// # 错误
    /// - `DriverError::NotConnected`: 通道从未打开或已关闭（包括读取过程中被关闭）
    /// - `DriverError::Reconnect`: 首次尝试失败后重连失败
    /// - `DriverError::ReadFailed`: 重连重试后仍未收到响应
    /// - `DriverError::Response`: 响应含错误标记或缺少数值
    pub fn read_object(&self, obj: ObjectRef) -> Result<i32, DriverError> {
        self.metrics.object_reads.fetch_add(1, Ordering::Relaxed);

        let response = match self.try_read_object(obj)? {
            Some(response) => response,
            None => {
                debug!("objRead {}: no response, reconnecting", obj);
                self.reconnect()?;
                match self.try_read_object(obj)? {
                    Some(response) => response,
                    None => {
                        self.metrics.read_failures.fetch_add(1, Ordering::Relaxed);
                        return Err(DriverError::ReadFailed { object: obj });
                    },
                }
            },
        };

        if let Some(answered) = response_object(&response)
            && answered != obj
        {
            debug!("objRead {}: response addresses {}", obj, answered);
        }

        let value = decode_object_response(&response)
            .map_err(|source| DriverError::Response { object: obj, source })?;
        debug!("objRead {} = {}", obj, value);
        Ok(value)
    }

    /// 一次读取尝试（持锁完成"发送 + 接收"）
    ///
    /// `Ok(None)` 表示可重试的失败（超时、对端关闭、IO 错误、响应过长）。
    fn try_read_object(&self, obj: ObjectRef) -> Result<Option<String>, DriverError> {
        let mut guard = self.transport.lock();
        let transport = match guard.as_mut() {
            Some(transport) => transport,
            // 重连失败后连接为空，但调用方仍希望保持连接：交给重连逻辑
            None if self.wanted.load(Ordering::Acquire) => return Ok(None),
            None => return Err(DriverError::NotConnected),
        };

        if let Err(e) = transport.send_all(&encode_object_read(obj)) {
            debug!("objRead {}: send failed: {}", obj, e);
            return Ok(None);
        }
        self.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);

        let deadline = Instant::now() + self.config.response_timeout;
        let mut buffer = Vec::with_capacity(128);
        let mut chunk = [0u8; RECV_CHUNK];

        loop {
            match transport.receive(&mut chunk) {
                Ok(0) => {
                    debug!("objRead {}: connection closed by drive", obj);
                    return Ok(None);
                },
                Ok(n) => {
                    buffer.extend_from_slice(&chunk[..n]);
                    if let Some(response) = find_object_response(&buffer) {
                        return Ok(Some(response));
                    }
                    if buffer.len() > self.config.max_response_len {
                        warn!(
                            "objRead {}: {} bytes without a response delimiter",
                            obj,
                            buffer.len()
                        );
                        return Ok(None);
                    }
                    if Instant::now() >= deadline {
                        debug!("objRead {}: response incomplete at deadline", obj);
                        return Ok(None);
                    }
                },
                Err(NetError::Timeout) => {
                    debug!("objRead {}: receive timed out", obj);
                    return Ok(None);
                },
                Err(e) => {
                    debug!("objRead {}: receive failed: {}", obj, e);
                    return Ok(None);
                },
            }
        }
    }

    /// 关闭旧连接并重新连接
    ///
    /// 通道已被 `close` 时不再连接，返回 `DriverError::NotConnected`。
    fn reconnect(&self) -> Result<(), DriverError> {
        let mut guard = self.transport.lock();
        if !self.wanted.load(Ordering::Acquire) {
            debug!("Channel to {} closed during read, not reconnecting", self.connector.peer());
            return Err(DriverError::NotConnected);
        }
        if let Some(mut stale) = guard.take() {
            stale.shutdown();
        }

        match self.connector.connect() {
            Ok(transport) => {
                *guard = Some(transport);
                self.state.set(ConnectionState::Connected);
                self.metrics.reconnects.fetch_add(1, Ordering::Relaxed);
                debug!("Reconnected to {}", self.connector.peer());
                Ok(())
            },
            Err(source) => {
                self.state.set(ConnectionState::Disconnected);
                warn!("Reconnect to {} failed: {}", self.connector.peer(), source);
                Err(DriverError::Reconnect {
                    peer: self.connector.peer(),
                    source,
                })
            },
        }
    }

    /// 发送失能命令（mode=0, torque=0）
    pub fn send_disable(&self) -> Result<(), DriverError> {
        self.send(&encode_disable(self.config.framing))
    }

    /// 关闭连接（幂等）
    ///
    /// 连接可用时先尽力发送失能命令，再关闭 socket。
    pub fn close(&self) {
        self.wanted.store(false, Ordering::Release);
        if self.is_connected()
            && let Err(e) = self.send_disable()
        {
            debug!("Disable command on close failed: {}", e);
        }
        self.shutdown();
    }

    /// 不发送任何命令，直接关闭 socket（幂等）
    ///
    /// 之后的读取不会触发重连。
    pub fn shutdown(&self) {
        self.wanted.store(false, Ordering::Release);
        let mut guard = self.transport.lock();
        if let Some(mut transport) = guard.take() {
            transport.shutdown();
            debug!("Command channel to {} closed", self.connector.peer());
        }
        self.state.set(ConnectionState::Disconnected);
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state.get().is_connected()
    }

    pub fn metrics(&self) -> ChannelMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn peer(&self) -> String {
        self.connector.peer()
    }
}

impl<C: TransportConnector> std::fmt::Debug for CommandChannel<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandChannel")
            .field("peer", &self.connector.peer())
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrive_protocol::{ObjectRequest, decode_object_request, encode_object_response};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    /// 单次接收的脚本化行为
    #[derive(Clone)]
    enum Reply {
        /// 正常回答对象值
        Answer,
        /// 分两块返回响应
        Split,
        /// 直接返回给定字节
        Raw(&'static [u8]),
        /// 对端关闭
        Close,
        /// 超时
        Timeout,
        /// 阻塞给定时间后超时
        Stall(Duration),
    }

    /// Mock 驱动器状态（跨连接共享）
    #[derive(Default)]
    struct MockDrive {
        objects: parking_lot::Mutex<HashMap<ObjectRef, i32>>,
        /// 每次接收按顺序消费一条；耗尽后为 Answer
        script: parking_lot::Mutex<VecDeque<Reply>>,
        /// 所有连接上写入的字节（按写入顺序）
        written: parking_lot::Mutex<Vec<Vec<u8>>>,
        connects: AtomicUsize,
        /// 尚未释放的连接数
        live: AtomicUsize,
        refuse_connect: AtomicBool,
        fail_send: AtomicBool,
    }

    struct MockTransport {
        drive: Arc<MockDrive>,
        pending: VecDeque<Vec<u8>>,
    }

    impl CommandTransport for MockTransport {
        fn send_all(&mut self, bytes: &[u8]) -> Result<(), NetError> {
            if self.drive.fail_send.load(Ordering::SeqCst) {
                return Err(NetError::Closed);
            }
            self.drive.written.lock().push(bytes.to_vec());

            let text = String::from_utf8_lossy(bytes);
            match decode_object_request(&text) {
                Some(ObjectRequest::Read(obj)) => {
                    let value = self.drive.objects.lock().get(&obj).copied().unwrap_or(0);
                    self.pending.push_back(encode_object_response(obj, value));
                },
                Some(ObjectRequest::Write(obj, value)) => {
                    self.drive.objects.lock().insert(obj, value);
                },
                None => {},
            }
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
            let reply = self.drive.script.lock().pop_front().unwrap_or(Reply::Answer);
            match reply {
                Reply::Answer => {
                    let Some(bytes) = self.pending.pop_front() else {
                        return Err(NetError::Timeout);
                    };
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                },
                Reply::Split => {
                    let Some(bytes) = self.pending.pop_front() else {
                        return Err(NetError::Timeout);
                    };
                    let half = bytes.len() / 2;
                    buf[..half].copy_from_slice(&bytes[..half]);
                    self.pending.push_front(bytes[half..].to_vec());
                    Ok(half)
                },
                Reply::Raw(bytes) => {
                    self.pending.pop_front();
                    buf[..bytes.len()].copy_from_slice(bytes);
                    Ok(bytes.len())
                },
                Reply::Close => Ok(0),
                Reply::Timeout => Err(NetError::Timeout),
                Reply::Stall(duration) => {
                    thread::sleep(duration);
                    Err(NetError::Timeout)
                },
            }
        }
    }

    impl Drop for MockTransport {
        fn drop(&mut self) {
            self.drive.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct MockConnector {
        drive: Arc<MockDrive>,
    }

    impl TransportConnector for MockConnector {
        type Transport = MockTransport;

        fn connect(&self) -> Result<MockTransport, NetError> {
            if self.drive.refuse_connect.load(Ordering::SeqCst) {
                return Err(NetError::Closed);
            }
            self.drive.connects.fetch_add(1, Ordering::SeqCst);
            self.drive.live.fetch_add(1, Ordering::SeqCst);
            Ok(MockTransport {
                drive: self.drive.clone(),
                pending: VecDeque::new(),
            })
        }

        fn peer(&self) -> String {
            "mock-drive".to_string()
        }
    }

    fn open_channel() -> (CommandChannel<MockConnector>, Arc<MockDrive>) {
        let drive = Arc::new(MockDrive::default());
        let channel = CommandChannel::new(
            MockConnector {
                drive: drive.clone(),
            },
            ChannelConfig {
                write_settle: Duration::from_micros(10),
                ..ChannelConfig::default()
            },
        );
        channel.open().unwrap();
        (channel, drive)
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let (channel, drive) = open_channel();
        channel.write_object(ObjectRef::new(4, 22), 3).unwrap();
        assert_eq!(channel.read_object(ObjectRef::new(4, 22)).unwrap(), 3);

        let written = drive.written.lock();
        assert_eq!(written[0], b"<objWrite a=\"4\" b=\"22\" c=\"3\" />");
        assert_eq!(written[1], b"<objRead a=\"4\" b=\"22\" />");
    }

    #[test]
    fn test_split_response_is_reassembled() {
        let (channel, drive) = open_channel();
        drive.objects.lock().insert(ObjectRef::new(3, 0), 266);
        drive.script.lock().push_back(Reply::Split);

        assert_eq!(channel.read_object(ObjectRef::new(3, 0)).unwrap(), 266);
        assert_eq!(channel.metrics().reconnects, 0);
    }

    #[test]
    fn test_read_reconnects_once_after_peer_close() {
        let (channel, drive) = open_channel();
        drive.objects.lock().insert(ObjectRef::new(3, 0), 300);
        drive.script.lock().push_back(Reply::Close);

        assert_eq!(channel.read_object(ObjectRef::new(3, 0)).unwrap(), 300);
        assert_eq!(drive.connects.load(Ordering::SeqCst), 2);
        assert_eq!(channel.metrics().reconnects, 1);
        assert!(channel.is_connected());
    }

    #[test]
    fn test_read_fails_after_second_timeout() {
        let (channel, drive) = open_channel();
        drive
            .script
            .lock()
            .extend([Reply::Timeout, Reply::Timeout]);

        let err = channel.read_object(ObjectRef::new(3, 0)).unwrap_err();
        assert!(matches!(err, DriverError::ReadFailed { .. }));
        assert_eq!(channel.metrics().reconnects, 1);
        assert_eq!(channel.metrics().read_failures, 1);
    }

    #[test]
    fn test_reconnect_failure_is_reported() {
        let (channel, drive) = open_channel();
        drive.script.lock().push_back(Reply::Close);
        drive.refuse_connect.store(true, Ordering::SeqCst);

        let err = channel.read_object(ObjectRef::new(3, 0)).unwrap_err();
        assert!(matches!(err, DriverError::Reconnect { .. }));
        assert!(!channel.is_connected());

        // 驱动器恢复后，下一次读取通过重连恢复
        drive.refuse_connect.store(false, Ordering::SeqCst);
        drive.objects.lock().insert(ObjectRef::new(3, 0), 270);
        assert_eq!(channel.read_object(ObjectRef::new(3, 0)).unwrap(), 270);
        assert!(channel.is_connected());
    }

    #[test]
    fn test_error_response_is_not_retried() {
        let (channel, drive) = open_channel();
        drive
            .script
            .lock()
            .push_back(Reply::Raw(b"<r a=\"9\" b=\"9\" error=\"1\" />"));

        let err = channel.read_object(ObjectRef::new(9, 9)).unwrap_err();
        assert!(matches!(err, DriverError::Response { .. }));
        assert_eq!(drive.connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_overlong_garbage_counts_as_failed_attempt() {
        let (channel, drive) = open_channel();
        let garbage: &'static [u8] = &[b'x'; 1000];
        drive
            .script
            .lock()
            .extend(std::iter::repeat_n(Reply::Raw(garbage), 10));

        // 每次尝试在第 5 块（5000 字节）时超限
        let err = channel.read_object(ObjectRef::new(3, 0)).unwrap_err();
        assert!(matches!(err, DriverError::ReadFailed { .. }));
        assert_eq!(channel.metrics().reconnects, 1);
    }

    #[test]
    fn test_send_failure_marks_disconnected() {
        let (channel, drive) = open_channel();
        drive.fail_send.store(true, Ordering::SeqCst);

        let err = channel.write_object(ObjectRef::new(4, 34), 1).unwrap_err();
        assert!(matches!(err, DriverError::Send(_)));
        assert!(!channel.is_connected());

        let err = channel.send_control(&ControlCommand::default()).unwrap_err();
        assert!(matches!(err, DriverError::NotConnected));
    }

    #[test]
    fn test_commands_before_open_fail() {
        let drive = Arc::new(MockDrive::default());
        let channel = CommandChannel::new(MockConnector { drive }, ChannelConfig::default());

        assert!(matches!(
            channel.write_object(ObjectRef::new(4, 34), 1),
            Err(DriverError::NotConnected)
        ));
        assert!(matches!(
            channel.read_object(ObjectRef::new(3, 0)),
            Err(DriverError::NotConnected)
        ));
    }

    #[test]
    fn test_close_sends_disable_once() {
        let (channel, drive) = open_channel();
        channel.close();
        channel.close();

        let written = drive.written.lock();
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with(b"\"<control "));
        assert!(String::from_utf8_lossy(&written[0]).contains("mode=\"0\""));
        assert!(!channel.is_connected());
    }

    #[test]
    fn test_shutdown_sends_nothing() {
        let (channel, drive) = open_channel();
        channel.send_disable().unwrap();
        channel.shutdown();
        channel.close();

        assert_eq!(drive.written.lock().len(), 1);
        assert_eq!(drive.live.load(Ordering::SeqCst), 0);
        assert!(matches!(channel.send_disable(), Err(DriverError::NotConnected)));
    }

    #[test]
    fn test_close_during_read_does_not_reconnect() {
        for _ in 0..10 {
            let (channel, drive) = open_channel();
            drive
                .script
                .lock()
                .push_back(Reply::Stall(Duration::from_millis(100)));
            let channel = Arc::new(channel);

            let reader = {
                let channel = channel.clone();
                thread::spawn(move || channel.read_object(ObjectRef::new(3, 0)))
            };
            thread::sleep(Duration::from_millis(30));
            channel.close();
            let result = reader.join().unwrap();

            assert!(matches!(result, Err(DriverError::NotConnected)), "got {result:?}");
            assert!(!channel.is_connected());
            assert_eq!(drive.connects.load(Ordering::SeqCst), 1);
            assert_eq!(drive.live.load(Ordering::SeqCst), 0);
            assert_eq!(channel.metrics().reconnects, 0);
        }
    }

    #[test]
    fn test_concurrent_writes_are_not_interleaved() {
        let (channel, drive) = open_channel();
        let channel = Arc::new(channel);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let channel = channel.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        channel.write_object(ObjectRef::new(100 + t, i), i32::from(i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let written = drive.written.lock();
        assert_eq!(written.len(), 100);
        for bytes in written.iter() {
            let text = String::from_utf8_lossy(bytes);
            assert!(
                matches!(decode_object_request(&text), Some(ObjectRequest::Write(..))),
                "malformed request: {text}"
            );
        }
    }
}
