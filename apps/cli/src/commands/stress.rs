//! 对象读写压力测试
//!
//! 三个阶段：循环读取一组网络对象、交替写入 m4s34、写入后读回。
//! 每个阶段输出成功/失败计数与延迟统计，结束时恢复 autosend。

use crate::connection::ConnectionArgs;
use anyhow::Result;
use clap::Args;
use hdrive_sdk::prelude::*;
use std::thread;
use std::time::{Duration, Instant};

/// 读取阶段轮流访问的对象
const READ_OBJECTS: [(&str, ObjectRef); 5] = [
    ("TCP port", TCP_PORT_OBJECT),
    ("UDP port", UDP_PORT_OBJECT),
    ("UDP communication", UDP_ENABLE_OBJECT),
    ("Ticket protocol", TICKET_PROTOCOL_OBJECT),
    ("Autosend", AUTOSEND_OBJECT),
];

#[derive(Args, Debug)]
pub struct StressCommand {
    /// 读取次数
    #[arg(long, default_value_t = 100)]
    pub reads: usize,

    /// 写入次数
    #[arg(long, default_value_t = 100)]
    pub writes: usize,

    /// 写入+读回轮数
    #[arg(long, default_value_t = 100)]
    pub mix: usize,

    /// 两次请求之间的间隔（毫秒）
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,
}

impl StressCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let session = connection.connect()?;
        let delay = Duration::from_millis(self.delay_ms);
        println!("Target: {}", session.peer());
        println!("Delay:  {} ms between requests", self.delay_ms);

        let reads = run_reads(&session, self.reads, delay);
        reads.print("READ");
        let writes = run_writes(&session, self.writes, delay);
        writes.print("WRITE");
        let mix = run_mix(&session, self.mix, delay);
        mix.print("READ/WRITE MIX");

        if let Err(e) = session.write_object(AUTOSEND_OBJECT, 1) {
            tracing::warn!("Could not restore autosend: {}", e);
        }

        let metrics = session.channel_metrics();
        println!(
            "Channel: {} reconnects, {} failed reads",
            metrics.reconnects, metrics.read_failures
        );
        println!("✅ All stress runs complete");
        Ok(())
    }
}

fn banner(title: &str, count: usize, delay: Duration) {
    println!("\n{}", "=".repeat(60));
    println!("  {title}: {count} requests, delay {} ms", delay.as_millis());
    println!("{}\n", "=".repeat(60));
}

/// 前 10 次以及之后每 100 次打印一行
fn should_print(i: usize) -> bool {
    i < 10 || i % 100 == 0
}

fn run_reads(session: &DriveSession, count: usize, delay: Duration) -> StressStats {
    banner("READ STRESS", count, delay);
    let mut stats = StressStats::default();

    for i in 0..count {
        let (name, obj) = READ_OBJECTS[i % READ_OBJECTS.len()];
        let start = Instant::now();
        match session.read_object(obj) {
            Ok(value) => {
                let elapsed = stats.ok(start);
                if should_print(i) {
                    println!(
                        "  [{:>5}/{count}]  {obj:<6} {name:.<25} {value:>8}   {:.1}ms",
                        i + 1,
                        millis(elapsed)
                    );
                }
            },
            Err(e) => {
                let elapsed = stats.error(start);
                println!("  [{:>5}/{count}]  {obj:<6} ERROR ({:.1}ms): {e}", i + 1, millis(elapsed));
            },
        }
        pause(delay);
    }
    stats
}

fn run_writes(session: &DriveSession, count: usize, delay: Duration) -> StressStats {
    banner("WRITE STRESS", count, delay);
    let mut stats = StressStats::default();

    for i in 0..count {
        let value = (i % 2) as i32;
        let start = Instant::now();
        match session.write_object(AUTOSEND_OBJECT, value) {
            Ok(()) => {
                let elapsed = stats.ok(start);
                if should_print(i) {
                    println!(
                        "  [{:>5}/{count}]  write {AUTOSEND_OBJECT} = {value}   {:.1}ms",
                        i + 1,
                        millis(elapsed)
                    );
                }
            },
            Err(e) => {
                let elapsed = stats.error(start);
                println!(
                    "  [{:>5}/{count}]  write {AUTOSEND_OBJECT} ERROR ({:.1}ms): {e}",
                    i + 1,
                    millis(elapsed)
                );
            },
        }
        pause(delay);
    }
    stats
}

fn run_mix(session: &DriveSession, count: usize, delay: Duration) -> StressStats {
    banner("READ/WRITE MIX", count, delay);
    let mut stats = StressStats::default();

    for i in 0..count {
        let value = (i % 2) as i32;
        let start = Instant::now();
        if let Err(e) = session.write_object(AUTOSEND_OBJECT, value) {
            let elapsed = stats.error(start);
            println!("  [{:>5}/{count}]  write ERROR ({:.1}ms): {e}", i + 1, millis(elapsed));
            pause(delay);
            continue;
        }
        pause(delay);

        match session.read_object(AUTOSEND_OBJECT) {
            Ok(read_back) => {
                let elapsed = stats.ok(start);
                if should_print(i) {
                    println!(
                        "  [{:>5}/{count}]  write+read {AUTOSEND_OBJECT} = {read_back}   {:.1}ms",
                        i + 1,
                        millis(elapsed)
                    );
                }
            },
            Err(e) => {
                let elapsed = stats.error(start);
                println!("  [{:>5}/{count}]  read ERROR ({:.1}ms): {e}", i + 1, millis(elapsed));
            },
        }
        pause(delay);
    }
    stats
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// 一个阶段的计数与成功请求的延迟
#[derive(Debug, Default)]
pub struct StressStats {
    ok: usize,
    errors: usize,
    latencies: Vec<Duration>,
}

/// 延迟汇总
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub min: Duration,
    pub avg: Duration,
    pub p95: Duration,
    pub max: Duration,
}

impl StressStats {
    fn ok(&mut self, start: Instant) -> Duration {
        let elapsed = start.elapsed();
        self.record(elapsed);
        elapsed
    }

    fn error(&mut self, start: Instant) -> Duration {
        self.errors += 1;
        start.elapsed()
    }

    pub fn record(&mut self, latency: Duration) {
        self.ok += 1;
        self.latencies.push(latency);
    }

    pub fn total(&self) -> usize {
        self.ok + self.errors
    }

    pub fn error_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.errors as f64 / total as f64,
        }
    }

    /// 成功请求的延迟统计；没有成功请求时为 `None`
    pub fn summary(&self) -> Option<LatencySummary> {
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        let min = *sorted.first()?;
        let max = *sorted.last()?;
        let total: Duration = sorted.iter().sum();
        let avg = total / sorted.len() as u32;
        // 最近秩法：rank = ceil(0.95 * n)
        let rank = (sorted.len() * 95).div_ceil(100);
        let p95 = sorted[rank.saturating_sub(1)];
        Some(LatencySummary { min, avg, p95, max })
    }

    /// 每秒成功请求数（按累计延迟计算）
    pub fn throughput(&self) -> Option<f64> {
        let busy: Duration = self.latencies.iter().sum();
        (!busy.is_zero()).then(|| self.ok as f64 / busy.as_secs_f64())
    }

    fn print(&self, label: &str) {
        println!("\n  --- {label} RESULTS ---");
        println!("  Total:    {}", self.total());
        println!("  OK:       {}", self.ok);
        println!("  Errors:   {}  ({:.1}%)", self.errors, self.error_rate() * 100.0);
        if let Some(s) = self.summary() {
            println!(
                "  Latency:  min {:.1}ms  avg {:.1}ms  p95 {:.1}ms  max {:.1}ms",
                millis(s.min),
                millis(s.avg),
                millis(s.p95),
                millis(s.max)
            );
        }
        if let Some(rps) = self.throughput() {
            println!("  Throughput: {rps:.1} req/s");
        }
        println!();
    }
}
