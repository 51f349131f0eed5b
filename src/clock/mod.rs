use chrono::{DateTime, Duration, Local};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// 时间源，便于在测试中控制时间
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// 本地墙上时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// 手动推进的时钟，克隆体共享同一个偏移量
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: DateTime<Local>,
    offset_ms: Arc<AtomicI64>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Local::now())
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(base: DateTime<Local>) -> Self {
        Self {
            base,
            offset_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    /// 向前推进
    pub fn advance(&self, by: Duration) {
        self.offset_ms
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    /// 跳到相对起点的某个时刻
    pub fn set_offset(&self, offset: Duration) {
        self.offset_ms
            .store(offset.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.base + Duration::milliseconds(self.offset_ms.load(Ordering::SeqCst))
    }
}
