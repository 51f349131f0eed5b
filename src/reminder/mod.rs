use chrono::{DateTime, Duration, Local};

use crate::error::{FocusError, Result};

/// 可取消的重复提醒计划。
///
/// 本身不持有线程或定时器，由宿主事件循环定期调用 [`ReminderSchedule::due`]。
/// 两次轮询之间错过的截止点合并为一次触发。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSchedule {
    interval: Duration,
    next_due: DateTime<Local>,
    cancelled: bool,
}

impl ReminderSchedule {
    pub fn new(interval: Duration, started_at: DateTime<Local>) -> Result<Self> {
        if interval <= Duration::zero() {
            return Err(FocusError::InvalidInput(
                "reminder interval must be positive".to_string(),
            ));
        }
        if interval.num_milliseconds() < 1 {
            return Err(FocusError::InvalidInput(
                "reminder interval is below millisecond resolution".to_string(),
            ));
        }
        let next_due = started_at.checked_add_signed(interval).ok_or_else(|| {
            FocusError::InvalidInput("reminder interval is out of range".to_string())
        })?;
        Ok(Self {
            interval,
            next_due,
            cancelled: false,
        })
    }

    /// 分钟数转换为提醒间隔，精确到毫秒，最短 1 毫秒
    pub fn from_minutes(minutes: f64, started_at: DateTime<Local>) -> Result<Self> {
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(FocusError::InvalidInput(format!(
                "reminder interval must be a positive number of minutes, got {}",
                minutes
            )));
        }
        // 过大的值转换时饱和，随后由带检查的时间运算拒绝
        let ms = ((minutes * 60_000.0).round() as i64).max(1);
        let interval = Duration::try_milliseconds(ms).ok_or_else(|| {
            FocusError::InvalidInput(format!(
                "reminder interval of {} minutes is out of range",
                minutes
            ))
        })?;
        Self::new(interval, started_at)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_due(&self) -> Option<DateTime<Local>> {
        (!self.cancelled).then_some(self.next_due)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// 自上次轮询以来是否到期，并把下一个截止点推到 `now` 之后。
    /// 截止点超出时间范围时计划自动取消
    pub fn due(&mut self, now: DateTime<Local>) -> bool {
        if self.cancelled || self.next_due > now {
            return false;
        }

        let interval_ms = self.interval.num_milliseconds();
        let missed = (now - self.next_due).num_milliseconds() / interval_ms + 1;
        let next = interval_ms
            .checked_mul(missed)
            .and_then(Duration::try_milliseconds)
            .and_then(|skip| self.next_due.checked_add_signed(skip));

        match next {
            Some(next) => self.next_due = next,
            None => {
                tracing::debug!("Next reminder is out of range, cancelling schedule");
                self.cancelled = true;
            }
        }
        true
    }

    /// 取消计划；返回本次调用是否真正执行了取消
    pub fn cancel(&mut self) -> bool {
        if self.cancelled {
            return false;
        }
        self.cancelled = true;
        true
    }
}
