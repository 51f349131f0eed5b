use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{validate_task_name, FocusError, Result};

const MS_PER_MINUTE: f64 = 60_000.0;

/// 推荐休息时长占专注总时长的比例
pub const BREAK_RATIO: f64 = 0.25;

/// 专注任务：一段有名字的专注时间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub start_time: DateTime<Local>,
    pub end_time: Option<DateTime<Local>>,
}

impl Task {
    fn open(name: &str, at: DateTime<Local>) -> Self {
        Self {
            name: name.to_string(),
            start_time: at,
            end_time: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// 持续分钟数；未结束的任务按 `now` 计算，结果不为负
    pub fn duration_minutes(&self, now: DateTime<Local>) -> f64 {
        let end = self.end_time.unwrap_or(now);
        let ms = (end - self.start_time).num_milliseconds().max(0);
        ms as f64 / MS_PER_MINUTE
    }
}

/// 按时间顺序追加的任务记录。
///
/// 最后一个任务单独存放在 `current`，因此记录永远不为空；
/// `history` 中的任务都已结束。每次变更都返回新版本，
/// 旧版本保持不变，外部不会观察到"两个进行中"或"没有任务"的中间状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskLog {
    history: Vec<Task>,
    current: Task,
}

impl TaskLog {
    /// 以一个进行中的任务开始记录
    pub fn start(name: &str, at: DateTime<Local>) -> Result<Self> {
        validate_task_name(name)?;
        Ok(Self {
            history: Vec::new(),
            current: Task::open(name, at),
        })
    }

    /// 在 `at` 时刻结束当前任务
    pub fn close_open_task(&self, at: DateTime<Local>) -> Result<Self> {
        if !self.current.is_open() {
            return Err(FocusError::InvariantViolation(format!(
                "task '{}' is already closed",
                self.current.name
            )));
        }
        if at < self.current.start_time {
            return Err(FocusError::InvariantViolation(format!(
                "cannot close task '{}' before it started",
                self.current.name
            )));
        }

        let mut next = self.clone();
        next.current.end_time = Some(at);
        Ok(next)
    }

    /// 追加一个新的进行中任务，要求之前的任务已经结束
    pub fn append_task(&self, name: &str, at: DateTime<Local>) -> Result<Self> {
        validate_task_name(name)?;
        let previous_end = self.current.end_time.ok_or_else(|| {
            FocusError::PreconditionFailed(format!(
                "task '{}' is still open",
                self.current.name
            ))
        })?;
        if at < previous_end {
            return Err(FocusError::PreconditionFailed(
                "new task would overlap the previous one".to_string(),
            ));
        }

        let mut history = self.history.clone();
        history.push(self.current.clone());
        Ok(Self {
            history,
            current: Task::open(name, at),
        })
    }

    /// 结束当前任务并在同一时刻开始新任务
    pub fn switch_task(&self, name: &str, at: DateTime<Local>) -> Result<Self> {
        // 先校验名字，避免关闭成功后追加失败
        validate_task_name(name)?;
        self.close_open_task(at)?.append_task(name, at)
    }

    /// 每个任务的 (名字, 分钟数)，按记录顺序
    pub fn durations_minutes(&self, now: DateTime<Local>) -> Vec<TaskDuration> {
        self.tasks()
            .map(|task| TaskDuration {
                name: task.name.clone(),
                minutes: task.duration_minutes(now),
            })
            .collect()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.history.iter().chain(std::iter::once(&self.current))
    }

    /// 最后一个任务（会话进行中时即当前任务）
    pub fn last(&self) -> &Task {
        &self.current
    }

    pub fn open_task(&self) -> Option<&Task> {
        Some(&self.current).filter(|task| task.is_open())
    }

    pub fn len(&self) -> usize {
        self.history.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// 单个任务的耗时
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDuration {
    pub name: String,
    pub minutes: f64,
}

/// 会话总结，由任务记录推导而来
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub per_task_durations_minutes: Vec<TaskDuration>,
    pub total_focus_minutes: f64,
    pub recommended_break_minutes: f64,
}

impl SessionSummary {
    pub fn from_log(log: &TaskLog, now: DateTime<Local>) -> Self {
        let per_task_durations_minutes = log.durations_minutes(now);
        let total_focus_minutes = per_task_durations_minutes
            .iter()
            .map(|entry| entry.minutes)
            .sum::<f64>();

        Self {
            per_task_durations_minutes,
            total_focus_minutes,
            recommended_break_minutes: total_focus_minutes * BREAK_RATIO,
        }
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Session Summary")?;
        for (index, entry) in self.per_task_durations_minutes.iter().enumerate() {
            writeln!(f, "{}. {}: {:.2} minutes", index + 1, entry.name, entry.minutes)?;
        }
        writeln!(f)?;
        writeln!(f, "### Recommended Break")?;
        write!(
            f,
            "Take a break for {:.2} minutes.",
            self.recommended_break_minutes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn start_opens_a_single_task() {
        let log = TaskLog::start("Write report", t0()).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().name, "Write report");
        assert_eq!(log.last().start_time, t0());
        assert!(log.open_task().is_some());
    }

    #[test]
    fn start_rejects_blank_name() {
        assert!(matches!(
            TaskLog::start("   ", t0()),
            Err(FocusError::InvalidInput(_))
        ));
    }

    #[test]
    fn close_twice_is_an_invariant_violation() {
        let log = TaskLog::start("A", t0()).unwrap();
        let closed = log.close_open_task(t0() + Duration::minutes(1)).unwrap();
        assert!(closed.open_task().is_none());
        assert!(matches!(
            closed.close_open_task(t0() + Duration::minutes(2)),
            Err(FocusError::InvariantViolation(_))
        ));
    }

    #[test]
    fn close_before_start_is_rejected() {
        let log = TaskLog::start("A", t0()).unwrap();
        assert!(matches!(
            log.close_open_task(t0() - Duration::seconds(1)),
            Err(FocusError::InvariantViolation(_))
        ));
    }

    #[test]
    fn append_requires_closed_task() {
        let log = TaskLog::start("A", t0()).unwrap();
        assert!(matches!(
            log.append_task("B", t0()),
            Err(FocusError::PreconditionFailed(_))
        ));

        let closed = log.close_open_task(t0() + Duration::minutes(3)).unwrap();
        assert!(matches!(
            closed.append_task("", t0() + Duration::minutes(3)),
            Err(FocusError::InvalidInput(_))
        ));
        let appended = closed.append_task("B", t0() + Duration::minutes(3)).unwrap();
        assert_eq!(appended.len(), 2);
        assert_eq!(appended.last().name, "B");
    }

    #[test]
    fn switch_leaves_previous_version_untouched() {
        let log = TaskLog::start("A", t0()).unwrap();
        let at = t0() + Duration::minutes(10);
        let switched = log.switch_task("B", at).unwrap();

        assert_eq!(log.len(), 1);
        assert!(log.last().is_open());

        let tasks: Vec<&Task> = switched.tasks().collect();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].end_time, Some(at));
        assert_eq!(tasks[1].start_time, at);
        assert!(tasks[1].is_open());
    }

    #[test]
    fn switch_with_blank_name_changes_nothing() {
        let log = TaskLog::start("A", t0()).unwrap();
        assert!(matches!(
            log.switch_task(" ", t0() + Duration::minutes(1)),
            Err(FocusError::InvalidInput(_))
        ));
        assert!(log.last().is_open());
    }

    #[test]
    fn same_name_switch_is_not_coalesced() {
        let log = TaskLog::start("A", t0())
            .unwrap()
            .switch_task("A", t0() + Duration::minutes(5))
            .unwrap();
        let names: Vec<&str> = log.tasks().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "A"]);
    }

    #[test]
    fn open_task_is_measured_against_now_and_never_negative() {
        let log = TaskLog::start("A", t0()).unwrap();
        let durations = log.durations_minutes(t0() + Duration::seconds(90));
        assert_eq!(durations[0].minutes, 1.5);

        let skewed = log.durations_minutes(t0() - Duration::minutes(1));
        assert_eq!(skewed[0].minutes, 0.0);
    }

    #[test]
    fn summary_renders_markdown() {
        let log = TaskLog::start("Write report", t0())
            .unwrap()
            .switch_task("Review PR", t0() + Duration::minutes(10))
            .unwrap()
            .close_open_task(t0() + Duration::minutes(25))
            .unwrap();
        let summary = SessionSummary::from_log(&log, t0() + Duration::hours(1));

        assert_eq!(summary.total_focus_minutes, 25.0);
        assert_eq!(summary.recommended_break_minutes, 6.25);
        assert_eq!(
            summary.to_string(),
            "# Session Summary\n\
             1. Write report: 10.00 minutes\n\
             2. Review PR: 15.00 minutes\n\
             \n\
             ### Recommended Break\n\
             Take a break for 6.25 minutes."
        );
    }
}
