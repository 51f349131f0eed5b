use chrono::{DateTime, Local};
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Preferences;
use crate::error::{FocusError, Result};
use crate::models::{SessionSummary, TaskLog};
use crate::notify::NotificationSink;
use crate::reminder::ReminderSchedule;

pub const REMINDER_TITLE: &str = "Reminder";

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Ended,
}

/// 专注会话控制器。
///
/// 持有任务记录和提醒计划；所有操作都是同步的，由宿主事件循环驱动。
/// 每个操作要么整体生效，要么不改变任何可观察状态。
pub struct FocusSession {
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
    log: TaskLog,
    state: SessionState,
    reminders: Option<ReminderSchedule>,
}

impl FocusSession {
    /// 以初始任务开始会话，开启提醒时同时排定提醒计划
    pub fn start(
        name: &str,
        prefs: &Preferences,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        prefs.validate()?;
        let now = clock.now();
        let log = TaskLog::start(name, now)?;

        let reminders = if prefs.reminders_enabled {
            Some(ReminderSchedule::from_minutes(
                prefs.reminder_interval_minutes,
                now,
            )?)
        } else {
            None
        };

        tracing::info!(
            task = name,
            reminders = prefs.reminders_enabled,
            "Focus session started"
        );

        Ok(Self {
            clock,
            notifier,
            log,
            state: SessionState::Active,
            reminders,
        })
    }

    fn ensure_active(&self, operation: &str) -> Result<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Ended => Err(FocusError::InvalidState(format!(
                "cannot {} after the session has ended",
                operation
            ))),
        }
    }

    /// 切换到新任务；提醒节奏不受影响
    pub fn switch_focus(&mut self, name: &str) -> Result<()> {
        self.ensure_active("switch focus")?;
        let at = self.clock.now();
        self.log = self.log.switch_task(name, at)?;
        tracing::info!(task = name, tasks = self.log.len(), "Focus switched");
        Ok(())
    }

    /// 结束会话：关闭当前任务并取消提醒。不可重复调用
    pub fn end(&mut self) -> Result<()> {
        self.ensure_active("end the session")?;
        let at = self.clock.now();
        self.log = self.log.close_open_task(at)?;
        self.state = SessionState::Ended;
        self.cancel_reminders();
        tracing::info!(tasks = self.log.len(), "Focus session ended");
        Ok(())
    }

    fn cancel_reminders(&mut self) {
        if let Some(schedule) = self.reminders.as_mut() {
            if schedule.cancel() {
                tracing::debug!("Reminder schedule cancelled");
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn log(&self) -> &TaskLog {
        &self.log
    }

    /// 会话使用的时钟当前时刻
    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    /// 当前（或结束时最后一个）任务名
    pub fn current_task_name(&self) -> &str {
        &self.log.last().name
    }

    /// 当前任务已进行的分钟数，每次调用都重新读取时钟
    pub fn elapsed_minutes(&self) -> Result<f64> {
        match self.state {
            SessionState::Active => Ok(self.log.last().duration_minutes(self.clock.now())),
            SessionState::Ended => Err(FocusError::InvalidState(
                "elapsed time is only available while the session is active".to_string(),
            )),
        }
    }

    /// 会话总结，只能在结束后计算
    pub fn summary(&self) -> Result<SessionSummary> {
        match self.state {
            SessionState::Ended => Ok(SessionSummary::from_log(&self.log, self.clock.now())),
            SessionState::Active => Err(FocusError::InvalidState(
                "summary is only available after the session has ended".to_string(),
            )),
        }
    }

    pub fn next_reminder(&self) -> Option<DateTime<Local>> {
        self.reminders.as_ref().and_then(ReminderSchedule::next_due)
    }

    /// 宿主循环的轮询入口：到期时触发一次提醒，返回触发次数。
    /// 两次轮询之间错过多个截止点也只提醒一次，内容读取触发时刻的当前任务
    pub fn fire_due_reminders(&mut self) -> usize {
        if self.state != SessionState::Active {
            return 0;
        }
        let now = self.clock.now();
        let due = self
            .reminders
            .as_mut()
            .is_some_and(|schedule| schedule.due(now));
        if !due {
            return 0;
        }

        let message = format!("Refocus on your task: {}", self.current_task_name());
        tracing::debug!("{}", message);
        self.notifier.notify(REMINDER_TITLE, &message);
        1
    }
}

impl Drop for FocusSession {
    fn drop(&mut self) {
        self.cancel_reminders();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::RecordingSink;
    use chrono::Duration;

    fn no_reminders() -> Preferences {
        Preferences {
            reminders_enabled: false,
            reminder_interval_minutes: 0.0,
        }
    }

    fn session(name: &str, prefs: &Preferences) -> (FocusSession, ManualClock, RecordingSink) {
        let clock = ManualClock::new();
        let sink = RecordingSink::new();
        let session = FocusSession::start(
            name,
            prefs,
            Arc::new(clock.clone()),
            Arc::new(sink.clone()),
        )
        .unwrap();
        (session, clock, sink)
    }

    #[test]
    fn blank_initial_task_is_rejected() {
        let result = FocusSession::start(
            "   ",
            &no_reminders(),
            Arc::new(ManualClock::new()),
            Arc::new(RecordingSink::new()),
        );
        assert!(matches!(result, Err(FocusError::InvalidInput(_))));
    }

    #[test]
    fn invalid_interval_is_rejected_when_enabled() {
        let prefs = Preferences {
            reminders_enabled: true,
            reminder_interval_minutes: -1.0,
        };
        let result = FocusSession::start(
            "Task",
            &prefs,
            Arc::new(ManualClock::new()),
            Arc::new(RecordingSink::new()),
        );
        assert!(matches!(result, Err(FocusError::InvalidInput(_))));
    }

    #[test]
    fn elapsed_rereads_the_clock() {
        let (session, clock, _) = session("Task", &no_reminders());
        assert_eq!(session.elapsed_minutes().unwrap(), 0.0);
        clock.advance(Duration::seconds(30));
        assert_eq!(session.elapsed_minutes().unwrap(), 0.5);
        clock.advance(Duration::seconds(90));
        assert_eq!(session.elapsed_minutes().unwrap(), 2.0);
    }

    #[test]
    fn elapsed_restarts_on_switch() {
        let (mut session, clock, _) = session("A", &no_reminders());
        clock.advance(Duration::minutes(7));
        session.switch_focus("B").unwrap();
        clock.advance(Duration::minutes(2));
        assert_eq!(session.elapsed_minutes().unwrap(), 2.0);
        assert_eq!(session.current_task_name(), "B");
    }

    #[test]
    fn lifecycle_errors() {
        let (mut session, _, _) = session("A", &no_reminders());
        assert!(matches!(session.summary(), Err(FocusError::InvalidState(_))));

        session.end().unwrap();
        assert_eq!(session.state(), SessionState::Ended);
        assert!(matches!(session.end(), Err(FocusError::InvalidState(_))));
        assert!(matches!(
            session.switch_focus("B"),
            Err(FocusError::InvalidState(_))
        ));
        assert!(matches!(
            session.elapsed_minutes(),
            Err(FocusError::InvalidState(_))
        ));
        assert_eq!(session.current_task_name(), "A");
    }

    #[test]
    fn failed_switch_keeps_state() {
        let (mut session, clock, _) = session("A", &no_reminders());
        clock.advance(Duration::minutes(1));
        assert!(matches!(
            session.switch_focus(""),
            Err(FocusError::InvalidInput(_))
        ));
        assert_eq!(session.log().len(), 1);
        assert!(session.log().open_task().is_some());
    }

    #[test]
    fn reminders_report_the_task_current_at_fire_time() {
        let prefs = Preferences {
            reminders_enabled: true,
            reminder_interval_minutes: 1.0,
        };
        let (mut session, clock, sink) = session("A", &prefs);

        clock.advance(Duration::seconds(61));
        assert_eq!(session.fire_due_reminders(), 1);
        session.switch_focus("B").unwrap();
        clock.advance(Duration::seconds(60));
        assert_eq!(session.fire_due_reminders(), 1);

        let messages: Vec<String> = sink.sent().into_iter().map(|(_, m)| m).collect();
        assert_eq!(
            messages,
            vec!["Refocus on your task: A", "Refocus on your task: B"]
        );
    }

    #[test]
    fn end_cancels_reminders() {
        let prefs = Preferences {
            reminders_enabled: true,
            reminder_interval_minutes: 1.0,
        };
        let (mut session, clock, sink) = session("A", &prefs);
        assert!(session.next_reminder().is_some());

        clock.advance(Duration::seconds(30));
        session.end().unwrap();
        assert_eq!(session.next_reminder(), None);

        clock.advance(Duration::minutes(10));
        assert_eq!(session.fire_due_reminders(), 0);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn disabled_reminders_never_fire() {
        let (mut session, clock, sink) = session("A", &no_reminders());
        clock.advance(Duration::hours(2));
        assert_eq!(session.fire_due_reminders(), 0);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn long_gap_between_polls_fires_once() {
        let prefs = Preferences {
            reminders_enabled: true,
            reminder_interval_minutes: 1.0,
        };
        let (mut session, clock, sink) = session("A", &prefs);
        clock.advance(Duration::hours(8));
        assert_eq!(session.fire_due_reminders(), 1);
        assert_eq!(session.fire_due_reminders(), 0);
        assert_eq!(sink.sent().len(), 1);
    }

    #[test]
    fn huge_interval_is_an_error_not_a_panic() {
        let prefs = Preferences {
            reminders_enabled: true,
            reminder_interval_minutes: 1e300,
        };
        let result = FocusSession::start(
            "Task",
            &prefs,
            Arc::new(ManualClock::new()),
            Arc::new(RecordingSink::new()),
        );
        assert!(matches!(result, Err(FocusError::InvalidInput(_))));
    }

    #[test]
    fn drop_path_cancels_an_active_schedule() {
        let prefs = Preferences {
            reminders_enabled: true,
            reminder_interval_minutes: 1.0,
        };
        let (mut session, clock, sink) = session("A", &prefs);
        assert!(session.next_reminder().is_some());

        // Drop 调用的正是这个方法
        session.cancel_reminders();
        assert_eq!(session.next_reminder(), None);
        clock.advance(Duration::minutes(5));
        assert_eq!(session.fire_due_reminders(), 0);
        assert!(session.is_active());

        drop(session);
        clock.advance(Duration::minutes(5));
        assert!(sink.sent().is_empty());
    }
}
