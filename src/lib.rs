//! 专注会话记录：声明任务、随时切换、结束时给出每个任务的耗时和建议休息时长。

pub mod clock;
pub mod config;
pub mod error;
pub mod headless;
pub mod models;
pub mod notify;
pub mod reminder;
pub mod session;
pub mod ui;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Preferences;
pub use error::{FocusError, Result};
pub use models::{SessionSummary, Task, TaskDuration, TaskLog};
pub use notify::{NotificationManager, NotificationSink, RecordingSink};
pub use session::{FocusSession, SessionState};
