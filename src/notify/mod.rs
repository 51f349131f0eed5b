use anyhow::Result;
use notify_rust::{Notification, Timeout};
use std::sync::{Arc, Mutex, PoisonError};

/// 通知出口：发送即忘，核心不关心结果
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// 桌面通知管理器
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationManager;

impl NotificationManager {
    pub fn new() -> Self {
        Self
    }

    /// 发送专注提醒
    pub fn send_focus_reminder(&self, title: &str, body: &str) -> Result<()> {
        Notification::new()
            .summary(&format!("🎯 {}", title))
            .body(body)
            .icon("appointment-soon")
            .timeout(Timeout::Milliseconds(5000))
            .show()?;
        Ok(())
    }
}

impl NotificationSink for NotificationManager {
    fn notify(&self, title: &str, message: &str) {
        if let Err(e) = self.send_focus_reminder(title, message) {
            tracing::warn!("Failed to send notification: {}", e);
        }
    }
}

/// 记录所有通知，供测试断言和界面状态栏读取
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 取出并清空已记录的通知
    pub fn drain(&self) -> Vec<(String, String)> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, title: &str, message: &str) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_string(), message.to_string()));
    }
}

/// 同时转发给多个出口
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, title: &str, message: &str) {
        for sink in &self.sinks {
            sink.notify(title, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_drains() {
        let sink = RecordingSink::new();
        sink.notify("Reminder", "one");
        sink.notify("Reminder", "two");
        assert_eq!(sink.sent().len(), 2);

        let drained = sink.drain();
        assert_eq!(drained[1], ("Reminder".to_string(), "two".to_string()));
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = RecordingSink::new();
        let b = RecordingSink::new();
        let fanout = FanoutSink::new(vec![Arc::new(a.clone()), Arc::new(b.clone())]);
        fanout.notify("Reminder", "focus");
        assert_eq!(a.sent().len(), 1);
        assert_eq!(b.sent().len(), 1);
    }
}
