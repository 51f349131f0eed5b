use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::FocusError;

pub const CONFIG_FILE: &str = "config.toml";

/// 用户偏好，只在会话开始时读取
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub reminders_enabled: bool,
    pub reminder_interval_minutes: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            reminders_enabled: true,
            reminder_interval_minutes: 15.0,
        }
    }
}

impl Preferences {
    /// 开启提醒时间隔必须为正数
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.reminders_enabled
            && (!self.reminder_interval_minutes.is_finite()
                || self.reminder_interval_minutes <= 0.0)
        {
            return Err(FocusError::InvalidInput(format!(
                "reminder interval must be positive, got {}",
                self.reminder_interval_minutes
            )));
        }
        Ok(())
    }

    /// 从TOML文件读取；文件不存在时使用默认值
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let prefs: Preferences =
            toml::from_str(&raw).with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(prefs)
    }

    /// 命令行参数覆盖配置文件
    pub fn with_overrides(mut self, interval: Option<f64>, no_reminders: bool) -> Self {
        if let Some(minutes) = interval {
            self.reminder_interval_minutes = minutes;
        }
        if no_reminders {
            self.reminders_enabled = false;
        }
        self
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "focus-on", "focus").context("Failed to get project directories")
}

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
}

/// 数据目录（日志文件所在位置），不存在则创建
pub fn data_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    let dir = dirs.data_dir();
    std::fs::create_dir_all(dir).context("Failed to create data directory")?;
    Ok(dir.to_path_buf())
}
