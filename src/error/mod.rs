use thiserror::Error;

/// 专注会话核心错误分类
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FocusError {
    /// 空任务名、非正提醒间隔等非法输入
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 在错误的生命周期状态下调用操作
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// 调用顺序不满足前置条件（例如追加任务前未关闭当前任务）
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// 内部一致性被破坏，属于调用方的编排错误
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, FocusError>;

/// 校验任务名：去除首尾空白后不能为空
pub fn validate_task_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FocusError::InvalidInput(
            "Task name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert!(matches!(
            validate_task_name("   "),
            Err(FocusError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_task_name("\t\n"),
            Err(FocusError::InvalidInput(_))
        ));
        assert!(validate_task_name(" Write report ").is_ok());
    }

    #[test]
    fn messages_carry_the_detail() {
        let err = FocusError::InvalidState("session already ended".into());
        assert_eq!(err.to_string(), "invalid state: session already ended");
    }
}
