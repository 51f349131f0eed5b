// 无终端界面的运行方式：从标准输入逐行读取命令

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::session::FocusSession;

/// 行命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Switch(String),
    Status,
    End,
    Help,
}

const HELP: &str = "commands: switch <task> | status | end | help";

/// 解析一行输入
pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "switch" | "s" => Ok(Command::Switch(rest.to_string())),
        "status" | "st" => Ok(Command::Status),
        "end" | "e" => Ok(Command::End),
        "help" | "?" => Ok(Command::Help),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command '{}'", other)),
    }
}

/// 当前任务和已用时间
pub fn status_line(session: &FocusSession) -> String {
    match session.elapsed_minutes() {
        Ok(minutes) => format!(
            "Focusing On: {}\nTime Elapsed: {:.1} minutes",
            session.current_task_name(),
            minutes
        ),
        Err(e) => e.to_string(),
    }
}

/// 事件循环：命令输入与提醒轮询交替进行，直到会话结束。
/// 输入结束（EOF）视为结束会话
pub async fn run<R, W>(
    session: &mut FocusSession,
    input: R,
    mut output: W,
    tick: Duration,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    output
        .write_all(format!("{}\n{}\n", status_line(session), HELP).as_bytes())
        .await?;

    while session.is_active() {
        tokio::select! {
            line = lines.next_line() => {
                let reply = match line? {
                    Some(line) => handle_line(session, &line),
                    None => {
                        tracing::debug!("Input closed, ending session");
                        session.end()?;
                        continue;
                    }
                };
                if let Some(reply) = reply {
                    output.write_all(format!("{}\n", reply).as_bytes()).await?;
                }
            }
            _ = ticker.tick() => {
                session.fire_due_reminders();
            }
        }
    }

    output.flush().await?;
    Ok(())
}

fn handle_line(session: &mut FocusSession, line: &str) -> Option<String> {
    if line.trim().is_empty() {
        return None;
    }
    let reply = match parse_command(line) {
        Ok(Command::Switch(name)) => match session.switch_focus(&name) {
            Ok(()) => status_line(session),
            Err(e) => format!("error: {}", e),
        },
        Ok(Command::Status) => status_line(session),
        Ok(Command::End) => match session.end() {
            Ok(()) => return None,
            Err(e) => format!("error: {}", e),
        },
        Ok(Command::Help) => HELP.to_string(),
        Err(e) => format!("error: {}. {}", e, HELP),
    };
    Some(reply)
}
