use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Preferences;
use crate::error::FocusError;
use crate::models::SessionSummary;
use crate::notify::{FanoutSink, NotificationSink, RecordingSink};
use crate::session::FocusSession;

/// 输入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Insert,
}

/// 对话框类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogType {
    None,
    StartFocus,
    ChangeFocus,
    Help,
}

/// 应用状态
pub struct App {
    pub prefs: Preferences,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
    inbox: RecordingSink,
    pub session: Option<FocusSession>,
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub show_dialog: DialogType,
    pub status_message: Option<String>,
}

impl App {
    /// 没有初始任务时先弹出"开始专注"对话框
    pub fn new(
        prefs: Preferences,
        clock: Arc<dyn Clock>,
        desktop: Arc<dyn NotificationSink>,
        initial_task: Option<String>,
    ) -> Result<Self> {
        let inbox = RecordingSink::new();
        let notifier: Arc<dyn NotificationSink> =
            Arc::new(FanoutSink::new(vec![desktop, Arc::new(inbox.clone())]));

        let mut app = Self {
            prefs,
            clock,
            notifier,
            inbox,
            session: None,
            should_quit: false,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            show_dialog: DialogType::None,
            status_message: None,
        };

        match initial_task {
            Some(task) => app.start_session(&task)?,
            None => app.open_dialog(DialogType::StartFocus),
        }
        Ok(app)
    }

    fn start_session(&mut self, task: &str) -> std::result::Result<(), FocusError> {
        let session = FocusSession::start(
            task,
            &self.prefs,
            self.clock.clone(),
            self.notifier.clone(),
        )?;
        self.session = Some(session);
        Ok(())
    }

    fn open_dialog(&mut self, dialog: DialogType) {
        self.show_dialog = dialog;
        self.input_mode = InputMode::Insert;
        self.input_buffer.clear();
    }

    fn close_dialog(&mut self) {
        self.show_dialog = DialogType::None;
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// 提交对话框中的任务名；为空时保留对话框并提示
    pub fn submit_task(&mut self) {
        let name = self.input_buffer.clone();
        let result = match self.show_dialog {
            DialogType::StartFocus => self.start_session(&name),
            DialogType::ChangeFocus => match self.session.as_mut() {
                Some(session) => session.switch_focus(&name),
                None => return,
            },
            _ => return,
        };

        match result {
            Ok(()) => {
                self.close_dialog();
                self.status_message = Some(format!("专注于: {}", name));
            }
            Err(FocusError::InvalidInput(_)) => {
                self.status_message = Some("Task name cannot be empty".to_string());
            }
            Err(e) => {
                self.close_dialog();
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// 结束会话
    pub fn end_session(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.end() {
                self.status_message = Some(e.to_string());
            } else {
                self.status_message = Some("会话已结束".to_string());
            }
        }
    }

    /// 轮询提醒，并把最新的提醒显示在状态栏
    pub fn tick(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.fire_due_reminders();
        }
        if let Some((title, message)) = self.inbox.drain().pop() {
            self.status_message = Some(format!("{}: {}", title, message));
        }
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        self.session.as_ref().and_then(|s| s.summary().ok())
    }

    fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(FocusSession::is_active)
    }
}

/// 运行TUI应用，返回结束后的会话总结
pub fn run_app(
    prefs: Preferences,
    clock: Arc<dyn Clock>,
    desktop: Arc<dyn NotificationSink>,
    initial_task: Option<String>,
) -> Result<Option<SessionSummary>> {
    // 先校验，避免进入备用屏幕后才报错
    prefs.validate()?;
    let mut app = App::new(prefs, clock, desktop, initial_task)?;

    // 设置终端
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 主循环
    let res = run_ui_loop(&mut terminal, &mut app);

    // 恢复终端
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(app.summary())
}

/// UI主循环
fn run_ui_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(std::time::Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key_event(app, key.code);
                }
            }
        }

        // 提醒计时
        app.tick();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// 处理键盘事件
pub fn handle_key_event(app: &mut App, key: KeyCode) {
    // 对话框模式
    if app.show_dialog != DialogType::None {
        match app.input_mode {
            InputMode::Insert => match key {
                KeyCode::Esc => {
                    if app.session.is_none() {
                        app.should_quit = true;
                    }
                    app.close_dialog();
                }
                KeyCode::Enter => app.submit_task(),
                KeyCode::Char(c) => app.input_buffer.push(c),
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
            InputMode::Normal => app.close_dialog(),
        }
        return;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => {
            // 直接退出也要结束会话，保证有总结可打印
            if app.is_active() {
                app.end_session();
            }
            app.should_quit = true;
        }
        KeyCode::Char('c') | KeyCode::Char('n') if app.is_active() => {
            app.open_dialog(DialogType::ChangeFocus);
        }
        KeyCode::Char('e') if app.is_active() => app.end_session(),
        KeyCode::Char('?') => {
            app.show_dialog = DialogType::Help;
            app.input_mode = InputMode::Normal;
        }
        _ => {}
    }
}

/// 渲染UI
fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 当前任务
            Constraint::Min(0),    // 内容
            Constraint::Length(2), // 状态栏
        ])
        .split(f.area());

    match app.session.as_ref() {
        Some(session) if session.is_active() => {
            render_header(f, session, chunks[0]);
            render_tasks(f, session, chunks[1]);
        }
        Some(session) => render_summary(f, session, chunks[0].union(chunks[1])),
        None => {}
    }

    render_status_bar(f, app, chunks[2]);

    if app.show_dialog != DialogType::None {
        render_dialog(f, app);
    }
}

fn render_header(f: &mut Frame, session: &FocusSession, area: Rect) {
    let elapsed = session.elapsed_minutes().unwrap_or_default();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("Focusing On: {}", session.current_task_name()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("Time Elapsed: {:.1} minutes", elapsed),
            Style::default().fg(Color::Cyan),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title("🎯 Focus"));

    f.render_widget(header, area);
}

/// 渲染本次会话的任务列表
fn render_tasks(f: &mut Frame, session: &FocusSession, area: Rect) {
    let now = session.now();
    let items: Vec<ListItem> = session
        .log()
        .tasks()
        .enumerate()
        .map(|(index, task)| {
            let icon = if task.is_open() { "🔥" } else { "✅" };
            ListItem::new(format!(
                "{} {}. {} ({:.1} min, 开始于 {})",
                icon,
                index + 1,
                task.name,
                task.duration_minutes(now),
                task.start_time.format("%H:%M")
            ))
        })
        .collect();

    let reminder = session
        .next_reminder()
        .map(|at| format!("下次提醒 {}", at.format("%H:%M:%S")))
        .unwrap_or_else(|| "提醒已关闭".to_string());

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("任务记录 ({} 个) | {}", session.log().len(), reminder))
            .title_bottom("c:切换任务 | e:结束会话 | q:退出 | ?:帮助"),
    );

    f.render_widget(list, area);
}

fn render_summary(f: &mut Frame, session: &FocusSession, area: Rect) {
    let content: Vec<Line> = match session.summary() {
        Ok(summary) => summary
            .to_string()
            .lines()
            .map(|line| {
                if line.starts_with('#') {
                    Line::from(Span::styled(
                        line.trim_start_matches('#').trim().to_string(),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(line.to_string())
                }
            })
            .collect(),
        Err(e) => vec![Line::from(e.to_string())],
    };

    let paragraph = Paragraph::new(content)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("会话总结")
                .title_bottom("q:退出"),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);
}

/// 渲染状态栏
fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let mode_text = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::Insert => "INSERT",
    };

    let status = if let Some(ref msg) = app.status_message {
        msg.clone()
    } else {
        format!("模式: {} | q:退出 | ?:帮助", mode_text)
    };

    let status_bar = Paragraph::new(status)
        .style(Style::default().bg(Color::DarkGray).fg(Color::White))
        .block(Block::default());

    f.render_widget(status_bar, area);
}

/// 渲染对话框
fn render_dialog(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 40, f.area());

    let task_prompt = |prompt: &'static str| {
        vec![
            Line::from(""),
            Line::from(prompt),
            Line::from(""),
            Line::from(Span::styled(
                app.input_buffer.clone(),
                Style::default().fg(Color::Yellow),
            )),
            Line::from(""),
            Line::from("按 Enter 确认, Esc 取消"),
        ]
    };

    let (title, content) = match app.show_dialog {
        DialogType::StartFocus => ("Start Focusing", task_prompt("Enter your focus task...")),
        DialogType::ChangeFocus => ("Change Focus", task_prompt("Enter new focus task...")),
        DialogType::Help => (
            "快捷键帮助",
            vec![
                Line::from(""),
                Line::from("  c/n : 切换专注任务"),
                Line::from("  e   : 结束会话并查看总结"),
                Line::from("  q   : 退出（会先结束会话）"),
                Line::from("  ?   : 显示此帮助"),
                Line::from(""),
                Line::from("按任意键关闭"),
            ],
        ),
        DialogType::None => ("", vec![]),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black).fg(Color::White));

    let paragraph = Paragraph::new(content)
        .block(block)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

/// 居中矩形
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
