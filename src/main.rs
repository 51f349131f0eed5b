use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use focus_on::{
    config, headless, ui, FocusSession, NotificationManager, Preferences, SessionSummary,
    SystemClock,
};

#[derive(Parser)]
#[command(name = "focus")]
#[command(about = "Track a focus session, switch tasks and get a break suggestion", long_about = None)]
struct Cli {
    /// Config file path (defaults to user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Reminder interval in minutes, overrides the config file
    #[arg(short, long, global = true)]
    interval: Option<f64>,

    /// Disable periodic reminders
    #[arg(long, global = true)]
    no_reminders: bool,

    /// Print the session summary as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the TUI and start focusing
    Start {
        /// Initial task, prompted for when omitted
        task: Option<String>,
    },

    /// Run without a TUI, reading commands from stdin
    Run {
        /// Initial task
        task: String,
    },
}

fn init_logging(debug: bool, to_file: bool) -> Result<()> {
    let log_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if to_file {
        // 备用屏幕下不能写stderr，日志写入数据目录
        let path = config::data_dir()?.join("focus.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn print_summary(summary: &SessionSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let headless_mode = matches!(cli.command, Some(Commands::Run { .. }));
    init_logging(cli.debug, !headless_mode)?;

    // 确定配置文件路径
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    tracing::info!("Using config: {:?}", config_path);
    let prefs = Preferences::load(&config_path)?.with_overrides(cli.interval, cli.no_reminders);

    let clock = Arc::new(SystemClock);
    let notifier = Arc::new(NotificationManager::new());

    let summary = match cli.command {
        Some(Commands::Start { task }) => ui::run_app(prefs, clock, notifier, task)?,
        None => ui::run_app(prefs, clock, notifier, None)?,
        Some(Commands::Run { task }) => {
            let mut session = FocusSession::start(&task, &prefs, clock, notifier)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(headless::run(
                &mut session,
                tokio::io::BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
                tokio::time::Duration::from_secs(1),
            ))?;
            Some(session.summary()?)
        }
    };

    if let Some(summary) = summary {
        print_summary(&summary, cli.json)?;
    }

    Ok(())
}
