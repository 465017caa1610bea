//! Applock TUI - Terminal demonstration of the application lock
//!
//! Simulates an application that protects itself with a passcode. F2/F3
//! stand in for the app moving to the background and back.

use std::fs::{self, File};
use std::io;
use std::panic;
use std::path::PathBuf;

use anyhow::{Context, Result};
use applock_core::{AppLockConfig, BiometryKind, PasscodeMode};
use applock_tui::{App, AppOptions};
use clap::{Parser, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "applock-tui")]
#[command(about = "Terminal demo of passcode app locking", long_about = None)]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured lock mode
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Directory holding the stored passcode
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Simulated device biometry
    #[arg(long, value_enum, default_value_t = BiometricsArg::None)]
    biometrics: BiometricsArg,

    /// Write logs to this file (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    HideInAppSwitcher,
    AlwaysVisible,
    Autohide,
    Disabled,
}

impl From<ModeArg> for PasscodeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::HideInAppSwitcher => PasscodeMode::HideInAppSwitcher,
            ModeArg::AlwaysVisible => PasscodeMode::AlwaysVisible,
            ModeArg::Autohide => PasscodeMode::Autohide,
            ModeArg::Disabled => PasscodeMode::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BiometricsArg {
    None,
    Face,
    Fingerprint,
}

impl From<BiometricsArg> for BiometryKind {
    fn from(kind: BiometricsArg) -> Self {
        match kind {
            BiometricsArg::None => BiometryKind::None,
            BiometricsArg::Face => BiometryKind::Face,
            BiometricsArg::Fingerprint => BiometryKind::Fingerprint,
        }
    }
}

/// Application entry point with panic handling for terminal restoration
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up panic hook to restore terminal on crash
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize logging; the terminal is taken by the UI, so only to a file
    let log_path = args
        .log_file
        .clone()
        .or_else(|| dirs::cache_dir().map(|dir| dir.join("applock").join("applock-tui.log")));
    let log_layer = match &log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(log_layer)
        .with(EnvFilter::from_default_env().add_directive("applock_tui=info".parse()?))
        .init();

    let options = resolve_options(&args)?;

    let result = run_app(options).await;

    if let Err(e) = &result {
        tracing::error!("Application error: {}", e);
    }

    result
}

fn resolve_options(args: &Args) -> Result<AppOptions> {
    let config_path = args.config.clone().or_else(AppLockConfig::default_path);

    let mut config = match &config_path {
        Some(path) => AppLockConfig::load_or_default(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppLockConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }

    let store_dir = args.store_dir.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("applock")
    });

    tracing::info!(
        "Starting with mode {:?}, store {}",
        config.mode,
        store_dir.display()
    );

    Ok(AppOptions {
        config,
        config_path,
        store_dir,
        biometrics: args.biometrics.into(),
    })
}

/// Main application runner
async fn run_app(options: AppOptions) -> Result<()> {
    let mut app = App::new(options)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
