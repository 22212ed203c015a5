use std::fs::{self, OpenOptions};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tasklane::api::TaskClient;
use tasklane::app::App;
use tasklane::config::{self, Config, Credentials};
use tasklane::runtime::{self, Msg};
use tasklane::views::Tab;
use tasklane::{auth, ui};

const TICK: Duration = Duration::from_millis(100);
const INPUT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Parser)]
#[command(name = "tasklane", version, about = "Keyboard-driven terminal client for your tasks")]
struct Cli {
    /// API token; falls back to the stored token file.
    #[arg(long, env = "TASKLANE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Alternate config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tab to open on start (today, upcoming, projects, labels, calendar).
    #[arg(long)]
    tab: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authorize in the browser and store the token.
    Login,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_tracing();

    let config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    let credentials = Credentials::from_default_location(cli.token.clone());

    if let Some(Command::Login) = cli.command {
        let token = auth::login(&config.oauth)
            .await
            .context("authorization failed")?;
        let path = credentials.store(&token).context("failed to store token")?;
        println!("Token saved to {}", path.display());
        return Ok(());
    }

    let token = credentials
        .token()
        .context("no API token; pass --token, set TASKLANE_TOKEN or run `tasklane login`")?;
    let client = TaskClient::new(
        &config.api_base_url,
        &token,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("failed to build API client")?;

    let tab = match cli.tab.as_deref() {
        Some(raw) => Tab::parse(raw)?,
        None => config.default_tab()?,
    };
    let mut app = App::new(&config, tab, Local::now().date_naive())?;
    tracing::info!(
        tab = tab.title(),
        log = ?log_path,
        base = %config.api_base_url,
        "starting session"
    );

    let result = {
        let mut tui = Tui::new()?;
        run(&mut tui, &mut app, Arc::new(client)).await
    };
    if let Err(err) = &result {
        tracing::error!(error = %err, "session ended with an error");
    }
    result
}

/// Logs go to a file; the terminal belongs to the interface.
fn init_tracing() -> Option<PathBuf> {
    for path in config::log_file_candidates() {
        if let Some(parent) = path.parent()
            && fs::create_dir_all(parent).is_err()
        {
            continue;
        }
        let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
            continue;
        };
        let filter =
            EnvFilter::try_from_env("TASKLANE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .with(filter)
            .init();
        return Some(path);
    }
    None
}

struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    fn new() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(err).context("failed to enter alternate screen");
        }
        let backend = CrosstermBackend::new(stdout);
        match Terminal::new(backend) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(err) => {
                let _ = disable_raw_mode();
                let mut stdout = io::stdout();
                let _ = execute!(stdout, LeaveAlternateScreen, DisableMouseCapture);
                Err(err).context("failed to create terminal")
            }
        }
    }

    fn draw(&mut self, app: &mut App) -> Result<()> {
        self.terminal
            .draw(|frame| ui::draw(frame, app))
            .context("failed to draw frame")?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}

/// Reads terminal events on a blocking thread until the receiver goes away.
fn spawn_input_pump(tx: mpsc::Sender<Event>) {
    tokio::task::spawn_blocking(move || {
        while !tx.is_closed() {
            match event::poll(INPUT_POLL) {
                Ok(false) => {}
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "reading terminal event failed");
                        break;
                    }
                },
                Err(err) => {
                    tracing::error!(error = %err, "polling terminal failed");
                    break;
                }
            }
        }
    });
}

fn dispatch_effects(app: &mut App, client: &Arc<TaskClient>, tx: &mpsc::Sender<Msg>) {
    for effect in app.take_effects() {
        runtime::spawn_effect(effect, Arc::clone(client), tx.clone());
    }
}

async fn run(tui: &mut Tui, app: &mut App, client: Arc<TaskClient>) -> Result<()> {
    let (input_tx, mut input_rx) = mpsc::channel(64);
    let (msg_tx, mut msg_rx) = mpsc::channel(64);
    spawn_input_pump(input_tx);
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    dispatch_effects(app, &client, &msg_tx);
    tui.draw(app)?;

    loop {
        tokio::select! {
            event = input_rx.recv() => match event {
                Some(event) => app.handle_event(event),
                None => anyhow::bail!("terminal input closed"),
            },
            Some(msg) = msg_rx.recv() => app.handle_msg(msg),
            _ = ticker.tick() => {
                app.set_today(Local::now().date_naive());
                app.tick();
            }
        }

        if app.should_quit() {
            tracing::info!("quit requested");
            return Ok(());
        }
        dispatch_effects(app, &client, &msg_tx);
        tui.draw(app)?;
    }
}
