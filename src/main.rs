mod ansi;
mod app;
mod config;
mod panel;
mod player;
mod theme;
mod trace;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup};
use config::PanelConfig;
use panel::PanelStatus;
use trace::{CallStatus, Trace};

#[derive(Parser, Debug)]
#[command(name = "tracepane")]
#[command(version = "0.1.0")]
#[command(about = "A terminal panel for replaying recorded interaction traces")]
struct Args {
    /// Trace file recorded by the instrumenter (JSON)
    trace: Option<PathBuf>,

    /// Print a JSON digest of the trace and exit (for scripts)
    #[arg(short, long)]
    summary: bool,

    /// Do not follow playback with the selection
    #[arg(long)]
    no_follow: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let trace = match args.trace.as_deref() {
        Some(path) => Trace::load(path)?,
        None => Trace::default(),
    };

    if args.summary {
        return print_summary(&trace);
    }

    let mut config = PanelConfig::load();
    if args.no_follow {
        config.follow_end = false;
    }

    let app = App::new(trace, args.trace, config);
    run_tui(app).await
}

/// JSON digest of a trace, for scripting around recorded runs.
fn print_summary(trace: &Trace) -> Result<()> {
    let status = PanelStatus::derive(false, trace.has_result_mismatch, trace.has_exception());
    let interactions = trace.interactions(false);
    let failing = interactions
        .iter()
        .filter(|c| c.status == Some(CallStatus::Error))
        .count();

    let output = serde_json::json!({
        "file": trace.file_name,
        "status": status.label(),
        "interactions": interactions.len(),
        "failing": failing,
        "hasResultMismatch": trace.has_result_mismatch,
        "caughtException": trace.caught_exception.as_ref().map(|e| e.display_text()),
        "unhandledErrors": trace.unhandled_errors.as_ref().map(Vec::len),
    });

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

async fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.popup == Popup::None => return Ok(()),
                        KeyCode::Char('c')
                            if key.modifiers.contains(event::KeyModifiers::CONTROL) =>
                        {
                            return Ok(())
                        }
                        _ => {
                            // Catch handler errors into the status line
                            if let Err(e) = app.handle_key(key) {
                                app.set_status(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        app.tick();
    }
}
