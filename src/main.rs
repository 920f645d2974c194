//! Stonklog - A terminal journal for stock prices, EPS and valuation ratios.

mod app;
mod chart;
mod cli;
mod commands;
mod config;
mod error;
mod export;
mod extract;
mod logging;
mod models;
mod ocr;
mod storage;
mod store;
mod ui;
mod valuation;
mod view;

use anyhow::{Context, Result};
use app::App;
use cli::{Args, Command, ViewArgs};
use config::Config;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;
use storage::{FileKeyValueStore, UuidGenerator};
use tracing::debug;
use view::ViewState;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse_args();

    // Load configuration
    let config = match args.config {
        Some(ref path) if !matches!(args.command, Command::Config { init: true }) => Config::load(path)?,
        _ => Config::load_or_default(),
    };

    let level = if args.verbose { "debug" } else { config.general.log_level.as_str() };
    logging::init(level);

    // Config does not touch stored data
    if let Command::Config { init } = args.command {
        return commands::run_config(args.config.as_deref(), &config, init);
    }

    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| config.general.data_dir.clone())
        .or_else(FileKeyValueStore::default_dir)
        .context("Could not determine a data directory; pass --data-dir")?;
    debug!(dir = %data_dir.display(), "opening storage");

    let mut app = App::load(
        Box::new(FileKeyValueStore::new(data_dir)),
        Box::new(UuidGenerator),
        config.general.storage_key.clone(),
    )?;

    match args.command {
        Command::Stock(command) => commands::run_stock(&mut app, command),
        Command::Record(command) => commands::run_record(&mut app, &config, command).await,
        Command::Eps(command) => commands::run_eps(&mut app, command),
        Command::Export { output } => commands::run_export(&app, output).await,
        Command::Import { file } => commands::run_import(&mut app, &file).await,
        Command::Ocr { image } => commands::run_ocr(&config, &image).await,
        Command::View(view_args) => run_view(&mut app, &config, view_args),
        Command::Config { .. } => Ok(()),
    }
}

/// Open the records view, once in batch mode or as a TUI.
fn run_view(app: &mut App, config: &Config, args: ViewArgs) -> Result<()> {
    let metric = args.metric.map_or(config.display.default_metric, Into::into);
    let mut view = ViewState::new(app, args.ticker.as_deref(), metric, args.read_only);

    if args.batch {
        print!("{}", ui::render_batch(app, &view));
        return Ok(());
    }
    run_interactive(app, &mut view)
}

/// Run in interactive mode with TUI.
fn run_interactive(app: &mut App, view: &mut ViewState) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, app, view);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    view: &mut ViewState,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);

    while view.running {
        terminal.draw(|f| ui::render(f, app, view))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key_event(app, view, key.code, key.modifiers);
                }
            }
        }
    }

    Ok(())
}

/// Handle keyboard input.
fn handle_key_event(app: &mut App, view: &mut ViewState, code: KeyCode, modifiers: KeyModifiers) {
    // Close help overlay on any key
    if view.show_help {
        view.show_help = false;
        return;
    }

    // Clear error on any key
    if view.error.is_some() {
        view.error = None;
        return;
    }

    view.status = None;

    match code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => view.quit(),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => view.quit(),

        // Navigation
        KeyCode::Up | KeyCode::Char('k') => view.select_up(1),
        KeyCode::Down | KeyCode::Char('j') => view.select_down(app, 1),
        KeyCode::Home | KeyCode::Char('g') => view.select_top(),
        KeyCode::End | KeyCode::Char('G') => view.select_bottom(app),
        KeyCode::PageUp => view.select_up(10),
        KeyCode::PageDown => view.select_down(app, 10),

        // Filter and chart
        KeyCode::Tab => view.next_filter(app),
        KeyCode::Char('m') => view.next_metric(app),

        // Editing
        KeyCode::Char('x') | KeyCode::Delete => view.delete_selected(app),

        KeyCode::Char('h') | KeyCode::Char('?') => view.toggle_help(),

        _ => {}
    }
}
