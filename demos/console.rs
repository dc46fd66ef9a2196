use std::{
    fs::OpenOptions,
    io::{self},
    ops::ControlFlow,
    time::Duration,
};

use armlink::{
    console::{ConsoleAction, ConsoleState, action_for_key, handle_action, ui},
    link::Connector,
    serial::new_std_session,
    session::ArmSession,
    status::StatusLog,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use embedded_hal::delay::DelayNs;
use log::info;
use ratatui::prelude::*;

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging to file
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("armlink_console.log")?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting arm console");

    let mut session = new_std_session(StatusLog::<8>::new());
    let mut console = ConsoleState::new();
    let _ = handle_action(&mut session, &mut console, ConsoleAction::RefreshPorts);
    if let Some(port) = std::env::args().nth(1) {
        let _ = session.connect(&port);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut session, &mut console);

    session.disconnect();

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

fn run_app<B: Backend, C: Connector, D: DelayNs, const N: usize>(
    terminal: &mut Terminal<B>,
    session: &mut ArmSession<C, D, StatusLog<N>>,
    console: &mut ConsoleState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| {
            ui(f, session, console);
        })?;

        // Poll for events with a timeout
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = action_for_key(key.code, key.modifiers) else {
            continue;
        };

        // routines block until done, show that before starting one
        if let ConsoleAction::RunRoutine(name) = action {
            console.busy = Some(name);
            terminal.draw(|f| ui(f, session, console))?;
        }
        let flow = handle_action(session, console, action);
        console.busy = None;
        if let ControlFlow::Break(()) = flow {
            return Ok(());
        }
    }
}
