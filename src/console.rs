//! Terminal front end: port picker, joint table, routine keys, status log.

use core::ops::ControlFlow;

use crossterm::event::{KeyCode, KeyModifiers};
use embedded_hal::delay::DelayNs;
use ratatui::{prelude::*, widgets::*};

use crate::connection::ConnectionState;
use crate::joint::Channel;
use crate::link::{Connector, PortList};
use crate::protocol::RelayState;
use crate::session::ArmSession;
use crate::status::{StatusLog, StatusSink};

const BAR_WIDTH: usize = 24;
const FINE_STEP: i32 = 1;
const COARSE_STEP: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    Quit,
    SelectPrevious,
    SelectNext,
    Adjust(i32),
    RunRoutine(&'static str),
    ToggleRelay,
    RefreshPorts,
    NextPort,
    Connect,
    Disconnect,
}

pub fn action_for_key(code: KeyCode, modifiers: KeyModifiers) -> Option<ConsoleAction> {
    let step = if modifiers.contains(KeyModifiers::SHIFT) {
        COARSE_STEP
    } else {
        FINE_STEP
    };
    let action = match code {
        KeyCode::Char('q') | KeyCode::Esc => ConsoleAction::Quit,
        KeyCode::Up => ConsoleAction::SelectPrevious,
        KeyCode::Down => ConsoleAction::SelectNext,
        KeyCode::Left => ConsoleAction::Adjust(-step),
        KeyCode::Right => ConsoleAction::Adjust(step),
        KeyCode::Char('h') => ConsoleAction::RunRoutine("Home"),
        KeyCode::Char('a') => ConsoleAction::RunRoutine("Action A"),
        KeyCode::Char('b') => ConsoleAction::RunRoutine("Action B"),
        KeyCode::Char('c') => ConsoleAction::RunRoutine("Action C"),
        KeyCode::Char('r') => ConsoleAction::ToggleRelay,
        KeyCode::Char('f') | KeyCode::F(5) => ConsoleAction::RefreshPorts,
        KeyCode::Char('p') | KeyCode::Tab => ConsoleAction::NextPort,
        KeyCode::Enter => ConsoleAction::Connect,
        KeyCode::Char('d') => ConsoleAction::Disconnect,
        _ => return None,
    };
    Some(action)
}

#[derive(Debug, Default)]
pub struct ConsoleState {
    pub selected_index: usize,
    pub ports: PortList,
    pub port_index: usize,
    /// Routine currently blocking the console, for the busy banner.
    pub busy: Option<&'static str>,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_next(&mut self) {
        if self.selected_index < Channel::COUNT.saturating_sub(1) {
            self.selected_index += 1;
        }
    }

    pub fn select_previous(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn selected_channel(&self) -> Channel {
        Channel::ALL[self.selected_index]
    }

    /// Keeps the current pick when it still exists, else the first port.
    pub fn set_ports(&mut self, ports: PortList) {
        self.port_index = self
            .selected_port()
            .and_then(|id| ports.iter().position(|port| port.id.as_str() == id))
            .unwrap_or(0);
        self.ports = ports;
    }

    pub fn next_port(&mut self) {
        if !self.ports.is_empty() {
            self.port_index = (self.port_index + 1) % self.ports.len();
        }
    }

    pub fn selected_port(&self) -> Option<&str> {
        self.ports.get(self.port_index).map(|port| port.id.as_str())
    }
}

/// Applies one console action to the session. Failures already land in the
/// session's status log, so they are not returned here.
pub fn handle_action<C: Connector, D: DelayNs, S: StatusSink>(
    session: &mut ArmSession<C, D, S>,
    console: &mut ConsoleState,
    action: ConsoleAction,
) -> ControlFlow<()> {
    match action {
        ConsoleAction::Quit => return ControlFlow::Break(()),
        ConsoleAction::SelectPrevious => console.select_previous(),
        ConsoleAction::SelectNext => console.select_next(),
        ConsoleAction::Adjust(delta) => {
            let channel = console.selected_channel();
            let current = i32::from(session.angles().get(channel));
            session.on_slider_change(channel, current + delta);
        }
        ConsoleAction::RunRoutine(name) => {
            let _ = session.run_routine(name);
        }
        ConsoleAction::ToggleRelay => {
            let _ = session.toggle_relay();
        }
        ConsoleAction::RefreshPorts => {
            if let Ok(ports) = session.list_ports() {
                console.set_ports(ports);
            }
        }
        ConsoleAction::NextPort => console.next_port(),
        ConsoleAction::Connect => {
            let _ = session.connect(console.selected_port().unwrap_or(""));
        }
        ConsoleAction::Disconnect => session.disconnect(),
    }
    ControlFlow::Continue(())
}

pub fn ui<C: Connector, D: DelayNs, const N: usize>(
    f: &mut Frame,
    session: &ArmSession<C, D, StatusLog<N>>,
    console: &ConsoleState,
) {
    let [header, joints, status, footer] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(Channel::COUNT as u16 + 3),
        Constraint::Min(3),
        Constraint::Length(2),
    ])
    .areas(f.area());

    f.render_widget(connection_panel(session, console), header);
    f.render_widget(joint_table(session, console), joints);
    f.render_widget(status_panel(session.status()), status);
    f.render_widget(help_footer(), footer);
}

fn connection_panel<C: Connector, D: DelayNs, S: StatusSink>(
    session: &ArmSession<C, D, S>,
    console: &ConsoleState,
) -> Paragraph<'static> {
    let (state_text, state_color) = match session.state() {
        ConnectionState::Connected => ("CONNECTED", Color::Green),
        ConnectionState::Connecting => ("CONNECTING", Color::Yellow),
        ConnectionState::Faulted => ("FAULTED", Color::Red),
        ConnectionState::Disconnected => ("DISCONNECTED", Color::Gray),
    };
    let relay_color = match session.relay() {
        RelayState::On => Color::Green,
        RelayState::Off => Color::Gray,
    };

    let mut first = vec![
        Span::styled(state_text, Style::default().fg(state_color).bold()),
        Span::raw(format!(" {}", session.port_id().unwrap_or("-"))),
        Span::raw("  ready: "),
        Span::raw(if session.is_ready() { "yes" } else { "no" }),
        Span::raw("  relay: "),
        Span::styled(session.relay().as_str(), Style::default().fg(relay_color)),
    ];
    if let Some(name) = console.busy {
        first.push(Span::styled(
            format!("  running {name}..."),
            Style::default().fg(Color::Yellow).bold(),
        ));
    }

    let port_line = match console.ports.get(console.port_index) {
        Some(port) => format!(
            "Port {}/{}: {}",
            console.port_index + 1,
            console.ports.len(),
            port.label
        ),
        None => "No ports, press f to refresh".to_string(),
    };

    Paragraph::new(vec![Line::from(first), Line::from(port_line)]).block(
        Block::default()
            .title("Serial")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
}

fn joint_table<C: Connector, D: DelayNs, S: StatusSink>(
    session: &ArmSession<C, D, S>,
    console: &ConsoleState,
) -> Table<'static> {
    let header = Row::new(vec![
        Cell::from("Joint"),
        Cell::from("Pin"),
        Cell::from("Angle"),
        Cell::from("Range"),
        Cell::from("Position"),
    ])
    .style(Style::default().fg(Color::Yellow).bold());

    let angles = session.angles();
    let rows: Vec<Row> = angles
        .iter()
        .map(|(channel, angle)| {
            let row = Row::new(vec![
                Cell::from(channel.label()),
                Cell::from(channel.pin().to_string()),
                Cell::from(angle.to_string()),
                Cell::from(format!("{}-{}", channel.min(), channel.max())),
                Cell::from(bar(channel, angle)).style(Style::default().fg(Color::Green)),
            ]);

            if channel == console.selected_channel() {
                row.style(Style::default().bg(Color::DarkGray).fg(Color::White))
            } else {
                row
            }
        })
        .collect();

    Table::new(
        rows,
        vec![
            Constraint::Length(10), // Joint
            Constraint::Length(5),  // Pin
            Constraint::Length(7),  // Angle
            Constraint::Length(9),  // Range
            Constraint::Length(BAR_WIDTH as u16 + 2),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title("Servos (↑↓: select, ←→: move, shift: x10)")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .style(Style::default().fg(Color::White))
}

fn bar(channel: Channel, angle: u8) -> String {
    let span = usize::from(channel.max() - channel.min()).max(1);
    let filled = usize::from(angle.saturating_sub(channel.min())) * BAR_WIDTH / span;
    let mut text = "█".repeat(filled);
    text.push_str(&"·".repeat(BAR_WIDTH - filled));
    text
}

fn status_panel<const N: usize>(log: &StatusLog<N>) -> Paragraph<'static> {
    let lines: Vec<Line> = log
        .iter()
        .map(|status| {
            let style = if status.is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::White)
            };
            Line::styled(status.text.to_string(), style)
        })
        .collect();

    Paragraph::new(lines).block(
        Block::default()
            .title("Status")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
}

fn help_footer() -> Paragraph<'static> {
    Paragraph::new(vec![
        Line::from("h: home  a/b/c: actions  r: relay  f: refresh  p: port  enter: connect  d: disconnect  q: quit"),
        Line::styled(
            "ENSURE ROBOT IS HOMED BEFORE POWERING OFF",
            Style::default().fg(Color::Yellow).bg(Color::Black).bold(),
        ),
    ])
}
