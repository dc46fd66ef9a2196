//! Connection lifecycle and the gate in front of the link.
//!
//! `Connection` is the only place that decides whether a command may reach
//! the wire: angle vectors need `Connected` plus the ready flag, display and
//! relay commands need `Connected`.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::ArmError;
use crate::bounded_text;
use crate::config::PORT_ID_LEN;
use crate::joint::AngleVector;
use crate::link::{Connector, Link, LinkStats, PortList};
use crate::protocol::{Command, RelayState};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Port being opened; includes the settle delay.
    Connecting,
    Connected,
    /// Open failed. Resolves to `Disconnected` straight away.
    Faulted,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// Where the motion scheduler and the sequencer send their output.
pub trait CommandSink {
    fn send_angles(&mut self, angles: &AngleVector) -> Result<(), ArmError>;
    fn send_display(&mut self, text: &str) -> Result<(), ArmError>;
}

pub struct Connection<C: Connector> {
    link: Link<C>,
    state: ConnectionState,
    ready: bool,
    port_id: Option<heapless::String<PORT_ID_LEN>>,
}

impl<C: Connector> Connection<C> {
    pub fn new(connector: C) -> Self {
        Self {
            link: Link::new(connector),
            state: ConnectionState::Disconnected,
            ready: false,
            port_id: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn port_id(&self) -> Option<&str> {
        self.port_id.as_deref()
    }

    pub fn link_stats(&self) -> LinkStats {
        self.link.stats()
    }

    pub fn list_ports(&mut self) -> Result<PortList, ArmError> {
        self.link.list_available_ports()
    }

    /// Closes any current link, then opens `port_id`. On failure the state
    /// passes through `Faulted` and ends `Disconnected`.
    pub fn open<D: DelayNs>(
        &mut self,
        port_id: &str,
        baud_rate: u32,
        settle_ms: u32,
        delay: &mut D,
    ) -> Result<(), ArmError> {
        self.close();
        self.transition(ConnectionState::Connecting);

        match self.link.open(port_id, baud_rate, settle_ms, delay) {
            Ok(()) => {
                self.port_id = Some(bounded_text(port_id));
                self.ready = false;
                self.transition(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                warn!("Opening {:?} failed: {}", port_id, e);
                self.transition(ConnectionState::Faulted);
                self.transition(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    pub fn close(&mut self) {
        self.link.close();
        self.ready = false;
        self.port_id = None;
        self.transition(ConnectionState::Disconnected);
    }

    /// Opens the ready gate after an operator interaction. Only takes effect
    /// while connected; returns the resulting flag.
    pub fn mark_ready(&mut self) -> bool {
        if self.is_connected() && !self.ready {
            debug!("Ready gate opened");
            self.ready = true;
        }
        self.ready
    }

    pub fn send_relay(&mut self, state: RelayState) -> Result<(), ArmError> {
        if !self.is_connected() {
            return Err(ArmError::NotConnected);
        }
        self.write(&Command::Relay(state))
    }

    fn write(&mut self, command: &Command) -> Result<(), ArmError> {
        let result = self.link.write(command);
        if result == Err(ArmError::WriteError) {
            warn!("Link lost while writing {:?}", command);
            self.close();
        }
        result
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!("Connection {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

impl<C: Connector> CommandSink for Connection<C> {
    fn send_angles(&mut self, angles: &AngleVector) -> Result<(), ArmError> {
        if !(self.is_connected() && self.ready) {
            return Err(ArmError::WriteDropped);
        }
        self.write(&Command::Angles(*angles))
    }

    fn send_display(&mut self, text: &str) -> Result<(), ArmError> {
        if !self.is_connected() {
            return Err(ArmError::WriteDropped);
        }
        self.write(&Command::Display(text))
    }
}
