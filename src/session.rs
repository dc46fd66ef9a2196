use embedded_hal::delay::DelayNs;
use log::{info, trace, warn};

use crate::ArmError;
use crate::config::ArmConfig;
use crate::connection::{CommandSink, Connection, ConnectionState};
use crate::error_message;
use crate::joint::{AngleVector, Channel};
use crate::link::{Connector, LinkStats, PortList};
use crate::motion::MotionScheduler;
use crate::protocol::RelayState;
use crate::routine::{self, BUILTIN_ROUTINES, Routine, RunSummary, Sequencer};
use crate::status::{LogStatus, Status, StatusSink};

/// Everything the operator can change, owned in one place.
///
/// All entry points take `&mut self`, so a routine and a slider drag can
/// never interleave.
pub struct ArmSession<C: Connector, D: DelayNs, S: StatusSink = LogStatus> {
    connection: Connection<C>,
    motion: MotionScheduler,
    sequencer: Sequencer,
    relay: RelayState,
    routines: &'static [Routine],
    config: ArmConfig,
    delay: D,
    status: S,
}

impl<C: Connector, D: DelayNs> ArmSession<C, D> {
    pub fn new(connector: C, delay: D) -> Self {
        ArmSession::with_status(connector, delay, LogStatus)
    }
}

impl<C: Connector, D: DelayNs, S: StatusSink> ArmSession<C, D, S> {
    pub fn with_status(connector: C, delay: D, status: S) -> Self {
        let config = ArmConfig::default();
        Self {
            connection: Connection::new(connector),
            motion: MotionScheduler::new(config.step_delay_ms),
            sequencer: Sequencer::new(config.display_settle_ms),
            relay: RelayState::Off,
            routines: BUILTIN_ROUTINES,
            config,
            delay,
            status,
        }
    }

    pub fn with_config(mut self, config: ArmConfig) -> Self {
        self.motion = MotionScheduler::with_angles(self.motion.angles(), config.step_delay_ms);
        self.sequencer = Sequencer::new(config.display_settle_ms);
        self.config = config;
        self
    }

    pub fn with_routines(mut self, routines: &'static [Routine]) -> Self {
        self.routines = routines;
        self
    }

    pub fn list_ports(&mut self) -> Result<PortList, ArmError> {
        match self.connection.list_ports() {
            Ok(ports) => {
                self.status.emit(Status::info(format_args!(
                    "Ports refreshed, {} found.",
                    ports.len()
                )));
                Ok(ports)
            }
            Err(e) => {
                self.status.emit(Status::error(format_args!("Port scan failed: {e}")));
                Err(e)
            }
        }
    }

    /// Opens `port_id`, replacing any current connection. Errors are also
    /// reported on the status sink.
    pub fn connect(&mut self, port_id: &str) -> Result<(), ArmError> {
        let port_id = port_id.trim();
        if port_id.is_empty() {
            self.status.emit(Status::error("Select a serial port first."));
            self.connection.close();
            return Err(ArmError::PortUnavailable);
        }

        let result = self.connection.open(
            port_id,
            self.config.baud_rate,
            self.config.settle_delay_ms,
            &mut self.delay,
        );
        match &result {
            Ok(()) => self.status.emit(Status::info(format_args!(
                "Connected to {port_id} @ {}",
                self.config.baud_rate
            ))),
            Err(ArmError::PortUnavailable) => self.status.emit(Status::error(format_args!(
                "Port {port_id} is not available."
            ))),
            Err(e) => self.status.emit(Status::error(format_args!("Serial error: {e}"))),
        }
        result
    }

    pub fn disconnect(&mut self) {
        let was_connected = self.connection.is_connected();
        self.connection.close();
        if was_connected {
            self.status.emit(Status::info("Disconnected."));
        }
    }

    /// Operator moved a slider. The internal angle always follows; the
    /// vector reaches the wire only when connected, and this interaction
    /// opens the ready gate.
    pub fn on_slider_change(&mut self, channel: Channel, angle: i32) -> u8 {
        let stored = self.motion.set(channel, angle);
        self.connection.mark_ready();
        match self.connection.send_angles(&self.motion.angles()) {
            Ok(()) => {}
            Err(ArmError::WriteError) => {
                self.status.emit(Status::error("Serial write failed, disconnected."));
            }
            Err(e) => trace!("Slider update not sent: {e}"),
        }
        stored
    }

    /// Runs the routine registered under `name`.
    pub fn run_routine(&mut self, name: &str) -> Result<RunSummary, ArmError> {
        let Some(routine) = routine::find(self.routines, name).copied() else {
            self.status.emit(Status::error(format_args!("Unknown routine {name:?}.")));
            return Err(ArmError::UnknownRoutine(error_message(name)));
        };
        self.run(&routine)
    }

    /// Runs `routine` to completion. Refuses to start while disconnected;
    /// once started, a lost link only silences the remaining steps.
    pub fn run(&mut self, routine: &Routine) -> Result<RunSummary, ArmError> {
        if !self.connection.is_connected() {
            warn!("Routine {} refused, not connected", routine.name);
            self.status.emit(Status::error("Connect to the arm first."));
            return Err(ArmError::NotConnected);
        }

        self.connection.mark_ready();
        self.status.emit(Status::info(format_args!("Running {}...", routine.name)));
        let summary = self.sequencer.run(
            routine,
            &mut self.motion,
            &mut self.connection,
            &mut self.delay,
        );

        if self.connection.is_connected() {
            self.status.emit(Status::info(format_args!("{} done.", routine.name)));
        } else {
            self.status.emit(Status::error(format_args!(
                "Link lost during {}, arm state unknown.",
                routine.name
            )));
        }
        Ok(summary)
    }

    pub fn set_relay(&mut self, state: RelayState) -> Result<(), ArmError> {
        match self.connection.send_relay(state) {
            Ok(()) => {
                info!("Relay {}", state.as_str());
                self.relay = state;
                self.status.emit(Status::info(format_args!("Relay {}.", state.as_str())));
                Ok(())
            }
            Err(e) => {
                self.status.emit(Status::error(format_args!("Relay not switched: {e}")));
                Err(e)
            }
        }
    }

    pub fn toggle_relay(&mut self) -> Result<RelayState, ArmError> {
        let next = self.relay.toggled();
        self.set_relay(next)?;
        Ok(next)
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_ready(&self) -> bool {
        self.connection.is_ready()
    }

    pub fn port_id(&self) -> Option<&str> {
        self.connection.port_id()
    }

    pub fn angles(&self) -> AngleVector {
        self.motion.angles()
    }

    pub fn relay(&self) -> RelayState {
        self.relay
    }

    pub fn routines(&self) -> &'static [Routine] {
        self.routines
    }

    pub fn config(&self) -> &ArmConfig {
        &self.config
    }

    pub fn link_stats(&self) -> LinkStats {
        self.connection.link_stats()
    }

    pub fn status(&self) -> &S {
        &self.status
    }
}
