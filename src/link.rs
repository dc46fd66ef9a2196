use embedded_hal::delay::DelayNs;
use embedded_io::Write;
use log::{debug, info, warn};

use crate::config::{COMMAND_BUFFER_SIZE, MAX_PORTS, PORT_ID_LEN, PORT_LABEL_LEN};
use crate::protocol::Command;
use crate::{ArmError, bounded_text, error_message};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub id: heapless::String<PORT_ID_LEN>,
    pub label: heapless::String<PORT_LABEL_LEN>,
}

impl PortDescriptor {
    /// `None` when `id` does not fit; ids are never shortened. Labels are
    /// display only and get cut.
    pub fn new(id: &str, label: &str) -> Option<Self> {
        Some(Self {
            id: heapless::String::try_from(id).ok()?,
            label: bounded_text(label),
        })
    }
}

pub type PortList = heapless::Vec<PortDescriptor, MAX_PORTS>;

/// Appends one enumerated port, logging the ones the list cannot hold.
pub fn push_port(list: &mut PortList, id: &str, label: &str) {
    let Some(port) = PortDescriptor::new(id, label) else {
        warn!("Port name {:?} exceeds {} bytes, not listed", id, PORT_ID_LEN);
        return;
    };
    if list.push(port).is_err() {
        warn!("More than {} ports, {:?} not listed", MAX_PORTS, id);
    }
}

/// Source of serial ports: enumerates and opens them.
pub trait Connector {
    type Port: Write;

    /// Ports in OS enumeration order, at most `MAX_PORTS` of them.
    fn available_ports(&mut self) -> Result<PortList, ArmError>;

    /// Whether `port_id` names a device in the complete OS enumeration.
    fn resolves(&mut self, port_id: &str) -> Result<bool, ArmError>;

    fn open(&mut self, port_id: &str, baud_rate: u32) -> Result<Self::Port, ArmError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: usize,
    pub dropped: usize,
}

/// Exclusive owner of the open serial port.
pub struct Link<C: Connector> {
    connector: C,
    port: Option<C::Port>,
    buffer: [u8; COMMAND_BUFFER_SIZE],
    stats: LinkStats,
}

impl<C: Connector> Link<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            port: None,
            buffer: [0u8; COMMAND_BUFFER_SIZE],
            stats: LinkStats::default(),
        }
    }

    pub fn list_available_ports(&mut self) -> Result<PortList, ArmError> {
        self.connector.available_ports()
    }

    /// Opens `port_id`, then blocks for `settle_ms` while the board resets.
    /// An already open port is closed first.
    pub fn open<D: DelayNs>(
        &mut self,
        port_id: &str,
        baud_rate: u32,
        settle_ms: u32,
        delay: &mut D,
    ) -> Result<(), ArmError> {
        self.close();

        if port_id.is_empty() {
            return Err(ArmError::PortUnavailable);
        }
        match self.connector.resolves(port_id) {
            Ok(true) => {}
            Ok(false) => {
                warn!("Port {} is not enumerated", port_id);
                return Err(ArmError::PortUnavailable);
            }
            Err(e) => return Err(ArmError::OpenFailure(error_message(e))),
        }
        if port_id.len() > PORT_ID_LEN {
            return Err(ArmError::OpenFailure(error_message(format_args!(
                "port name longer than {PORT_ID_LEN} bytes"
            ))));
        }

        let port = self.connector.open(port_id, baud_rate)?;
        info!("Port opened: {} @ {}, settling {} ms", port_id, baud_rate, settle_ms);
        delay.delay_ms(settle_ms);
        self.port = Some(port);
        Ok(())
    }

    pub fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Port closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Writes one command line. Not open: `WriteDropped`. An I/O failure
    /// closes the port and yields `WriteError`.
    pub fn write(&mut self, command: &Command) -> Result<(), ArmError> {
        let Some(port) = self.port.as_mut() else {
            self.stats.dropped += 1;
            debug!("Dropped {:?}, port closed", command);
            return Err(ArmError::WriteDropped);
        };
        match command.send_command(port, &mut self.buffer) {
            Ok(()) => {
                self.stats.sent += 1;
                Ok(())
            }
            Err(ArmError::WriteError) => {
                warn!("Write failed, closing port");
                self.stats.dropped += 1;
                self.close();
                Err(ArmError::WriteError)
            }
            Err(e) => {
                self.stats.dropped += 1;
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}
