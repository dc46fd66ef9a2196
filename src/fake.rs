//! Recording stand-ins for the serial port, the clock and the status sink.

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_io::{ErrorKind, ErrorType, Write};

use crate::ArmError;
use crate::error_message;
use crate::link::{Connector, PortList, push_port};
use crate::status::{Status, StatusSink};

#[derive(Debug, Default)]
struct WireState {
    bytes: Vec<u8>,
    writes_left: Option<usize>,
}

/// Shared view of everything written to fake ports.
#[derive(Debug, Clone, Default)]
pub struct Wire(Rc<RefCell<WireState>>);

impl Wire {
    pub fn lines(&self) -> Vec<String> {
        let state = self.0.borrow();
        String::from_utf8_lossy(&state.bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn raw(&self) -> Vec<u8> {
        self.0.borrow().bytes.clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().bytes.clear();
    }
}

#[derive(Debug, Default)]
pub struct RecordingPort {
    wire: Wire,
}

impl ErrorType for RecordingPort {
    type Error = ErrorKind;
}

impl Write for RecordingPort {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.wire.0.borrow_mut();
        if let Some(left) = state.writes_left.as_mut() {
            if *left == 0 {
                return Err(ErrorKind::Other);
            }
            *left -= 1;
        }
        state.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeConnector {
    ports: Vec<(String, String)>,
    wire: Wire,
    open_error: Option<String>,
    scan_error: Option<String>,
    opened: Vec<(String, u32)>,
}

impl FakeConnector {
    pub fn with_ports(ids: &[&str]) -> Self {
        Self {
            ports: ids
                .iter()
                .map(|id| (id.to_string(), format!("{id} - Fake board")))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing_open(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    pub fn failing_scan(mut self, message: &str) -> Self {
        self.scan_error = Some(message.to_string());
        self
    }

    /// Ports accept `writes` commands, then every write fails.
    pub fn failing_after(self, writes: usize) -> Self {
        self.wire.0.borrow_mut().writes_left = Some(writes);
        self
    }

    pub fn wire(&self) -> Wire {
        self.wire.clone()
    }

    pub fn opened(&self) -> Vec<(String, u32)> {
        self.opened.clone()
    }
}

impl FakeConnector {
    fn scan(&self) -> Result<(), ArmError> {
        match &self.scan_error {
            Some(message) => Err(ArmError::Enumeration(error_message(message))),
            None => Ok(()),
        }
    }
}

impl Connector for FakeConnector {
    type Port = RecordingPort;

    fn available_ports(&mut self) -> Result<PortList, ArmError> {
        self.scan()?;
        let mut list = PortList::new();
        for (id, label) in &self.ports {
            push_port(&mut list, id, label);
        }
        Ok(list)
    }

    fn resolves(&mut self, port_id: &str) -> Result<bool, ArmError> {
        self.scan()?;
        Ok(self.ports.iter().any(|(id, _)| id == port_id))
    }

    fn open(&mut self, port_id: &str, baud_rate: u32) -> Result<Self::Port, ArmError> {
        if let Some(message) = &self.open_error {
            return Err(ArmError::OpenFailure(error_message(message)));
        }
        self.opened.push((port_id.to_string(), baud_rate));
        Ok(RecordingPort {
            wire: self.wire.clone(),
        })
    }
}

/// Delay that only records what was asked of it.
#[derive(Debug, Default)]
pub struct FakeClock {
    total_ns: u64,
    waits_ms: Vec<u32>,
}

impl FakeClock {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }

    pub fn waits_ms(&self) -> &[u32] {
        &self.waits_ms
    }
}

impl DelayNs for FakeClock {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
        self.waits_ms.push(ms);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingStatus(Rc<RefCell<Vec<Status>>>);

impl RecordingStatus {
    pub fn texts(&self) -> Vec<String> {
        self.0.borrow().iter().map(|s| s.text.to_string()).collect()
    }

    pub fn last(&self) -> Option<Status> {
        self.0.borrow().last().cloned()
    }
}

impl StatusSink for RecordingStatus {
    fn emit(&mut self, status: Status) {
        self.0.borrow_mut().push(status);
    }
}
