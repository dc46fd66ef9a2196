use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_io_adapters::std::FromStd;
use log::info;
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits};

use crate::config::PORT_TIMEOUT_MS;
use crate::link::{Connector, PortList, push_port};
use crate::session::ArmSession;
use crate::status::StatusSink;
use crate::{ArmError, error_message};

pub type StdPort = FromStd<Box<dyn SerialPort>>;

/// OS serial ports through `serialport`.
#[derive(Debug, Clone, Copy)]
pub struct SerialConnector {
    timeout: Duration,
}

impl Default for SerialConnector {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(PORT_TIMEOUT_MS),
        }
    }
}

impl SerialConnector {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Connector for SerialConnector {
    type Port = StdPort;

    fn available_ports(&mut self) -> Result<PortList, ArmError> {
        let mut list = PortList::new();
        for port in &scan()? {
            push_port(&mut list, &port.port_name, &describe(port));
        }
        Ok(list)
    }

    fn resolves(&mut self, port_id: &str) -> Result<bool, ArmError> {
        Ok(scan()?.iter().any(|port| port.port_name == port_id))
    }

    fn open(&mut self, port_id: &str, baud_rate: u32) -> Result<Self::Port, ArmError> {
        let port = create_arm_port(port_id, baud_rate, self.timeout)
            .map_err(|e| ArmError::OpenFailure(error_message(&e)))?;
        Ok(FromStd::new(port))
    }
}

fn scan() -> Result<Vec<SerialPortInfo>, ArmError> {
    serialport::available_ports().map_err(|e| ArmError::Enumeration(error_message(&e)))
}

fn create_arm_port(
    port_name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, serialport::Error> {
    let port = serialport::new(port_name, baud_rate)
        .timeout(timeout)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .flow_control(FlowControl::None)
        .open()?;

    info!("Port opened successfully: {}", port_name);
    Ok(port)
}

/// `"<device> - <description>"`, or just the device when nothing is known.
fn describe(port: &SerialPortInfo) -> String {
    let description = match &port.port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .as_deref()
            .or(usb.manufacturer.as_deref())
            .unwrap_or("USB serial"),
        SerialPortType::PciPort => "PCI serial",
        SerialPortType::BluetoothPort => "Bluetooth",
        SerialPortType::Unknown => "",
    };
    let label = if description.is_empty() {
        port.port_name.clone()
    } else {
        format!("{} - {}", port.port_name, description)
    };
    label
}

/// Blocking delay on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

pub type StdArmSession<S> = ArmSession<SerialConnector, StdDelay, S>;

/// Session on real serial ports with thread-sleep timing.
pub fn new_std_session<S: StatusSink>(status: S) -> StdArmSession<S> {
    ArmSession::with_status(SerialConnector::default(), StdDelay, status)
}
