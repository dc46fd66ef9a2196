use armlink::{ArmError, link::Connector, serial::SerialConnector};
use log::{info, warn};

/// Lists serial ports; with a port argument, connects and homes the arm.
pub fn main() -> Result<(), ArmError> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let ports = SerialConnector::default().available_ports()?;
    if ports.is_empty() {
        warn!("No serial ports found");
    }
    for port in &ports {
        println!("{:<24} {}", port.id, port.label);
    }

    let Some(port_id) = std::env::args().nth(1) else {
        return Ok(());
    };

    let mut session = armlink::serial::new_std_session(armlink::status::LogStatus);
    session.connect(&port_id)?;
    let summary = session.run_routine("Home")?;
    info!("Homed in {} steps, link stats {:?}", summary.steps, session.link_stats());
    session.disconnect();
    Ok(())
}
