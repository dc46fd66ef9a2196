use core::fmt::{self, Write as _};

use embedded_io::Write;
use log::debug;

use crate::{ArmError, joint::AngleVector};

const DISPLAY_PREFIX: &str = "DISPLAY:";
const RELAY_PREFIX: &str = "RELAY:";

/// State of the auxiliary relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    #[default]
    Off,
    On,
}

impl RelayState {
    pub fn toggled(self) -> Self {
        match self {
            RelayState::Off => RelayState::On,
            RelayState::On => RelayState::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelayState::Off => "OFF",
            RelayState::On => "ON",
        }
    }
}

/// One line of the microcontroller protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Angles(AngleVector),
    Display(&'a str),
    Relay(RelayState),
}

impl<'cmd> Command<'cmd> {
    /// Renders the command, newline included, into `buffer` and returns the
    /// number of bytes written.
    pub fn write_buffer(&self, buffer: &mut [u8]) -> Result<usize, ArmError> {
        let mut cursor = Cursor { buffer, len: 0 };
        let rendered = match self {
            Command::Angles(angles) => writeln!(cursor, "{angles}"),
            Command::Display(text) => writeln!(cursor, "{DISPLAY_PREFIX}{text}"),
            Command::Relay(state) => writeln!(cursor, "{RELAY_PREFIX}{}", state.as_str()),
        };
        rendered.map_err(|_| ArmError::BufferOverflow)?;
        Ok(cursor.len)
    }

    pub fn send_command<P: Write>(&self, port: &mut P, buffer: &mut [u8]) -> Result<(), ArmError> {
        let len = self.write_buffer(buffer)?;
        port.write_all(&buffer[..len])
            .map_err(|_| ArmError::WriteError)?;
        port.flush().map_err(|_| ArmError::WriteError)?;
        debug!("Sent line: {:?}", core::str::from_utf8(&buffer[..len]).unwrap_or("<binary>"));
        Ok(())
    }
}

/// `fmt::Write` over a fixed byte slice; fails instead of truncating.
struct Cursor<'a> {
    buffer: &'a mut [u8],
    len: usize,
}

impl fmt::Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.buffer.len() {
            return Err(fmt::Error);
        }
        self.buffer[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::COMMAND_BUFFER_SIZE;

    fn render(command: Command) -> String {
        let mut buffer = [0u8; COMMAND_BUFFER_SIZE];
        let len = command.write_buffer(&mut buffer).unwrap();
        String::from_utf8(buffer[..len].to_vec()).unwrap()
    }

    #[test]
    fn test_angle_command_buffer() {
        let angles = AngleVector::new([60, 150, 120, 90, 75]);
        let mut buffer = [0u8; COMMAND_BUFFER_SIZE];
        let length = Command::Angles(angles).write_buffer(&mut buffer).unwrap();

        assert_eq!(&buffer[..length], b"60,150,120,90,75\n");
        assert_eq!(length, 17, "Five values, four commas and a newline");
        assert_eq!(buffer[length - 1], b'\n', "Line must be newline terminated");
        assert!(
            !buffer[..length].contains(&b' '),
            "Angle lines carry no whitespace"
        );
    }

    #[test]
    fn angle_values_have_no_leading_zeros() {
        let angles = AngleVector::new([60, 0, 5, 90, 180]);
        assert_eq!(render(Command::Angles(angles)), "60,0,5,90,180\n");
    }

    #[test]
    fn display_text_is_verbatim() {
        assert_eq!(render(Command::Display("SMILE")), "DISPLAY:SMILE\n");
        assert_eq!(render(Command::Display("a b:c")), "DISPLAY:a b:c\n");
        assert_eq!(render(Command::Display("")), "DISPLAY:\n");
    }

    #[test]
    fn relay_lines() {
        assert_eq!(render(Command::Relay(RelayState::On)), "RELAY:ON\n");
        assert_eq!(render(Command::Relay(RelayState::Off)), "RELAY:OFF\n");
        assert_eq!(RelayState::Off.toggled(), RelayState::On);
        assert_eq!(RelayState::On.toggled(), RelayState::Off);
    }

    #[test]
    fn short_buffer_overflows_instead_of_panicking() {
        let mut buffer = [0u8; 8];
        let result = Command::Display("THIS DOES NOT FIT").write_buffer(&mut buffer);
        assert!(matches!(result, Err(ArmError::BufferOverflow)));

        // the newline alone must also fit
        let mut exact = [0u8; 14];
        assert!(Command::Display("SMILE").write_buffer(&mut exact).is_ok());
        let mut one_short = [0u8; 13];
        assert!(Command::Display("SMILE").write_buffer(&mut one_short).is_err());
    }
}
