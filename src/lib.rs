#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt::{self, Display, Write as _};

use crate::config::ERROR_MESSAGE_LEN;

pub mod config;
pub mod connection;
pub mod joint;
pub mod link;
pub mod motion;
pub mod protocol;
pub mod routine;
pub mod session;
pub mod status;

#[cfg(feature = "std")]
pub mod serial;

#[cfg(feature = "ui")]
pub mod console;

#[cfg(test)]
mod fake;

pub use connection::ConnectionState;
pub use joint::Channel;
pub use session::ArmSession;

pub type ErrorMessage = heapless::String<ERROR_MESSAGE_LEN>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArmError {
    #[error("Serial port is not available")]
    PortUnavailable,
    #[error("Failed to open serial port: {0}")]
    OpenFailure(ErrorMessage),
    #[error("Serial port enumeration failed: {0}")]
    Enumeration(ErrorMessage),
    #[error("Arm is not connected")]
    NotConnected,
    #[error("Write dropped, link is not ready")]
    WriteDropped,
    #[error("Serial port write error")]
    WriteError,
    #[error("Command does not fit the encode buffer")]
    BufferOverflow,
    #[error("No routine named {0:?}")]
    UnknownRoutine(ErrorMessage),
}

/// Renders any displayable error into a bounded message, cutting it short
/// when it does not fit.
pub fn error_message(error: impl Display) -> ErrorMessage {
    bounded_text(error)
}

pub(crate) fn bounded_text<const N: usize>(text: impl Display) -> heapless::String<N> {
    let mut out = heapless::String::new();
    let _ = write!(Truncate(&mut out), "{text}");
    out
}

struct Truncate<'a, const N: usize>(&'a mut heapless::String<N>);

impl<const N: usize> fmt::Write for Truncate<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}
