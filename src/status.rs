//! Operator-facing status lines.
//!
//! The session never talks to a UI directly; it pushes [`Status`] values into
//! whatever [`StatusSink`] it was built with.

use core::fmt::Display;

use log::{info, warn};

use crate::bounded_text;
use crate::config::STATUS_TEXT_LEN;

pub type StatusText = heapless::String<STATUS_TEXT_LEN>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: StatusText,
    pub is_error: bool,
}

impl Status {
    pub fn info(text: impl Display) -> Self {
        Self {
            text: bounded_text(text),
            is_error: false,
        }
    }

    pub fn error(text: impl Display) -> Self {
        Self {
            text: bounded_text(text),
            is_error: true,
        }
    }
}

pub trait StatusSink {
    fn emit(&mut self, status: Status);
}

impl<F: FnMut(Status)> StatusSink for F {
    fn emit(&mut self, status: Status) {
        self(status)
    }
}

/// Sink that only forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn emit(&mut self, status: Status) {
        if status.is_error {
            warn!("{}", status.text);
        } else {
            info!("{}", status.text);
        }
    }
}

/// Keeps the latest `N` status lines, oldest first.
#[derive(Debug, Default)]
pub struct StatusLog<const N: usize = 8> {
    lines: heapless::Deque<Status, N>,
}

impl<const N: usize> StatusLog<N> {
    pub fn new() -> Self {
        Self {
            lines: heapless::Deque::new(),
        }
    }

    pub fn latest(&self) -> Option<&Status> {
        self.lines.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Status> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl<const N: usize> StatusSink for StatusLog<N> {
    fn emit(&mut self, status: Status) {
        LogStatus.emit(status.clone());
        if self.lines.is_full() {
            self.lines.pop_front();
        }
        // capacity was freed above
        let _ = self.lines.push_back(status);
    }
}
