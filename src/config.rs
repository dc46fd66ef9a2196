//! Protocol and timing constants, plus the runtime configuration carried by
//! an [`ArmSession`](crate::session::ArmSession).

/// Fixed baud rate of the microcontroller's serial port.
pub const BAUD_RATE: u32 = 115_200;
/// Read/write timeout applied when opening the OS serial port.
pub const PORT_TIMEOUT_MS: u64 = 1_000;

/// Grace period after opening the port; the board resets on connect and
/// discards input until it has booted.
pub const SETTLE_DELAY_MS: u32 = 2_000;
/// Wait between two single-degree interpolation steps.
pub const STEP_DELAY_MS: u32 = 20;
/// Wait after a display command so the matrix can redraw.
pub const DISPLAY_SETTLE_MS: u32 = 50;
/// Pause used between the phases of the built-in routines.
pub const ROUTINE_PAUSE_MS: u32 = 500;

pub const HOME_ANGLE: u8 = 90;
/// Glyph shown on the matrix whenever the arm is idle.
pub const IDLE_GLYPH: &str = "SMILE";

/// Scratch buffer used to render one wire command.
pub const COMMAND_BUFFER_SIZE: usize = 256;
/// Upper bound on the number of serial ports reported by enumeration.
pub const MAX_PORTS: usize = 16;
pub const PORT_ID_LEN: usize = 128;
pub const PORT_LABEL_LEN: usize = 192;
pub const STATUS_TEXT_LEN: usize = 128;
pub const ERROR_MESSAGE_LEN: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmConfig {
    pub baud_rate: u32,
    pub settle_delay_ms: u32,
    pub step_delay_ms: u32,
    pub display_settle_ms: u32,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            settle_delay_ms: SETTLE_DELAY_MS,
            step_delay_ms: STEP_DELAY_MS,
            display_settle_ms: DISPLAY_SETTLE_MS,
        }
    }
}

impl ArmConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_settle_delay_ms(mut self, ms: u32) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    pub fn with_step_delay_ms(mut self, ms: u32) -> Self {
        self.step_delay_ms = ms;
        self
    }

    pub fn with_display_settle_ms(mut self, ms: u32) -> Self {
        self.display_settle_ms = ms;
        self
    }
}
