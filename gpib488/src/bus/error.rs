//! Engine error types.

/// Indicate the ways a bus operation can fail.
///
/// Handshake failures carry the numeric status the host protocol reports:
/// 1 for an IFC abort, 2 for an ATN abort, and the stalled stage number
/// (4..=8) for a timeout, identifying which handshake wire never moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// A handshake wire did not transition within the configured timeout.
    /// Carries the stage number at which the transfer stalled.
    Timeout(u8),
    /// IFC was asserted by the controller while a transfer was in progress.
    InterfaceClear,
    /// ATN interrupted a device-mode transfer; the engine has switched to
    /// listening for the incoming command.
    Attention,
    /// The host-side sink rejected received data.
    Sink(embedded_io::ErrorKind),
}

impl BusError {
    /// Numeric status code reported to the host (0 is reserved for success).
    pub fn status_code(&self) -> u8 {
        match self {
            Self::InterfaceClear => 1,
            Self::Attention => 2,
            Self::Sink(_) => 3,
            Self::Timeout(stage) => *stage,
        }
    }
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Timeout(stage) => write!(f, "handshake timeout at stage {}", stage),
            Self::InterfaceClear => write!(f, "aborted by IFC"),
            Self::Attention => write!(f, "aborted by ATN"),
            Self::Sink(kind) => write!(f, "sink rejected data: {:?}", kind),
        }
    }
}
