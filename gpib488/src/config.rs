//! Runtime configuration of the bus engine.
//!
//! The host side keeps these options in an opaque persisted block; the codec
//! for that block lives outside this crate. The engine only consumes the
//! decoded fields collected in [`Config`].

use bitbybit::bitenum;
use embedded_time::duration::Milliseconds;

/// Carriage return.
pub const CR: u8 = 0x0D;
/// Line feed.
pub const LF: u8 = 0x0A;
/// Escape prefix used by the host protocol.
pub const ESC: u8 = 0x1B;
/// End-of-text, used as a terminator by some instruments.
pub const ETX: u8 = 0x03;

/// Operating role of the local party on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Bus not started.
    #[default]
    None,
    /// Addressable device (talker/listener).
    Device,
    /// Controller-in-charge.
    Controller,
}

/// Terminator policy for transmitted messages.
#[bitenum(u2, exhaustive = true)]
#[derive(Debug, PartialEq, Eq)]
pub enum Eos {
    /// Append CR LF.
    CrLf = 0b00,
    /// Append CR only.
    Cr = 0b01,
    /// Append LF only.
    Lf = 0b10,
    /// Append nothing.
    None = 0b11,
}

impl Eos {
    /// Decode from the persisted two-bit field.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::CrLf,
            1 => Self::Cr,
            2 => Self::Lf,
            _ => Self::None,
        }
    }

    pub const fn sends_cr(self) -> bool {
        matches!(self, Self::CrLf | Self::Cr)
    }

    pub const fn sends_lf(self) -> bool {
        matches!(self, Self::CrLf | Self::Lf)
    }
}

/// Terminator recognition for received messages.
///
/// Matching runs over a sliding window of the three most recent bytes,
/// newest first. [`Eor::Eoi`] disables byte matching entirely and relies on
/// the EOI line instead.
#[bitenum(u3, exhaustive = true)]
#[derive(Debug, PartialEq, Eq)]
pub enum Eor {
    /// CR LF.
    CrLf = 0b000,
    /// CR alone.
    Cr = 0b001,
    /// LF alone.
    Lf = 0b010,
    /// No byte terminator; length- or EOI-delimited only.
    None = 0b011,
    /// LF CR, as sent by some Keithley instruments.
    LfCr = 0b100,
    /// ETX alone.
    Etx = 0b101,
    /// CR LF ETX.
    CrLfEtx = 0b110,
    /// EOI line only.
    Eoi = 0b111,
}

impl Eor {
    /// Decode from the persisted three-bit field.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::CrLf,
            1 => Self::Cr,
            2 => Self::Lf,
            3 => Self::None,
            4 => Self::LfCr,
            5 => Self::Etx,
            6 => Self::CrLfEtx,
            _ => Self::Eoi,
        }
    }

    /// Whether `window` ends a message. `window[0]` is the newest byte.
    pub fn matches(self, window: &[u8; 3]) -> bool {
        match self {
            Self::CrLf => window[0] == LF && window[1] == CR,
            Self::Cr => window[0] == CR,
            Self::Lf => window[0] == LF,
            Self::None => false,
            Self::LfCr => window[0] == CR && window[1] == LF,
            Self::Etx => window[0] == ETX,
            Self::CrLfEtx => window[0] == ETX && window[1] == LF && window[2] == CR,
            Self::Eoi => false,
        }
    }
}

/// Engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Operating role selected for [`begin`](crate::bus::GpibBus::begin).
    pub role: Role,
    /// Primary address of the peer instrument (controller role) or of the
    /// local party (device role), 0..=30.
    pub paddr: u8,
    /// Serial-poll status byte; bit 0x40 mirrors the SRQ line.
    pub stat: u8,
    /// Assert EOI with the end of transmitted messages.
    pub eoi_tx: bool,
    /// Terminators appended to transmitted messages.
    pub eos: Eos,
    /// Terminator recognized in received messages.
    pub eor: Eor,
    /// Byte appended to received data when the message ended with EOI.
    pub eot: Option<u8>,
    /// Per-byte handshake timeout.
    pub rtmo: Milliseconds<u32>,
}

impl Config {
    /// Creates a new Config with default settings.
    ///
    /// Default settings are:
    /// - Controller role, peer address 1.
    /// - CR LF terminators on both directions, no EOI.
    /// - 1200 ms handshake timeout.
    pub fn new() -> Self {
        Self {
            role: Role::Controller,
            paddr: 1,
            stat: 0,
            eoi_tx: false,
            eos: Eos::CrLf,
            eor: Eor::CrLf,
            eot: None,
            rtmo: Milliseconds(1_200),
        }
    }

    /// Sets the operating role.
    pub fn set_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets the primary address.
    pub fn set_paddr(mut self, paddr: u8) -> Self {
        self.paddr = paddr;
        self
    }

    /// Sets EOI assertion on transmit.
    pub fn set_eoi_tx(mut self, eoi_tx: bool) -> Self {
        self.eoi_tx = eoi_tx;
        self
    }

    /// Sets the transmit terminator policy.
    pub fn set_eos(mut self, eos: Eos) -> Self {
        self.eos = eos;
        self
    }

    /// Sets the receive terminator.
    pub fn set_eor(mut self, eor: Eor) -> Self {
        self.eor = eor;
        self
    }

    /// Sets the byte appended after EOI-terminated reception.
    pub fn set_eot(mut self, eot: Option<u8>) -> Self {
        self.eot = eot;
        self
    }

    /// Sets the per-byte handshake timeout.
    pub fn set_rtmo(mut self, rtmo: Milliseconds<u32>) -> Self {
        self.rtmo = rtmo;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
