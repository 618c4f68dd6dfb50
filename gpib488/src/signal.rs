//! Control-signal definitions for the IEEE-488 management and handshake lines.
//!
//! The bus carries eight control lines next to the eight data lines. They are
//! packed into a [`Signals`] byte that serves both as a value and as a mask
//! when talking to the board layer, mirroring how the wires are grouped in
//! port registers on most adapter boards.
//!
//! GPIB is negative-true: a line is *asserted* when it is electrically LOW.
//! A `Signals` bit therefore means HIGH/released when set and LOW/driven when
//! clear whenever the byte is used as a level value.

use bitbybit::{bitenum, bitfield};

/// Bit set of the eight GPIB control lines.
///
/// Used as `(value, mask)` pairs by [`GpibPort::set_signals`]: bits inside
/// the mask are applied, bits outside it leave the line untouched.
///
/// [`GpibPort::set_signals`]: crate::port::GpibPort::set_signals
#[bitfield(u8)]
#[derive(Debug, PartialEq, Eq)]
pub struct Signals {
    /// Attention: commands (not data) are on the data lines while asserted.
    #[bit(7, rw)]
    atn: bool,
    /// Service request from a device to the controller.
    #[bit(6, rw)]
    srq: bool,
    /// Remote enable.
    #[bit(5, rw)]
    ren: bool,
    /// End-or-identify: flags the last byte of a message.
    #[bit(4, rw)]
    eoi: bool,
    /// Data valid, driven by the talker.
    #[bit(3, rw)]
    dav: bool,
    /// Not ready for data, driven by listeners.
    #[bit(2, rw)]
    nrfd: bool,
    /// No data accepted, driven by listeners.
    #[bit(1, rw)]
    ndac: bool,
    /// Interface clear: forces every device to idle.
    #[bit(0, rw)]
    ifc: bool,
}

impl Signals {
    pub const NONE: Self = Self::new_with_raw_value(0x00);
    pub const IFC: Self = Self::new_with_raw_value(0x01);
    pub const NDAC: Self = Self::new_with_raw_value(0x02);
    pub const NRFD: Self = Self::new_with_raw_value(0x04);
    pub const DAV: Self = Self::new_with_raw_value(0x08);
    pub const EOI: Self = Self::new_with_raw_value(0x10);
    pub const REN: Self = Self::new_with_raw_value(0x20);
    pub const SRQ: Self = Self::new_with_raw_value(0x40);
    pub const ATN: Self = Self::new_with_raw_value(0x80);
    pub const ALL: Self = Self::new_with_raw_value(0xFF);

    /// Combine two signal sets.
    pub const fn union(self, other: Self) -> Self {
        Self::new_with_raw_value(self.raw_value() | other.raw_value())
    }
}

impl core::ops::BitOr for Signals {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Selects a single control line for level sampling.
#[bitenum(u3, exhaustive = true)]
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Ifc = 0b000,
    Ndac = 0b001,
    Nrfd = 0b010,
    Dav = 0b011,
    Eoi = 0b100,
    Ren = 0b101,
    Srq = 0b110,
    Atn = 0b111,
}

impl Line {
    /// The [`Signals`] bit carrying this line.
    pub const fn mask(self) -> Signals {
        Signals::new_with_raw_value(1 << (self as u8))
    }
}

/// Selects which per-line register a [`Signals`] write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    /// Driven level: 1 = HIGH/pull-up, 0 = LOW.
    Level,
    /// Direction: 1 = output, 0 = input with pull-up.
    Direction,
}
