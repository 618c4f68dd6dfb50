//! Board capability consumed by the bus engine.
//!
//! The engine never touches pin registers directly. A board crate implements
//! [`GpibPort`] for its layout (discrete MCU pins, an I/O expander, a test
//! double) and the engine drives the bus exclusively through it. Register
//! writes must be deterministic and non-blocking; all waiting is done by the
//! engine itself against [`GpibPort::now_ms`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use crate::signal::{Line, LineMode, Signals};

/// Pin-level access to the sixteen GPIB wires plus a time source.
///
/// The data lines are negative-true: [`write_data_bus`] drives the bitwise
/// complement of the byte and [`read_data_bus`] returns the complement of the
/// sampled levels, so callers only ever see logical byte values.
///
/// Microsecond sleeping comes from the [`DelayNs`] supertrait.
///
/// [`write_data_bus`]: GpibPort::write_data_bus
/// [`read_data_bus`]: GpibPort::read_data_bus
pub trait GpibPort: DelayNs {
    /// Configure all eight data lines as inputs with pull-ups.
    fn ready_data_bus(&mut self);

    /// Sample the data lines and return the logical byte value.
    fn read_data_bus(&mut self) -> u8;

    /// Configure the data lines as outputs and drive `byte` onto them.
    fn write_data_bus(&mut self, byte: u8);

    /// Apply `value` bits to the direction or level register of every
    /// control line selected by `mask`. Lines outside `mask` are unchanged.
    fn set_signals(&mut self, value: Signals, mask: Signals, mode: LineMode);

    /// Electrical level of a single control line.
    fn line_level(&mut self, line: Line) -> PinState;

    /// Monotonic millisecond clock used for handshake timeouts.
    fn now_ms(&mut self) -> u64;

    /// Whether `line` is asserted (electrically LOW).
    fn line_asserted(&mut self, line: Line) -> bool {
        self.line_level(line) == PinState::Low
    }
}
