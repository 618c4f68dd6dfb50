//! IEEE-488.1 (GPIB) bus engine for serial-to-GPIB adapter firmware.
//!
//! The crate implements the controller/talker/listener protocol over an
//! abstract pin capability: the timed three-wire byte handshake, the named
//! bus states and their control-line contracts, controller command
//! sequences, message terminators, and serial-poll status with SRQ.
//!
//! Board support lives outside this crate: a board implements
//! [`port::GpibPort`] for its pin layout and hands it to [`bus::GpibBus`].
#![no_std]

#[cfg(test)]
extern crate std;

pub mod bus;
pub mod config;
pub mod port;
pub mod signal;

#[cfg(test)]
pub(crate) mod mock;

pub use bus::{AddressDirection, BusError, BusState, GpibBus};
pub use config::{Config, Eor, Eos, Role};
pub use port::GpibPort;
pub use signal::{Line, LineMode, Signals};
