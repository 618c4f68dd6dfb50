//! GPIB bus engine.
//!
//! [`GpibBus`] owns the bus for the duration of a session: it is constructed
//! over a board's [`GpibPort`] capability, started in controller or device
//! role, and driven by the host command layer. All methods block, polling the
//! port's control lines under the configured per-byte timeout.
//!
//! # Example
//! ```rust,ignore
//! use core::sync::atomic::AtomicBool;
//! use gpib488::{Config, GpibBus};
//!
//! static TX_BREAK: AtomicBool = AtomicBool::new(false);
//!
//! let mut bus = GpibBus::new(board_port, Config::default(), &TX_BREAK);
//! bus.begin();
//! bus.address_device(7, AddressDirection::Listen)?;
//! bus.send_data(b"*IDN?")?;
//! ```

mod command;
mod error;
mod handshake;
mod states;
mod transfer;

pub use command::{
    AddressDirection, GET, GTL, LAD, LLO, SDC, TAD, UNL, UNT,
};
pub use error::BusError;
pub use states::{BusState, LineContract};

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::{Config, Role};
use crate::port::GpibPort;
use crate::signal::{Line, LineMode, Signals};

/// Settling time after a role change.
const SETTLE_DELAY_US: u32 = 200;
/// Width of the IFC pulse claiming the controller-in-charge position.
const IFC_PULSE_US: u32 = 150;
/// Hold time for each half of the remote-enable clear sequence.
const CLEAR_HOLD_US: u32 = 40_000;
/// Quiet period before un-addressing.
const ADDRESS_GAP_US: u32 = 30;
/// Width of the trailing EOI pulse after a transmitted message.
const EOI_PULSE_US: u32 = 40;

/// The bus engine.
///
/// Exactly one engine may exist per cable; it assumes exclusive ownership of
/// the bus whenever a role is active. The `tx_break` flag is shared with the
/// host-serial input path, which sets it to cancel a running receive loop at
/// the next byte boundary.
pub struct GpibBus<'b, P: GpibPort> {
    port: P,
    cfg: Config,
    cstate: Option<BusState>,
    device_addressed: bool,
    tx_break: &'b AtomicBool,
}

impl<'b, P: GpibPort> GpibBus<'b, P> {
    /// Create an engine over a board port. The bus is left untouched until
    /// [`begin`](Self::begin).
    pub fn new(port: P, cfg: Config, tx_break: &'b AtomicBool) -> Self {
        Self {
            port,
            cfg,
            cstate: None,
            device_addressed: false,
            tx_break,
        }
    }

    /// Consume the engine and hand the port back.
    pub fn release(mut self) -> P {
        self.stop();
        self.port
    }

    /// Start the bus in the role selected by the configuration.
    pub fn begin(&mut self) {
        if self.is_controller() {
            self.start_controller();
        } else {
            self.start_device();
        }
    }

    /// Take the controller-in-charge position.
    ///
    /// Returns every instrument to local, claims the bus with an IFC pulse
    /// and, when a peer address is configured, addresses it to listen. A
    /// peer that does not answer at startup is not treated as fatal.
    pub fn start_controller(&mut self) {
        self.send_all_clear();
        self.stop();
        self.port.delay_us(SETTLE_DELAY_US);
        self.cfg.role = Role::Controller;
        self.set_controls(BusState::Cini);
        self.port.ready_data_bus();
        self.send_ifc();
        if self.cfg.paddr > 1 {
            let _ = self.address_device(self.cfg.paddr, AddressDirection::Listen);
        }
    }

    /// Join the bus as an addressable device.
    pub fn start_device(&mut self) {
        self.stop();
        self.port.delay_us(SETTLE_DELAY_US);
        self.cfg.role = Role::Device;
        self.set_controls(BusState::Dini);
        self.port.ready_data_bus();
    }

    /// Leave the active role and release every line.
    ///
    /// All control lines go back to input-with-pull-up and the data lines are
    /// parked; the engine ends up with no current bus state.
    pub fn stop(&mut self) {
        self.cstate = None;
        self.device_addressed = false;
        self.port.set_signals(Signals::NONE, Signals::ALL, LineMode::Direction);
        self.port.set_signals(Signals::ALL, Signals::ALL, LineMode::Level);
        self.port.ready_data_bus();
    }

    /// Enter `state`, applying its line contract.
    pub fn set_controls(&mut self, state: BusState) {
        states::drive(&mut self.port, state);
        self.cstate = Some(state);
    }

    /// The current bus state, if a role is active.
    pub fn current_state(&self) -> Option<BusState> {
        self.cstate
    }

    /// Whether the engine is configured as controller-in-charge.
    pub fn is_controller(&self) -> bool {
        self.cfg.role == Role::Controller
    }

    /// Whether `line` is asserted (electrically LOW) on the cable.
    pub fn is_asserted(&mut self, line: Line) -> bool {
        self.port.line_asserted(line)
    }

    /// Whether an address command has been sent with no un-address since.
    pub fn have_addressed_device(&self) -> bool {
        self.device_addressed
    }

    /// Whether the device side is sitting idle.
    pub fn is_device_idle(&self) -> bool {
        self.cstate == Some(BusState::Dids)
    }

    /// Request cancellation of a running receive loop.
    ///
    /// Safe to call from the serial input path; the loop observes the flag
    /// between bytes.
    pub fn signal_break(&self) {
        self.tx_break.store(true, Ordering::Relaxed);
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Mutable access for the host command layer.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.cfg
    }

    /// Diagnostic passthrough: raw masked write to the control lines.
    pub fn set_control_val(&mut self, value: Signals, mask: Signals, mode: LineMode) {
        self.port.set_signals(value, mask, mode);
    }

    /// Diagnostic passthrough: drive a raw byte onto the data lines.
    pub fn set_data_val(&mut self, byte: u8) {
        self.port.write_data_bus(byte);
    }

    /// Return the data lines to input-with-pull-up.
    pub fn clear_data_bus(&mut self) {
        self.port.ready_data_bus();
    }

    fn in_device_role(&self) -> bool {
        self.cfg.role == Role::Device
    }

    fn break_requested(&self) -> bool {
        self.tx_break.load(Ordering::Relaxed)
    }

    fn clear_break(&self) {
        self.tx_break.store(false, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn port_ref(&self) -> &P {
        &self.port
    }

    #[cfg(test)]
    pub(crate) fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}
