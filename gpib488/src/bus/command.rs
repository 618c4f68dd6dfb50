//! Controller command sequences.
//!
//! Commands travel on the data lines with ATN asserted, which the
//! [`BusState::Ccms`] contract guarantees; every sequence here funnels
//! through [`GpibBus::send_cmd`].

use crate::port::GpibPort;
use crate::signal::{LineMode, Signals};

use super::error::BusError;
use super::states::BusState;
use super::{GpibBus, ADDRESS_GAP_US, CLEAR_HOLD_US, IFC_PULSE_US};

/// Go to local.
pub const GTL: u8 = 0x01;
/// Selected device clear.
pub const SDC: u8 = 0x04;
/// Group execute trigger.
pub const GET: u8 = 0x08;
/// Local lockout.
pub const LLO: u8 = 0x11;
/// Listen address base; primary addresses 0..=30 are added to it.
pub const LAD: u8 = 0x20;
/// Unlisten.
pub const UNL: u8 = 0x3F;
/// Talk address base.
pub const TAD: u8 = 0x40;
/// Untalk.
pub const UNT: u8 = 0x5F;

/// Whether an addressed party should talk or listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressDirection {
    Talk,
    Listen,
}

impl<'b, P: GpibPort> GpibBus<'b, P> {
    /// Send a single command byte under ATN.
    pub fn send_cmd(&mut self, cmd: u8) -> Result<(), BusError> {
        if self.cstate != Some(BusState::Ccms) {
            self.set_controls(BusState::Ccms);
        }
        self.write_byte(cmd, false)
    }

    /// Unlisten the bus, then address `addr` to talk or listen.
    pub fn address_device(&mut self, addr: u8, direction: AddressDirection) -> Result<(), BusError> {
        assert!(addr <= 30, "primary address out of range");
        self.send_cmd(UNL)?;
        match direction {
            AddressDirection::Talk => self.send_cmd(TAD + addr)?,
            AddressDirection::Listen => self.send_cmd(LAD + addr)?,
        }
        self.device_addressed = true;
        Ok(())
    }

    /// Untalk and unlisten everything on the bus.
    pub fn unaddress_device(&mut self) -> Result<(), BusError> {
        self.port.delay_us(ADDRESS_GAP_US);
        self.send_cmd(UNL)?;
        self.send_cmd(UNT)?;
        self.device_addressed = false;
        Ok(())
    }

    /// Send UNL alone and return to idle.
    pub fn send_unl(&mut self) -> Result<(), BusError> {
        self.send_cmd(UNL)?;
        self.set_controls(BusState::Cids);
        self.device_addressed = false;
        Ok(())
    }

    /// Send UNT alone and return to idle.
    pub fn send_unt(&mut self) -> Result<(), BusError> {
        self.send_cmd(UNT)?;
        self.set_controls(BusState::Cids);
        self.device_addressed = false;
        Ok(())
    }

    /// Address the peer instrument to talk.
    pub fn send_mta(&mut self) -> Result<(), BusError> {
        if self.cstate != Some(BusState::Ccms) {
            self.set_controls(BusState::Ccms);
        }
        self.address_device(self.cfg.paddr, AddressDirection::Talk)
    }

    /// Address the peer instrument to listen.
    pub fn send_mla(&mut self) -> Result<(), BusError> {
        if self.cstate != Some(BusState::Ccms) {
            self.set_controls(BusState::Ccms);
        }
        self.address_device(self.cfg.paddr, AddressDirection::Listen)
    }

    /// Send a secondary address byte, then drop ATN.
    pub fn send_msa(&mut self, addr: u8) -> Result<(), BusError> {
        self.send_cmd(addr)?;
        self.port.set_signals(Signals::ATN, Signals::ATN, LineMode::Level);
        Ok(())
    }

    /// Pulse IFC, forcing every device on the bus to idle.
    pub fn send_ifc(&mut self) {
        self.port.set_signals(Signals::NONE, Signals::IFC, LineMode::Level);
        self.port.delay_us(IFC_PULSE_US);
        self.port.set_signals(Signals::IFC, Signals::IFC, LineMode::Level);
    }

    /// Return every instrument to local control.
    ///
    /// REN is released, then re-asserted together with ATN, each half held
    /// long enough for the slowest instruments to notice.
    pub fn send_all_clear(&mut self) {
        self.port.set_signals(Signals::REN, Signals::REN, LineMode::Level);
        self.port.delay_us(CLEAR_HOLD_US);
        self.port
            .set_signals(Signals::NONE, Signals::ATN | Signals::REN, LineMode::Level);
        self.port.delay_us(CLEAR_HOLD_US);
        self.port.set_signals(Signals::ATN, Signals::ATN, LineMode::Level);
    }

    /// Clear the configured peer instrument.
    pub fn send_sdc(&mut self) -> Result<(), BusError> {
        self.send_to_addressed(self.cfg.paddr, SDC)
    }

    /// Lock the configured peer instrument out of local control.
    pub fn send_llo(&mut self) -> Result<(), BusError> {
        self.send_to_addressed(self.cfg.paddr, LLO)
    }

    /// Return the configured peer instrument to local control.
    pub fn send_gtl(&mut self) -> Result<(), BusError> {
        self.send_to_addressed(self.cfg.paddr, GTL)
    }

    /// Trigger the instrument at `addr`.
    pub fn send_get(&mut self, addr: u8) -> Result<(), BusError> {
        self.send_to_addressed(addr, GET)
    }

    /// Shared shape of the single-byte device commands: address the target
    /// to listen, send the command, un-address. The first failing step
    /// aborts the sequence.
    fn send_to_addressed(&mut self, addr: u8, cmd: u8) -> Result<(), BusError> {
        self.address_device(addr, AddressDirection::Listen)?;
        self.send_cmd(cmd)?;
        self.unaddress_device()?;
        Ok(())
    }
}
