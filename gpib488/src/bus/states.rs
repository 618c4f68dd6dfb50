//! Named bus states and their control-line contracts.
//!
//! Every state pins down, for each control line it owns, a direction
//! (input-with-pull-up or output) and a driven level. Entering a state issues
//! exactly two masked port writes, direction first, then level. Lines outside
//! a state's masks keep whatever the previous state left behind.

use crate::port::GpibPort;
use crate::signal::{LineMode, Signals};

/// Configuration of the control lines while a state is current.
///
/// Levels follow negative-true convention: a set bit releases the line
/// (HIGH/pull-up), a clear bit drives it LOW.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineContract {
    pub direction_value: Signals,
    pub direction_mask: Signals,
    pub level_value: Signals,
    pub level_mask: Signals,
}

/// Operating states of the bus interface.
///
/// `C*` states exist in controller role, `D*` states in device role. The
/// engine holds no state at all between [`stop`](super::GpibBus::stop) and
/// the next start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// Controller initialization: ATN seized so commands can follow at once.
    Cini,
    /// Controller idle.
    Cids,
    /// Controller sending commands under ATN.
    Ccms,
    /// Controller listening to an addressed talker.
    Clas,
    /// Controller talking to addressed listeners.
    Ctas,
    /// Device initialization: every line released.
    Dini,
    /// Device idle.
    Dids,
    /// Device actively listening.
    Dlas,
    /// Device actively talking.
    Dtas,
}

/// Output set shared by the controller states: ATN, REN, EOI and DAV.
const CTRL_DRIVEN: Signals = Signals::ATN
    .union(Signals::REN)
    .union(Signals::EOI)
    .union(Signals::DAV);

/// The three handshake wires.
const HANDSHAKE: Signals = Signals::DAV.union(Signals::NRFD).union(Signals::NDAC);

/// Lines a device state may touch: EOI plus the handshake wires.
const DEVICE_LINES: Signals = Signals::EOI.union(HANDSHAKE);

/// Everything except IFC, which only CINI/CIDS/CCMS own.
const ALL_BUT_IFC: Signals = Signals::new_with_raw_value(0xFF ^ 0x01);

impl BusState {
    /// Whether this state belongs to the controller role.
    pub fn is_controller(self) -> bool {
        matches!(self, Self::Cini | Self::Cids | Self::Ccms | Self::Clas | Self::Ctas)
    }

    /// The line writes performed on entry to this state.
    pub(crate) const fn contract(self) -> LineContract {
        match self {
            // ATN is held asserted out of initialization so the controller
            // can issue commands immediately.
            Self::Cini => LineContract {
                direction_value: CTRL_DRIVEN,
                direction_mask: Signals::ALL,
                level_value: Signals::ALL.with_atn(false),
                level_mask: Signals::ALL,
            },
            Self::Cids => LineContract {
                direction_value: CTRL_DRIVEN,
                direction_mask: Signals::ALL,
                level_value: Signals::ALL,
                level_mask: Signals::ALL,
            },
            Self::Ccms => LineContract {
                direction_value: CTRL_DRIVEN.with_ifc(true),
                direction_mask: Signals::ALL,
                level_value: Signals::ALL.with_atn(false),
                level_mask: Signals::ALL,
            },
            Self::Clas => LineContract {
                direction_value: Signals::ATN
                    .union(Signals::REN)
                    .union(Signals::NRFD)
                    .union(Signals::NDAC),
                direction_mask: ALL_BUT_IFC,
                level_value: ALL_BUT_IFC.with_nrfd(false).with_ndac(false),
                level_mask: ALL_BUT_IFC,
            },
            Self::Ctas => LineContract {
                direction_value: CTRL_DRIVEN,
                direction_mask: ALL_BUT_IFC,
                level_value: ALL_BUT_IFC,
                level_mask: ALL_BUT_IFC,
            },
            Self::Dini => LineContract {
                direction_value: Signals::NONE,
                direction_mask: Signals::ALL,
                level_value: Signals::ALL,
                level_mask: Signals::ALL,
            },
            Self::Dids => LineContract {
                direction_value: Signals::NONE,
                direction_mask: HANDSHAKE,
                level_value: HANDSHAKE,
                level_mask: HANDSHAKE,
            },
            Self::Dlas => LineContract {
                direction_value: Signals::NRFD.union(Signals::NDAC),
                direction_mask: DEVICE_LINES,
                level_value: Signals::EOI.union(Signals::DAV),
                level_mask: DEVICE_LINES,
            },
            Self::Dtas => LineContract {
                direction_value: Signals::EOI.union(Signals::DAV),
                direction_mask: DEVICE_LINES,
                level_value: DEVICE_LINES,
                level_mask: DEVICE_LINES,
            },
        }
    }
}

/// Apply a state's line contract to the port.
pub(crate) fn drive<P: GpibPort>(port: &mut P, state: BusState) {
    let contract = state.contract();
    port.set_signals(contract.direction_value, contract.direction_mask, LineMode::Direction);
    port.set_signals(contract.level_value, contract.level_mask, LineMode::Level);
    // The init states also park the data lines.
    if matches!(state, BusState::Cini | BusState::Dini) {
        port.ready_data_bus();
    }
}
