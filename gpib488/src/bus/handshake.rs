//! Three-wire byte handshake.
//!
//! Each byte on the bus is clocked by DAV against the wired-AND NRFD and
//! NDAC lines. Both directions are expressed as small staged machines polled
//! once per loop iteration; the stage numbers double as the timeout status
//! reported to the host, so a stalled transfer names the wire that never
//! moved.
//!
//! In device role both machines additionally watch IFC and ATN every
//! iteration: the controller may clear the interface or seize attention at
//! any time, and the device must abandon the transfer at once.

use crate::port::GpibPort;
use crate::signal::{Line, LineMode, Signals};

use super::error::BusError;
use super::states::BusState;
use super::GpibBus;

/// Acceptor (read) handshake stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptorStage {
    /// Release NRFD to announce readiness.
    Ready,
    /// Wait for the talker to assert DAV.
    AwaitValid,
    /// Latch the byte and release NDAC.
    Accept,
    /// Wait for DAV to clear, then re-arm NDAC.
    AwaitRelease,
}

impl AcceptorStage {
    fn code(self) -> u8 {
        match self {
            Self::Ready => 4,
            Self::AwaitValid => 6,
            Self::Accept => 7,
            Self::AwaitRelease => 8,
        }
    }
}

/// Source (write) handshake stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceStage {
    /// Wait for NDAC low: at least one listener is attentive.
    AwaitAttentive,
    /// Wait for NRFD high: every listener is ready.
    AwaitReady,
    /// Drive the byte and assert DAV.
    Present,
    /// Wait for NRFD low: listeners are taking the byte.
    AwaitAccept,
    /// Wait for NDAC high: every listener has accepted.
    AwaitAccepted,
}

impl SourceStage {
    fn code(self) -> u8 {
        match self {
            Self::AwaitAttentive => 4,
            Self::AwaitReady => 5,
            Self::Present => 6,
            Self::AwaitAccept => 7,
            Self::AwaitAccepted => 8,
        }
    }
}

impl<'b, P: GpibPort> GpibBus<'b, P> {
    /// Accept a single byte from the bus.
    ///
    /// The bus must already be configured to listen. Returns the byte and
    /// whether EOI accompanied it; EOI is only sampled when `read_with_eoi`
    /// is set.
    pub fn read_byte(&mut self, read_with_eoi: bool) -> Result<(u8, bool), BusError> {
        let started = self.port.now_ms();
        let timeout = u64::from(self.cfg.rtmo.0);
        let atn_at_entry = self.port.line_asserted(Line::Atn);
        let mut stage = AcceptorStage::Ready;
        let mut byte = 0u8;
        let mut eoi = false;

        loop {
            if self.in_device_role() {
                if self.port.line_asserted(Line::Ifc) {
                    return Err(BusError::InterfaceClear);
                }
                if !atn_at_entry && self.port.line_asserted(Line::Atn) {
                    return Err(BusError::Attention);
                }
            }

            match stage {
                AcceptorStage::Ready => {
                    self.port.set_signals(Signals::NRFD, Signals::NRFD, LineMode::Level);
                    stage = AcceptorStage::AwaitValid;
                }
                AcceptorStage::AwaitValid => {
                    if self.port.line_asserted(Line::Dav) {
                        // Busy reading: hold off further bytes.
                        self.port.set_signals(Signals::NONE, Signals::NRFD, LineMode::Level);
                        stage = AcceptorStage::Accept;
                    }
                }
                AcceptorStage::Accept => {
                    if read_with_eoi && self.port.line_asserted(Line::Eoi) {
                        eoi = true;
                    }
                    byte = self.port.read_data_bus();
                    self.port.set_signals(Signals::NDAC, Signals::NDAC, LineMode::Level);
                    stage = AcceptorStage::AwaitRelease;
                }
                AcceptorStage::AwaitRelease => {
                    if !self.port.line_asserted(Line::Dav) {
                        self.port.set_signals(Signals::NONE, Signals::NDAC, LineMode::Level);
                        return Ok((byte, eoi));
                    }
                }
            }

            if self.port.now_ms().wrapping_sub(started) >= timeout {
                return Err(BusError::Timeout(stage.code()));
            }
        }
    }

    /// Source a single byte onto the bus.
    ///
    /// With `eoi_tx` configured and `is_last` set, EOI is asserted together
    /// with DAV so the byte arrives flagged as the end of the message. On a
    /// device-role abort the engine switches to [`BusState::Dlas`] so the
    /// incoming command can be listened for.
    pub fn write_byte(&mut self, byte: u8, is_last: bool) -> Result<(), BusError> {
        let started = self.port.now_ms();
        let timeout = u64::from(self.cfg.rtmo.0);
        let with_eoi = self.cfg.eoi_tx && is_last;
        let dav_lines = if with_eoi {
            Signals::DAV | Signals::EOI
        } else {
            Signals::DAV
        };
        let mut stage = SourceStage::AwaitAttentive;

        loop {
            if self.in_device_role() {
                if self.port.line_asserted(Line::Ifc) {
                    self.set_controls(BusState::Dlas);
                    return Err(BusError::InterfaceClear);
                }
                if self.port.line_asserted(Line::Atn) {
                    self.set_controls(BusState::Dlas);
                    return Err(BusError::Attention);
                }
            }

            match stage {
                SourceStage::AwaitAttentive => {
                    if self.port.line_asserted(Line::Ndac) {
                        stage = SourceStage::AwaitReady;
                    }
                }
                SourceStage::AwaitReady => {
                    if !self.port.line_asserted(Line::Nrfd) {
                        stage = SourceStage::Present;
                    }
                }
                SourceStage::Present => {
                    self.port.write_data_bus(byte);
                    self.port.set_signals(Signals::NONE, dav_lines, LineMode::Level);
                    stage = SourceStage::AwaitAccept;
                }
                SourceStage::AwaitAccept => {
                    if self.port.line_asserted(Line::Nrfd) {
                        stage = SourceStage::AwaitAccepted;
                    }
                }
                SourceStage::AwaitAccepted => {
                    if !self.port.line_asserted(Line::Ndac) {
                        self.port.set_signals(dav_lines, dav_lines, LineMode::Level);
                        self.port.write_data_bus(0);
                        return Ok(());
                    }
                }
            }

            if self.port.now_ms().wrapping_sub(started) >= timeout {
                return Err(BusError::Timeout(stage.code()));
            }
        }
    }
}
