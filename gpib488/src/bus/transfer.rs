//! Data-message transfer and serial-poll status.

use embedded_io::Error as _;

use crate::config::{Eor, CR, ESC, LF};
use crate::port::GpibPort;
use crate::signal::{LineMode, Signals};

use super::command::AddressDirection;
use super::error::BusError;
use super::states::BusState;
use super::{GpibBus, EOI_PULSE_US};

/// Request-service bit of the serial-poll status byte.
const RQS: u8 = 0x40;

impl<'b, P: GpibPort> GpibBus<'b, P> {
    /// Send a data message to the currently addressed listeners.
    ///
    /// The role's talk state is entered for the duration of the transfer.
    /// Terminators are appended according to the transmit policy, and with
    /// EOI enabled a trailing EOI pulse marks the end of the message. The
    /// bus is returned to the role's idle state in every case.
    pub fn send_data(&mut self, data: &[u8]) -> Result<(), BusError> {
        if self.is_controller() {
            self.set_controls(BusState::Ctas);
        } else {
            self.set_controls(BusState::Dtas);
        }

        let mut result = Ok(());
        for &byte in data {
            // Without EOI framing, bare terminator bytes inside the payload
            // are dropped; the host escapes the ones it wants on the wire.
            if !self.cfg.eoi_tx && matches!(byte, CR | LF | ESC) {
                continue;
            }
            if let Err(e) = self.write_byte(byte, false) {
                result = Err(e);
                break;
            }
        }

        if result.is_ok() {
            if self.cfg.eos.sends_cr() {
                result = self.write_byte(CR, false);
            }
            if result.is_ok() && self.cfg.eos.sends_lf() {
                result = self.write_byte(LF, false);
            }
        }

        if result.is_ok() && self.cfg.eoi_tx {
            self.pulse_eoi();
        }

        let idle = if self.is_controller() {
            BusState::Cids
        } else {
            BusState::Dids
        };
        self.set_controls(idle);
        self.port.ready_data_bus();
        result
    }

    /// Receive a data message and stream it into `sink`.
    ///
    /// In controller role the peer instrument is first addressed to talk; in
    /// device role the engine simply listens and always honors EOI. The loop
    /// ends on the recognized terminator (EOI, `end_byte`, or the configured
    /// receive terminator), on a break request from the host side, or on a
    /// bus fault. Returns the number of payload bytes written to `sink`.
    pub fn receive_data<W: embedded_io::Write>(
        &mut self,
        sink: &mut W,
        force_eoi: bool,
        end_byte: Option<u8>,
    ) -> Result<usize, BusError> {
        self.clear_break();

        let mut read_with_eoi = self.cfg.eoi_tx || force_eoi || self.cfg.eor == Eor::Eoi;

        if self.is_controller() {
            if let Err(e) = self.address_device(self.cfg.paddr, AddressDirection::Talk) {
                self.set_controls(BusState::Cids);
                return Err(e);
            }
            self.set_controls(BusState::Clas);
        } else {
            self.set_controls(BusState::Dlas);
            read_with_eoi = true;
        }
        self.port.ready_data_bus();

        let mut window = [0u8; 3];
        let mut count = 0usize;
        let mut ended_by_eoi = false;
        let mut failure = None;

        loop {
            if self.break_requested() {
                break;
            }
            match self.read_byte(read_with_eoi) {
                Ok((byte, eoi)) => {
                    if let Err(e) = sink.write_all(&[byte]) {
                        failure = Some(BusError::Sink(e.kind()));
                        break;
                    }
                    count += 1;
                    if read_with_eoi {
                        if eoi {
                            ended_by_eoi = true;
                            break;
                        }
                    } else if let Some(end) = end_byte {
                        if byte == end {
                            break;
                        }
                    } else {
                        window = [byte, window[0], window[1]];
                        if self.cfg.eor.matches(&window) {
                            break;
                        }
                    }
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if ended_by_eoi {
            if let Some(eot) = self.cfg.eot {
                if let Err(e) = sink.write_all(&[eot]) {
                    if failure.is_none() {
                        failure = Some(BusError::Sink(e.kind()));
                    }
                }
            }
        }

        if self.is_controller() {
            // Best effort: the bus still has to be released even if the
            // talker stopped answering.
            let _ = self.unaddress_device();
            self.set_controls(BusState::Cids);
        } else {
            self.set_controls(BusState::Dids);
        }
        self.clear_break();

        match failure {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }

    /// Store the serial-poll status byte and mirror its RQS bit on SRQ.
    pub fn set_status(&mut self, status: u8) {
        self.cfg.stat = status;
        if status & RQS != 0 {
            self.assert_srq();
        } else {
            self.release_srq();
        }
    }

    /// Answer a serial poll with the stored status byte.
    ///
    /// After the byte is on the wire the request is considered served: the
    /// RQS bit is cleared and SRQ released.
    pub fn send_status(&mut self) -> Result<(), BusError> {
        if self.cstate != Some(BusState::Dtas) {
            self.set_controls(BusState::Dtas);
        }
        let result = self.write_byte(self.cfg.stat, false);
        self.set_controls(BusState::Dids);
        self.port.ready_data_bus();
        self.cfg.stat &= !RQS;
        self.release_srq();
        result
    }

    fn assert_srq(&mut self) {
        self.port.set_signals(Signals::SRQ, Signals::SRQ, LineMode::Direction);
        self.port.set_signals(Signals::NONE, Signals::SRQ, LineMode::Level);
    }

    fn release_srq(&mut self) {
        self.port.set_signals(Signals::NONE, Signals::SRQ, LineMode::Direction);
        self.port.set_signals(Signals::SRQ, Signals::SRQ, LineMode::Level);
    }

    fn pulse_eoi(&mut self) {
        self.port.set_signals(Signals::EOI, Signals::EOI, LineMode::Direction);
        self.port.set_signals(Signals::NONE, Signals::EOI, LineMode::Level);
        self.port.delay_us(EOI_PULSE_US);
        self.port.set_signals(Signals::EOI, Signals::EOI, LineMode::Level);
    }
}
