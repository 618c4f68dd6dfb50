//! In-memory board capability used by the test suites.
//!
//! [`MockPort`] records every port operation, keeps an electrical model of
//! the sixteen wires (wired-AND: low wins), and can attach a scripted
//! [`Instrument`] peer that handshakes commands and data like a real
//! talker/listener. The millisecond clock advances by one on every poll, so
//! timeout behavior is deterministic.

use core::sync::atomic::{AtomicBool, Ordering};
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use crate::bus::{LAD, TAD, UNL, UNT};
use crate::port::GpibPort;
use crate::signal::{Line, LineMode, Signals};

/// Recorded port operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Direction { value: u8, mask: u8 },
    Level { value: u8, mask: u8 },
    DataWrite(u8),
    DataRead,
    DataReady,
    DelayUs(u32),
}

struct LineEvent {
    at: u64,
    line: Line,
    level: PinState,
}

/// Scripted bus peer: accepts commands, listens and talks when addressed.
pub struct Instrument {
    pub address: u8,
    pub listening: bool,
    pub talking: bool,
    /// Bytes the instrument talks when addressed, with their EOI flag.
    tx: Vec<(u8, bool)>,
    tx_idx: usize,
    /// Command bytes received under ATN.
    pub commands: Vec<u8>,
    /// Data bytes received while listening.
    pub data: Vec<u8>,
    accepted: bool,
    driving: bool,
}

impl Instrument {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            listening: false,
            talking: false,
            tx: Vec::new(),
            tx_idx: 0,
            commands: Vec::new(),
            data: Vec::new(),
            accepted: false,
            driving: false,
        }
    }

    /// Start out already addressed to listen.
    pub fn listening(mut self) -> Self {
        self.listening = true;
        self
    }

    /// Start out already addressed to talk.
    pub fn talking(mut self) -> Self {
        self.talking = true;
        self
    }

    /// Queue `bytes` to be talked; `eoi_on_last` flags the final byte.
    pub fn with_response(mut self, bytes: &[u8], eoi_on_last: bool) -> Self {
        for (i, &byte) in bytes.iter().enumerate() {
            let last = i + 1 == bytes.len();
            self.tx.push((byte, eoi_on_last && last));
        }
        self
    }

    fn handle_command(&mut self, byte: u8) {
        self.commands.push(byte);
        if byte == UNL {
            self.listening = false;
        } else if byte == UNT {
            self.talking = false;
        } else if byte == LAD + self.address {
            self.listening = true;
        } else if byte == TAD + self.address {
            self.talking = true;
        }
    }
}

/// Recording, peer-aware implementation of the board capability.
pub struct MockPort {
    pub ops: Vec<Op>,
    dir: u8,
    level: u8,
    peer_lines: u8,
    data_out: Option<u8>,
    peer_data: Option<u8>,
    t: u64,
    events: Vec<LineEvent>,
    peer: Option<Instrument>,
    break_flag: Option<&'static AtomicBool>,
    break_at: u64,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            dir: 0x00,
            level: 0xFF,
            peer_lines: 0xFF,
            data_out: None,
            peer_data: None,
            t: 0,
            events: Vec::new(),
            peer: None,
            break_flag: None,
            break_at: 0,
        }
    }

    pub fn with_instrument(instrument: Instrument) -> Self {
        let mut port = Self::new();
        port.peer = Some(instrument);
        port
    }

    pub fn instrument(&self) -> &Instrument {
        self.peer.as_ref().expect("no instrument attached")
    }

    /// Change a peer-driven line level once the clock reaches `at`.
    pub fn schedule_level(&mut self, at: u64, line: Line, level: PinState) {
        self.events.push(LineEvent { at, line, level });
    }

    /// Raise `flag` once the clock reaches `at`.
    pub fn schedule_break(&mut self, at: u64, flag: &'static AtomicBool) {
        self.break_flag = Some(flag);
        self.break_at = at;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.t
    }

    pub fn direction_bits(&self) -> u8 {
        self.dir
    }

    pub fn level_bits(&self) -> u8 {
        self.level
    }

    /// All logical bytes driven onto the data lines, in order.
    pub fn data_writes(&self) -> Vec<u8> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::DataWrite(byte) => Some(*byte),
                _ => None,
            })
            .collect()
    }

    fn engine_low(&self, line: Line) -> bool {
        let bit = line.mask().raw_value();
        self.dir & bit != 0 && self.level & bit == 0
    }

    fn bus_low(&self, line: Line) -> bool {
        let bit = line.mask().raw_value();
        self.engine_low(line) || self.peer_lines & bit == 0
    }

    fn peer_drive(&mut self, line: Line, level: PinState) {
        let bit = line.mask().raw_value();
        match level {
            PinState::Low => self.peer_lines &= !bit,
            PinState::High => self.peer_lines |= bit,
        }
    }

    /// Advance the peer's handshake machines after a bus mutation.
    fn step_peer(&mut self) {
        let Some(mut peer) = self.peer.take() else {
            return;
        };
        let atn_low = self.engine_low(Line::Atn);
        let dav_low = self.engine_low(Line::Dav);

        // Listener half: every device handshakes commands; data only while
        // addressed to listen.
        if atn_low || peer.listening {
            if dav_low && !peer.accepted {
                let byte = self.data_out.unwrap_or(0);
                if atn_low {
                    peer.handle_command(byte);
                } else {
                    peer.data.push(byte);
                }
                self.peer_drive(Line::Nrfd, PinState::Low);
                self.peer_drive(Line::Ndac, PinState::High);
                peer.accepted = true;
            } else if !dav_low && peer.accepted {
                self.peer_drive(Line::Nrfd, PinState::High);
                self.peer_drive(Line::Ndac, PinState::Low);
                peer.accepted = false;
            } else if !peer.accepted {
                self.peer_drive(Line::Nrfd, PinState::High);
                self.peer_drive(Line::Ndac, PinState::Low);
            }
        } else if !peer.talking {
            self.peer_drive(Line::Nrfd, PinState::High);
            self.peer_drive(Line::Ndac, PinState::High);
        }

        // Talker half. A device addressed to talk stops driving the
        // acceptor wires.
        if peer.talking && !atn_low {
            self.peer_drive(Line::Nrfd, PinState::High);
            self.peer_drive(Line::Ndac, PinState::High);
            if !peer.driving {
                let acceptor_ready = !self.bus_low(Line::Nrfd) && self.engine_low(Line::Ndac);
                if peer.tx_idx < peer.tx.len() && acceptor_ready {
                    let (byte, eoi) = peer.tx[peer.tx_idx];
                    self.peer_data = Some(byte);
                    if eoi {
                        self.peer_drive(Line::Eoi, PinState::Low);
                    }
                    self.peer_drive(Line::Dav, PinState::Low);
                    peer.driving = true;
                }
            } else if !self.bus_low(Line::Ndac) {
                self.peer_drive(Line::Dav, PinState::High);
                self.peer_drive(Line::Eoi, PinState::High);
                self.peer_data = None;
                peer.tx_idx += 1;
                peer.driving = false;
            }
        }

        self.peer = Some(peer);
    }
}

impl DelayNs for MockPort {
    fn delay_ns(&mut self, ns: u32) {
        self.ops.push(Op::DelayUs(ns / 1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.ops.push(Op::DelayUs(us));
    }
}

impl GpibPort for MockPort {
    fn ready_data_bus(&mut self) {
        self.ops.push(Op::DataReady);
        self.data_out = None;
        self.step_peer();
    }

    fn read_data_bus(&mut self) -> u8 {
        self.ops.push(Op::DataRead);
        // Logical view of the wired bus: a driven byte wins over pull-ups.
        self.peer_data.or(self.data_out).unwrap_or(0x00)
    }

    fn write_data_bus(&mut self, byte: u8) {
        self.ops.push(Op::DataWrite(byte));
        self.data_out = Some(byte);
        self.step_peer();
    }

    fn set_signals(&mut self, value: Signals, mask: Signals, mode: LineMode) {
        let (value, mask) = (value.raw_value(), mask.raw_value());
        match mode {
            LineMode::Direction => {
                self.ops.push(Op::Direction { value, mask });
                self.dir = (self.dir & !mask) | (value & mask);
            }
            LineMode::Level => {
                self.ops.push(Op::Level { value, mask });
                self.level = (self.level & !mask) | (value & mask);
            }
        }
        self.step_peer();
    }

    fn line_level(&mut self, line: Line) -> PinState {
        if self.bus_low(line) {
            PinState::Low
        } else {
            PinState::High
        }
    }

    fn now_ms(&mut self) -> u64 {
        self.t += 1;
        let now = self.t;
        let mut applied = false;
        let mut i = 0;
        while i < self.events.len() {
            if self.events[i].at <= now {
                let event = self.events.remove(i);
                self.peer_drive(event.line, event.level);
                applied = true;
            } else {
                i += 1;
            }
        }
        if let Some(flag) = self.break_flag {
            if now >= self.break_at {
                flag.store(true, Ordering::Relaxed);
            }
        }
        if applied {
            self.step_peer();
        }
        now
    }
}

/// Build an engine over `port` with a fresh break flag.
pub fn engine(
    port: MockPort,
    cfg: crate::config::Config,
) -> (crate::bus::GpibBus<'static, MockPort>, &'static AtomicBool) {
    let flag: &'static AtomicBool = std::boxed::Box::leak(std::boxed::Box::new(AtomicBool::new(false)));
    (crate::bus::GpibBus::new(port, cfg, flag), flag)
}

/// Infallible byte sink backed by a `Vec`.
pub struct SinkBuf(pub Vec<u8>);

impl SinkBuf {
    pub fn new() -> Self {
        Self(Vec::new())
    }
}

impl embedded_io::ErrorType for SinkBuf {
    type Error = core::convert::Infallible;
}

impl embedded_io::Write for SinkBuf {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Sink that rejects every write.
pub struct FailingSink;

impl embedded_io::ErrorType for FailingSink {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> Result<usize, Self::Error> {
        Err(embedded_io::ErrorKind::OutOfMemory)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_bus_loopback_is_logical() {
        let mut port = MockPort::new();
        for byte in [0x00, 0x2A, 0xFF, 0x55] {
            port.write_data_bus(byte);
            assert_eq!(port.read_data_bus(), byte);
        }
        port.ready_data_bus();
        assert_eq!(port.read_data_bus(), 0x00);
    }

    #[test]
    fn masked_writes_leave_other_lines_alone() {
        let mut port = MockPort::new();
        port.set_signals(Signals::NONE, Signals::ALL, LineMode::Direction);
        port.set_signals(Signals::ALL, Signals::ALL, LineMode::Level);
        port.set_signals(Signals::ATN, Signals::ATN, LineMode::Direction);
        port.set_signals(Signals::NONE, Signals::ATN, LineMode::Level);
        assert_eq!(port.direction_bits(), 0x80);
        assert_eq!(port.level_bits(), 0x7F);
        // A handshake-only write must not disturb ATN.
        port.set_signals(Signals::NRFD, Signals::NRFD | Signals::NDAC, LineMode::Level);
        assert_eq!(port.level_bits(), 0x7D);
        assert_eq!(port.direction_bits(), 0x80);
    }
}
