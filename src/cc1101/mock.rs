//! Scripted CC1101 bus for host tests.
//!
//! Models just enough chip behavior for the supervisor and pipeline tests:
//! MARCSTATE follows the strobes unless pinned with `stuck_marcstate`, the
//! RX FIFO is a byte queue, and every transaction is recorded for
//! assertions.

use super::bus::{Cc1101Bus, RegisterAccess};
use super::registers as regs;
use std::collections::VecDeque;
use std::convert::Infallible;

pub(crate) struct MockBus {
    /// Current chip state; tracks SIDLE/SRX strobes.
    pub marcstate: u8,
    /// When set, MARCSTATE reads return this regardless of strobes.
    pub stuck_marcstate: Option<u8>,
    pub rx_bytes: u8,
    pub rssi: u8,
    pub fifo: VecDeque<u8>,
    pub writes: Vec<(u8, u8)>,
    pub strobes: Vec<u8>,
    pub resets: usize,
    status_reads: Vec<u8>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            marcstate: regs::MARCSTATE_RX,
            stuck_marcstate: None,
            rx_bytes: 0,
            rssi: 0xC0, // about -106 dBm, a plausible idle channel
            fifo: VecDeque::new(),
            writes: Vec::new(),
            strobes: Vec::new(),
            resets: 0,
            status_reads: Vec::new(),
        }
    }

    /// Load bytes into the RX FIFO as the chip would present them:
    /// two preamble bytes, then the frame starting with its L-field.
    pub fn load_fifo(&mut self, preamble: [u8; 2], frame: &[u8]) {
        self.fifo.extend(preamble);
        self.fifo.extend(frame.iter().copied());
    }

    pub fn status_reads_of(&self, addr: u8) -> usize {
        self.status_reads.iter().filter(|&&a| a == addr).count()
    }
}

impl Cc1101Bus for MockBus {
    type Error = Infallible;

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Infallible> {
        self.writes.push((addr, value));
        Ok(())
    }

    fn read_register(&mut self, addr: u8, access: RegisterAccess) -> Result<u8, Infallible> {
        if access == RegisterAccess::Status {
            self.status_reads.push(addr);
        }
        Ok(match addr {
            regs::MARCSTATE => self.stuck_marcstate.unwrap_or(self.marcstate),
            regs::RXBYTES => self.rx_bytes,
            regs::RSSI => self.rssi,
            regs::RXFIFO => self.fifo.pop_front().unwrap_or(0),
            _ => 0,
        })
    }

    fn read_burst(&mut self, _addr: u8, buf: &mut [u8]) -> Result<(), Infallible> {
        for byte in buf.iter_mut() {
            *byte = self.fifo.pop_front().unwrap_or(0);
        }
        Ok(())
    }

    fn strobe(&mut self, strobe: u8) -> Result<(), Infallible> {
        self.strobes.push(strobe);
        match strobe {
            regs::SIDLE => self.marcstate = regs::MARCSTATE_IDLE,
            regs::SRX => self.marcstate = regs::MARCSTATE_RX,
            regs::SFRX => self.fifo.clear(),
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Infallible> {
        self.resets += 1;
        self.marcstate = regs::MARCSTATE_IDLE;
        self.fifo.clear();
        Ok(())
    }

    fn delay_ms(&mut self, _ms: u32) {}
}
