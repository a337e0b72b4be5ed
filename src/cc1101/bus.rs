//! Register/strobe transport contract for the CC1101.
//!
//! This is a pure register transport: no frame semantics live here. Every
//! implementation wraps each transaction in chip-select assert/release and
//! gates it on the chip's ready signal (MISO low while selected). That wait
//! is bounded only by the chip's own timing guarantee; a hang here means
//! dead hardware, which is not recoverable in software.

/// Addressing mode for single-register reads.
///
/// The CC1101 overloads the burst bit to select the status register space,
/// so status reads use a different header bit than configuration reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAccess {
    /// Configuration register space (header `addr | 0x80`).
    Config,
    /// Status register space (header `addr | 0xC0`).
    Status,
}

impl RegisterAccess {
    /// Header bits OR'd onto the register address.
    pub fn header_bits(self) -> u8 {
        match self {
            RegisterAccess::Config => 0x80,
            RegisterAccess::Status => 0xC0,
        }
    }
}

/// Header bits for burst reads (`addr | 0xC0`).
pub const READ_BURST: u8 = 0xC0;

/// Low-level CC1101 transport.
///
/// Implemented by the bit-banged SPI driver on ESP32 and by a scripted mock
/// in host tests. All methods are invoked exclusively from the main loop
/// thread; implementations need no interior synchronization.
pub trait Cc1101Bus {
    type Error: core::fmt::Debug;

    /// Write a single configuration register.
    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Self::Error>;

    /// Read a single register in the given address space.
    fn read_register(&mut self, addr: u8, access: RegisterAccess) -> Result<u8, Self::Error>;

    /// Burst-read `buf.len()` bytes starting at `addr`.
    fn read_burst(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Issue a command strobe.
    fn strobe(&mut self, strobe: u8) -> Result<(), Self::Error>;

    /// Perform the documented power-on-reset sequence. The only supported
    /// way to return the chip to a known state.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Block for `ms` milliseconds. Mock implementations may make this a
    /// no-op.
    fn delay_ms(&mut self, ms: u32);
}
