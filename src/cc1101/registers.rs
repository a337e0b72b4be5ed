//! CC1101 register map and the WMBus Mode C1 configuration table.
//!
//! Addresses and strobe opcodes per the TI CC1101 datasheet (SWRS061I).
//! The default value table programs the radio for WMBus Mode C1 reception:
//! 868.95 MHz, 100 kbps 2-GFSK, sync word 0x543D, fixed-length packet
//! handling disabled (length is taken from the frame's L-field).

// Configuration registers
pub const IOCFG2: u8 = 0x00;
pub const IOCFG0: u8 = 0x02;
pub const FIFOTHR: u8 = 0x03;
pub const SYNC1: u8 = 0x04;
pub const SYNC0: u8 = 0x05;
pub const PKTLEN: u8 = 0x06;
pub const PKTCTRL1: u8 = 0x07;
pub const PKTCTRL0: u8 = 0x08;
pub const ADDR: u8 = 0x09;
pub const CHANNR: u8 = 0x0A;
pub const FSCTRL1: u8 = 0x0B;
pub const FSCTRL0: u8 = 0x0C;
pub const FREQ2: u8 = 0x0D;
pub const FREQ1: u8 = 0x0E;
pub const FREQ0: u8 = 0x0F;
pub const MDMCFG4: u8 = 0x10;
pub const MDMCFG3: u8 = 0x11;
pub const MDMCFG2: u8 = 0x12;
pub const MDMCFG1: u8 = 0x13;
pub const MDMCFG0: u8 = 0x14;
pub const DEVIATN: u8 = 0x15;
pub const MCSM1: u8 = 0x17;
pub const MCSM0: u8 = 0x18;
pub const FOCCFG: u8 = 0x19;
pub const BSCFG: u8 = 0x1A;
pub const AGCCTRL2: u8 = 0x1B;
pub const AGCCTRL1: u8 = 0x1C;
pub const AGCCTRL0: u8 = 0x1D;
pub const FREND1: u8 = 0x21;
pub const FREND0: u8 = 0x22;
pub const FSCAL3: u8 = 0x23;
pub const FSCAL2: u8 = 0x24;
pub const FSCAL1: u8 = 0x25;
pub const FSCAL0: u8 = 0x26;
pub const FSTEST: u8 = 0x29;
pub const TEST2: u8 = 0x2C;
pub const TEST1: u8 = 0x2D;
pub const TEST0: u8 = 0x2E;

// Status registers (read with status access mode)
pub const RSSI: u8 = 0x34;
pub const MARCSTATE: u8 = 0x35;
pub const RXBYTES: u8 = 0x3B;

/// RX FIFO (single-byte config-mode reads pop one byte).
pub const RXFIFO: u8 = 0x3F;

// Command strobes
pub const SRES: u8 = 0x30;
pub const SCAL: u8 = 0x33;
pub const SRX: u8 = 0x34;
pub const SIDLE: u8 = 0x36;
pub const SFRX: u8 = 0x3A;

// MARCSTATE values of interest
pub const MARCSTATE_IDLE: u8 = 0x01;
pub const MARCSTATE_RX: u8 = 0x0D;

/// High bit of RXBYTES signals an RX FIFO overflow.
pub const RXBYTES_OVERFLOW: u8 = 0x80;

/// Default register table written verbatim at every (re)start.
pub const DEFAULT_CONFIG: &[(u8, u8)] = &[
    (IOCFG2, 0x2E),   // GDO2 high impedance (unused)
    (IOCFG0, 0x06),   // GDO0 asserts on sync, deasserts at end of packet
    (FIFOTHR, 0x07),  // 32 byte RX FIFO threshold
    (PKTLEN, 0xFF),   // maximum packet length
    (PKTCTRL1, 0x00), // no address check, no status append
    (PKTCTRL0, 0x00), // fixed length mode, CRC off (WMBus CRC checked in software)
    (SYNC1, 0x54),    // Mode C sync word, high byte
    (SYNC0, 0x3D),    // Mode C sync word, low byte
    (ADDR, 0x00),
    (CHANNR, 0x00),
    (FSCTRL1, 0x08), // 203 kHz IF
    (FSCTRL0, 0x00),
    (FREQ2, 0x21), // 868.95 MHz
    (FREQ1, 0x6B),
    (FREQ0, 0xD0),
    (MDMCFG4, 0x5C), // 100 kbps, 325 kHz RX bandwidth
    (MDMCFG3, 0x04),
    (MDMCFG2, 0x06), // 2-GFSK, 16/16 sync bits with carrier sense
    (MDMCFG1, 0x22), // 4 preamble bytes
    (MDMCFG0, 0xF8),
    (DEVIATN, 0x44), // 38 kHz deviation
    (MCSM1, 0x00),   // return to IDLE after packet
    (MCSM0, 0x18),   // autocal on IDLE -> RX
    (FOCCFG, 0x2E),
    (BSCFG, 0xBF),
    (AGCCTRL2, 0x43),
    (AGCCTRL1, 0x09),
    (AGCCTRL0, 0xB5),
    (FREND1, 0xB6),
    (FREND0, 0x10),
    (FSCAL3, 0xEA),
    (FSCAL2, 0x2A),
    (FSCAL1, 0x00),
    (FSCAL0, 0x1F),
    (FSTEST, 0x59),
    (TEST2, 0x81),
    (TEST1, 0x35),
    (TEST0, 0x09),
];

/// Convert a raw RSSI register value to dBm (datasheet section 17.3).
pub fn rssi_dbm(raw: u8) -> i16 {
    if raw >= 128 {
        (raw as i16 - 256) / 2 - 74
    } else {
        raw as i16 / 2 - 74
    }
}
