//! Decrypted-payload layouts and the structured meter reading.
//!
//! The Multical21 sends one of two payload layouts, told apart by a single
//! discriminator byte: 0x78 selects the long layout, anything else the
//! compact one. Extraction is a pure offset-table lookup; there is no
//! other parsing.

use serde::Serialize;
use std::fmt;

/// Discriminator byte value selecting the long layout.
const LONG_LAYOUT: u8 = 0x78;

/// Byte index of the discriminator within the decrypted payload.
const DISCRIMINATOR: usize = 2;

/// Fixed byte offsets within the decrypted payload.
struct Layout {
    total: usize,
    target: usize,
    info: usize,
    flow_temp: usize,
    ambient_temp: usize,
}

const COMPACT: Layout = Layout {
    total: 9,
    target: 13,
    info: 7,
    flow_temp: 17,
    ambient_temp: 18,
};

const LONG: Layout = Layout {
    total: 10,
    target: 16,
    info: 6,
    flow_temp: 22,
    ambient_temp: 25,
};

impl Layout {
    fn select(discriminator: u8) -> &'static Layout {
        if discriminator == LONG_LAYOUT {
            &LONG
        } else {
            &COMPACT
        }
    }

    /// Smallest payload this layout can be read from.
    fn min_len(&self) -> usize {
        (self.target + 3)
            .max(self.total + 3)
            .max(self.info)
            .max(self.flow_temp)
            .max(self.ambient_temp)
            + 1
    }
}

/// Meter status flag, decoded for presentation. The raw byte is preserved
/// for machine consumption; codes this firmware does not know degrade to
/// [`InfoCode::Unknown`] instead of being misrepresented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoCode {
    Normal,
    Dry,
    Reverse,
    Leak,
    Burst,
    Unknown(u8),
}

impl InfoCode {
    pub fn from_raw(code: u8) -> Self {
        match code {
            0x00 => Self::Normal,
            0x01 => Self::Dry,
            0x02 => Self::Reverse,
            0x04 => Self::Leak,
            0x08 => Self::Burst,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            Self::Normal => 0x00,
            Self::Dry => 0x01,
            Self::Reverse => 0x02,
            Self::Leak => 0x04,
            Self::Burst => 0x08,
            Self::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for InfoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Dry => f.write_str("dry"),
            Self::Reverse => f.write_str("reverse"),
            Self::Leak => f.write_str("leak"),
            Self::Burst => f.write_str("burst"),
            Self::Unknown(code) => write!(f, "code_0x{:02x}", code),
        }
    }
}

/// One decoded reading. Produced fresh per successfully decoded frame and
/// superseded, not merged, by the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeterReading {
    /// Total consumption in liters.
    pub total_liters: u32,
    /// Target (start-of-month) consumption in liters.
    pub target_liters: u32,
    /// Water temperature in °C.
    pub flow_temp_c: i8,
    /// Temperature around the meter in °C.
    pub ambient_temp_c: i8,
    /// Raw info code byte.
    pub info_code: u8,
}

impl MeterReading {
    /// Extract a reading from a decrypted payload.
    ///
    /// Returns `None` if the payload is too short for the layout its
    /// discriminator selects; this is the semantic range check backing up
    /// the CRC, since a wrong key produces noise, not an error.
    pub fn extract(payload: &[u8]) -> Option<Self> {
        if payload.len() <= DISCRIMINATOR {
            return None;
        }
        let layout = Layout::select(payload[DISCRIMINATOR]);
        if payload.len() < layout.min_len() {
            return None;
        }

        let le_u32 = |at: usize| {
            u32::from_le_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]])
        };

        Some(Self {
            total_liters: le_u32(layout.total),
            target_liters: le_u32(layout.target),
            flow_temp_c: payload[layout.flow_temp] as i8,
            ambient_temp_c: payload[layout.ambient_temp] as i8,
            info_code: payload[layout.info],
        })
    }

    pub fn info(&self) -> InfoCode {
        InfoCode::from_raw(self.info_code)
    }
}

impl fmt::Display for MeterReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total: {}.{:03} m³ - target: {}.{:03} m³ - {} °C - {} °C - {}",
            self.total_liters / 1000,
            self.total_liters % 1000,
            self.target_liters / 1000,
            self.target_liters % 1000,
            self.flow_temp_c,
            self.ambient_temp_c,
            self.info()
        )
    }
}
