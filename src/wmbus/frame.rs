//! Wire-frame buffer, validation and field access.
//!
//! A received frame is `[L][payload...]` where the L-field counts every
//! byte after itself and the last two payload bytes are a big-endian
//! CRC-16 (EN 13757) over everything preceding them, L-field included.
//! The 4-byte meter serial sits least-significant-byte-first in the
//! A-field, ending at byte 7.

use crate::config::MeterId;
use crc::{Crc, CRC_16_EN_13757};
use std::fmt;

/// Frame buffer capacity (L-field plus payload). The L-field must be
/// strictly below this; anything larger is rejected, never truncated.
pub const MAX_FRAME_LEN: usize = 64;

/// Shortest payload worth looking at.
pub const MIN_FRAME_LEN: usize = 10;

/// Shortest frame that can carry ciphertext (17-byte header, one CRC pair
/// short of an AES block).
pub const MIN_ENCRYPTED_LEN: usize = 18;

/// Ciphertext starts here, right after the unencrypted header.
pub const CIPHER_OFFSET: usize = 17;

/// Scratch capacity for the decrypted payload.
pub const CIPHER_CAPACITY: usize = MAX_FRAME_LEN - CIPHER_OFFSET;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_EN_13757);

/// CRC-16 per EN 13757 (poly 0x3D65, init 0, final XOR 0xFFFF).
pub fn crc16_en13757(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Frame validation failures. All are locally recovered by abandoning the
/// frame; WMBus is broadcast, the next transmission arrives on its own
/// schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// L-field exceeds the buffer capacity.
    Oversize { length: usize },
    /// Frame too short to be meaningful (or to carry ciphertext).
    Undersize { length: usize },
    /// Addressed to a different meter on the same channel.
    AddressMismatch,
    /// CRC-16 over the frame does not match the trailing bytes.
    ChecksumMismatch { computed: u16, stored: u16 },
    /// Computed ciphertext length exceeds the scratch capacity.
    CipherLengthOverflow { length: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversize { length } => {
                write!(f, "oversize frame: L-field {} (max {})", length, MAX_FRAME_LEN - 1)
            }
            Self::Undersize { length } => write!(f, "undersize frame: {} bytes", length),
            Self::AddressMismatch => write!(f, "frame addressed to another meter"),
            Self::ChecksumMismatch { computed, stored } => {
                write!(f, "CRC mismatch: computed {:04X}, stored {:04X}", computed, stored)
            }
            Self::CipherLengthOverflow { length } => {
                write!(f, "cipher region too long: {} bytes", length)
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// Bounded buffer holding exactly one packet as pulled from the chip's RX
/// FIFO: the L-field at index 0 followed by L payload bytes. Owned by the
/// pipeline and reused across frames; no per-frame allocation.
pub struct RawFrame {
    bytes: [u8; MAX_FRAME_LEN],
}

impl RawFrame {
    pub const fn new() -> Self {
        Self {
            bytes: [0; MAX_FRAME_LEN],
        }
    }

    /// Start a new frame with the given L-field. Returns the payload
    /// region to fill, or [`FrameError::Oversize`] if the L-field does not
    /// fit the buffer.
    pub fn begin(&mut self, length: u8) -> Result<&mut [u8], FrameError> {
        let length = length as usize;
        if length >= MAX_FRAME_LEN {
            return Err(FrameError::Oversize { length });
        }
        self.bytes[0] = length as u8;
        Ok(&mut self.bytes[1..=length])
    }

    /// The L-field value.
    pub fn length(&self) -> usize {
        self.bytes[0] as usize
    }

    /// The whole frame: L-field plus payload.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..=self.length()]
    }
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated view over a raw frame.
///
/// Construction runs the full pre-decryption pipeline: size bounds,
/// addressing, CRC. Only a checked frame exposes its IV material and
/// ciphertext.
pub struct WmbusFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> WmbusFrame<'a> {
    /// Validate `raw` against this meter's identity.
    ///
    /// The address check runs before the CRC so foreign traffic is
    /// discarded without further work; the CRC is the authoritative
    /// pre-decryption integrity check.
    pub fn check(raw: &'a RawFrame, meter: &MeterId) -> Result<Self, FrameError> {
        let length = raw.length();
        if length < MIN_FRAME_LEN {
            return Err(FrameError::Undersize { length });
        }

        let bytes = raw.as_slice();
        let serial = meter.as_bytes();
        for i in 0..4 {
            if serial[i] != bytes[7 - i] {
                return Err(FrameError::AddressMismatch);
            }
        }

        let computed = crc16_en13757(&bytes[..length - 1]);
        let stored = u16::from_be_bytes([bytes[length - 1], bytes[length]]);
        if computed != stored {
            return Err(FrameError::ChecksumMismatch { computed, stored });
        }

        if length < MIN_ENCRYPTED_LEN {
            return Err(FrameError::Undersize { length });
        }

        let cipher_len = length - 2 - (CIPHER_OFFSET - 1);
        if cipher_len > CIPHER_CAPACITY {
            return Err(FrameError::CipherLengthOverflow { length: cipher_len });
        }

        Ok(Self { bytes })
    }

    /// The frame bytes, L-field included, CRC included.
    pub fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }

    /// Cipher-text region: everything between the header and the CRC.
    pub fn ciphertext(&self) -> &'a [u8] {
        &self.bytes[CIPHER_OFFSET..self.bytes.len() - 2]
    }

    /// Per-frame initialization vector derived from the header fields.
    pub fn iv(&self) -> [u8; 16] {
        super::crypto::derive_iv(self.bytes)
    }
}
