//! Start-up configuration for the meter reader.
//!
//! Both the AES key and the meter serial number are supplied once at
//! start-up and held read-only for the process lifetime. The key is wrapped
//! in a zeroize-on-drop newtype and is never logged or transmitted.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-128 key shared with the meter.
///
/// Deliberately has no `Debug`/`Display` impl that exposes the bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 16]);

impl EncryptionKey {
    pub fn new(key: [u8; 16]) -> Self {
        Self(key)
    }

    /// Raw key bytes, for handing to the cipher.
    pub(crate) fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// 4-byte meter serial number, as printed on the meter label
/// (most significant byte first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterId([u8; 4]);

impl MeterId {
    pub fn new(serial: [u8; 4]) -> Self {
        Self(serial)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}{:02X}{:02X}{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Immutable start-up parameters supplied by the orchestration layer.
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// AES-128 key for this meter.
    pub key: EncryptionKey,
    /// Serial number used to filter frames from other meters on the channel.
    pub serial: MeterId,
    /// When false, all telemetry sink calls are suppressed. Decoding is
    /// unaffected.
    pub telemetry_enabled: bool,
}

impl MeterConfig {
    pub fn new(key: [u8; 16], serial: [u8; 4]) -> Self {
        Self {
            key: EncryptionKey::new(key),
            serial: MeterId::new(serial),
            telemetry_enabled: true,
        }
    }
}
