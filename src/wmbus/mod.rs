//! WMBus Mode C1 wire-frame handling.
//!
//! This module contains:
//! - [`frame`]: Frame buffer, validation (size, addressing, CRC) and field
//!   access
//! - [`crypto`]: Per-frame IV derivation and AES-128-CTR decryption

mod crypto;
mod frame;

pub use crypto::{decrypt_payload, derive_iv};
pub use frame::{
    crc16_en13757, FrameError, RawFrame, WmbusFrame, CIPHER_CAPACITY, CIPHER_OFFSET, MAX_FRAME_LEN,
    MIN_ENCRYPTED_LEN, MIN_FRAME_LEN,
};
