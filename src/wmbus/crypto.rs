//! Per-frame IV derivation and payload decryption.
//!
//! Mode C1 frames are encrypted with AES-128 in CTR mode. The 16-byte
//! counter block is derived from frame header fields; because it
//! incorporates the access number, which changes every transmission, the
//! same IV is never reused under one key. Decryption failure is not
//! independently detectable here; the CRC checked before decryption plus
//! the range checks at extraction are the authoritative integrity checks.

use crate::config::EncryptionKey;
use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;

type FrameCipher = Ctr128BE<Aes128>;

/// Derive the counter block from the frame header.
///
/// A pure function of the header bytes: bytes 0-7 are the M-field and
/// A-field, byte 8 the CI-field, bytes 9-12 the access number, status and
/// configuration words, bytes 13-15 zero padding. `frame` is the whole
/// frame including the L-field and must be at least 17 bytes.
pub fn derive_iv(frame: &[u8]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&frame[2..10]);
    iv[8] = frame[11];
    iv[9..13].copy_from_slice(&frame[13..17]);
    iv
}

/// Decrypt `ciphertext` into `plaintext`, returning the plaintext length.
///
/// CTR mode needs no padding, so the plaintext length equals the
/// ciphertext length. The caller guarantees `plaintext` has capacity for
/// it (enforced as `CipherLengthOverflow` during frame validation).
pub fn decrypt_payload(
    key: &EncryptionKey,
    iv: &[u8; 16],
    ciphertext: &[u8],
    plaintext: &mut [u8],
) -> usize {
    let n = ciphertext.len();
    plaintext[..n].copy_from_slice(ciphertext);
    let mut cipher = FrameCipher::new(key.as_bytes().into(), iv.into());
    cipher.apply_keystream(&mut plaintext[..n]);
    n
}
