//! Streaming-shaped facade over a one-shot AEAD primitive.
//!
//! The wire protocol was designed around a cipher with an `init → assoc →
//! update → finalize` API; the concrete primitive backing it, Ascon-128 (a
//! NIST Lightweight Cryptography finalist, well suited to CAN-FD's small
//! frames), exposes a one-shot `RustCrypto` `AeadInPlace` API instead. This
//! module buffers associated data and plaintext/ciphertext into fixed-size,
//! non-heap buffers sized to the largest frame this library ever builds, and
//! defers to the one-shot primitive at [`AeadCtx::finalize_encrypt`]/
//! [`AeadCtx::finalize_decrypt`]. If the backing cipher ever changes, only
//! this module needs to.

use aead::generic_array::GenericArray;
use aead::{AeadInPlace, KeyInit};
use ascon_aead::Ascon128;

use crate::core::constants::{AEAD_NONCE_LEN, AEAD_TAG_LEN, KEY_LEN, MAX_SDU_LEN};
use crate::core::error::SecurityWarning;
use crate::core::types::{Ltk, Stk};

const MAX_ASSOC_LEN: usize = 16;

/// Either key type this facade can be initialized with.
pub trait AeadKey {
    /// Borrows the raw key bytes.
    fn as_bytes(&self) -> &[u8; KEY_LEN];
}

impl AeadKey for Ltk {
    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        Ltk::as_bytes(self)
    }
}
impl AeadKey for Stk {
    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        Stk::as_bytes(self)
    }
}

/// Accumulates associated data and plaintext/ciphertext ahead of a single
/// call into the underlying one-shot cipher.
pub struct AeadCtx {
    key: [u8; KEY_LEN],
    nonce: [u8; AEAD_NONCE_LEN],
    assoc: [u8; MAX_ASSOC_LEN],
    assoc_len: usize,
    buf: [u8; MAX_SDU_LEN],
    buf_len: usize,
}

impl AeadCtx {
    /// Initializes a fresh context for one encryption or decryption.
    pub fn init(key: &impl AeadKey, nonce: [u8; AEAD_NONCE_LEN]) -> Self {
        Self {
            key: *key.as_bytes(),
            nonce,
            assoc: [0u8; MAX_ASSOC_LEN],
            assoc_len: 0,
            buf: [0u8; MAX_SDU_LEN],
            buf_len: 0,
        }
    }

    /// Appends associated data to be authenticated but not encrypted.
    ///
    /// # Panics
    ///
    /// Panics if the total associated data exceeds the fixed internal
    /// buffer; callers only ever pass header bytes plus the counter nonce,
    /// which fit comfortably within [`MAX_ASSOC_LEN`].
    pub fn assoc_data_update(&mut self, data: &[u8]) {
        let end = self.assoc_len + data.len();
        assert!(end <= MAX_ASSOC_LEN, "associated data exceeds internal buffer");
        self.assoc[self.assoc_len..end].copy_from_slice(data);
        self.assoc_len = end;
    }

    /// Appends plaintext to be encrypted (encryption direction) or
    /// ciphertext to be decrypted (decryption direction).
    ///
    /// # Panics
    ///
    /// Panics if the total exceeds [`MAX_SDU_LEN`]; builders reject an SDU
    /// too long before ever reaching this call.
    pub fn update(&mut self, data: &[u8]) {
        let end = self.buf_len + data.len();
        assert!(end <= MAX_SDU_LEN, "plaintext/ciphertext exceeds internal buffer");
        self.buf[self.buf_len..end].copy_from_slice(data);
        self.buf_len = end;
    }

    /// Finalizes encryption, writing ciphertext into `out` (same length as
    /// the buffered plaintext) and returning the authentication tag.
    pub fn finalize_encrypt(self, out: &mut [u8]) -> [u8; AEAD_TAG_LEN] {
        let cipher = Ascon128::new(GenericArray::from_slice(&self.key));
        let nonce = GenericArray::from_slice(&self.nonce[..16]);
        let mut buf = self.buf;
        let tag = cipher
            .encrypt_in_place_detached(nonce, &self.assoc[..self.assoc_len], &mut buf[..self.buf_len])
            .expect("Ascon-128 encryption does not fail for in-range inputs");
        out[..self.buf_len].copy_from_slice(&buf[..self.buf_len]);
        let mut tag_out = [0u8; AEAD_TAG_LEN];
        tag_out.copy_from_slice(&tag[..AEAD_TAG_LEN]);
        tag_out
    }

    /// Finalizes decryption, writing plaintext into `out` and verifying `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityWarning::InvalidTag`] if authentication fails; `out`
    /// must then be treated as garbage by the caller (the processor zeroizes
    /// its output struct before this call for exactly that reason).
    pub fn finalize_decrypt(
        self,
        out: &mut [u8],
        tag: &[u8],
    ) -> Result<(), SecurityWarning> {
        let cipher = Ascon128::new(GenericArray::from_slice(&self.key));
        let nonce = GenericArray::from_slice(&self.nonce[..16]);
        let tag = GenericArray::from_slice(&tag[..AEAD_TAG_LEN]);
        let mut buf = self.buf;
        cipher
            .decrypt_in_place_detached(nonce, &self.assoc[..self.assoc_len], &mut buf[..self.buf_len], tag)
            .map_err(|_| SecurityWarning::InvalidTag)?;
        out[..self.buf_len].copy_from_slice(&buf[..self.buf_len]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = Ltk::new([7u8; KEY_LEN]);
        let nonce = [1u8; AEAD_NONCE_LEN];
        let assoc = [0xAA, 0xBB];
        let plaintext = [1, 2, 3, 4, 5];

        let mut enc = AeadCtx::init(&key, nonce);
        enc.assoc_data_update(&assoc);
        enc.update(&plaintext);
        let mut ciphertext = [0u8; 5];
        let tag = enc.finalize_encrypt(&mut ciphertext);

        let mut dec = AeadCtx::init(&key, nonce);
        dec.assoc_data_update(&assoc);
        dec.update(&ciphertext);
        let mut recovered = [0u8; 5];
        dec.finalize_decrypt(&mut recovered, &tag).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn tampered_tag_is_rejected() {
        let key = Ltk::new([3u8; KEY_LEN]);
        let nonce = [9u8; AEAD_NONCE_LEN];
        let plaintext = [0x10, 0x20];

        let mut enc = AeadCtx::init(&key, nonce);
        enc.update(&plaintext);
        let mut ciphertext = [0u8; 2];
        let mut tag = enc.finalize_encrypt(&mut ciphertext);
        tag[0] ^= 0xFF;

        let mut dec = AeadCtx::init(&key, nonce);
        dec.update(&ciphertext);
        let mut recovered = [0u8; 2];
        assert_eq!(dec.finalize_decrypt(&mut recovered, &tag), Err(SecurityWarning::InvalidTag));
    }
}
