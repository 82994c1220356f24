//! Protocol-wide sizes and sentinel values.
//!
//! These mirror the wire format exactly: changing any of them breaks
//! interoperability with a peer Server, so they are not configurable.

// === Field widths (bytes) ===

/// Length of the Group Identifier field.
pub const GID_LEN: usize = 1;

/// Length of the Source Identifier field.
pub const SID_LEN: usize = 1;

/// Length of the Payload Type field.
pub const PTY_LEN: usize = 1;

/// Length of the counter nonce on the wire (24 bits, stored in 3 bytes little-endian).
pub const CTRNONCE_LEN: usize = 3;

/// Length of the request nonce.
pub const REQNONCE_LEN: usize = 8;

/// Length of the Long-Term Key and Short-Term Key.
pub const KEY_LEN: usize = 16;

/// Length of the AEAD nonce passed to the cipher.
///
/// Must fit `ctrnonce || gid || sid` (5 bytes) with room to spare; Ascon-128
/// uses a 16-byte nonce.
pub const AEAD_NONCE_LEN: usize = 16;

/// Length of the authentication tag appended to every AEAD-protected frame.
///
/// Matches Ascon-128's native tag size; the wire format does not truncate
/// it; truncating a Synthetic-IV-less tag would require re-deriving the
/// comparison instead of delegating to the cipher's constant-time check.
pub const AEAD_TAG_LEN: usize = 16;

/// Maximum plaintext/ciphertext payload carried in a single CAN-FD secured frame.
pub const MAX_SDU_LEN: usize = 64;

// === Sentinel values ===

/// Counter nonce value meaning "this session is expired, do not use it again".
pub const MAX_CTRNONCE: u32 = 0xFF_FFFF;

/// Request nonce value meaning "no handshake outstanding".
pub const REQNONCE_NOT_EXPECTING_A_RESPONSE: u64 = 0;

/// Source identifier reserved for the Server; a Client must never use it.
pub const SERVER_SID: u8 = 0;

/// Mandatory broadcast group; every Client configuration must include it first.
pub const BROADCAST_GID: u8 = 0;

/// Returns whether a counter nonce has reached its terminal, expired value.
#[inline]
#[must_use]
pub const fn ctrnonce_is_expired(ctrnonce: u32) -> bool {
    ctrnonce >= MAX_CTRNONCE
}

/// Upper bound on TRNG retries when a non-zero output is required.
pub const MAX_TRNG_TRIES_FOR_NONZERO_VALUE: u32 = 16;
