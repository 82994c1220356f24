//! Little-endian, unpadded wire encodings for the fixed-width fields that
//! follow the header in every PDU.

use crate::core::constants::CTRNONCE_LEN;
use crate::core::types::{CtrNonce, ReqNonce};

/// Encodes a 24-bit counter nonce as 3 little-endian bytes.
pub(crate) fn encode_ctrnonce(value: CtrNonce, out: &mut [u8]) {
    debug_assert!(out.len() >= CTRNONCE_LEN);
    out[0] = value.0 as u8;
    out[1] = (value.0 >> 8) as u8;
    out[2] = (value.0 >> 16) as u8;
}

/// Decodes a 24-bit counter nonce from 3 little-endian bytes.
pub(crate) fn decode_ctrnonce(buf: &[u8]) -> CtrNonce {
    debug_assert!(buf.len() >= CTRNONCE_LEN);
    CtrNonce(u32::from(buf[0]) | (u32::from(buf[1]) << 8) | (u32::from(buf[2]) << 16))
}

/// Encodes a request nonce as 8 little-endian bytes.
pub(crate) fn encode_reqnonce(value: ReqNonce, out: &mut [u8]) {
    out[..8].copy_from_slice(&value.0.to_le_bytes());
}

/// Decodes a request nonce from 8 little-endian bytes.
pub(crate) fn decode_reqnonce(buf: &[u8]) -> ReqNonce {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[..8]);
    ReqNonce(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrnonce_round_trips() {
        let mut buf = [0u8; 3];
        encode_ctrnonce(CtrNonce(0x01_2345), &mut buf);
        assert_eq!(buf, [0x45, 0x23, 0x01]);
        assert_eq!(decode_ctrnonce(&buf), CtrNonce(0x01_2345));
    }

    #[test]
    fn reqnonce_round_trips() {
        let mut buf = [0u8; 8];
        encode_reqnonce(ReqNonce(0xDEAD_BEEF_0011_2233), &mut buf);
        assert_eq!(decode_reqnonce(&buf), ReqNonce(0xDEAD_BEEF_0011_2233));
    }
}
