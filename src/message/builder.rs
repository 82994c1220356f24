//! Builders for the three frame types a Client transmits: REQ, UAD, SADFD.

use crate::core::constants::{AEAD_NONCE_LEN, AEAD_TAG_LEN, MAX_SDU_LEN};
use crate::core::error::{Error, FramingError, StateError};
use crate::core::traits::{non_zero_fill, Clock, Trng};
use crate::core::types::{Gid, Sid};
use crate::crypto::aead::AeadCtx;
use crate::crypto::header::{Header, HeaderType, PayloadType};
use crate::group::machine::{self, ClientTimeout};
use crate::group::state::GroupState;
use crate::message::pdu::{encode_ctrnonce, encode_reqnonce};

/// Builds a Request frame for `gid`, starting a new handshake.
///
/// # Errors
///
/// - [`StateError::HandshakeOngoing`] if a Request is already outstanding.
/// - A [`crate::core::error::ProviderError`] if the clock or RNG fail.
pub(crate) fn build_request(
    header_type: HeaderType,
    self_sid: Sid,
    timeout_req_to_res_ms: u16,
    gid: Gid,
    state: &mut GroupState,
    clock: &dyn Clock,
    trng: &dyn Trng,
    out: &mut [u8],
) -> Result<usize, Error> {
    let now = clock.now()?;
    let timeout = ClientTimeout { timeout_req_to_res_ms };
    machine::check_can_start_handshake(&timeout, state, now)
        .map_err(|_| Error::State(StateError::HandshakeOngoing))?;

    let mut reqnonce_bytes = [0u8; 8];
    non_zero_fill(trng, &mut reqnonce_bytes)?;
    let request_nonce = crate::core::types::ReqNonce(u64::from_le_bytes(reqnonce_bytes));

    machine::begin_handshake(state, request_nonce, now);

    let header = Header { pty: PayloadType::Req, gid, sid: self_sid };
    let header_len = header.pack(header_type, out).map_err(Error::Framing)?;
    encode_reqnonce(request_nonce, &mut out[header_len..]);
    Ok(header_len + 8)
}

/// Builds an Unsecured Application Data frame. Valid even for a GID with no
/// established session; carries no authentication.
///
/// # Errors
///
/// [`FramingError::TooLongSdu`] if `sdu` exceeds [`MAX_SDU_LEN`].
pub(crate) fn build_unsecured(
    header_type: HeaderType,
    self_sid: Sid,
    gid: Gid,
    sdu: &[u8],
    out: &mut [u8],
) -> Result<usize, Error> {
    if sdu.len() > MAX_SDU_LEN || sdu.len() > u8::MAX as usize {
        return Err(Error::Framing(FramingError::TooLongSdu(sdu.len())));
    }
    let header = Header { pty: PayloadType::Uad, gid, sid: self_sid };
    let header_len = header.pack(header_type, out).map_err(Error::Framing)?;
    out[header_len] = sdu.len() as u8;
    out[header_len + 1..header_len + 1 + sdu.len()].copy_from_slice(sdu);
    Ok(header_len + 1 + sdu.len())
}

/// Builds a Secured Application Data frame, authenticated and encrypted
/// under the Group's current Short-Term Key.
///
/// The counter nonce is incremented before encryption is attempted, and the
/// increment is not undone on failure: the value is never reused even if
/// this call does not ultimately produce a frame.
///
/// # Errors
///
/// - [`StateError::SessionNotEstablished`] if no session is established for `gid`.
/// - [`FramingError::TooLongSdu`] if `sdu` exceeds [`MAX_SDU_LEN`].
pub(crate) fn build_secured(
    header_type: HeaderType,
    self_sid: Sid,
    gid: Gid,
    state: &mut GroupState,
    sdu: &[u8],
    out: &mut [u8],
) -> Result<usize, Error> {
    if !state.is_session_established_and_valid() {
        return Err(Error::State(StateError::SessionNotEstablished));
    }
    if sdu.len() > MAX_SDU_LEN || sdu.len() > u8::MAX as usize {
        return Err(Error::Framing(FramingError::TooLongSdu(sdu.len())));
    }

    machine::incr_current_ctrnonce(state);
    let ctrnonce = state.current_ctrnonce;

    let header = Header { pty: PayloadType::SadFd, gid, sid: self_sid };
    let header_len = header.pack(header_type, out).map_err(Error::Framing)?;
    let ctrnonce_off = header_len;
    encode_ctrnonce(ctrnonce, &mut out[ctrnonce_off..]);
    let len_off = ctrnonce_off + 3;
    out[len_off] = sdu.len() as u8;
    let sdu_off = len_off + 1;

    let mut aead_nonce = [0u8; AEAD_NONCE_LEN];
    encode_ctrnonce(ctrnonce, &mut aead_nonce);
    aead_nonce[3] = gid.0;
    aead_nonce[4] = self_sid.0;

    let mut ctx = AeadCtx::init(&state.current_stk, aead_nonce);
    ctx.assoc_data_update(&out[..len_off + 1]);
    ctx.update(sdu);
    let (ciphertext_region, tag_region) = out[sdu_off..].split_at_mut(sdu.len());
    let tag = ctx.finalize_encrypt(ciphertext_region);
    tag_region[..AEAD_TAG_LEN].copy_from_slice(&tag);

    Ok(sdu_off + sdu.len() + AEAD_TAG_LEN)
}
