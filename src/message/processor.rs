//! Inbound frame classification, authentication and dispatch.

use zeroize::Zeroize;

use crate::core::constants::{AEAD_NONCE_LEN, AEAD_TAG_LEN, KEY_LEN, MAX_SDU_LEN, SERVER_SID};
use crate::core::error::{Error, SecurityWarning, StateError};
use crate::core::traits::{Clock, Trng};
use crate::core::types::{Gid, Ltk, Sid, Timestamp};
use crate::crypto::aead::AeadCtx;
use crate::crypto::header::{Header, HeaderType, PayloadType};
use crate::group::config::GroupConfig;
use crate::group::machine::{self, ClientTimeout, SelectedSession};
use crate::group::state::GroupState;
use crate::message::builder::build_request;
use crate::message::pdu::{decode_ctrnonce, decode_reqnonce, encode_ctrnonce};

/// Result of [`process_received`]: how much of `user_out` holds plaintext
/// meant for the caller, and how much of `reaction_out` holds a frame the
/// caller should transmit in response (e.g. a REQ following an accepted SRN).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ProcessOutcome {
    pub user_data_len: usize,
    pub reaction_len: usize,
}

fn find_group<'a>(
    groups: &'a [GroupConfig],
    states: &'a mut [GroupState],
    gid: Gid,
) -> Option<(&'a GroupConfig, &'a mut GroupState)> {
    let idx = groups.iter().position(|g| g.gid == gid)?;
    Some((&groups[idx], &mut states[idx]))
}

/// Processes one received PDU.
///
/// # Errors
///
/// See [`crate::core::error::Error`]; [`Error::MessageIgnored`] is returned
/// for frames that are structurally valid but not actionable by a Client
/// (a Request, or an SRN/RES while one isn't relevant) and is not itself a
/// sign of an attack.
#[allow(clippy::too_many_arguments)]
pub(crate) fn process_received(
    header_type: HeaderType,
    self_sid: Sid,
    timeout_req_to_res_ms: u16,
    ltk: &Ltk,
    groups: &[GroupConfig],
    states: &mut [GroupState],
    clock: &dyn Clock,
    trng: &dyn Trng,
    pdu: &[u8],
    user_out: &mut [u8],
    reaction_out: &mut [u8],
) -> Result<ProcessOutcome, Error> {
    user_out.zeroize();

    let header = Header::unpack(header_type, pdu).map_err(Error::Framing)?;
    let header_len = header_type.header_len();
    let now = clock.now()?;

    if header.sid == self_sid {
        return Err(Error::Security(SecurityWarning::MessageFromMyself));
    }

    match header.pty {
        PayloadType::Uad => {
            let rest = &pdu[header_len..];
            let sdu_len = *rest.first().ok_or(Error::Framing(crate::core::error::FramingError::TooShortPduForPayload))? as usize;
            let sdu = rest.get(1..1 + sdu_len).ok_or(Error::Framing(crate::core::error::FramingError::TooShortPduForPayload))?;
            user_out[..sdu_len].copy_from_slice(sdu);
            Ok(ProcessOutcome { user_data_len: sdu_len, reaction_len: 0 })
        }
        PayloadType::Req => Err(Error::MessageIgnored),
        PayloadType::Res => {
            if header.sid.0 != SERVER_SID {
                return Err(Error::Security(SecurityWarning::ServerOnlyMessage));
            }
            let (_group_cfg, state) =
                find_group(groups, states, header.gid).ok_or(Error::State(StateError::UnknownGroup(header.gid)))?;
            handle_response(timeout_req_to_res_ms, ltk, header.gid, state, pdu, header_len, now)?;
            Ok(ProcessOutcome::default())
        }
        PayloadType::Srn => {
            if header.sid.0 != SERVER_SID {
                return Err(Error::Security(SecurityWarning::ServerOnlyMessage));
            }
            let (group_cfg, state) =
                find_group(groups, states, header.gid).ok_or(Error::State(StateError::UnknownGroup(header.gid)))?;
            let outcome = handle_renewal_notification(
                header_type,
                self_sid,
                timeout_req_to_res_ms,
                header.gid,
                group_cfg,
                state,
                pdu,
                header_len,
                now,
                trng,
                reaction_out,
            )?;
            machine::exit_renewal_phase_if_needed(group_cfg, state, now);
            Ok(outcome)
        }
        PayloadType::SadFd => {
            let (group_cfg, state) =
                find_group(groups, states, header.gid).ok_or(Error::State(StateError::UnknownGroup(header.gid)))?;
            let result = handle_secured_data(header.gid, header.sid, group_cfg, state, pdu, header_len, now, user_out);
            machine::exit_renewal_phase_if_needed(group_cfg, state, now);
            let user_data_len = result?;
            Ok(ProcessOutcome { user_data_len, reaction_len: 0 })
        }
    }
}

fn handle_response(
    timeout_req_to_res_ms: u16,
    ltk: &Ltk,
    gid: Gid,
    state: &mut GroupState,
    pdu: &[u8],
    header_len: usize,
    now: Timestamp,
) -> Result<(), Error> {
    const REQNONCE_OFF: usize = 0;
    const CTRNONCE_OFF: usize = 8;
    const STK_OFF: usize = 11;
    const TAG_OFF: usize = STK_OFF + KEY_LEN;
    let body = &pdu[header_len..];
    if body.len() < TAG_OFF + AEAD_TAG_LEN {
        return Err(Error::Framing(crate::core::error::FramingError::TooShortPduForPayload));
    }

    let received_reqnonce = decode_reqnonce(&body[REQNONCE_OFF..]);
    if received_reqnonce != state.request_nonce {
        return Err(Error::Security(SecurityWarning::NotExpectingAResponse));
    }
    let timeout = ClientTimeout { timeout_req_to_res_ms };
    machine::check_response_acceptable(&timeout, state, now).map_err(Error::Security)?;

    let ctrnonce = decode_ctrnonce(&body[CTRNONCE_OFF..]);
    let mut aead_nonce = [0u8; AEAD_NONCE_LEN];
    encode_ctrnonce(ctrnonce, &mut aead_nonce);
    aead_nonce[3] = gid.0;
    aead_nonce[4] = SERVER_SID;

    let mut ctx = AeadCtx::init(ltk, aead_nonce);
    ctx.assoc_data_update(&pdu[..header_len]);
    ctx.assoc_data_update(&body[REQNONCE_OFF..CTRNONCE_OFF + 3]);
    ctx.update(&body[STK_OFF..TAG_OFF]);
    let mut stk_bytes = [0u8; KEY_LEN];
    ctx.finalize_decrypt(&mut stk_bytes, &body[TAG_OFF..TAG_OFF + AEAD_TAG_LEN])
        .map_err(Error::Security)?;

    let stk = crate::core::types::Stk::new(stk_bytes);
    machine::complete_handshake(state, stk, now);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_renewal_notification(
    header_type: HeaderType,
    self_sid: Sid,
    timeout_req_to_res_ms: u16,
    gid: Gid,
    group_cfg: &GroupConfig,
    state: &mut GroupState,
    pdu: &[u8],
    header_len: usize,
    now: Timestamp,
    trng: &dyn Trng,
    reaction_out: &mut [u8],
) -> Result<ProcessOutcome, Error> {
    if !state.is_session_established_and_valid() || !machine::is_renewal_acceptable(state) {
        return Err(Error::MessageIgnored);
    }
    const CTRNONCE_OFF: usize = 0;
    const TAG_OFF: usize = 3;
    let body = &pdu[header_len..];
    if body.len() < TAG_OFF + AEAD_TAG_LEN {
        return Err(Error::Framing(crate::core::error::FramingError::TooShortPduForPayload));
    }

    let ctrnonce = decode_ctrnonce(&body[CTRNONCE_OFF..]);
    let mut aead_nonce = [0u8; AEAD_NONCE_LEN];
    encode_ctrnonce(ctrnonce, &mut aead_nonce);
    aead_nonce[3] = gid.0;
    aead_nonce[4] = SERVER_SID;

    let mut ctx = AeadCtx::init(&state.current_stk, aead_nonce);
    ctx.assoc_data_update(&pdu[..header_len]);
    ctx.assoc_data_update(&body[..TAG_OFF]);
    ctx.finalize_decrypt(&mut [], &body[TAG_OFF..TAG_OFF + AEAD_TAG_LEN])
        .map_err(Error::Security)?;

    machine::enter_renewal_phase(state);

    let reaction_len = build_request(
        header_type,
        self_sid,
        timeout_req_to_res_ms,
        gid,
        state,
        &FixedNowClock(now),
        trng,
        reaction_out,
    )?;
    let _ = group_cfg;
    Ok(ProcessOutcome { user_data_len: 0, reaction_len })
}

/// A [`Clock`] that always answers with a timestamp already obtained, so
/// the renewal reaction's Request is timestamped consistently with the SRN
/// that triggered it, without a second call into the caller's clock.
struct FixedNowClock(Timestamp);

impl Clock for FixedNowClock {
    fn now(&self) -> Result<Timestamp, crate::core::error::ProviderError> {
        Ok(self.0)
    }
}

fn handle_secured_data(
    gid: Gid,
    sender_sid: Sid,
    group_cfg: &GroupConfig,
    state: &mut GroupState,
    pdu: &[u8],
    header_len: usize,
    now: Timestamp,
    user_out: &mut [u8],
) -> Result<usize, Error> {
    const CTRNONCE_OFF: usize = 0;
    const LEN_OFF: usize = 3;
    const SDU_OFF: usize = 4;
    let body = &pdu[header_len..];
    if body.len() < SDU_OFF + AEAD_TAG_LEN {
        return Err(Error::Framing(crate::core::error::FramingError::TooShortPduForPayload));
    }
    let ctrnonce = decode_ctrnonce(&body[CTRNONCE_OFF..]);
    let sdu_len = body[LEN_OFF] as usize;
    if sdu_len > MAX_SDU_LEN {
        return Err(Error::Framing(crate::core::error::FramingError::TooLongSdu(sdu_len)));
    }
    if body.len() < SDU_OFF + sdu_len + AEAD_TAG_LEN {
        return Err(Error::Framing(crate::core::error::FramingError::TooShortPduForPayload));
    }

    let selected = machine::check_rx_ctrnonce(group_cfg, state, ctrnonce, now).map_err(Error::Security)?;
    let key = match selected {
        SelectedSession::Current => &state.current_stk,
        SelectedSession::Previous => &state.previous_stk,
    };

    let mut aead_nonce = [0u8; AEAD_NONCE_LEN];
    encode_ctrnonce(ctrnonce, &mut aead_nonce);
    aead_nonce[3] = gid.0;
    aead_nonce[4] = sender_sid.0;

    let mut ctx = AeadCtx::init(key, aead_nonce);
    ctx.assoc_data_update(&pdu[..header_len]);
    ctx.assoc_data_update(&body[..SDU_OFF]);
    ctx.update(&body[SDU_OFF..SDU_OFF + sdu_len]);
    let tag = &body[SDU_OFF + sdu_len..SDU_OFF + sdu_len + AEAD_TAG_LEN];
    ctx.finalize_decrypt(&mut user_out[..sdu_len], tag).map_err(Error::Security)?;

    machine::update_ctrnonce_and_rx_timestamp(state, selected, ctrnonce, now);
    Ok(sdu_len)
}

