//! Per-Group session state machine.
//!
//! Pure functions over [`GroupConfig`]/[`GroupState`]: no I/O, no allocation.
//! [`crate::client::Client`] is the only caller; these are exposed `pub(crate)`
//! so the message builders and inbound processor can share them without
//! duplicating the handshake/freshness/renewal logic.

use crate::core::error::{SecurityWarning, StateError};
use crate::core::time::wrap_delta;
use crate::core::types::{CtrNonce, ReqNonce, Timestamp};
use crate::crypto::ctrdelay::ctrdelay;
use crate::group::config::GroupConfig;
use crate::group::state::GroupState;

/// Whether a handshake is outstanding and still within its response window.
#[must_use]
pub(crate) fn is_handshake_ongoing(config: &ClientTimeout, state: &GroupState, now: Timestamp) -> bool {
    state.request_nonce.is_outstanding()
        && wrap_delta(state.last_handshake_event, now) <= u32::from(config.timeout_req_to_res_ms)
}

/// Thin carrier for the one Client-wide field the machine needs, so this
/// module does not depend on the full `ClientConfig` (and therefore not on
/// `Ltk`/`Sid`, which are irrelevant to timing decisions).
pub(crate) struct ClientTimeout {
    pub timeout_req_to_res_ms: u16,
}

/// Checks whether a just-received Response is acceptable: a handshake must
/// be outstanding and the Response must have arrived within the timeout.
///
/// # Errors
///
/// - [`SecurityWarning::NotExpectingAResponse`] if no Request is outstanding.
/// - [`SecurityWarning::ResponseTimeout`] if the Response arrived too late.
pub(crate) fn check_response_acceptable(
    config: &ClientTimeout,
    state: &GroupState,
    rx_timestamp: Timestamp,
) -> Result<(), SecurityWarning> {
    if !state.request_nonce.is_outstanding() {
        return Err(SecurityWarning::NotExpectingAResponse);
    }
    let elapsed = wrap_delta(state.last_handshake_event, rx_timestamp);
    if elapsed > u32::from(config.timeout_req_to_res_ms) {
        return Err(SecurityWarning::ResponseTimeout);
    }
    Ok(())
}

/// Whether a Session Renewal Notification can be processed right now: no
/// handshake outstanding, and not already in the renewal overlap phase.
#[must_use]
pub(crate) fn is_renewal_acceptable(state: &GroupState) -> bool {
    !state.request_nonce.is_outstanding() && !state.is_overlapping()
}

/// Begins a handshake: records the Request nonce and the transmission time.
pub(crate) fn begin_handshake(state: &mut GroupState, request_nonce: ReqNonce, now: Timestamp) {
    state.request_nonce = request_nonce;
    state.last_handshake_event = now;
}

/// Completes a handshake on an accepted Response: installs the new session,
/// resetting the counter nonce and clearing the outstanding Request.
pub(crate) fn complete_handshake(state: &mut GroupState, stk: crate::core::types::Stk, now: Timestamp) {
    state.current_stk = stk;
    state.current_ctrnonce = CtrNonce::ZERO;
    state.request_nonce = ReqNonce::NONE;
    state.last_handshake_event = now;
    state.current_rx_last = now;
}

/// Snapshots the current session into the previous one, entering the
/// renewal overlap phase. Called when an SRN is accepted.
pub(crate) fn enter_renewal_phase(state: &mut GroupState) {
    state.previous_stk = state.current_stk.clone();
    state.previous_ctrnonce = state.current_ctrnonce;
    state.previous_rx_last = state.current_rx_last;
}

/// Exits the renewal overlap phase if either threshold has been crossed:
/// enough secured messages sent in the new session, or enough time elapsed
/// since the Response that started it. The two conditions are OR'd, matching
/// a reference implementation exactly.
pub(crate) fn exit_renewal_phase_if_needed(config: &GroupConfig, state: &mut GroupState, now: Timestamp) {
    if !state.is_overlapping() {
        return;
    }
    let enough_messages_used = state.current_ctrnonce.0 >= 2 * config.max_ctrnonce_delay_msgs;
    let enough_time_passed = wrap_delta(state.last_handshake_event, now)
        > u32::from(config.session_renewal_duration_ms);
    if enough_messages_used || enough_time_passed {
        state.previous_stk = crate::core::types::Stk::ZERO;
        state.previous_ctrnonce = CtrNonce::ZERO;
    }
}

/// Increments the current counter nonce by one, unless it is already
/// expired (in which case it stays pinned at the terminal value).
pub(crate) fn incr_current_ctrnonce(state: &mut GroupState) {
    state.current_ctrnonce = state.current_ctrnonce.saturating_incr();
}

/// Outcome of [`check_rx_ctrnonce`]: which session (current or previous)
/// the received counter nonce was validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectedSession {
    Current,
    Previous,
}

/// Validates a received counter nonce against the freshness window and
/// selects which session (current, or previous during overlap) it belongs
/// to, by proximity to the midpoint between the two sessions' counters.
///
/// # Errors
///
/// - [`SecurityWarning::ReceivedOverflownNonce`] if the nonce is the
///   terminal expired value.
/// - [`SecurityWarning::OldMessage`] if the nonce is older than the
///   adaptive freshness window tolerates.
pub(crate) fn check_rx_ctrnonce(
    config: &GroupConfig,
    state: &GroupState,
    received: CtrNonce,
    rx_timestamp: Timestamp,
) -> Result<SelectedSession, SecurityWarning> {
    if received.is_expired() {
        return Err(SecurityWarning::ReceivedOverflownNonce);
    }

    let selected = if state.is_overlapping() {
        let average = (u64::from(state.current_ctrnonce.0) + u64::from(state.previous_ctrnonce.0)) / 2;
        if u64::from(received.0) >= average {
            SelectedSession::Previous
        } else {
            SelectedSession::Current
        }
    } else {
        SelectedSession::Current
    };

    let (selected_ctrnonce, selected_last_rx) = match selected {
        SelectedSession::Current => (state.current_ctrnonce, state.current_rx_last),
        SelectedSession::Previous => (state.previous_ctrnonce, state.previous_rx_last),
    };

    let elapsed = wrap_delta(selected_last_rx, rx_timestamp);
    let delay = ctrdelay(
        elapsed,
        config.max_ctrnonce_delay_msgs,
        u32::from(config.max_silence_interval_ms),
    );

    // Deliberately signed: `delay` can exceed `selected_ctrnonce` early in a
    // session, and the protocol's 24-bit range fits comfortably in i32, so
    // saturating unsigned subtraction is not an option here (it would widen
    // acceptance near nonce 0 instead of narrowing it).
    let oldest_tolerated = i64::from(selected_ctrnonce.0) - i64::from(delay);
    if i64::from(received.0) < oldest_tolerated {
        return Err(SecurityWarning::OldMessage);
    }
    Ok(selected)
}

/// Updates the selected session's counter nonce and last-reception
/// timestamp upon acceptance of a Secured Application Data frame.
pub(crate) fn update_ctrnonce_and_rx_timestamp(
    state: &mut GroupState,
    selected: SelectedSession,
    received: CtrNonce,
    rx_timestamp: Timestamp,
) {
    match selected {
        SelectedSession::Current => {
            if received.0 > state.current_ctrnonce.0 {
                state.current_ctrnonce = received;
            }
            state.current_ctrnonce = state.current_ctrnonce.saturating_incr();
            state.current_rx_last = rx_timestamp;
        }
        SelectedSession::Previous => {
            if received.0 > state.previous_ctrnonce.0 {
                state.previous_ctrnonce = received;
            }
            state.previous_ctrnonce = state.previous_ctrnonce.saturating_incr();
            state.previous_rx_last = rx_timestamp;
        }
    }
}

/// Converts [`StateError::HandshakeOngoing`] semantics at the call site:
/// a new Request cannot be started while one is outstanding.
pub(crate) fn check_can_start_handshake(
    config: &ClientTimeout,
    state: &GroupState,
    now: Timestamp,
) -> Result<(), StateError> {
    if is_handshake_ongoing(config, state, now) {
        return Err(StateError::HandshakeOngoing);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Gid, Stk};

    fn group_config() -> GroupConfig {
        GroupConfig {
            gid: Gid(0),
            max_ctrnonce_delay_msgs: 10,
            max_silence_interval_ms: 5000,
            session_renewal_duration_ms: 2000,
        }
    }

    #[test]
    fn fresh_strictly_increasing_nonces_are_accepted() {
        let config = group_config();
        let mut state = GroupState::ZERO;
        state.current_stk = Stk::new([1u8; 16]);
        for n in 1..5u32 {
            let selected = check_rx_ctrnonce(&config, &state, CtrNonce(n), Timestamp(n)).unwrap();
            update_ctrnonce_and_rx_timestamp(&mut state, selected, CtrNonce(n), Timestamp(n));
        }
        assert_eq!(state.current_ctrnonce.0, 5);
    }

    #[test]
    fn replayed_nonce_is_rejected_once_local_counter_has_advanced() {
        let config = group_config();
        let mut state = GroupState::ZERO;
        state.current_stk = Stk::new([1u8; 16]);
        for n in 1..16u32 {
            let selected = check_rx_ctrnonce(&config, &state, CtrNonce(n), Timestamp(0)).unwrap();
            update_ctrnonce_and_rx_timestamp(&mut state, selected, CtrNonce(n), Timestamp(0));
        }
        // Local counter is now well past the oldest tolerated value; replaying
        // an early nonce falls outside the freshness window.
        assert_eq!(
            check_rx_ctrnonce(&config, &state, CtrNonce(1), Timestamp(0)),
            Err(SecurityWarning::OldMessage)
        );
    }

    #[test]
    fn overflown_nonce_is_rejected_outright() {
        let config = group_config();
        let mut state = GroupState::ZERO;
        state.current_stk = Stk::new([1u8; 16]);
        assert_eq!(
            check_rx_ctrnonce(&config, &state, CtrNonce(crate::core::constants::MAX_CTRNONCE), Timestamp(0)),
            Err(SecurityWarning::ReceivedOverflownNonce)
        );
    }

    #[test]
    fn renewal_overlap_enters_and_exits_on_message_count() {
        let config = group_config();
        let mut state = GroupState::ZERO;
        state.current_stk = Stk::new([1u8; 16]);
        state.current_ctrnonce = CtrNonce(5);
        enter_renewal_phase(&mut state);
        assert!(state.is_overlapping());

        complete_handshake(&mut state, Stk::new([2u8; 16]), Timestamp(100));
        state.current_ctrnonce = CtrNonce(2 * config.max_ctrnonce_delay_msgs);
        exit_renewal_phase_if_needed(&config, &mut state, Timestamp(100));
        assert!(!state.is_overlapping());
    }

    #[test]
    fn renewal_overlap_exits_on_elapsed_time() {
        let config = group_config();
        let mut state = GroupState::ZERO;
        state.current_stk = Stk::new([1u8; 16]);
        enter_renewal_phase(&mut state);
        state.last_handshake_event = Timestamp(0);
        exit_renewal_phase_if_needed(
            &config,
            &mut state,
            Timestamp(u32::from(config.session_renewal_duration_ms) + 1),
        );
        assert!(!state.is_overlapping());
    }

    #[test]
    fn incrementing_at_terminal_value_stays_pinned() {
        let mut state = GroupState::ZERO;
        state.current_ctrnonce = CtrNonce(crate::core::constants::MAX_CTRNONCE);
        incr_current_ctrnonce(&mut state);
        assert_eq!(state.current_ctrnonce.0, crate::core::constants::MAX_CTRNONCE);
    }
}
