//! Per-Group mutable state and the session-state view derived from it.

use crate::core::types::{CtrNonce, ReqNonce, Stk, Timestamp};

/// Raw per-Group state, owned exclusively by the library for the lifetime of
/// a [`Client`](crate::client::Client).
///
/// The fields mirror a reference implementation's struct layout field for
/// field (request nonce, handshake/session timestamps, counters, keys) so
/// that [`SessionState::from_raw`] can reconstruct an explicit state value
/// without losing any information the wire protocol depends on — notably,
/// the sentinel encodings (`request_nonce == 0`, `current_stk` all-zero,
/// `current_ctrnonce == MAX_CTRNONCE`) are preserved exactly, only the
/// *in-memory* representation gains a sum type.
#[derive(Debug, Clone)]
pub struct GroupState {
    /// Nonce of the outstanding Request, or [`ReqNonce::NONE`].
    pub request_nonce: ReqNonce,
    /// Time the last REQ was sent or RES was received, whichever is newer.
    pub last_handshake_event: Timestamp,
    /// Time of the last accepted message in the current session.
    pub current_rx_last: Timestamp,
    /// Time of the last accepted message in the previous (overlap) session.
    pub previous_rx_last: Timestamp,
    /// Highest counter nonce observed/used in the current session.
    pub current_ctrnonce: CtrNonce,
    /// Highest counter nonce observed/used in the previous session.
    pub previous_ctrnonce: CtrNonce,
    /// Current Short-Term Key, or [`Stk::ZERO`] if no session is established.
    pub current_stk: Stk,
    /// Previous Short-Term Key retained during renewal overlap, or [`Stk::ZERO`].
    pub previous_stk: Stk,
}

impl GroupState {
    /// The all-zero state: no session, no handshake outstanding.
    pub const ZERO: Self = Self {
        request_nonce: ReqNonce::NONE,
        last_handshake_event: Timestamp(0),
        current_rx_last: Timestamp(0),
        previous_rx_last: Timestamp(0),
        current_ctrnonce: CtrNonce::ZERO,
        previous_ctrnonce: CtrNonce::ZERO,
        current_stk: Stk::ZERO,
        previous_stk: Stk::ZERO,
    };

    /// Zeroes this state in place, as at `init`/`deinit`.
    pub fn clear(&mut self) {
        *self = Self::ZERO;
    }

    /// Whether a session (current or overlapping) is established.
    #[must_use]
    pub fn is_session_established_and_valid(&self) -> bool {
        !self.current_stk.is_zero() && !self.current_ctrnonce.is_expired()
    }

    /// Whether the renewal overlap phase is active.
    #[must_use]
    pub fn is_overlapping(&self) -> bool {
        !self.previous_stk.is_zero()
    }
}

/// An explicit view over [`GroupState`]'s sentinel-encoded fields.
///
/// A reference implementation (in a language without sum types) encodes
/// these states with sentinels directly in the fields above; this is the
/// same information, read-only, as a Rust enum for callers and tests that
/// want to match on it without re-deriving the sentinel logic themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session established, no handshake outstanding.
    NoSession,
    /// A Request was sent and a Response is still awaited.
    HandshakePending {
        /// Nonce of the outstanding Request.
        request_nonce: ReqNonce,
    },
    /// A session is established and not overlapping with a previous one.
    Established {
        /// Current Short-Term Key.
        stk: Stk,
        /// Current counter nonce.
        ctrnonce: CtrNonce,
    },
    /// A new session was established while a previous one is still
    /// tolerated for in-flight traffic.
    Overlap {
        /// Current (new) Short-Term Key.
        current_stk: Stk,
        /// Previous (old) Short-Term Key, still accepted.
        previous_stk: Stk,
    },
    /// The current session's counter nonce is exhausted; a new handshake is
    /// required before any further secured traffic can be sent.
    Expired,
}

impl SessionState {
    /// Derives the explicit state from a [`GroupState`]'s sentinel fields.
    #[must_use]
    pub fn from_raw(state: &GroupState) -> Self {
        if state.current_ctrnonce.is_expired() {
            return Self::Expired;
        }
        if state.request_nonce.is_outstanding() {
            return Self::HandshakePending { request_nonce: state.request_nonce };
        }
        if state.current_stk.is_zero() {
            return Self::NoSession;
        }
        if state.is_overlapping() {
            return Self::Overlap {
                current_stk: state.current_stk.clone(),
                previous_stk: state.previous_stk.clone(),
            };
        }
        Self::Established { stk: state.current_stk.clone(), ctrnonce: state.current_ctrnonce }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_state_has_no_session() {
        assert_eq!(SessionState::from_raw(&GroupState::ZERO), SessionState::NoSession);
    }

    #[test]
    fn outstanding_request_is_handshake_pending() {
        let mut state = GroupState::ZERO;
        state.request_nonce = ReqNonce(42);
        assert_eq!(
            SessionState::from_raw(&state),
            SessionState::HandshakePending { request_nonce: ReqNonce(42) }
        );
    }

    #[test]
    fn expired_ctrnonce_wins_over_everything_else() {
        let mut state = GroupState::ZERO;
        state.current_stk = Stk::new([1u8; 16]);
        state.current_ctrnonce = CtrNonce(crate::core::constants::MAX_CTRNONCE);
        assert_eq!(SessionState::from_raw(&state), SessionState::Expired);
    }

    #[test]
    fn overlap_detected_from_previous_stk() {
        let mut state = GroupState::ZERO;
        state.current_stk = Stk::new([1u8; 16]);
        state.previous_stk = Stk::new([2u8; 16]);
        assert!(matches!(SessionState::from_raw(&state), SessionState::Overlap { .. }));
    }
}
