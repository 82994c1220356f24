//! The top-level Client: owns no heap allocation, borrows its Group
//! configuration and state arrays for its whole lifetime, and dispatches
//! every public operation into [`crate::group`]/[`crate::message`].

use crate::core::error::{ConfigError, Error, StateError};
use crate::core::traits::{Clock, Trng};
use crate::core::types::Gid;
use crate::group::config::{check_ctx, ClientConfig, GroupConfig};
use crate::group::state::GroupState;
use crate::message::{build_request, build_secured, build_unsecured, process_received, ProcessOutcome};

/// A running CBS Client, bound to one `ClientConfig` and a matched pair of
/// Group configuration/state slices.
///
/// `groups` and `states` are positional: `states[i]` holds the mutable state
/// for `groups[i]`. The caller owns both arrays; `Client` only ever borrows
/// them, so a host can place them in `static` memory on a microcontroller
/// with no allocator at all.
pub struct Client<'a, C, T> {
    config: ClientConfig,
    groups: &'a [GroupConfig],
    states: &'a mut [GroupState],
    clock: C,
    trng: T,
}

/// Outcome of [`Client::process_received`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Received {
    /// Number of bytes of plaintext user data written to the caller's buffer.
    pub user_data_len: usize,
    /// Number of bytes of a reaction PDU (e.g. a Request following an
    /// accepted renewal notification) written to the caller's buffer, to be
    /// transmitted by the caller.
    pub reaction_len: usize,
}

impl From<ProcessOutcome> for Received {
    fn from(outcome: ProcessOutcome) -> Self {
        Self { user_data_len: outcome.user_data_len, reaction_len: outcome.reaction_len }
    }
}

impl<'a, C: Clock, T: Trng> Client<'a, C, T> {
    /// Validates `config`/`groups`, zeroes `states`, and binds the three
    /// together for the Client's lifetime.
    ///
    /// # Errors
    ///
    /// - A [`ConfigError`] if `config`/`groups` fail validation.
    /// - [`ConfigError::GroupsStatesLengthMismatch`] if `groups` and `states`
    ///   have different lengths; the two arrays must be positionally matched.
    pub fn init(
        config: ClientConfig,
        groups: &'a [GroupConfig],
        states: &'a mut [GroupState],
        clock: C,
        trng: T,
    ) -> Result<Self, Error> {
        if groups.len() != states.len() {
            return Err(Error::Config(ConfigError::GroupsStatesLengthMismatch));
        }
        check_ctx(&config, groups)?;
        for state in states.iter_mut() {
            state.clear();
        }
        Ok(Self { config, groups, states, clock, trng })
    }

    /// Clears every Group's state, as if the Client had just been [`init`](Self::init)ed.
    ///
    /// Does not re-validate the configuration; `config`/`groups` are unchanged.
    pub fn deinit(&mut self) {
        for state in self.states.iter_mut() {
            state.clear();
        }
    }

    fn group_index(&self, gid: Gid) -> Result<usize, Error> {
        self.groups
            .iter()
            .position(|g| g.gid == gid)
            .ok_or(Error::State(StateError::UnknownGroup(gid)))
    }

    /// Builds a Request frame, starting a new handshake for `gid`.
    ///
    /// # Errors
    ///
    /// See [`crate::message`]'s builder for the conditions under which this fails.
    pub fn build_request(&mut self, gid: Gid, out: &mut [u8]) -> Result<usize, Error> {
        let idx = self.group_index(gid)?;
        build_request(
            self.config.header_type,
            self.config.sid,
            self.config.timeout_req_to_res_ms,
            gid,
            &mut self.states[idx],
            &self.clock,
            &self.trng,
            out,
        )
    }

    /// Builds an Unsecured Application Data frame for `gid`. Does not require
    /// an established session, and does not mutate any Group state.
    ///
    /// # Errors
    ///
    /// [`crate::core::error::FramingError::TooLongSdu`] if `sdu` is too large.
    pub fn build_unsecured(&self, gid: Gid, sdu: &[u8], out: &mut [u8]) -> Result<usize, Error> {
        build_unsecured(self.config.header_type, self.config.sid, gid, sdu, out)
    }

    /// Builds a Secured Application Data frame for `gid`, authenticated and
    /// encrypted under the Group's current Short-Term Key.
    ///
    /// # Errors
    ///
    /// - [`StateError::SessionNotEstablished`] if no session is established.
    /// - [`crate::core::error::FramingError::TooLongSdu`] if `sdu` is too large.
    pub fn build_secured(&mut self, gid: Gid, sdu: &[u8], out: &mut [u8]) -> Result<usize, Error> {
        let idx = self.group_index(gid)?;
        build_secured(
            self.config.header_type,
            self.config.sid,
            gid,
            &mut self.states[idx],
            sdu,
            out,
        )
    }

    /// Processes one received PDU, dispatching to the appropriate handler by
    /// payload type and updating the relevant Group's state.
    ///
    /// `user_out` receives plaintext user data (from a UAD or an accepted
    /// SADFD frame); `reaction_out` receives a PDU the caller should
    /// transmit in response (currently, only the Request that follows an
    /// accepted Session Renewal Notification).
    ///
    /// # Errors
    ///
    /// See [`crate::core::error::Error`]. [`Error::MessageIgnored`] is not
    /// indicative of an attack; most other variants warrant logging.
    pub fn process_received(
        &mut self,
        pdu: &[u8],
        user_out: &mut [u8],
        reaction_out: &mut [u8],
    ) -> Result<Received, Error> {
        process_received(
            self.config.header_type,
            self.config.sid,
            self.config.timeout_req_to_res_ms,
            &self.config.ltk,
            self.groups,
            self.states,
            &self.clock,
            &self.trng,
            pdu,
            user_out,
            reaction_out,
        )
        .map(Received::from)
    }

    /// Read-only view of a Group's session state, for diagnostics or tests.
    ///
    /// # Errors
    ///
    /// [`StateError::UnknownGroup`] if `gid` is not configured.
    pub fn session_state(&self, gid: Gid) -> Result<crate::group::state::SessionState, Error> {
        let idx = self.group_index(gid)?;
        Ok(crate::group::state::SessionState::from_raw(&self.states[idx]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::KEY_LEN;
    use crate::core::error::ProviderError;
    use crate::core::types::{Ltk, Sid, Timestamp};
    use crate::crypto::HeaderType;
    use core::cell::Cell;

    struct StepClock(Cell<u32>);
    impl Clock for StepClock {
        fn now(&self) -> Result<Timestamp, ProviderError> {
            let t = self.0.get();
            self.0.set(t + 1);
            Ok(Timestamp(t))
        }
    }

    struct FixedTrng(u8);
    impl Trng for FixedTrng {
        fn fill(&self, out: &mut [u8]) -> Result<(), ProviderError> {
            out.fill(self.0);
            Ok(())
        }
    }

    fn config() -> ClientConfig {
        ClientConfig {
            timeout_req_to_res_ms: 1000,
            ltk: Ltk::new([9u8; KEY_LEN]),
            sid: Sid(2),
            header_type: HeaderType::Standard,
        }
    }

    fn groups() -> [GroupConfig; 1] {
        [GroupConfig {
            gid: Gid(0),
            max_ctrnonce_delay_msgs: 10,
            max_silence_interval_ms: 5000,
            session_renewal_duration_ms: 2000,
        }]
    }

    #[test]
    fn init_rejects_mismatched_group_and_state_array_lengths() {
        let groups = groups();
        let mut states: [GroupState; 2] = [GroupState::ZERO, GroupState::ZERO];
        let err = Client::init(config(), &groups, &mut states, StepClock(Cell::new(0)), FixedTrng(1))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::GroupsStatesLengthMismatch)));
    }

    #[test]
    fn build_request_then_unsecured_round_trip() {
        let groups = groups();
        let mut states = [GroupState::ZERO];
        let mut client =
            Client::init(config(), &groups, &mut states, StepClock(Cell::new(0)), FixedTrng(1)).unwrap();

        let mut buf = [0u8; 32];
        let len = client.build_request(Gid(0), &mut buf).unwrap();
        assert!(len > 0);
        assert_eq!(
            client.session_state(Gid(0)).unwrap(),
            crate::group::state::SessionState::HandshakePending { request_nonce: client_reqnonce(&client) }
        );

        let mut uad_buf = [0u8; 32];
        let uad_len = client.build_unsecured(Gid(0), b"hello", &mut uad_buf).unwrap();
        assert!(uad_len > 0);
    }

    #[test]
    fn build_secured_fails_without_an_established_session() {
        let groups = groups();
        let mut states = [GroupState::ZERO];
        let mut client =
            Client::init(config(), &groups, &mut states, StepClock(Cell::new(0)), FixedTrng(1)).unwrap();
        let mut buf = [0u8; 32];
        let err = client.build_secured(Gid(0), b"x", &mut buf).unwrap_err();
        assert!(matches!(err, Error::State(StateError::SessionNotEstablished)));
    }

    #[test]
    fn unknown_group_is_rejected() {
        let groups = groups();
        let mut states = [GroupState::ZERO];
        let mut client =
            Client::init(config(), &groups, &mut states, StepClock(Cell::new(0)), FixedTrng(1)).unwrap();
        let mut buf = [0u8; 32];
        let err = client.build_request(Gid(9), &mut buf).unwrap_err();
        assert!(matches!(err, Error::State(StateError::UnknownGroup(Gid(9)))));
    }

    fn client_reqnonce<C: Clock, T: Trng>(client: &Client<C, T>) -> crate::core::types::ReqNonce {
        match client.session_state(Gid(0)).unwrap() {
            crate::group::state::SessionState::HandshakePending { request_nonce } => request_nonce,
            other => panic!("expected HandshakePending, got {other:?}"),
        }
    }

    // The scenarios below play the Server's side of the wire by hand, since
    // `Client` only ever builds REQ/UAD/SADFD: a RES or SRN has to be
    // authored exactly as `message::processor` expects to find one.

    const SERVER_SID: Sid = Sid(0);

    fn aead_nonce(ctrnonce: u32, gid: Gid, sid: Sid) -> [u8; 16] {
        let mut nonce = [0u8; 16];
        nonce[..3].copy_from_slice(&ctrnonce.to_le_bytes()[..3]);
        nonce[3] = gid.0;
        nonce[4] = sid.0;
        nonce
    }

    fn build_res(
        gid: Gid,
        reqnonce: crate::core::types::ReqNonce,
        ctrnonce: u32,
        stk_plain: &[u8; KEY_LEN],
        ltk: &Ltk,
    ) -> Vec<u8> {
        let header = crate::crypto::Header { pty: crate::crypto::PayloadType::Res, gid, sid: SERVER_SID };
        let mut pdu = vec![0u8; 3];
        header.pack(HeaderType::Standard, &mut pdu).unwrap();
        pdu.extend_from_slice(&reqnonce.0.to_le_bytes());
        pdu.extend_from_slice(&ctrnonce.to_le_bytes()[..3]);

        let assoc: Vec<u8> = pdu.clone();
        let mut ctx = crate::crypto::AeadCtx::init(ltk, aead_nonce(ctrnonce, gid, SERVER_SID));
        ctx.assoc_data_update(&assoc);
        ctx.update(stk_plain);
        let mut ciphertext = [0u8; KEY_LEN];
        let tag = ctx.finalize_encrypt(&mut ciphertext);
        pdu.extend_from_slice(&ciphertext);
        pdu.extend_from_slice(&tag);
        pdu
    }

    fn build_srn(gid: Gid, ctrnonce: u32, stk: &crate::core::types::Stk) -> Vec<u8> {
        let header = crate::crypto::Header { pty: crate::crypto::PayloadType::Srn, gid, sid: SERVER_SID };
        let mut pdu = vec![0u8; 3];
        header.pack(HeaderType::Standard, &mut pdu).unwrap();
        pdu.extend_from_slice(&ctrnonce.to_le_bytes()[..3]);

        let assoc: Vec<u8> = pdu.clone();
        let mut ctx = crate::crypto::AeadCtx::init(stk, aead_nonce(ctrnonce, gid, SERVER_SID));
        ctx.assoc_data_update(&assoc);
        let tag = ctx.finalize_encrypt(&mut []);
        pdu.extend_from_slice(&tag);
        pdu
    }

    fn build_sadfd(
        gid: Gid,
        sender_sid: Sid,
        ctrnonce: u32,
        sdu: &[u8],
        stk: &crate::core::types::Stk,
    ) -> Vec<u8> {
        let header = crate::crypto::Header { pty: crate::crypto::PayloadType::SadFd, gid, sid: sender_sid };
        let mut pdu = vec![0u8; 3];
        header.pack(HeaderType::Standard, &mut pdu).unwrap();
        pdu.extend_from_slice(&ctrnonce.to_le_bytes()[..3]);
        pdu.push(sdu.len() as u8);

        let assoc: Vec<u8> = pdu.clone();
        let mut ctx = crate::crypto::AeadCtx::init(stk, aead_nonce(ctrnonce, gid, sender_sid));
        ctx.assoc_data_update(&assoc);
        ctx.update(sdu);
        let mut ciphertext = vec![0u8; sdu.len()];
        let tag = ctx.finalize_encrypt(&mut ciphertext);
        pdu.extend_from_slice(&ciphertext);
        pdu.extend_from_slice(&tag);
        pdu
    }

    /// Scenario A: a full handshake followed by one accepted Secured
    /// Application Data frame.
    #[test]
    fn scenario_a_happy_handshake_then_one_sadfd() {
        let groups = groups();
        let mut states = [GroupState::ZERO];
        let cfg = config();
        let ltk = cfg.ltk.clone();
        let mut client =
            Client::init(cfg, &groups, &mut states, StepClock(Cell::new(0)), FixedTrng(1)).unwrap();

        let mut req_buf = [0u8; 32];
        client.build_request(Gid(0), &mut req_buf).unwrap();
        let reqnonce = client_reqnonce(&client);

        let stk_plain = [0xA0u8; KEY_LEN];
        let res = build_res(Gid(0), reqnonce, 0, &stk_plain, &ltk);
        let mut user_out = [0u8; 64];
        let mut reaction_out = [0u8; 32];
        client.process_received(&res, &mut user_out, &mut reaction_out).unwrap();
        assert_eq!(
            client.session_state(Gid(0)).unwrap(),
            crate::group::state::SessionState::Established {
                stk: crate::core::types::Stk::new(stk_plain),
                ctrnonce: crate::core::types::CtrNonce(0),
            }
        );

        let mut sec_buf = [0u8; 64];
        let len = client.build_secured(Gid(0), &[0xDE, 0xAD], &mut sec_buf).unwrap();
        assert!(len > 0);
        match client.session_state(Gid(0)).unwrap() {
            crate::group::state::SessionState::Established { ctrnonce, .. } => {
                assert_eq!(ctrnonce, crate::core::types::CtrNonce(1));
            }
            other => panic!("expected Established, got {other:?}"),
        }
    }

    /// Scenario B: once the local counter has advanced far enough past it, a
    /// replayed counter nonce falls outside the freshness window and is
    /// rejected, even though it authenticates correctly.
    #[test]
    fn scenario_b_replay_is_rejected_once_window_has_advanced() {
        let groups = groups();
        let mut states = [GroupState::ZERO];
        let cfg = config();
        let ltk = cfg.ltk.clone();
        let mut client =
            Client::init(cfg, &groups, &mut states, StepClock(Cell::new(0)), FixedTrng(1)).unwrap();

        let mut req_buf = [0u8; 32];
        client.build_request(Gid(0), &mut req_buf).unwrap();
        let reqnonce = client_reqnonce(&client);
        let stk = crate::core::types::Stk::new([0xB0u8; KEY_LEN]);
        let res = build_res(Gid(0), reqnonce, 0, stk.as_bytes(), &ltk);
        let mut user_out = [0u8; 64];
        let mut reaction_out = [0u8; 32];
        client.process_received(&res, &mut user_out, &mut reaction_out).unwrap();

        let first = build_sadfd(Gid(0), Sid(5), 1, b"hi", &stk);
        // Drive the local counter well past the replayed value's tolerance window.
        for n in 1..16u32 {
            let sadfd = build_sadfd(Gid(0), Sid(5), n, b"hi", &stk);
            client.process_received(&sadfd, &mut user_out, &mut reaction_out).unwrap();
        }
        let err = client.process_received(&first, &mut user_out, &mut reaction_out).unwrap_err();
        assert!(matches!(err, Error::Security(crate::core::error::SecurityWarning::OldMessage)));
    }

    /// Scenario C: a Response arriving after the handshake timeout is rejected.
    #[test]
    fn scenario_c_handshake_timeout() {
        let groups = groups();
        let mut states = [GroupState::ZERO];
        let mut cfg = config();
        cfg.timeout_req_to_res_ms = 100;
        let ltk = cfg.ltk.clone();
        let clock = StepClock(Cell::new(0));
        let mut client = Client::init(cfg, &groups, &mut states, clock, FixedTrng(1)).unwrap();

        let mut req_buf = [0u8; 32];
        client.build_request(Gid(0), &mut req_buf).unwrap();
        let reqnonce = client_reqnonce(&client);

        // Burn clock ticks past the timeout; StepClock advances by 1 per call.
        for _ in 0..300 {
            let _ = client.clock.now();
        }

        let res = build_res(Gid(0), reqnonce, 0, &[0xA0u8; KEY_LEN], &ltk);
        let mut user_out = [0u8; 64];
        let mut reaction_out = [0u8; 32];
        let err = client.process_received(&res, &mut user_out, &mut reaction_out).unwrap_err();
        assert!(matches!(err, Error::Security(crate::core::error::SecurityWarning::ResponseTimeout)));
        assert!(matches!(
            client.session_state(Gid(0)).unwrap(),
            crate::group::state::SessionState::HandshakePending { .. }
        ));
    }

    /// Scenario D: a Session Renewal Notification starts an overlap phase in
    /// which both the old and new Short-Term Keys are accepted. Mirrors the
    /// ordinary renewal timeline: the old session has been carrying traffic
    /// and so sits at a higher counter than the brand new one.
    #[test]
    fn scenario_d_renewal_overlap_accepts_both_sessions() {
        let groups = groups();
        let mut states = [GroupState::ZERO];
        let cfg = config();
        let ltk = cfg.ltk.clone();
        let mut client =
            Client::init(cfg, &groups, &mut states, StepClock(Cell::new(0)), FixedTrng(1)).unwrap();

        let mut req_buf = [0u8; 32];
        client.build_request(Gid(0), &mut req_buf).unwrap();
        let reqnonce = client_reqnonce(&client);
        let old_stk = crate::core::types::Stk::new([0xC0u8; KEY_LEN]);
        let res = build_res(Gid(0), reqnonce, 0, old_stk.as_bytes(), &ltk);
        let mut user_out = [0u8; 64];
        let mut reaction_out = [0u8; 32];
        client.process_received(&res, &mut user_out, &mut reaction_out).unwrap();

        // Drive the old session's counter up with ordinary traffic before renewal.
        for n in 1..=6u32 {
            let sadfd = build_sadfd(Gid(0), Sid(5), n, b"old", &old_stk);
            client.process_received(&sadfd, &mut user_out, &mut reaction_out).unwrap();
        }

        let srn = build_srn(Gid(0), 7, &old_stk);
        let outcome = client.process_received(&srn, &mut user_out, &mut reaction_out).unwrap();
        assert!(outcome.reaction_len > 0, "accepted SRN must produce a reaction REQ");
        let new_reqnonce = client_reqnonce(&client);

        let new_stk = crate::core::types::Stk::new([0xD0u8; KEY_LEN]);
        let new_res = build_res(Gid(0), new_reqnonce, 0, new_stk.as_bytes(), &ltk);
        client.process_received(&new_res, &mut user_out, &mut reaction_out).unwrap();
        assert!(matches!(
            client.session_state(Gid(0)).unwrap(),
            crate::group::state::SessionState::Overlap { .. }
        ));

        // After renewal: current (new) counter is 0, previous (old) counter is
        // 6, so the midpoint is 3. A frame above the midpoint under the old
        // key still routes to the previous session and authenticates.
        let old_sadfd = build_sadfd(Gid(0), Sid(5), 7, b"old", &old_stk);
        client.process_received(&old_sadfd, &mut user_out, &mut reaction_out).unwrap();

        // A frame below the midpoint under the new key routes to the current session.
        let new_sadfd = build_sadfd(Gid(0), Sid(5), 1, b"new", &new_stk);
        client.process_received(&new_sadfd, &mut user_out, &mut reaction_out).unwrap();
    }

    /// Scenario E: once the counter nonce reaches its terminal value, no
    /// further Secured Application Data frame can be built until a fresh
    /// handshake installs a new session.
    #[test]
    fn scenario_e_nonce_exhaustion_blocks_further_secured_frames() {
        let groups = groups();
        let mut states = [GroupState::ZERO];
        let mut client =
            Client::init(config(), &groups, &mut states, StepClock(Cell::new(0)), FixedTrng(1)).unwrap();
        // `init` zeroes every state, so the near-exhausted session is installed after construction.
        client.states[0].current_stk = crate::core::types::Stk::new([0xE0u8; KEY_LEN]);
        client.states[0].current_ctrnonce =
            crate::core::types::CtrNonce(crate::core::constants::MAX_CTRNONCE - 1);

        let mut buf = [0u8; 64];
        client.build_secured(Gid(0), b"x", &mut buf).unwrap();
        assert!(matches!(
            client.session_state(Gid(0)).unwrap(),
            crate::group::state::SessionState::Expired
        ));

        let err = client.build_secured(Gid(0), b"y", &mut buf).unwrap_err();
        assert!(matches!(err, Error::State(StateError::SessionNotEstablished)));
    }

    /// Scenario F: configuration rejection for out-of-order GIDs, a missing
    /// broadcast group, and an all-zero long-term key.
    #[test]
    fn scenario_f_config_rejection() {
        let bad_order = [
            GroupConfig { gid: Gid(0), ..groups()[0] },
            GroupConfig { gid: Gid(0), ..groups()[0] },
        ];
        let mut states = [GroupState::ZERO, GroupState::ZERO];
        assert!(matches!(
            Client::init(config(), &bad_order, &mut states, StepClock(Cell::new(0)), FixedTrng(1))
                .unwrap_err(),
            Error::Config(ConfigError::GidsNotPresortedAscending)
        ));

        let missing_gid0 = [GroupConfig { gid: Gid(1), ..groups()[0] }];
        let mut states = [GroupState::ZERO];
        assert!(matches!(
            Client::init(config(), &missing_gid0, &mut states, StepClock(Cell::new(0)), FixedTrng(1))
                .unwrap_err(),
            Error::Config(ConfigError::MissingGid0)
        ));

        let mut zero_ltk_config = config();
        zero_ltk_config.ltk = Ltk::ZERO;
        let groups = groups();
        let mut states = [GroupState::ZERO];
        assert!(matches!(
            Client::init(zero_ltk_config, &groups, &mut states, StepClock(Cell::new(0)), FixedTrng(1))
                .unwrap_err(),
            Error::Config(ConfigError::LtkAllZero)
        ));
    }
}
