//! Hosted (`std`-only) glue: OS-backed capability providers, a heap-allocated
//! Client wrapper, and the binary configuration file loader.
//!
//! None of this is reachable without the `std` feature; the embedded,
//! `no_std` surface in [`crate::client`] never depends on it.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;

use crate::core::constants::{AEAD_TAG_LEN, KEY_LEN};
use crate::core::error::{ConfigError, ConfigFileError, Error, ProviderError, StateError};
use crate::core::traits::{Clock, Trng};
use crate::core::types::{Gid, Ltk, Sid, Timestamp};
use crate::crypto::HeaderType;
use crate::group::{check_ctx, ClientConfig, GroupConfig, GroupState};
use crate::message::{build_request, build_secured, build_unsecured, process_received, ProcessOutcome};

const MAGIC: &[u8; 4] = b"HZL\0";
const CLIENT_CONFIG_RECORD_LEN: usize = 2 + KEY_LEN + 1 + 1 + 1;
const GROUP_CONFIG_RECORD_LEN: usize = 1 + 4 + 2 + 2;

/// A [`Clock`] backed by [`std::time::SystemTime`], truncated to 32-bit
/// milliseconds since the Unix epoch.
///
/// Callers crossing the ~49-day wraparound of that truncation are covered by
/// [`crate::core::time::wrap_delta`]'s single-wrap tolerance; a second wrap
/// within one protocol timeout would misbehave, as it would for any 32-bit
/// millisecond clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsClock;

impl Clock for OsClock {
    fn now(&self) -> Result<Timestamp, ProviderError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ProviderError::CannotGetCurrentTime)?;
        Ok(Timestamp(elapsed.as_millis() as u32))
    }
}

/// A [`Trng`] backed by the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTrng;

impl Trng for OsTrng {
    fn fill(&self, out: &mut [u8]) -> Result<(), ProviderError> {
        OsRng.try_fill_bytes(out).map_err(|_| ProviderError::CannotGenerateRandom)
    }
}

/// Parses the binary `.hzl` configuration file format: 4-byte magic `"HZL\0"`,
/// followed by a packed [`ClientConfig`] record, followed by `amount_of_groups`
/// packed [`GroupConfig`] records. All multi-byte integers little-endian, no
/// padding between fields or records.
///
/// # Errors
///
/// - [`ConfigFileError::BadMagic`] if the file does not start with `"HZL\0"`.
/// - [`ConfigFileError::UnexpectedEof`] if the buffer ends before a full record does.
/// - [`ConfigFileError::Config`] if the decoded configuration fails the usual
///   [`check_ctx`] validation.
pub fn parse_config_bytes(bytes: &[u8]) -> Result<(ClientConfig, Vec<GroupConfig>), ConfigFileError> {
    let rest = bytes.strip_prefix(MAGIC.as_slice()).ok_or(ConfigFileError::BadMagic)?;
    if rest.len() < CLIENT_CONFIG_RECORD_LEN {
        return Err(ConfigFileError::UnexpectedEof);
    }

    let timeout_req_to_res_ms = u16::from_le_bytes([rest[0], rest[1]]);
    let mut ltk_bytes = [0u8; KEY_LEN];
    ltk_bytes.copy_from_slice(&rest[2..2 + KEY_LEN]);
    let sid = rest[2 + KEY_LEN];
    let header_type_raw = rest[2 + KEY_LEN + 1];
    let amount_of_groups = rest[2 + KEY_LEN + 2] as usize;

    let header_type = HeaderType::from_u8(header_type_raw)?;
    let config = ClientConfig {
        timeout_req_to_res_ms,
        ltk: Ltk::new(ltk_bytes),
        sid: Sid(sid),
        header_type,
    };

    let groups_bytes = &rest[CLIENT_CONFIG_RECORD_LEN..];
    if groups_bytes.len() < amount_of_groups * GROUP_CONFIG_RECORD_LEN {
        return Err(ConfigFileError::UnexpectedEof);
    }
    let mut groups = Vec::with_capacity(amount_of_groups);
    for chunk in groups_bytes.chunks_exact(GROUP_CONFIG_RECORD_LEN).take(amount_of_groups) {
        groups.push(GroupConfig {
            gid: Gid(chunk[0]),
            max_ctrnonce_delay_msgs: u32::from_le_bytes([chunk[1], chunk[2], chunk[3], chunk[4]]),
            max_silence_interval_ms: u16::from_le_bytes([chunk[5], chunk[6]]),
            session_renewal_duration_ms: u16::from_le_bytes([chunk[7], chunk[8]]),
        });
    }

    check_ctx(&config, &groups)?;
    tracing::debug!(groups = groups.len(), "parsed CBS client configuration");
    Ok((config, groups))
}

/// Reads and parses a `.hzl` configuration file from `path`.
///
/// # Errors
///
/// See [`parse_config_bytes`]. I/O failures surface as [`ConfigFileError::UnexpectedEof`],
/// since a missing or unreadable file is, from the parser's point of view,
/// indistinguishable from an empty one.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<(ClientConfig, Vec<GroupConfig>), ConfigFileError> {
    let bytes = fs::read(path).map_err(|_| ConfigFileError::UnexpectedEof)?;
    parse_config_bytes(&bytes)
}

/// A heap-allocated Client, for hosts that would rather own their Group
/// arrays on the heap than pin them in `static` memory.
///
/// Equivalent to the embedded [`crate::client::Client`], but owns its
/// configuration and state instead of borrowing them, and defaults its
/// capability providers to [`OsClock`]/[`OsTrng`]. `Drop` zeroizes every
/// secret-carrying field before the backing `Vec`s are freed, mirroring
/// `hzl_ClientFree`'s clear-then-free order.
pub struct HostedClient {
    config: ClientConfig,
    groups: Vec<GroupConfig>,
    states: Vec<GroupState>,
    clock: OsClock,
    trng: OsTrng,
}

impl HostedClient {
    /// Validates `config`/`groups` and allocates zeroed state for each group.
    ///
    /// # Errors
    ///
    /// A [`ConfigError`] if validation fails.
    pub fn new(config: ClientConfig, groups: Vec<GroupConfig>) -> Result<Self, Error> {
        check_ctx(&config, &groups)?;
        let states = vec![GroupState::ZERO; groups.len()];
        Ok(Self { config, groups, states, clock: OsClock, trng: OsTrng })
    }

    /// Loads a `.hzl` configuration file and constructs a [`HostedClient`] from it.
    ///
    /// # Errors
    ///
    /// See [`load_config_file`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let (config, groups) = load_config_file(path)?;
        let states = vec![GroupState::ZERO; groups.len()];
        Ok(Self { config, groups, states, clock: OsClock, trng: OsTrng })
    }

    /// Zeroes every Group's state, as if freshly constructed.
    pub fn deinit(&mut self) {
        for state in &mut self.states {
            state.clear();
        }
    }

    fn group_index(&self, gid: Gid) -> Result<usize, Error> {
        self.groups
            .iter()
            .position(|g| g.gid == gid)
            .ok_or(Error::State(StateError::UnknownGroup(gid)))
    }

    /// Builds a Request frame for `gid`, returning a heap-allocated PDU.
    ///
    /// # Errors
    ///
    /// See [`crate::client::Client::build_request`].
    pub fn build_request(&mut self, gid: Gid) -> Result<Vec<u8>, Error> {
        let idx = self.group_index(gid)?;
        let mut buf = vec![0u8; self.config.header_type.header_len() + 8];
        let len = build_request(
            self.config.header_type,
            self.config.sid,
            self.config.timeout_req_to_res_ms,
            gid,
            &mut self.states[idx],
            &self.clock,
            &self.trng,
            &mut buf,
        )?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Builds an Unsecured Application Data frame for `gid`.
    ///
    /// # Errors
    ///
    /// See [`crate::client::Client::build_unsecured`].
    pub fn build_unsecured(&self, gid: Gid, sdu: &[u8]) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; self.config.header_type.header_len() + 1 + sdu.len()];
        let len = build_unsecured(self.config.header_type, self.config.sid, gid, sdu, &mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Builds a Secured Application Data frame for `gid`.
    ///
    /// # Errors
    ///
    /// See [`crate::client::Client::build_secured`].
    pub fn build_secured(&mut self, gid: Gid, sdu: &[u8]) -> Result<Vec<u8>, Error> {
        let idx = self.group_index(gid)?;
        let mut buf =
            vec![0u8; self.config.header_type.header_len() + 3 + 1 + sdu.len() + AEAD_TAG_LEN];
        let len = build_secured(
            self.config.header_type,
            self.config.sid,
            gid,
            &mut self.states[idx],
            sdu,
            &mut buf,
        )?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Processes a received PDU, returning any plaintext user data and any
    /// reaction PDU the caller should transmit.
    ///
    /// # Errors
    ///
    /// See [`crate::client::Client::process_received`].
    pub fn process_received(&mut self, pdu: &[u8]) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let mut user_out = vec![0u8; crate::core::constants::MAX_SDU_LEN];
        let mut reaction_out = vec![0u8; self.config.header_type.header_len() + 8];
        let ProcessOutcome { user_data_len, reaction_len } = process_received(
            self.config.header_type,
            self.config.sid,
            self.config.timeout_req_to_res_ms,
            &self.config.ltk,
            &self.groups,
            &mut self.states,
            &self.clock,
            &self.trng,
            pdu,
            &mut user_out,
            &mut reaction_out,
        )?;
        user_out.truncate(user_data_len);
        reaction_out.truncate(reaction_len);
        Ok((user_out, reaction_out))
    }
}

impl Drop for HostedClient {
    fn drop(&mut self) {
        for state in &mut self.states {
            state.clear();
        }
        self.config.ltk = Ltk::ZERO;
    }
}
