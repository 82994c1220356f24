//! Client and Group configuration, plus the validation run once at [`init`](crate::client::Client::init).

use crate::core::error::ConfigError;
use crate::core::types::{Gid, Ltk, Sid};
use crate::core::constants::MAX_CTRNONCE;
use crate::crypto::HeaderType;

/// Configuration shared across all Groups a Client participates in.
///
/// Immutable for the lifetime of the [`Client`](crate::client::Client) that validated it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long to wait for a Response after sending a Request.
    pub timeout_req_to_res_ms: u16,
    /// Long-term key shared with the Server. Must not be all-zero.
    pub ltk: Ltk,
    /// This Client's own source identifier. Must not equal the Server's.
    pub sid: Sid,
    /// Wire encoding of the header fields; must match the Server's choice.
    pub header_type: HeaderType,
}

/// Per-Group configuration.
#[derive(Debug, Clone, Copy)]
pub struct GroupConfig {
    /// Group identifier.
    pub gid: Gid,
    /// Maximum tolerated lag, in messages, of a received counter nonce
    /// behind the locally known one, immediately after a fresh message.
    pub max_ctrnonce_delay_msgs: u32,
    /// Silence duration after which the freshness window shrinks to zero tolerance.
    pub max_silence_interval_ms: u16,
    /// Duration of the renewal overlap phase after a Response.
    pub session_renewal_duration_ms: u16,
}

/// Validates a `ClientConfig` in isolation, independent of its Groups.
///
/// Mirrors the order of checks a reference implementation performs so that
/// a misconfigured deployment fails on the same first check regardless of
/// which language validated it.
///
/// # Errors
///
/// Returns the first applicable [`ConfigError`] variant.
pub fn check_client_config(
    config: &ClientConfig,
    groups: &[GroupConfig],
) -> Result<(), ConfigError> {
    if config.ltk.is_zero() {
        return Err(ConfigError::LtkAllZero);
    }
    if config.sid.0 == crate::core::constants::SERVER_SID {
        return Err(ConfigError::ServerSidAssignedToClient);
    }
    if config.sid.0 > config.header_type.max_sid() {
        return Err(ConfigError::SidTooLarge);
    }
    if groups.is_empty() {
        return Err(ConfigError::ZeroGroups);
    }
    if groups.len() > usize::from(config.header_type.max_gid()) + 1 {
        return Err(ConfigError::TooManyGroups);
    }
    Ok(())
}

/// Validates the Group configuration array: broadcast group first,
/// strictly ascending GIDs, and per-group bounds.
///
/// # Errors
///
/// Returns the first applicable [`ConfigError`] variant.
pub fn check_group_configs(
    groups: &[GroupConfig],
    header_type: HeaderType,
) -> Result<(), ConfigError> {
    if groups.first().is_some_and(|g| g.gid.0 != crate::core::constants::BROADCAST_GID) {
        return Err(ConfigError::MissingGid0);
    }
    let mut previous_gid: Option<u8> = None;
    for group in groups {
        if group.max_ctrnonce_delay_msgs >= MAX_CTRNONCE {
            return Err(ConfigError::InvalidMaxCtrnonceDelay(group.gid));
        }
        if group.gid.0 > header_type.max_gid() {
            return Err(ConfigError::GidTooLarge);
        }
        if let Some(prev) = previous_gid {
            if group.gid.0 <= prev {
                return Err(ConfigError::GidsNotPresortedAscending);
            }
        }
        previous_gid = Some(group.gid.0);
    }
    Ok(())
}

/// Runs [`check_client_config`] followed by [`check_group_configs`].
///
/// # Errors
///
/// Returns the first applicable [`ConfigError`] variant, checking the
/// Client-wide configuration before any Group-specific one.
pub fn check_ctx(config: &ClientConfig, groups: &[GroupConfig]) -> Result<(), ConfigError> {
    check_client_config(config, groups)?;
    check_group_configs(groups, config.header_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::KEY_LEN;

    fn valid_config() -> ClientConfig {
        ClientConfig {
            timeout_req_to_res_ms: 1000,
            ltk: Ltk::new([1u8; KEY_LEN]),
            sid: Sid(2),
            header_type: HeaderType::Standard,
        }
    }

    fn valid_groups() -> [GroupConfig; 1] {
        [GroupConfig {
            gid: Gid(0),
            max_ctrnonce_delay_msgs: 10,
            max_silence_interval_ms: 5000,
            session_renewal_duration_ms: 2000,
        }]
    }

    #[test]
    fn accepts_minimal_valid_config() {
        assert!(check_ctx(&valid_config(), &valid_groups()).is_ok());
    }

    #[test]
    fn rejects_zero_ltk() {
        let mut config = valid_config();
        config.ltk = Ltk::ZERO;
        assert_eq!(check_ctx(&config, &valid_groups()), Err(ConfigError::LtkAllZero));
    }

    #[test]
    fn rejects_server_sid() {
        let mut config = valid_config();
        config.sid = Sid(0);
        assert_eq!(
            check_ctx(&config, &valid_groups()),
            Err(ConfigError::ServerSidAssignedToClient)
        );
    }

    #[test]
    fn rejects_zero_groups() {
        assert_eq!(check_ctx(&valid_config(), &[]), Err(ConfigError::ZeroGroups));
    }

    #[test]
    fn rejects_missing_gid_zero() {
        let groups = [GroupConfig { gid: Gid(1), ..valid_groups()[0] }];
        assert_eq!(check_ctx(&valid_config(), &groups), Err(ConfigError::MissingGid0));
    }

    #[test]
    fn rejects_non_ascending_gids() {
        let groups = [
            GroupConfig { gid: Gid(0), ..valid_groups()[0] },
            GroupConfig { gid: Gid(0), ..valid_groups()[0] },
        ];
        assert_eq!(
            check_ctx(&valid_config(), &groups),
            Err(ConfigError::GidsNotPresortedAscending)
        );
    }

    #[test]
    fn rejects_excessive_max_ctrnonce_delay() {
        let groups = [GroupConfig { max_ctrnonce_delay_msgs: MAX_CTRNONCE, ..valid_groups()[0] }];
        assert_eq!(
            check_ctx(&valid_config(), &groups),
            Err(ConfigError::InvalidMaxCtrnonceDelay(Gid(0)))
        );
    }
}
