//! Error types for the CBS client.

use thiserror::Error;

use crate::core::types::Gid;

/// Structural problems with a `ClientConfig`/`GroupConfig` pair, detected at [`init`](crate::client::Client::init).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The long-term key is all-zero.
    #[error("long-term key must not be all-zero")]
    LtkAllZero,
    /// The configured own SID equals the reserved Server SID.
    #[error("client SID must not equal the Server SID (0)")]
    ServerSidAssignedToClient,
    /// The header type identifier is not one this implementation recognizes.
    #[error("unknown header type {0}")]
    InvalidHeaderType(u8),
    /// The configured SID does not fit in the header type's SID field.
    #[error("SID does not fit the configured header type")]
    SidTooLarge,
    /// A group's GID does not fit in the header type's GID field.
    #[error("GID does not fit the configured header type")]
    GidTooLarge,
    /// No groups were configured.
    #[error("at least one group must be configured")]
    ZeroGroups,
    /// More groups were configured than the header type can address.
    #[error("too many groups for the configured header type")]
    TooManyGroups,
    /// `groups[0].gid != 0`; the broadcast group must be present and first.
    #[error("the first configured group must have GID 0")]
    MissingGid0,
    /// Groups are not sorted in strictly ascending GID order.
    #[error("group configurations must be strictly ascending by GID")]
    GidsNotPresortedAscending,
    /// A group's `max_ctrnonce_delay_msgs` exceeds the representable range.
    #[error("max_ctrnonce_delay_msgs out of range for group {0:?}")]
    InvalidMaxCtrnonceDelay(Gid),
    /// The Group configuration and Group state arrays passed to `init` have
    /// different lengths; they must be positionally matched.
    #[error("group configuration and state arrays must have the same length")]
    GroupsStatesLengthMismatch,
}

/// Problems decoding or framing a PDU.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// Buffer shorter than the header requires.
    #[error("PDU too short to contain a header")]
    TooShortPduForHeader,
    /// Buffer shorter than the given payload type requires.
    #[error("PDU too short for its payload type")]
    TooShortPduForPayload,
    /// Payload type byte does not match a known variant.
    #[error("unrecognized payload type {0}")]
    InvalidPayloadType(u8),
    /// SDU exceeds the maximum size this implementation buffers.
    #[error("SDU too long ({0} bytes)")]
    TooLongSdu(usize),
    /// Destination buffer too small to hold the built PDU.
    #[error("output buffer too small to hold the built PDU")]
    OutputBufferTooSmall,
}

/// Problems arising from the current Group session state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// A handshake is already outstanding for this group.
    #[error("a handshake is already ongoing for this group")]
    HandshakeOngoing,
    /// No established session exists for this group.
    #[error("no established session for this group")]
    SessionNotEstablished,
    /// No group with the requested GID is configured.
    #[error("unknown group {0:?}")]
    UnknownGroup(Gid),
}

/// Outcomes of processing a frame that indicate an adversarial or stale
/// network condition rather than a programming error. Several of these are
/// *expected* on a live bus and are not necessarily worth logging loudly.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SecurityWarning {
    /// The frame's SID is our own; we are observing our own transmission.
    #[error("received a message addressed from ourselves")]
    MessageFromMyself,
    /// A RES/SRN arrived from a SID other than the Server.
    #[error("only the Server may send this payload type")]
    ServerOnlyMessage,
    /// The received counter nonce is the terminal expired value.
    #[error("received an already-expired counter nonce")]
    ReceivedOverflownNonce,
    /// The received counter nonce is older than the current freshness window tolerates.
    #[error("received counter nonce is too old")]
    OldMessage,
    /// AEAD tag verification failed; plaintext output is not to be trusted.
    #[error("AEAD tag verification failed")]
    InvalidTag,
    /// A RES arrived for a group with no outstanding REQ.
    #[error("not expecting a response for this group")]
    NotExpectingAResponse,
    /// A RES arrived after the handshake response window elapsed.
    #[error("response arrived after the handshake timeout")]
    ResponseTimeout,
}

/// Failures of the injected [`Clock`](crate::core::traits::Clock)/[`Trng`](crate::core::traits::Trng) capabilities.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProviderError {
    /// The injected clock failed to produce a timestamp.
    #[error("could not read the current time")]
    CannotGetCurrentTime,
    /// The injected RNG failed to produce random bytes.
    #[error("could not generate random bytes")]
    CannotGenerateRandom,
    /// The injected RNG repeatedly produced an all-zero output.
    #[error("could not generate a non-zero random value after {0} attempts")]
    CannotGenerateNonZeroRandom(u32),
}

/// Top-level error type returned by every public operation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration rejected at `init`.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Malformed or oversized frame.
    #[error(transparent)]
    Framing(#[from] FramingError),
    /// Operation not valid in the group's current state.
    #[error(transparent)]
    State(#[from] StateError),
    /// Adversarial or stale-network condition detected while processing a frame.
    #[error(transparent)]
    Security(#[from] SecurityWarning),
    /// Injected clock or RNG failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The frame was structurally valid but irrelevant to this context
    /// (e.g. a REQ, which only a Server answers). Not indicative of an attack.
    #[error("message ignored: not actionable by a client")]
    MessageIgnored,
}

/// Errors from the hosted (`std`-only) config-file loader.
#[cfg(feature = "std")]
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Buffer does not start with the expected magic bytes.
    #[error("bad magic bytes")]
    BadMagic,
    /// Buffer ended before a fixed-size record could be read.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// The decoded configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
