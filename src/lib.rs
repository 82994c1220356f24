//! # CBS Client
//!
//! A Client-side implementation of the CAN Bus Security (CBS) protocol: a
//! lightweight authenticated-encryption scheme for CAN/CAN-FD networks,
//! built around short-lived AEAD session keys and a 3-way handshake over
//! the bus itself.
//!
//! The state machine is synchronous, single-threaded and allocation-free by
//! default: every operation that needs the current time or randomness takes
//! it through the [`core::traits::Clock`]/[`core::traits::Trng`] traits
//! rather than reaching for `std::time`/`OsRng`, so the same code runs on a
//! bare-metal ECU or behind the `std`-only helpers in [`os`].
//!
//! ## Feature Flags
//!
//! - `std` (off by default): enables [`os`], a heap-backed [`client::Client`]
//!   wrapper, an [`std::time`]/`rand`-backed [`core::traits::Clock`]/
//!   [`core::traits::Trng`] pair, and a binary configuration file loader.
//!
//! ## Modules
//!
//! - [`core`]: shared types, constants, error enums and capability traits.
//! - [`crypto`]: the header codec, the AEAD facade, and the freshness window.
//! - [`group`]: per-Group configuration, mutable state, and the session
//!   state machine.
//! - [`message`]: frame builders and the inbound frame processor.
//! - [`client`]: the public, `no_std`-compatible [`client::Client`] type.
//! - [`os`] (requires `std`): hosted helpers — OS-backed capabilities, a
//!   heap-allocating context, and the configuration file format.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod core;
pub mod crypto;
pub mod group;
pub mod message;

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod os;

/// Convenient re-exports of the types most callers need.
pub mod prelude {
    pub use crate::client::{Client, Received};
    pub use crate::core::error::{
        ConfigError, Error, FramingError, ProviderError, SecurityWarning, StateError,
    };
    pub use crate::core::traits::{Clock, Trng};
    pub use crate::core::types::{CtrNonce, Gid, Ltk, ReqNonce, Sid, Stk, Timestamp};
    pub use crate::crypto::HeaderType;
    pub use crate::group::config::{ClientConfig, GroupConfig};
    pub use crate::group::state::{GroupState, SessionState};

    #[cfg(feature = "std")]
    #[cfg_attr(docsrs, doc(cfg(feature = "std")))]
    pub use crate::os::{OsClock, OsTrng};
}
