//! Newtypes for the identifiers and secrets that flow through the protocol.

use core::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::constants::KEY_LEN;

/// Group identifier. `Gid(0)` is the mandatory broadcast group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gid(pub u8);

/// Source identifier. `Sid(0)` is reserved for the Server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sid(pub u8);

/// 24-bit counter nonce. `0xFF_FFFF` is the terminal expired value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CtrNonce(pub u32);

impl CtrNonce {
    /// The zero counter nonce, used when a session is first established.
    pub const ZERO: Self = Self(0);

    /// Whether this counter has reached the terminal expired value.
    #[must_use]
    pub const fn is_expired(self) -> bool {
        crate::core::constants::ctrnonce_is_expired(self.0)
    }

    /// Returns `self + 1`, saturating at the expired sentinel rather than wrapping.
    #[must_use]
    pub const fn saturating_incr(self) -> Self {
        if self.is_expired() {
            self
        } else {
            Self(self.0 + 1)
        }
    }
}

/// Opaque request nonce binding a RES to the REQ that solicited it.
/// `ReqNonce(0)` means "no handshake outstanding".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReqNonce(pub u64);

impl ReqNonce {
    /// The sentinel meaning "not expecting a response".
    pub const NONE: Self = Self(0);

    /// Whether a handshake is outstanding for this value.
    #[must_use]
    pub const fn is_outstanding(self) -> bool {
        self.0 != 0
    }
}

/// 32-bit millisecond timestamp from an injected [`Clock`](crate::core::traits::Clock).
///
/// Arithmetic between two timestamps tolerates at most one wraparound of the
/// underlying counter; see [`crate::core::time::wrap_delta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u32);

macro_rules! zeroizing_key {
    ($name:ident) => {
        /// Symmetric key material. `Debug` never prints the bytes; the
        /// backing buffer is zeroized when dropped.
        #[derive(Clone, Zeroize, ZeroizeOnDrop)]
        pub struct $name([u8; KEY_LEN]);

        impl $name {
            /// Wraps raw key bytes.
            #[must_use]
            pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
                Self(bytes)
            }

            /// The all-zero key, used as the "no key present" sentinel.
            pub const ZERO: Self = Self([0u8; KEY_LEN]);

            /// Borrows the raw key bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
                &self.0
            }

            /// Whether this key is the all-zero sentinel.
            #[must_use]
            pub fn is_zero(&self) -> bool {
                self.0.ct_eq(&[0u8; KEY_LEN]).into()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&"[redacted]").finish()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.ct_eq(&other.0).into()
            }
        }
        impl Eq for $name {}
    };
}

zeroizing_key!(Ltk);
zeroizing_key!(Stk);
