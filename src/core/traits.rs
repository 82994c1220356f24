//! Capability traits injected into a [`Client`](crate::client::Client) at construction.
//!
//! The library never reaches for ambient time or randomness: every operation
//! that needs either takes them through these traits, so the same state
//! machine runs unmodified on bare metal (a caller-supplied free-running
//! counter and a hardware TRNG) or on a hosted OS (see the `std`-only
//! implementations in [`crate::os`]).

use crate::core::error::ProviderError;
use crate::core::types::Timestamp;

/// Source of monotonic (modulo one wraparound) millisecond timestamps.
///
/// # Requirements
///
/// - MUST NOT block indefinitely; the library has no timeout for this call.
/// - Successive calls MUST represent non-decreasing wall-clock time, modulo
///   exactly one wraparound of the underlying 32-bit counter (see
///   [`crate::core::time::wrap_delta`]).
///
/// # Example
///
/// ```ignore
/// struct FixedClock(core::cell::Cell<u32>);
///
/// impl Clock for FixedClock {
///     fn now(&self) -> Result<Timestamp, ProviderError> {
///         Ok(Timestamp(self.0.get()))
///     }
/// }
/// ```
pub trait Clock {
    /// Returns the current timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::CannotGetCurrentTime`] if the underlying
    /// clock source is unavailable.
    fn now(&self) -> Result<Timestamp, ProviderError>;
}

/// Source of cryptographically secure random bytes.
///
/// # Requirements
///
/// - MUST be suitable for generating nonces and keys (a hardware TRNG, a
///   CSPRNG seeded from one, or an OS-provided source).
/// - MUST NOT block indefinitely.
pub trait Trng {
    /// Fills `out` with random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::CannotGenerateRandom`] if the underlying
    /// source is unavailable or fails.
    fn fill(&self, out: &mut [u8]) -> Result<(), ProviderError>;
}

/// Fills `out` via `trng`, retrying until the output is not all-zero.
///
/// A TRNG producing an all-zero buffer is vanishingly unlikely but would
/// otherwise be indistinguishable from the "no session"/"no request"
/// sentinels this library relies on, so it is rejected explicitly.
///
/// # Errors
///
/// Propagates [`ProviderError::CannotGenerateRandom`] from `trng`, or
/// returns [`ProviderError::CannotGenerateNonZeroRandom`] if every attempt
/// within [`crate::core::constants::MAX_TRNG_TRIES_FOR_NONZERO_VALUE`]
/// produced an all-zero buffer.
pub fn non_zero_fill(trng: &dyn Trng, out: &mut [u8]) -> Result<(), ProviderError> {
    use crate::core::constants::MAX_TRNG_TRIES_FOR_NONZERO_VALUE;

    for _ in 0..MAX_TRNG_TRIES_FOR_NONZERO_VALUE {
        trng.fill(out)?;
        if out.iter().any(|&b| b != 0) {
            return Ok(());
        }
    }
    Err(ProviderError::CannotGenerateNonZeroRandom(MAX_TRNG_TRIES_FOR_NONZERO_VALUE))
}
