//! Adaptive freshness window.
//!
//! The longer the bus has been silent, the less tolerance is granted for a
//! stale counter nonce: a freshly-seen session tolerates nonces close to
//! `max_ctrnonce_delay` behind the locally known counter, shrinking linearly
//! to zero tolerance once `max_silence_ms` has passed.

/// Computes the maximum acceptable positive lag of a received counter nonce
/// behind the locally known one.
///
/// Returns `0` once `elapsed_ms >= max_silence_ms`, both to enforce "no
/// tolerance after prolonged silence" and to avoid dividing by zero when
/// `max_silence_ms == 0` (freshness checking disabled via an empty window).
#[must_use]
pub fn ctrdelay(elapsed_ms: u32, max_ctrnonce_delay: u32, max_silence_ms: u32) -> u32 {
    if max_silence_ms == 0 || elapsed_ms >= max_silence_ms {
        return 0;
    }
    let delay = max_ctrnonce_delay as f32;
    let fraction = elapsed_ms as f32 / max_silence_ms as f32;
    ceil_u32(delay * (1.0 - fraction))
}

/// Rounds a non-negative float up to the next integer without pulling in a
/// full `libm` dependency for a single `ceilf` call.
fn ceil_u32(x: f32) -> u32 {
    let floored = x as u32;
    floored + u32::from((floored as f32) < x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_silence_grants_full_tolerance() {
        assert_eq!(ctrdelay(0, 100, 1000), 100);
    }

    #[test]
    fn full_silence_grants_no_tolerance() {
        assert_eq!(ctrdelay(1000, 100, 1000), 0);
        assert_eq!(ctrdelay(5000, 100, 1000), 0);
    }

    #[test]
    fn disabled_window_never_tolerates_lag() {
        assert_eq!(ctrdelay(0, 100, 0), 0);
    }

    #[test]
    fn tolerance_shrinks_monotonically() {
        let a = ctrdelay(100, 100, 1000);
        let b = ctrdelay(500, 100, 1000);
        let c = ctrdelay(900, 100, 1000);
        assert!(a >= b);
        assert!(b >= c);
        assert!(c >= ctrdelay(999, 100, 1000));
    }

    #[test]
    fn ceiling_rounds_up_fractional_results() {
        // elapsed=1 of max_silence=3 -> fraction=1/3, delay*2/3 with delay=10 -> 6.66 -> 7
        assert_eq!(ctrdelay(1, 10, 3), 7);
    }
}
