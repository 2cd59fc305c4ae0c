//! Scalar math helpers

/// Unnormalized cardinal sine, `sin(x)/x` with `sinc(0) = 1`
#[inline(always)]
pub fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    }
    else {
        x.sin() / x
    }
}

/// Largest representable `f64` strictly less than `x` (for finite, positive `x`)
pub fn next_below(x: f64) -> f64 {
    debug_assert!(x.is_finite() && x > 0.0);
    f64::from_bits(x.to_bits() - 1)
}
