//! Numeric helpers called by generated arithmetic

use crate::error::{RuntimeError, RuntimeResult};

/// Floor of the square root of `n`.
pub fn isqrt(n: i64) -> RuntimeResult<i64> {
    if n < 0 {
        return Err(RuntimeError::NegativeSqrt { value: n });
    }
    Ok(n.isqrt())
}

pub fn sqrt(value: f64) -> f64 {
    value.sqrt()
}

/// Floored modulo: the result takes the sign of the divisor, so it is never
/// negative for a positive divisor.
pub fn safe_mod(n: i64, d: i64) -> RuntimeResult<i64> {
    if d == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let r = n.wrapping_rem(d);
    if r != 0 && (r < 0) != (d < 0) {
        Ok(r + d)
    } else {
        Ok(r)
    }
}

/// Floating counterpart of [`safe_mod`].
pub fn safe_mod_f(n: f64, d: f64) -> RuntimeResult<f64> {
    if d == 0.0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let r = n % d;
    if r != 0.0 && (r < 0.0) != (d < 0.0) {
        Ok(r + d)
    } else {
        Ok(r)
    }
}
