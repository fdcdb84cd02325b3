//! Bracketed 1-D root finding.
//!
//! Brent's method: bisection safeguarded inverse-quadratic interpolation.
//! The positioner uses it to slide along a bisector edge to the point
//! equidistant from three sites, and the split-point search uses it to find
//! where an edge crosses the supporting line of a new segment. Both callers
//! hand in brackets whose endpoint signs differ by construction.

use num_traits::Float;
use thiserror::Error;

/// Errors from the bracketed solver.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RootFindingError {
    /// The function does not change sign over the supplied interval.
    #[error("no sign change over the bracket: f(a) = {fa}, f(b) = {fb}")]
    NoBracket {
        /// Function value at the left bracket end.
        fa: f64,
        /// Function value at the right bracket end.
        fb: f64,
    },
    /// The iteration budget was exhausted before the tolerance was met.
    #[error("no convergence after {iterations} iterations")]
    NoConvergence {
        /// Number of iterations performed.
        iterations: usize,
    },
}

/// Default iteration budget; Brent converges superlinearly, so this is ample
/// for any tolerance above machine epsilon.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

fn to_f64<T: Float>(x: T) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

/// Finds a root of `f` in `[a, b]` to within `tolerance` using Brent's
/// method.
///
/// `f(a)` and `f(b)` must have opposite signs (either may be exactly zero,
/// in which case that endpoint is returned).
///
/// # Errors
///
/// [`RootFindingError::NoBracket`] when the endpoint values have the same
/// sign, [`RootFindingError::NoConvergence`] when `max_iterations` passes do
/// not reach the tolerance.
pub fn brent<T, F>(
    f: F,
    a: T,
    b: T,
    tolerance: T,
    max_iterations: usize,
) -> Result<T, RootFindingError>
where
    T: Float,
    F: Fn(T) -> T,
{
    let zero = T::zero();
    let one = T::one();
    let two = one + one;
    let three = two + one;
    let half = one / two;

    let mut a = a;
    let mut b = b;
    let mut fa = f(a);
    let mut fb = f(b);

    if fa == zero {
        return Ok(a);
    }
    if fb == zero {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(RootFindingError::NoBracket {
            fa: to_f64(fa),
            fb: to_f64(fb),
        });
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = two * T::epsilon() * b.abs() + half * tolerance;
        let xm = half * (c - b);
        if xm.abs() <= tol1 || fb == zero {
            return Ok(b);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // interpolation step: secant when a == c, inverse quadratic otherwise
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (two * xm * s, one - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (two * xm * q * (q - r) - (b - a) * (r - one)),
                    (q - one) * (r - one) * (s - one),
                )
            };
            if p > zero {
                q = -q;
            }
            p = p.abs();
            let min1 = three * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if two * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        if d.abs() > tol1 {
            b = b + d;
        } else {
            b = b + tol1.copysign(xm);
        }
        fb = f(b);
    }

    Err(RootFindingError::NoConvergence {
        iterations: max_iterations,
    })
}
