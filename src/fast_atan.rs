//! Polynomial `atan2` approximation for the CPU reference path.
//!
//! Octant reduction to `[0, 1]`, then an odd degree-11 minimax polynomial.
//! Maximum absolute error is below 1e-5 rad over the full plane.

use std::f32::consts::{FRAC_PI_2, PI};

const A1: f32 = 0.999_977_26;
const A3: f32 = -0.332_623_47;
const A5: f32 = 0.193_543_46;
const A7: f32 = -0.116_432_87;
const A9: f32 = 0.052_653_32;
const A11: f32 = -0.011_721_20;

/// `atan(z)` for `z` in `[0, 1]`.
#[inline(always)]
fn atan_unit(z: f32) -> f32 {
    let z2 = z * z;
    z * (A1 + z2 * (A3 + z2 * (A5 + z2 * (A7 + z2 * (A9 + z2 * A11)))))
}

/// Fast approximation of `y.atan2(x)`, range (−π, π].
///
/// Returns 0 for the origin. Negative zero in `y` maps to +π on the negative
/// real axis, keeping the result inside the half-open range.
#[inline]
pub fn fast_atan2f(y: f32, x: f32) -> f32 {
    let ax = x.abs();
    let ay = y.abs();
    if ax == 0.0 && ay == 0.0 {
        return 0.0;
    }

    let mut angle = if ay > ax {
        FRAC_PI_2 - atan_unit(ax / ay)
    } else {
        atan_unit(ay / ax)
    };
    if x < 0.0 {
        angle = PI - angle;
    }
    if y < 0.0 {
        -angle
    } else {
        angle
    }
}
