//! Earth slides: neighbouring columns settle toward their angle of repose.

use crate::int::mag;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Slot of the east neighbour in a stencil-3 triple.
pub const EAST: usize = 1;
/// Slot of the south neighbour in a stencil-3 triple.
pub const SOUTH: usize = 2;

/// Earth to move from `left` to `right` (negative moves it back) so the two
/// columns end up about `repose` apart.
///
/// Columns already within `repose` of each other stay put. The mean is
/// floored, so a slide never carries a column past its neighbour.
pub fn slide(left: i64, right: i64, repose: i64) -> i64 {
    if left == right || mag(left - right) <= repose {
        return 0;
    }
    let mean = (left + right).div_euclid(2) - repose / 2;
    if left > right {
        mean - right
    } else {
        left - mean
    }
}

/// Fill `dst` with slide deltas toward the neighbour in slot `other`,
/// dividing each slide by `mute`. Returns the total moved.
pub fn slide_pass(dst: &mut [[i64; 3]], earth3s: &[[i64; 3]], repose: &[i64], mute: i64, other: usize) -> i64 {
    let cell = |(d, src): (&mut [i64; 3], &[i64; 3]), repose: i64| {
        *d = [src[0], 0, 0];
        let delta = slide(src[0], src[other], repose) / mute;
        d[0] -= delta;
        d[other] += delta;
        mag(delta)
    };

    #[cfg(feature = "parallel")]
    {
        dst.par_iter_mut()
            .zip(earth3s.par_iter())
            .zip(repose.par_iter())
            .map(|(pair, &r)| cell(pair, r))
            .sum()
    }

    #[cfg(not(feature = "parallel"))]
    {
        dst.iter_mut()
            .zip(earth3s)
            .zip(repose)
            .map(|(pair, &r)| cell(pair, r))
            .sum()
    }
}
